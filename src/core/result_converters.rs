// src/core/result_converters.rs
//
// Converters that turn a finished execution into the caller's return value.

use crate::core::converters::{
    downcast_input, CompositeConverter, Converter, FromStrConverter, LambdaConverter,
};
use crate::core::registry::TypeRegistry;
use crate::core::value::{Extras, TypeSpec, Value, ValueRef};
use crate::error::Error;
use crate::models::ExecutionResult;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Builds the default result converter: the whole result, its output text,
/// its return code, unit for fire-and-forget calls, and any type the
/// registry knows how to build from a result.
pub fn default_result_converter(types: Arc<TypeRegistry>) -> CompositeConverter {
    CompositeConverter::new(vec![
        Arc::new(LambdaConverter::<ExecutionResult, ExecutionResult>::new(
            ExecutionResult::clone,
        )) as Arc<dyn Converter>,
        Arc::new(LambdaConverter::<ExecutionResult, String>::new(|result| {
            result.output.clone()
        })),
        Arc::new(LambdaConverter::<ExecutionResult, i32>::new(|result| {
            result.return_code
        })),
        Arc::new(LambdaConverter::<ExecutionResult, ()>::new(|_| ())),
        Arc::new(FactoryConverter { types }),
    ])
}

/// Converts an [`ExecutionResult`] into any type whose registry entry carries
/// factories, delegating the choice of factory to [`crate::core::factory::FactorySet`].
pub struct FactoryConverter {
    types: Arc<TypeRegistry>,
}

impl FactoryConverter {
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Self { types }
    }
}

impl fmt::Debug for FactoryConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FactoryConverter")
    }
}

impl Converter for FactoryConverter {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        input.is::<ExecutionResult>()
            && self
                .types
                .factory_set(output)
                .is_some_and(|set| set.resolve().is_some())
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        _extras: &Extras,
    ) -> Result<Value, Error> {
        let result = downcast_input::<ExecutionResult>(value, input, output)?;
        let builder = self
            .types
            .factory_set(output)
            .and_then(|set| set.resolve())
            .ok_or_else(|| Error::Conversion {
                input: input.name().to_string(),
                output: output.name().to_string(),
            })?;
        Ok(builder(result))
    }
}

/// Extracts the first capture group of a pattern from the output text, then
/// hands the extracted text to a delegate for the final conversion.
pub struct RegexResultConverter {
    regex: Regex,
    delegate: Arc<dyn Converter>,
}

impl RegexResultConverter {
    /// Compiles `pattern` and pairs it with the default delegate: identity
    /// for strings plus `FromStr` parsing for the numeric and boolean
    /// primitives.
    ///
    /// The pattern must define at least one capture group.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let delegate = CompositeConverter::new(vec![
            Arc::new(LambdaConverter::<String, String>::new(String::clone))
                as Arc<dyn Converter>,
            Arc::new(FromStrConverter::<i8>::new()),
            Arc::new(FromStrConverter::<i16>::new()),
            Arc::new(FromStrConverter::<i32>::new()),
            Arc::new(FromStrConverter::<i64>::new()),
            Arc::new(FromStrConverter::<u8>::new()),
            Arc::new(FromStrConverter::<u16>::new()),
            Arc::new(FromStrConverter::<u32>::new()),
            Arc::new(FromStrConverter::<u64>::new()),
            Arc::new(FromStrConverter::<f32>::new()),
            Arc::new(FromStrConverter::<f64>::new()),
            Arc::new(FromStrConverter::<bool>::new()),
        ]);
        Self::with_delegate(pattern, Arc::new(delegate))
    }

    pub fn with_delegate(pattern: &str, delegate: Arc<dyn Converter>) -> Result<Self, Error> {
        let regex = Regex::new(pattern)
            .map_err(|error| Error::InvalidConfig(format!("invalid pattern '{pattern}': {error}")))?;
        if regex.captures_len() < 2 {
            return Err(Error::InvalidConfig(format!(
                "pattern '{pattern}' must define a capture group"
            )));
        }
        Ok(Self { regex, delegate })
    }
}

impl fmt::Debug for RegexResultConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegexResultConverter({:?})", self.regex.as_str())
    }
}

impl Converter for RegexResultConverter {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        input.is::<ExecutionResult>()
            && self
                .delegate
                .can_convert(TypeSpec::of::<String>(), output)
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        extras: &Extras,
    ) -> Result<Value, Error> {
        let result = downcast_input::<ExecutionResult>(value, input, output)?;
        let captures = self
            .regex
            .captures(&result.output)
            .ok_or_else(|| Error::Extraction {
                pattern: self.regex.as_str().to_string(),
                text: result.output.clone(),
            })?;
        let extracted = captures
            .get(1)
            .map(|group| group.as_str().to_string())
            .ok_or_else(|| Error::Extraction {
                pattern: self.regex.as_str().to_string(),
                text: result.output.clone(),
            })?;
        self.delegate
            .convert(&extracted, TypeSpec::of::<String>(), output, extras)
    }
}

// MARK: --- UNIT TESTS ---
