// src/core/converters.rs

use crate::core::joining::Flattener;
use crate::core::value::{Extras, TypeSpec, Value, ValueRef};
use crate::error::Error;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Converts a type-erased value into another type-erased value.
///
/// `convert` must only be called when `can_convert` held for the same
/// `(input, output)` pair; composites rely on that protocol to pick a member.
pub trait Converter: fmt::Debug + Send + Sync {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool;

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        extras: &Extras,
    ) -> Result<Value, Error>;
}

/// Downcasts a converter input, mapping failure to a conversion error that
/// names both attempted types.
pub(crate) fn downcast_input<'a, T: Any>(
    value: ValueRef<'a>,
    input: TypeSpec,
    output: TypeSpec,
) -> Result<&'a T, Error> {
    value.downcast_ref::<T>().ok_or_else(|| Error::Conversion {
        input: input.name().to_string(),
        output: output.name().to_string(),
    })
}

// --- COMPOSITE ---

/// Tries member converters in declaration order and uses the first whose
/// `can_convert` succeeds; no winner is a conversion error.
#[derive(Debug, Clone, Default)]
pub struct CompositeConverter {
    members: Vec<Arc<dyn Converter>>,
}

impl CompositeConverter {
    pub fn new(members: Vec<Arc<dyn Converter>>) -> Self {
        Self { members }
    }

    pub fn push(&mut self, member: Arc<dyn Converter>) {
        self.members.push(member);
    }
}

impl Converter for CompositeConverter {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        self.members
            .iter()
            .any(|member| member.can_convert(input, output))
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        extras: &Extras,
    ) -> Result<Value, Error> {
        let member = self
            .members
            .iter()
            .find(|member| member.can_convert(input, output))
            .ok_or_else(|| Error::Conversion {
                input: input.name().to_string(),
                output: output.name().to_string(),
            })?;
        log::trace!("converting '{input}' to '{output}' with {member:?}");
        member.convert(value, input, output, extras)
    }
}

// --- BUILT-IN MEMBERS ---

/// `T` → `String` through the value's `Display` implementation.
pub struct DisplayConverter<T>(PhantomData<fn() -> T>);

impl<T> DisplayConverter<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for DisplayConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DisplayConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayConverter<{}>", std::any::type_name::<T>())
    }
}

impl<T: fmt::Display + Any> Converter for DisplayConverter<T> {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        input.is::<T>() && output.is::<String>()
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        _extras: &Extras,
    ) -> Result<Value, Error> {
        let typed = downcast_input::<T>(value, input, output)?;
        Ok(Box::new(typed.to_string()))
    }
}

/// Wraps a delegate's string result in double quotes when it contains
/// whitespace. The only quoting this crate performs.
#[derive(Debug)]
pub struct QuotedIfNeeded<C> {
    inner: C,
}

impl<C> QuotedIfNeeded<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

pub(crate) fn quote_if_needed(text: String) -> String {
    if text.chars().any(char::is_whitespace) {
        format!("\"{text}\"")
    } else {
        text
    }
}

impl<C: Converter> Converter for QuotedIfNeeded<C> {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        self.inner.can_convert(input, output)
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        extras: &Extras,
    ) -> Result<Value, Error> {
        let converted = self.inner.convert(value, input, output, extras)?;
        match converted.downcast::<String>() {
            Ok(text) => Ok(Box::new(quote_if_needed(*text))),
            // The delegate produced a non-string; pass it through untouched.
            Err(other) => Ok(other),
        }
    }
}

/// `String` → `T` through `FromStr`.
pub struct FromStrConverter<T>(PhantomData<fn() -> T>);

impl<T> FromStrConverter<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for FromStrConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FromStrConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FromStrConverter<{}>", std::any::type_name::<T>())
    }
}

impl<T: FromStr + Any + Send + Sync> Converter for FromStrConverter<T> {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        input.is::<String>() && output.is::<T>()
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        _extras: &Extras,
    ) -> Result<Value, Error> {
        let text = downcast_input::<String>(value, input, output)?;
        let parsed: T = text.parse().map_err(|_| Error::Parse {
            text: text.clone(),
            output: output.name().to_string(),
        })?;
        Ok(Box::new(parsed))
    }
}

/// Binds one fixed `(I, O)` pair to an arbitrary closure, ignoring any
/// subtype/polymorphism concerns.
pub struct LambdaConverter<I, O> {
    convertlet: Arc<dyn Fn(&I, &Extras) -> O + Send + Sync>,
}

impl<I: Any, O: Any + Send + Sync> LambdaConverter<I, O> {
    pub fn new(convertlet: impl Fn(&I) -> O + Send + Sync + 'static) -> Self {
        Self::with_extras(move |value, _extras| convertlet(value))
    }

    pub fn with_extras(convertlet: impl Fn(&I, &Extras) -> O + Send + Sync + 'static) -> Self {
        Self {
            convertlet: Arc::new(convertlet),
        }
    }
}

impl<I, O> fmt::Debug for LambdaConverter<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LambdaConverter<{}, {}>",
            std::any::type_name::<I>(),
            std::any::type_name::<O>()
        )
    }
}

impl<I: Any, O: Any + Send + Sync> Converter for LambdaConverter<I, O> {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        input.is::<I>() && output.is::<O>()
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        extras: &Extras,
    ) -> Result<Value, Error> {
        let typed = downcast_input::<I>(value, input, output)?;
        Ok(Box::new((self.convertlet)(typed, extras)))
    }
}

/// `PathBuf` → `String`, lossy on non-UTF-8 components, quoted if the
/// rendered path contains whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathConverter;

impl Converter for PathConverter {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        input.is::<PathBuf>() && output.is::<String>()
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        _extras: &Extras,
    ) -> Result<Value, Error> {
        let path = downcast_input::<PathBuf>(value, input, output)?;
        Ok(Box::new(quote_if_needed(
            path.display().to_string(),
        )))
    }
}

// --- MULTI-VALUED PARAMETERS ---

/// An ordered, type-erased element list: how multi-valued parameters cross
/// the erasure boundary while keeping their element type for conversion.
pub struct ValueList {
    items: Vec<Value>,
    element_type: TypeSpec,
}

impl ValueList {
    pub fn of<T: Any + Send + Sync>(items: Vec<T>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| Box::new(item) as Value)
                .collect(),
            element_type: TypeSpec::of::<T>(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueList<{}>[{}]", self.element_type, self.items.len())
    }
}

/// Converts a [`ValueList`] to one string: each element through the element
/// converter, then the ordered results through a flattener with its own
/// delimiter. This is what lets a multi-valued parameter use one delimiter
/// while the switch-to-value join uses another.
pub struct ItemsConverter {
    element: Arc<dyn Converter>,
    flattener: Arc<dyn Flattener>,
    delimiter: String,
}

impl ItemsConverter {
    pub fn new(
        element: Arc<dyn Converter>,
        flattener: Arc<dyn Flattener>,
        delimiter: impl Into<String>,
    ) -> Self {
        Self {
            element,
            flattener,
            delimiter: delimiter.into(),
        }
    }
}

impl fmt::Debug for ItemsConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemsConverter(delimiter={:?})", self.delimiter)
    }
}

impl Converter for ItemsConverter {
    fn can_convert(&self, input: TypeSpec, output: TypeSpec) -> bool {
        // The element type only travels with the value, so per-element
        // convertibility is checked at convert time.
        input.is::<ValueList>() && output.is::<String>()
    }

    fn convert(
        &self,
        value: ValueRef<'_>,
        input: TypeSpec,
        output: TypeSpec,
        extras: &Extras,
    ) -> Result<Value, Error> {
        let list = downcast_input::<ValueList>(value, input, output)?;
        let mut converted = Vec::with_capacity(list.items.len());
        for item in &list.items {
            let element = self.element.convert(
                item.as_ref(),
                list.element_type,
                TypeSpec::of::<String>(),
                extras,
            )?;
            match element.downcast::<String>() {
                Ok(text) => converted.push(*text),
                Err(_) => {
                    return Err(Error::Conversion {
                        input: list.element_type.name().to_string(),
                        output: output.name().to_string(),
                    });
                }
            }
        }
        Ok(Box::new(
            self.flattener.flatten(&converted, &self.delimiter, extras),
        ))
    }
}

// MARK: --- UNIT TESTS ---
