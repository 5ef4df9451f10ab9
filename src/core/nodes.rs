// src/core/nodes.rs
//
// The in-flight shape of one call chain: an executable node owning switch
// nodes owning parameter nodes. Conversion is deferred until flatten time so
// every parameter sees the extras accumulated over the whole chain.

use crate::core::converters::Converter;
use crate::core::joining::{Aggregator, Flattener};
use crate::core::value::{Extras, TypeSpec, Value};
use crate::error::Error;
use crate::system::environment::ExecutionEnvironment;
use crate::system::executor::Executor;
use std::borrow::Cow;
use std::sync::Arc;

/// One not-yet-converted argument of a switch.
pub struct ParameterNode {
    value: Value,
    value_type: TypeSpec,
    converter: Arc<dyn Converter>,
}

impl ParameterNode {
    pub fn new(value: Value, value_type: TypeSpec, converter: Arc<dyn Converter>) -> Self {
        Self {
            value,
            value_type,
            converter,
        }
    }

    fn flatten(&self, extras: &Extras) -> Result<String, Error> {
        let converted = self.converter.convert(
            self.value.as_ref(),
            self.value_type,
            TypeSpec::of::<String>(),
            extras,
        )?;
        converted
            .downcast::<String>()
            .map(|text| *text)
            .map_err(|_| Error::Conversion {
                input: self.value_type.name().to_string(),
                output: TypeSpec::of::<String>().name().to_string(),
            })
    }
}

/// One command or option of the chain, with the parameters attached to it
/// and the joining strategy that collapses them into a single token.
pub struct SwitchNode {
    name: String,
    aggregator: Arc<dyn Aggregator>,
    aggregator_parameter: String,
    flattener: Arc<dyn Flattener>,
    flattener_parameter: String,
    parameters: Vec<ParameterNode>,
}

impl SwitchNode {
    pub fn new(
        name: impl Into<String>,
        aggregator: Arc<dyn Aggregator>,
        aggregator_parameter: impl Into<String>,
        flattener: Arc<dyn Flattener>,
        flattener_parameter: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            aggregator,
            aggregator_parameter: aggregator_parameter.into(),
            flattener,
            flattener_parameter: flattener_parameter.into(),
            parameters: Vec::new(),
        }
    }

    pub fn push_parameter(&mut self, parameter: ParameterNode) {
        self.parameters.push(parameter);
    }

    fn flatten(&self, extras: &Extras) -> Result<String, Error> {
        let mut converted = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            converted.push(parameter.flatten(extras)?);
        }
        let value = self
            .flattener
            .flatten(&converted, &self.flattener_parameter, extras);
        Ok(self
            .aggregator
            .aggregate(&self.name, &value, &self.aggregator_parameter, extras))
    }
}

/// How the chain finishes: which executor runs it, which converter shapes
/// the result, into which type, under which return-code policy.
pub struct ExecutionContext {
    pub executor: Arc<dyn Executor>,
    pub converter: Arc<dyn Converter>,
    pub output: TypeSpec,
    pub expected_return_codes: Option<Vec<i32>>,
}

/// The root of one call chain.
pub struct ExecutableNode {
    executable: Vec<String>,
    switches: Vec<SwitchNode>,
    extras: Extras,
    context: ExecutionContext,
}

impl ExecutableNode {
    pub fn new(executable: Vec<String>, context: ExecutionContext) -> Self {
        Self {
            executable,
            switches: Vec::new(),
            extras: Extras::new(),
            context,
        }
    }

    pub fn push_switch(&mut self, switch: SwitchNode) {
        self.switches.push(switch);
    }

    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    pub fn extras_mut(&mut self) -> &mut Extras {
        &mut self.extras
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    pub fn output_type(&self) -> TypeSpec {
        self.context.output
    }

    /// Renders the chain into command-line tokens: the executable tokens
    /// followed by one token per switch, in call order.
    pub fn flatten(&self) -> Result<Vec<String>, Error> {
        let mut tokens = self.executable.clone();
        for switch in &self.switches {
            tokens.push(switch.flatten(&self.extras)?);
        }
        Ok(tokens)
    }

    /// Flattens, runs, checks the return code and converts the result.
    ///
    /// An absent expected-code list means `{0}`; an explicitly empty list
    /// skips the check entirely.
    pub fn execute(self, environment: &ExecutionEnvironment) -> Result<Value, Error> {
        let tokens = self.flatten()?;
        log::debug!("executing {tokens:?}");
        let result = environment.run(self.context.executor.as_ref(), &tokens, &self.extras)?;
        let expected: Cow<'_, [i32]> = match &self.context.expected_return_codes {
            None => Cow::Owned(vec![0]),
            Some(codes) => Cow::Borrowed(codes),
        };
        if !expected.is_empty() && !expected.contains(&result.return_code) {
            return Err(Error::ReturnCodeMismatch {
                actual: result.return_code,
                expected: expected.into_owned(),
                result,
            });
        }
        self.context.converter.convert(
            &result,
            TypeSpec::of::<crate::models::ExecutionResult>(),
            self.context.output,
            &self.extras,
        )
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::core::registry::ComponentRegistry;
    use crate::core::value::Arg;
    use crate::models::{ComponentChoice, ExecutionResult};
    use crate::system::executor::ExecutionError;
    use std::sync::Mutex;

    /// Records the tokens it was handed and replies with a canned result.
    #[derive(Debug)]
    struct MockExecutor {
        seen: Mutex<Vec<Vec<String>>>,
        return_code: i32,
    }

    impl MockExecutor {
        fn with_code(return_code: i32) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                return_code,
            })
        }
    }

    impl Executor for MockExecutor {
        fn execute(
            &self,
            tokens: &[String],
            _environment: &ExecutionEnvironment,
            _extras: &Extras,
        ) -> Result<ExecutionResult, ExecutionError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(tokens.to_vec());
            }
            Ok(ExecutionResult {
                output: "ok".to_string(),
                error: String::new(),
                return_code: self.return_code,
            })
        }
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::default()
    }

    fn context(
        registry: &ComponentRegistry,
        executor: Arc<dyn Executor>,
        expected_return_codes: Option<Vec<i32>>,
    ) -> ExecutionContext {
        ExecutionContext {
            executor,
            converter: registry
                .converter(&ComponentChoice::new("result"))
                .unwrap(),
            output: TypeSpec::of::<ExecutionResult>(),
            expected_return_codes,
        }
    }

    fn switch_with(registry: &ComponentRegistry, name: &str, arguments: Vec<Arg>) -> SwitchNode {
        let mut switch = SwitchNode::new(
            name,
            registry.aggregator(&ComponentChoice::new("symbol")).unwrap(),
            " ",
            registry.flattener(&ComponentChoice::new("joining")).unwrap(),
            " ",
        );
        let converter = registry.converter(&ComponentChoice::new("string")).unwrap();
        for argument in arguments {
            switch.push_parameter(ParameterNode::new(
                argument.value,
                argument.value_type,
                Arc::clone(&converter),
            ));
        }
        switch
    }

    #[test]
    fn test_flatten_keeps_call_order_and_quotes_spaced_values() {
        let registry = registry();
        let executor = MockExecutor::with_code(0);
        let mut node = ExecutableNode::new(
            vec!["git".to_string()],
            context(&registry, executor, None),
        );
        node.push_switch(switch_with(&registry, "commit", vec![]));
        node.push_switch(switch_with(
            &registry,
            "-m",
            vec![crate::arg("Some message".to_string())],
        ));
        node.push_switch(switch_with(
            &registry,
            "",
            vec![crate::arg("whatever.txt".to_string())],
        ));
        assert_eq!(
            node.flatten().unwrap(),
            vec!["git", "commit", "-m \"Some message\"", "whatever.txt"]
        );
    }

    #[test]
    fn test_execute_defaults_to_expecting_zero() {
        let registry = registry();
        let environment = ExecutionEnvironment::default();
        let failing = MockExecutor::with_code(1);
        let node = ExecutableNode::new(
            vec!["tool".to_string()],
            context(&registry, failing, None),
        );
        let error = node.execute(&environment).unwrap_err();
        match error {
            Error::ReturnCodeMismatch {
                actual,
                expected,
                result,
            } => {
                assert_eq!(actual, 1);
                assert_eq!(expected, vec![0]);
                assert_eq!(result.return_code, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_execute_accepts_listed_codes() {
        let registry = registry();
        let environment = ExecutionEnvironment::default();
        let node = ExecutableNode::new(
            vec!["tool".to_string()],
            context(&registry, MockExecutor::with_code(3), Some(vec![0, 3])),
        );
        assert!(node.execute(&environment).is_ok());
    }

    #[test]
    fn test_execute_with_empty_list_skips_the_check() {
        let registry = registry();
        let environment = ExecutionEnvironment::default();
        let node = ExecutableNode::new(
            vec!["tool".to_string()],
            context(&registry, MockExecutor::with_code(42), Some(vec![])),
        );
        assert!(node.execute(&environment).is_ok());
    }

    #[test]
    fn test_extras_are_visible_while_flattening() {
        let mut registry = registry();
        registry.register_converter("suffixing", |_| {
            Ok(Arc::new(
                crate::core::converters::LambdaConverter::<String, String>::with_extras(
                    |value, extras| {
                        let suffix = extras.get::<String>("suffix").cloned().unwrap_or_default();
                        format!("{value}{suffix}")
                    },
                ),
            ))
        });
        let converter = registry
            .converter(&ComponentChoice::new("suffixing"))
            .unwrap();
        let mut node = ExecutableNode::new(
            vec!["tool".to_string()],
            context(&registry, MockExecutor::with_code(0), None),
        );
        let mut switch = SwitchNode::new(
            "--name",
            registry.aggregator(&ComponentChoice::new("symbol")).unwrap(),
            "=",
            registry.flattener(&ComponentChoice::new("joining")).unwrap(),
            " ",
        );
        let argument = crate::arg("value".to_string());
        switch.push_parameter(ParameterNode::new(
            argument.value,
            argument.value_type,
            converter,
        ));
        node.push_switch(switch);
        node.extras_mut().insert("suffix", "!".to_string());
        assert_eq!(node.flatten().unwrap(), vec!["tool", "--name=value!"]);
    }
}
