// src/core/invocation.rs
//
// The user-facing surface: a `Wrapper` compiles an interface spec into
// resolved components once, and each `invoke()` opens an `Invocation` that
// accumulates a call chain and is consumed by `execute`.

use crate::core::check::validate_spec;
use crate::core::converters::Converter;
use crate::core::joining::{Aggregator, Flattener};
use crate::core::nodes::{ExecutableNode, ExecutionContext, ParameterNode, SwitchNode};
use crate::core::registry::{ComponentRegistry, TypeRegistry};
use crate::core::value::{Arg, Extras, TypeSpec, Value};
use crate::error::Error;
use crate::models::{ComponentChoice, ExecutionMode, ExecutionSpec, InterfaceSpec, ParamSpec};
use crate::system::environment::ExecutionEnvironment;
use crate::system::executor::Executor;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

enum CompiledParam {
    Converted { converter: Arc<dyn Converter> },
    Extra { name: String },
}

struct CompiledExecution {
    mode: ExecutionMode,
    executor: Arc<dyn Executor>,
    converter: Arc<dyn Converter>,
    output: TypeSpec,
    expected_return_codes: Option<Vec<i32>>,
}

struct CompiledOperation {
    name: String,
    parameters: Vec<CompiledParam>,
    aggregator: Arc<dyn Aggregator>,
    aggregator_parameter: String,
    flattener: Arc<dyn Flattener>,
    flattener_parameter: String,
    execution: Option<CompiledExecution>,
}

/// A command-line interface with every named component resolved, ready to
/// hand out invocations. Compilation fails eagerly on unknown component,
/// type, or converter configuration, so each call site only deals with
/// call-shaped errors.
pub struct Wrapper {
    executable: Vec<String>,
    operations: BTreeMap<String, CompiledOperation>,
    default_executor: Arc<dyn Executor>,
    default_converter: Arc<dyn Converter>,
    default_output: TypeSpec,
    environment: ExecutionEnvironment,
}

impl Wrapper {
    /// Compiles `spec` against explicit registries.
    pub fn new(
        spec: &InterfaceSpec,
        registry: &ComponentRegistry,
    ) -> Result<Self, Error> {
        let types = registry.types();
        let mut operations = BTreeMap::new();
        for (key, descriptor) in &spec.operations {
            let mut parameters = Vec::with_capacity(descriptor.parameters.len());
            for parameter in &descriptor.parameters {
                parameters.push(match parameter {
                    ParamSpec::Converted { converter, .. } => CompiledParam::Converted {
                        converter: registry.converter(converter)?,
                    },
                    ParamSpec::Extra { name } => CompiledParam::Extra { name: name.clone() },
                });
            }
            let execution = descriptor
                .execution
                .as_ref()
                .map(|execution| Self::compile_execution(execution, registry, types))
                .transpose()?;
            operations.insert(
                key.clone(),
                CompiledOperation {
                    name: descriptor.name.clone(),
                    parameters,
                    aggregator: registry.aggregator(&descriptor.aggregator)?,
                    aggregator_parameter: descriptor.aggregator_parameter.clone(),
                    flattener: registry.flattener(&descriptor.flattener)?,
                    flattener_parameter: descriptor.flattener_parameter.clone(),
                    execution,
                },
            );
        }
        log::debug!(
            "compiled wrapper for {:?} with {} operation(s)",
            spec.executable,
            operations.len()
        );
        Ok(Self {
            executable: spec.executable.clone(),
            operations,
            default_executor: registry.executor(&ComponentChoice::new("process"))?,
            default_converter: registry.converter(&ComponentChoice::new("result"))?,
            default_output: types.resolve("result")?,
            environment: ExecutionEnvironment::default(),
        })
    }

    /// Compiles `spec` with the built-in registries.
    pub fn with_defaults(spec: &InterfaceSpec) -> Result<Self, Error> {
        Self::new(spec, &ComponentRegistry::default())
    }

    /// Like [`Wrapper::new`], but runs the pre-flight checker first and
    /// refuses specs it reports on.
    pub fn checked(
        spec: &InterfaceSpec,
        registry: &ComponentRegistry,
    ) -> Result<Self, Error> {
        let report = validate_spec(spec, registry);
        if !report.is_empty() {
            return Err(Error::Validation(report));
        }
        Self::new(spec, registry)
    }

    fn compile_execution(
        execution: &ExecutionSpec,
        registry: &ComponentRegistry,
        types: &Arc<TypeRegistry>,
    ) -> Result<CompiledExecution, Error> {
        Ok(CompiledExecution {
            mode: execution.mode,
            executor: registry.executor(&execution.executor)?,
            converter: registry.converter(&execution.converter)?,
            output: types.resolve(&execution.output_type)?,
            expected_return_codes: execution.expected_return_codes.clone(),
        })
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut ExecutionEnvironment {
        &mut self.environment
    }

    /// Opens a fresh call chain.
    pub fn invoke(&self) -> Invocation<'_> {
        let context = ExecutionContext {
            executor: Arc::clone(&self.default_executor),
            converter: Arc::clone(&self.default_converter),
            output: self.default_output,
            expected_return_codes: None,
        };
        Invocation {
            wrapper: self,
            node: ExecutableNode::new(self.executable.clone(), context),
        }
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("executable", &self.executable)
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// One accumulating call chain. `call` appends switches; consuming `execute`
/// runs the chain, so a finished invocation cannot be reused or extended.
pub struct Invocation<'a> {
    wrapper: &'a Wrapper,
    node: ExecutableNode,
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("wrapper", &self.wrapper)
            .finish_non_exhaustive()
    }
}

impl Invocation<'_> {
    /// Appends the operation named `key`, binding `arguments` to its
    /// declared parameters in order.
    ///
    /// Operations that execute immediately are rejected here; use
    /// [`Invocation::execute_now`] for those.
    pub fn call(mut self, key: &str, arguments: Vec<Arg>) -> Result<Self, Error> {
        self.apply(key, arguments, false)?;
        Ok(self)
    }

    /// Runs the accumulated chain and returns the erased result.
    pub fn execute(self) -> Result<Value, Error> {
        self.node.execute(&self.wrapper.environment)
    }

    /// Runs the accumulated chain and downcasts the result to `T`.
    pub fn execute_as<T: Any>(self) -> Result<T, Error> {
        let declared = self.node.output_type();
        let value = self.execute()?;
        match value.downcast::<T>() {
            Ok(typed) => Ok(*typed),
            Err(_) => Err(Error::Downcast {
                declared: declared.name().to_string(),
                requested: std::any::type_name::<T>(),
            }),
        }
    }

    /// Appends the operation named `key` and executes right away, as
    /// immediate operations require.
    pub fn execute_now(mut self, key: &str, arguments: Vec<Arg>) -> Result<Value, Error> {
        self.apply(key, arguments, true)?;
        self.execute()
    }

    /// [`Invocation::execute_now`], downcast to `T`.
    pub fn execute_now_as<T: Any>(mut self, key: &str, arguments: Vec<Arg>) -> Result<T, Error> {
        self.apply(key, arguments, true)?;
        self.execute_as()
    }

    /// The extras accumulated so far, for out-of-band context like
    /// interactive-session accumulators.
    pub fn extras_mut(&mut self) -> &mut Extras {
        self.node.extras_mut()
    }

    /// Renders the chain to tokens without running anything.
    pub fn flatten(&self) -> Result<Vec<String>, Error> {
        self.node.flatten()
    }

    fn apply(&mut self, key: &str, arguments: Vec<Arg>, immediate: bool) -> Result<(), Error> {
        let operation = self
            .wrapper
            .operations
            .get(key)
            .ok_or_else(|| Error::UnknownOperation(key.to_string()))?;
        if operation.parameters.len() != arguments.len() {
            return Err(Error::ArityMismatch {
                operation: key.to_string(),
                expected: operation.parameters.len(),
                actual: arguments.len(),
            });
        }
        if let Some(execution) = &operation.execution {
            if execution.mode == ExecutionMode::Now && !immediate {
                return Err(Error::ImmediateOperation(key.to_string()));
            }
            let context = self.node.context_mut();
            context.executor = Arc::clone(&execution.executor);
            context.converter = Arc::clone(&execution.converter);
            context.output = execution.output;
            context.expected_return_codes = execution.expected_return_codes.clone();
        }
        let mut switch = SwitchNode::new(
            operation.name.clone(),
            Arc::clone(&operation.aggregator),
            operation.aggregator_parameter.clone(),
            Arc::clone(&operation.flattener),
            operation.flattener_parameter.clone(),
        );
        for (parameter, argument) in operation.parameters.iter().zip(arguments) {
            match parameter {
                CompiledParam::Converted { converter } => {
                    switch.push_parameter(ParameterNode::new(
                        argument.value,
                        argument.value_type,
                        Arc::clone(converter),
                    ));
                }
                CompiledParam::Extra { name } => {
                    self.node
                        .extras_mut()
                        .insert_value(name.clone(), argument.value);
                }
            }
        }
        self.node.push_switch(switch);
        Ok(())
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::models::{CallDescriptor, ExecutionResult};
    use std::path::PathBuf;

    fn java_spec() -> InterfaceSpec {
        InterfaceSpec::new(["java"])
            .with_operation(
                "classpath",
                CallDescriptor::option("-classpath")
                    .with_parameter(ParamSpec::converted_with(ComponentChoice::new("paths"))),
            )
            .with_operation(
                "main",
                CallDescriptor::command("")
                    .with_parameter(ParamSpec::converted())
                    .executed(ExecutionSpec::later()),
            )
            .with_operation(
                "version",
                CallDescriptor::option("-version").executed(
                    ExecutionSpec::now()
                        .with_converter(ComponentChoice::with_config(
                            "regex",
                            r#"version "([^"]+)""#,
                        ))
                        .with_output_type("string")
                        .without_return_code_check(),
                ),
            )
    }

    #[test]
    fn test_flatten_resolves_deferred_parameters() {
        let wrapper = Wrapper::with_defaults(&java_spec()).unwrap();
        let invocation = wrapper
            .invoke()
            .call(
                "classpath",
                vec![crate::arg(crate::core::converters::ValueList::of(vec![
                    PathBuf::from("a.jar"),
                    PathBuf::from("b.jar"),
                ]))],
            )
            .unwrap()
            .call("main", vec![crate::arg("mainClass".to_string())])
            .unwrap();
        let delimiter = if cfg!(windows) { ";" } else { ":" };
        assert_eq!(
            invocation.flatten().unwrap(),
            vec![
                "java".to_string(),
                format!("-classpath a.jar{delimiter}b.jar"),
                "mainClass".to_string(),
            ]
        );
    }

    #[test]
    fn test_debug_output_names_the_executable() {
        let wrapper = Wrapper::with_defaults(&java_spec()).unwrap();
        assert!(format!("{wrapper:?}").contains("java"));
        assert!(format!("{:?}", wrapper.invoke()).starts_with("Invocation"));
    }

    #[test]
    fn test_unknown_operation_is_reported() {
        let wrapper = Wrapper::with_defaults(&java_spec()).unwrap();
        let error = wrapper.invoke().call("nope", vec![]).unwrap_err();
        assert!(matches!(error, Error::UnknownOperation(_)));
    }

    #[test]
    fn test_arity_is_checked_per_operation() {
        let wrapper = Wrapper::with_defaults(&java_spec()).unwrap();
        let error = wrapper.invoke().call("main", vec![]).unwrap_err();
        match error {
            Error::ArityMismatch {
                operation,
                expected,
                actual,
            } => {
                assert_eq!(operation, "main");
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_immediate_operations_refuse_plain_calls() {
        let wrapper = Wrapper::with_defaults(&java_spec()).unwrap();
        let error = wrapper.invoke().call("version", vec![]).unwrap_err();
        assert!(matches!(error, Error::ImmediateOperation(_)));
    }

    #[test]
    fn test_checked_compile_reports_every_issue_up_front() {
        let spec = InterfaceSpec::new(["tool"])
            .with_operation(
                "first",
                CallDescriptor::command("a")
                    .flattened_with(ComponentChoice::new("missing"), " "),
            )
            .with_operation(
                "second",
                CallDescriptor::command("b")
                    .executed(ExecutionSpec::later().with_output_type("no_such_type")),
            );
        let error = Wrapper::checked(&spec, &ComponentRegistry::default()).unwrap_err();
        match error {
            Error::Validation(report) => assert_eq!(report.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compile_fails_on_unknown_component() {
        let spec = InterfaceSpec::new(["tool"]).with_operation(
            "broken",
            CallDescriptor::command("go")
                .aggregated_with(ComponentChoice::new("missing"), " "),
        );
        let error = Wrapper::with_defaults(&spec).unwrap_err();
        assert!(matches!(error, Error::UnknownComponent { .. }));
    }

    #[test]
    fn test_execute_as_mismatch_names_the_declared_type() {
        let mut registry = ComponentRegistry::default();
        registry.register_executor("canned", |_| {
            Ok(Arc::new(CannedExecutor {
                result: ExecutionResult::new("out", "", 0),
            }))
        });
        let spec = InterfaceSpec::new(["tool"]).with_operation(
            "go",
            CallDescriptor::command("go").executed(
                ExecutionSpec::later()
                    .with_executor(ComponentChoice::new("canned"))
                    .with_output_type("string"),
            ),
        );
        let wrapper = Wrapper::new(&spec, &registry).unwrap();
        let error = wrapper
            .invoke()
            .call("go", vec![])
            .unwrap()
            .execute_as::<i32>()
            .unwrap_err();
        match error {
            Error::Downcast {
                declared,
                requested,
            } => {
                assert!(declared.contains("String"));
                assert!(requested.contains("i32"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_end_to_end_with_a_canned_executor() {
        let mut registry = ComponentRegistry::default();
        registry.register_executor("canned", |_| {
            Ok(Arc::new(CannedExecutor {
                result: ExecutionResult::new("java version \"11.0.2\"", "", 0),
            }))
        });
        let mut spec = java_spec();
        if let Some(version) = spec.operations.get_mut("version") {
            if let Some(execution) = version.execution.as_mut() {
                execution.executor = ComponentChoice::new("canned");
            }
        }
        let wrapper = Wrapper::new(&spec, &registry).unwrap();
        let version: String = wrapper.invoke().execute_now_as("version", vec![]).unwrap();
        assert_eq!(version, "11.0.2");
    }

    #[derive(Debug)]
    struct CannedExecutor {
        result: ExecutionResult,
    }

    impl crate::system::executor::Executor for CannedExecutor {
        fn execute(
            &self,
            _tokens: &[String],
            _environment: &ExecutionEnvironment,
            _extras: &Extras,
        ) -> Result<ExecutionResult, crate::system::executor::ExecutionError> {
            Ok(self.result.clone())
        }
    }
}
