// src/models.rs

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// --- EXECUTION RESULT ---

/// The raw outcome of one process execution. Produced by an executor,
/// consumed by the return-code validator and the result converters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub error: String,
    pub return_code: i32,
}

impl ExecutionResult {
    pub fn new(output: impl Into<String>, error: impl Into<String>, return_code: i32) -> Self {
        Self {
            output: output.into(),
            error: error.into(),
            return_code,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Result [output='{}', error='{}', return_code='{}']",
            shorten(&self.output),
            shorten(&self.error),
            self.return_code
        )
    }
}

/// Truncates long stream captures for display.
fn shorten(text: &str) -> String {
    const LIMIT: usize = 100;
    if text.chars().count() > LIMIT {
        let prefix: String = text.chars().take(LIMIT).collect();
        format!("{prefix}...")
    } else {
        text.to_string()
    }
}

// --- DESCRIPTOR SCHEMA ---
// The input boundary of the engine: whatever binding mechanism the caller
// uses (TOML file, builder calls, code generation) ends up producing these.

/// Whether an operation contributes a sub-command or an option token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Command,
    Option,
}

/// A pluggable component reference: a registry id plus an optional
/// configuration string (e.g. a regex pattern or a join delimiter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentChoice {
    pub id: String,
    #[serde(default)]
    pub config: Option<String>,
}

impl ComponentChoice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: None,
        }
    }

    pub fn with_config(id: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: Some(config.into()),
        }
    }
}

/// One declared parameter of an operation: either converted into a token
/// fragment, or routed by name into the extras map (bypassing conversion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSpec {
    Converted {
        #[serde(default = "default_parameter_converter")]
        converter: ComponentChoice,
        /// Declared value type id, consumed by the pre-flight checker only.
        #[serde(default)]
        value_type: Option<String>,
    },
    Extra { name: String },
}

impl ParamSpec {
    /// A parameter converted with the default string converter.
    pub fn converted() -> Self {
        Self::Converted {
            converter: default_parameter_converter(),
            value_type: None,
        }
    }

    pub fn converted_with(converter: ComponentChoice) -> Self {
        Self::Converted {
            converter,
            value_type: None,
        }
    }

    pub fn typed(converter: ComponentChoice, value_type: impl Into<String>) -> Self {
        Self::Converted {
            converter,
            value_type: Some(value_type.into()),
        }
    }

    pub fn extra(name: impl Into<String>) -> Self {
        Self::Extra { name: name.into() }
    }
}

/// Whether a descriptor triggers execution as soon as it is called, or only
/// arms the final `execute()` of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Now,
    Later,
}

/// How a chain ending at this descriptor runs and what it turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSpec {
    pub mode: ExecutionMode,
    #[serde(default = "default_executor")]
    pub executor: ComponentChoice,
    #[serde(default = "default_result_converter")]
    pub converter: ComponentChoice,
    #[serde(default = "default_output_type")]
    pub output_type: String,
    /// Three-state return-code expectation: absent checks for `{0}`, an
    /// explicit empty list disables checking, anything else is a strict
    /// membership check.
    #[serde(default)]
    pub expected_return_codes: Option<Vec<i32>>,
}

impl ExecutionSpec {
    pub fn now() -> Self {
        Self::with_mode(ExecutionMode::Now)
    }

    pub fn later() -> Self {
        Self::with_mode(ExecutionMode::Later)
    }

    fn with_mode(mode: ExecutionMode) -> Self {
        Self {
            mode,
            executor: default_executor(),
            converter: default_result_converter(),
            output_type: default_output_type(),
            expected_return_codes: None,
        }
    }

    pub fn with_executor(mut self, executor: ComponentChoice) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_converter(mut self, converter: ComponentChoice) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_output_type(mut self, output_type: impl Into<String>) -> Self {
        self.output_type = output_type.into();
        self
    }

    pub fn with_expected_return_codes(mut self, codes: impl Into<Vec<i32>>) -> Self {
        self.expected_return_codes = Some(codes.into());
        self
    }

    /// Disables return-code checking (the explicit-empty state).
    pub fn without_return_code_check(mut self) -> Self {
        self.expected_return_codes = Some(Vec::new());
        self
    }
}

/// One bound operation: everything needed to turn a call into a switch node
/// and, optionally, into an execution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub kind: OperationKind,
    /// The literal name token; may be empty for a bare parameter slot.
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    #[serde(default = "default_aggregator")]
    pub aggregator: ComponentChoice,
    #[serde(default = "default_join_parameter")]
    pub aggregator_parameter: String,
    #[serde(default = "default_flattener")]
    pub flattener: ComponentChoice,
    #[serde(default = "default_join_parameter")]
    pub flattener_parameter: String,
    #[serde(default)]
    pub execution: Option<ExecutionSpec>,
}

impl CallDescriptor {
    pub fn command(name: impl Into<String>) -> Self {
        Self::with_kind(OperationKind::Command, name)
    }

    pub fn option(name: impl Into<String>) -> Self {
        Self::with_kind(OperationKind::Option, name)
    }

    fn with_kind(kind: OperationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parameters: Vec::new(),
            aggregator: default_aggregator(),
            aggregator_parameter: default_join_parameter(),
            flattener: default_flattener(),
            flattener_parameter: default_join_parameter(),
            execution: None,
        }
    }

    pub fn with_parameter(mut self, parameter: ParamSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn aggregated_with(mut self, aggregator: ComponentChoice, parameter: impl Into<String>) -> Self {
        self.aggregator = aggregator;
        self.aggregator_parameter = parameter.into();
        self
    }

    pub fn flattened_with(mut self, flattener: ComponentChoice, parameter: impl Into<String>) -> Self {
        self.flattener = flattener;
        self.flattener_parameter = parameter.into();
        self
    }

    pub fn executed(mut self, execution: ExecutionSpec) -> Self {
        self.execution = Some(execution);
        self
    }
}

/// The full declared surface of one wrapped executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    /// Fixed leading argv tokens (the executable, possibly with baked-in
    /// leading arguments).
    pub executable: Vec<String>,
    #[serde(default)]
    pub operations: BTreeMap<String, CallDescriptor>,
}

impl InterfaceSpec {
    pub fn new<I, S>(executable: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            executable: executable.into_iter().map(Into::into).collect(),
            operations: BTreeMap::new(),
        }
    }

    pub fn with_operation(mut self, key: impl Into<String>, descriptor: CallDescriptor) -> Self {
        self.operations.insert(key.into(), descriptor);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }
}

// --- SERDE DEFAULTS ---

fn default_parameter_converter() -> ComponentChoice {
    ComponentChoice::new("string")
}

fn default_executor() -> ComponentChoice {
    ComponentChoice::new("process")
}

fn default_result_converter() -> ComponentChoice {
    ComponentChoice::new("result")
}

fn default_output_type() -> String {
    "result".to_string()
}

fn default_aggregator() -> ComponentChoice {
    ComponentChoice::new("symbol")
}

fn default_flattener() -> ComponentChoice {
    ComponentChoice::new("joining")
}

fn default_join_parameter() -> String {
    " ".to_string()
}

// MARK: --- UNIT TESTS ---
