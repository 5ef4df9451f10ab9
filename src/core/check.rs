// src/core/check.rs
//
// Pre-flight validation of an interface spec: every problem the registries
// would only surface at call time, gathered in one pass so a spec can be
// vetted in a test before anything runs.

use crate::core::registry::ComponentRegistry;
use crate::core::value::TypeSpec;
use crate::error::Error;
use crate::models::{ExecutionResult, InterfaceSpec, ParamSpec};
use std::collections::HashSet;
use std::fmt;

/// One problem found in a spec, with enough location context to fix it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub location: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Every issue found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    issues: Vec<Issue>,
}

impl Report {
    fn add(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.issues.push(Issue {
            location: location.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Empty report to `Ok`, anything else to a validation error.
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Validates `spec` against the components and types `registry` knows,
/// accumulating every issue instead of stopping at the first.
pub fn validate_spec(spec: &InterfaceSpec, registry: &ComponentRegistry) -> Report {
    let mut report = Report::default();
    match spec.executable.first() {
        None => report.add("executable", "no executable tokens declared"),
        Some(first) if first.trim().is_empty() => {
            report.add("executable", "first executable token is empty");
        }
        Some(_) => {}
    }
    for (key, descriptor) in &spec.operations {
        let location = format!("operations.{key}");
        // Extra names are scoped to one operation; two operations may route
        // into the same extras key.
        let mut extra_names = HashSet::new();
        if let Err(error) = registry.aggregator(&descriptor.aggregator) {
            report.add(&location, error.to_string());
        }
        if let Err(error) = registry.flattener(&descriptor.flattener) {
            report.add(&location, error.to_string());
        }
        for (index, parameter) in descriptor.parameters.iter().enumerate() {
            let location = format!("{location}.parameters[{index}]");
            match parameter {
                ParamSpec::Converted {
                    converter,
                    value_type,
                } => match registry.converter(converter) {
                    Err(error) => report.add(&location, error.to_string()),
                    Ok(converter) => {
                        if let Some(value_type) = value_type {
                            match registry.types().resolve(value_type) {
                                Err(error) => report.add(&location, error.to_string()),
                                Ok(input) => {
                                    if !converter.can_convert(input, TypeSpec::of::<String>()) {
                                        report.add(
                                            &location,
                                            format!(
                                                "converter cannot turn '{input}' into a token"
                                            ),
                                        );
                                    }
                                }
                            }
                        }
                    }
                },
                ParamSpec::Extra { name } => {
                    if !extra_names.insert(name.clone()) {
                        report.add(&location, format!("duplicate extra parameter '{name}'"));
                    }
                }
            }
        }
        if let Some(execution) = &descriptor.execution {
            if let Err(error) = registry.executor(&execution.executor) {
                report.add(&location, error.to_string());
            }
            let converter = match registry.converter(&execution.converter) {
                Err(error) => {
                    report.add(&location, error.to_string());
                    None
                }
                Ok(converter) => Some(converter),
            };
            match registry.types().resolve(&execution.output_type) {
                Err(error) => report.add(&location, error.to_string()),
                Ok(output) => {
                    if let Some(converter) = converter {
                        if !converter.can_convert(TypeSpec::of::<ExecutionResult>(), output) {
                            report.add(
                                &location,
                                format!(
                                    "result converter cannot produce '{output}' from an execution"
                                ),
                            );
                        }
                    }
                }
            }
        }
    }
    report
}

// MARK: --- UNIT TESTS ---
