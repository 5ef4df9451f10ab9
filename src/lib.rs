//! Declarative bindings for external command-line executables.
//!
//! A caller describes an executable's invocation surface (sub-commands,
//! switches, parameters, expected exit codes, output parsing) as a set of
//! [`CallDescriptor`]s grouped into an [`InterfaceSpec`]. The crate then
//! assembles descriptors plus call-time arguments into an ordered argv token
//! list, runs the process (batch or interactive), and converts the raw
//! `{stdout, stderr, exit code}` outcome into a caller-declared typed value.
//!
//! ```no_run
//! use cliwrap::{arg, CallDescriptor, ExecutionSpec, InterfaceSpec, ParamSpec, Wrapper};
//!
//! let spec = InterfaceSpec::new(["git"])
//!     .with_operation("commit", CallDescriptor::command("commit"))
//!     .with_operation(
//!         "message",
//!         CallDescriptor::option("-m")
//!             .with_parameter(ParamSpec::converted())
//!             .executed(ExecutionSpec::later().with_output_type("int")),
//!     );
//! let wrapper = Wrapper::with_defaults(&spec)?;
//! let code: i32 = wrapper
//!     .invoke()
//!     .call("commit", vec![])?
//!     .call("message", vec![arg("Some message".to_string())])?
//!     .execute_as()?;
//! # Ok::<(), cliwrap::Error>(())
//! ```

pub mod core;
pub mod error;
pub mod models;
pub mod system;

pub use crate::core::check::{Issue, Report, validate_spec};
pub use crate::core::converters::{CompositeConverter, Converter, LambdaConverter, ValueList};
pub use crate::core::factory::{ArgType, FactorySet};
pub use crate::core::invocation::{Invocation, Wrapper};
pub use crate::core::joining::{Aggregator, Flattener};
pub use crate::core::registry::{ComponentRegistry, TypeRegistry};
pub use crate::core::result_converters::{FactoryConverter, RegexResultConverter};
pub use crate::core::value::{Arg, Extras, TypeSpec, Value, arg};
pub use crate::error::Error;
pub use crate::models::{
    CallDescriptor, ComponentChoice, ExecutionMode, ExecutionResult, ExecutionSpec, InterfaceSpec,
    OperationKind, ParamSpec,
};
pub use crate::system::environment::{Encoding, ExecutionEnvironment};
pub use crate::system::executor::{ExecutionError, Executor, ProcessExecutor, TracingExecutor};
pub use crate::system::interactive::InteractiveExecutor;
