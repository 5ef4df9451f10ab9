// src/error.rs

use crate::core::check::Report;
use crate::models::ExecutionResult;
use crate::system::executor::ExecutionError;
use thiserror::Error;

/// Everything that can go wrong while compiling a wrapper or running one call.
///
/// All variants are fatal to the single call in progress; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// No converter in the chain applies to the attempted input/output pair.
    #[error("could not convert from '{input}' to '{output}'")]
    Conversion { input: String, output: String },

    /// A string value could not be parsed into the requested type.
    #[error("could not parse '{text}' as '{output}'")]
    Parse { text: String, output: String },

    /// A regex result converter found no match in the source text.
    #[error("pattern '{pattern}' did not match output '{text}'")]
    Extraction { pattern: String, text: String },

    /// The process finished with a code outside the expected set. The raw
    /// result is attached so captured output stays inspectable.
    #[error("finished with code '{actual}' but expected it in '{expected:?}'")]
    ReturnCodeMismatch {
        actual: i32,
        expected: Vec<i32>,
        result: ExecutionResult,
    },

    /// Spawning, waiting on, or talking to the child process failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The pre-flight checker found one or more issues.
    #[error("interface validation failed:\n{0}")]
    Validation(Report),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("unknown {kind} '{id}'")]
    UnknownComponent { kind: &'static str, id: String },

    #[error("unknown output type '{0}'")]
    UnknownType(String),

    #[error("operation '{operation}' takes {expected} argument(s) but {actual} were given")]
    ArityMismatch {
        operation: String,
        expected: usize,
        actual: usize,
    },

    /// An operation declared `mode = "now"` was queued instead of executed.
    #[error("operation '{0}' executes immediately; use execute_now")]
    ImmediateOperation(String),

    /// The executed value does not have the downcast-requested type.
    #[error("declared output type is '{declared}' but '{requested}' was requested")]
    Downcast {
        declared: String,
        requested: &'static str,
    },

    #[error("invalid interface spec: {0}")]
    InvalidSpec(#[from] toml::de::Error),

    /// A component id resolved, but its configuration string is unusable.
    #[error("invalid component configuration: {0}")]
    InvalidConfig(String),
}
