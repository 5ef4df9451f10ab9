// src/system/environment.rs

use crate::core::value::Extras;
use crate::models::ExecutionResult;
use crate::system::executor::{ExecutionError, Executor};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::Utf8Error;

/// How process output bytes become text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Strict UTF-8; invalid bytes fail the execution.
    #[default]
    Utf8,
    /// UTF-8 with invalid bytes replaced by U+FFFD.
    Utf8Lossy,
}

impl Encoding {
    /// Decodes a complete byte buffer.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, Utf8Error> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).map(str::to_string),
            Self::Utf8Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Decodes as much of `pending` as forms complete characters, leaving an
    /// incomplete trailing sequence in the buffer for the next chunk. At EOF
    /// an incomplete trailer is an error (or replaced, when lossy).
    // valid_up_to() is always within bounds of the buffer it came from.
    #[allow(clippy::indexing_slicing)]
    pub fn decode_chunk(&self, pending: &mut Vec<u8>, at_eof: bool) -> Result<String, Utf8Error> {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                let text = text.to_string();
                pending.clear();
                Ok(text)
            }
            Err(error) => {
                let valid_up_to = error.valid_up_to();
                // error_len is None when the error is an incomplete trailing
                // sequence more input could finish.
                if error.error_len().is_none() && !at_eof {
                    let decoded = match std::str::from_utf8(&pending[..valid_up_to]) {
                        Ok(text) => text.to_string(),
                        Err(error) => return Err(error),
                    };
                    pending.drain(..valid_up_to);
                    Ok(decoded)
                } else {
                    match self {
                        Self::Utf8 => Err(error),
                        Self::Utf8Lossy => {
                            let decoded = String::from_utf8_lossy(pending).into_owned();
                            pending.clear();
                            Ok(decoded)
                        }
                    }
                }
            }
        }
    }
}

/// The ambient context executions run in: working directory, environment
/// variable overlay, output encoding. One environment is shared by every
/// invocation of a wrapper and can be reconfigured between chains.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEnvironment {
    working_directory: Option<PathBuf>,
    environment_variables: HashMap<String, String>,
    encoding: Encoding,
}

impl ExecutionEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_working_directory(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.working_directory = Some(directory.into());
        self
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.environment_variables.insert(name.into(), value.into());
        self
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.environment_variables
    }

    pub fn set_encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Applies this environment to a command about to be spawned. The parent
    /// environment stays visible; declared variables overlay it.
    pub fn configure(&self, command: &mut Command) {
        if let Some(directory) = &self.working_directory {
            command.current_dir(dunce::simplified(directory));
        }
        command.envs(&self.environment_variables);
    }

    /// Runs `tokens` through `executor` within this environment.
    pub fn run(
        &self,
        executor: &dyn Executor,
        tokens: &[String],
        extras: &Extras,
    ) -> Result<ExecutionResult, ExecutionError> {
        executor.execute(tokens, self, extras)
    }
}

// MARK: --- UNIT TESTS ---
