// src/system/executor.rs

use crate::core::value::Extras;
use crate::models::ExecutionResult;
use crate::system::environment::ExecutionEnvironment;
use std::io;
use std::process::{Command, Stdio};
use std::str::Utf8Error;
use std::sync::Arc;
use thiserror::Error;

/// Failures raised while spawning, feeding, or reading a process, before any
/// result-shaping happens.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no command-line tokens to execute")]
    EmptyCommandLine,
    #[error("failed to spawn '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("i/o failure while running '{command}'")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("'{command}' wrote invalid text on {stream}")]
    InvalidOutput {
        command: String,
        stream: &'static str,
        #[source]
        source: Utf8Error,
    },
    #[error("an output reader thread panicked")]
    ReaderPanicked,
}

/// Turns command-line tokens into a finished [`ExecutionResult`].
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        tokens: &[String],
        environment: &ExecutionEnvironment,
        extras: &Extras,
    ) -> Result<ExecutionResult, ExecutionError>;
}

pub(crate) fn command_for(
    tokens: &[String],
    environment: &ExecutionEnvironment,
) -> Result<(Command, String), ExecutionError> {
    let (program, arguments) = tokens.split_first().ok_or(ExecutionError::EmptyCommandLine)?;
    let mut command = Command::new(program);
    command.args(arguments);
    environment.configure(&mut command);
    Ok((command, program.clone()))
}

/// A process that terminates on its own is mapped to its exit code; one
/// killed by a signal reports -1.
pub(crate) fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Batch executor: runs the process to completion with no stdin, gathering
/// both output streams whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(
        &self,
        tokens: &[String],
        environment: &ExecutionEnvironment,
        _extras: &Extras,
    ) -> Result<ExecutionResult, ExecutionError> {
        let (mut command, program) = command_for(tokens, environment)?;
        command.stdin(Stdio::null());
        let output = command.output().map_err(|source| ExecutionError::Spawn {
            command: program.clone(),
            source,
        })?;
        let encoding = environment.encoding();
        let stdout = encoding.decode(&output.stdout).map_err(|source| {
            ExecutionError::InvalidOutput {
                command: program.clone(),
                stream: "stdout",
                source,
            }
        })?;
        let stderr = encoding.decode(&output.stderr).map_err(|source| {
            ExecutionError::InvalidOutput {
                command: program.clone(),
                stream: "stderr",
                source,
            }
        })?;
        Ok(ExecutionResult::new(stdout, stderr, exit_code(output.status)))
    }
}

/// Prints the command line it is about to run, then delegates. The default
/// printer logs a shell-quoted rendition.
pub struct TracingExecutor {
    delegate: Arc<dyn Executor>,
    printer: Box<dyn Fn(&[String]) + Send + Sync>,
}

impl TracingExecutor {
    pub fn new(delegate: Arc<dyn Executor>) -> Self {
        Self::with_printer(delegate, |tokens| {
            let rendered = shlex::try_join(tokens.iter().map(String::as_str))
                .unwrap_or_else(|_| tokens.join(" "));
            log::info!("running: {rendered}");
        })
    }

    pub fn with_printer(
        delegate: Arc<dyn Executor>,
        printer: impl Fn(&[String]) + Send + Sync + 'static,
    ) -> Self {
        Self {
            delegate,
            printer: Box::new(printer),
        }
    }
}

impl Executor for TracingExecutor {
    fn execute(
        &self,
        tokens: &[String],
        environment: &ExecutionEnvironment,
        extras: &Extras,
    ) -> Result<ExecutionResult, ExecutionError> {
        (self.printer)(tokens);
        self.delegate.execute(tokens, environment, extras)
    }
}

// MARK: --- UNIT TESTS ---
