// src/system/interactive.rs
//
// Executor for programs that prompt on their output streams and expect
// answers on stdin. Two reader threads decode chunks as they arrive and hand
// each one to an interactor together with a shared stdin writer.

use crate::core::value::Extras;
use crate::models::ExecutionResult;
use crate::system::environment::{Encoding, ExecutionEnvironment};
use crate::system::executor::{command_for, exit_code, ExecutionError, Executor};
use std::io::{self, Read, Write};
use std::process::{ChildStdin, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Reacts to one decoded output chunk, optionally answering on stdin.
pub type Interactor = dyn Fn(&str, &mut dyn Write, &Extras) -> io::Result<()> + Send + Sync;

/// Builds the final result once the process exited, from the exit code and
/// whatever the interactors accumulated in the extras.
pub type ResultBuilder = dyn Fn(i32, &Extras) -> ExecutionResult + Send + Sync;

const DEFAULT_CHUNK_SIZE: usize = 256;

/// Interactive executor: streams stdout and stderr to interactors while the
/// process runs, then lets a result builder shape the outcome.
///
/// Both interactors may answer concurrently; the stdin writer is shared
/// under a lock, so each chunk's answer is written whole. Interactors that
/// accumulate text across chunks should stash an `Arc<Mutex<_>>` in the
/// extras and read it back in the result builder.
pub struct InteractiveExecutor {
    on_output: Arc<Interactor>,
    on_error: Arc<Interactor>,
    build_result: Arc<ResultBuilder>,
    chunk_size: usize,
}

impl InteractiveExecutor {
    pub fn new(
        on_output: impl Fn(&str, &mut dyn Write, &Extras) -> io::Result<()> + Send + Sync + 'static,
        build_result: impl Fn(i32, &Extras) -> ExecutionResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_output: Arc::new(on_output),
            on_error: Arc::new(|_, _, _| Ok(())),
            build_result: Arc::new(build_result),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_error_interactor(
        mut self,
        on_error: impl Fn(&str, &mut dyn Write, &Extras) -> io::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Arc::new(on_error);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

struct Pump<'a> {
    writer: &'a Mutex<ChildStdin>,
    interactor: &'a Interactor,
    encoding: Encoding,
    chunk_size: usize,
    extras: &'a Extras,
    command: &'a str,
    stream: &'static str,
}

impl Pump<'_> {
    fn io_error(&self, source: io::Error) -> ExecutionError {
        ExecutionError::Io {
            command: self.command.to_string(),
            source,
        }
    }

    // Read::read never returns more than the buffer length.
    #[allow(clippy::indexing_slicing)]
    fn run(&self, mut reader: impl Read) -> Result<(), ExecutionError> {
        let mut buffer = vec![0u8; self.chunk_size];
        let mut pending = Vec::new();
        loop {
            let read = reader.read(&mut buffer).map_err(|source| self.io_error(source))?;
            let at_eof = read == 0;
            pending.extend_from_slice(&buffer[..read]);
            let text = self
                .encoding
                .decode_chunk(&mut pending, at_eof)
                .map_err(|source| ExecutionError::InvalidOutput {
                    command: self.command.to_string(),
                    stream: self.stream,
                    source,
                })?;
            if !text.is_empty() {
                let mut stdin = self
                    .writer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                (self.interactor)(&text, &mut *stdin, self.extras)
                    .map_err(|source| self.io_error(source))?;
                stdin.flush().map_err(|source| self.io_error(source))?;
            }
            if at_eof {
                return Ok(());
            }
        }
    }
}

impl Executor for InteractiveExecutor {
    fn execute(
        &self,
        tokens: &[String],
        environment: &ExecutionEnvironment,
        extras: &Extras,
    ) -> Result<ExecutionResult, ExecutionError> {
        let (mut command, program) = command_for(tokens, environment)?;
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|source| ExecutionError::Spawn {
            command: program.clone(),
            source,
        })?;
        let io_error = |message: &str| ExecutionError::Io {
            command: program.clone(),
            source: io::Error::other(message.to_string()),
        };
        let stdin = child.stdin.take().ok_or_else(|| io_error("stdin pipe missing"))?;
        let stdout = child.stdout.take().ok_or_else(|| io_error("stdout pipe missing"))?;
        let stderr = child.stderr.take().ok_or_else(|| io_error("stderr pipe missing"))?;
        let writer = Mutex::new(stdin);
        let encoding = environment.encoding();
        let (output_outcome, error_outcome) = thread::scope(|scope| {
            let output_pump = Pump {
                writer: &writer,
                interactor: self.on_output.as_ref(),
                encoding,
                chunk_size: self.chunk_size,
                extras,
                command: &program,
                stream: "stdout",
            };
            let error_pump = Pump {
                writer: &writer,
                interactor: self.on_error.as_ref(),
                encoding,
                chunk_size: self.chunk_size,
                extras,
                command: &program,
                stream: "stderr",
            };
            let output_reader = scope.spawn(move || output_pump.run(stdout));
            let error_reader = scope.spawn(move || error_pump.run(stderr));
            (output_reader.join(), error_reader.join())
        });
        // Both streams hit EOF, so the process is done or about to be.
        drop(writer);
        let status = child.wait().map_err(|source| ExecutionError::Io {
            command: program.clone(),
            source,
        })?;
        output_outcome.map_err(|_| ExecutionError::ReaderPanicked)??;
        error_outcome.map_err(|_| ExecutionError::ReaderPanicked)??;
        Ok((self.build_result)(exit_code(status), extras))
    }
}

// MARK: --- UNIT TESTS ---
