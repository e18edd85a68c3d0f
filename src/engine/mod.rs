//! The inference engine child process and its output protocol.
//!
//! The engine is treated as an opaque text stream: prompts go in on stdin,
//! generated text comes back on stdout one character at a time, and the end
//! of a response is recognised by a sentinel the engine prints when it is
//! ready for the next user turn.
//!
//! - [`ChildProcessChannel`]: owns the child and its pipes
//! - [`CharReader`]: UTF-8 decoding of any async byte reader
//! - [`ResponseStream`]: sentinel detection, echo, and cancellation

mod reader;
mod stream;

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::error::{Error, Result};
use crate::observability::{ENGINE_SPAWN_ERRORS, ENGINE_SPAWNS, ENGINE_WRITES};

pub use reader::CharReader;
pub use stream::{DEFAULT_SENTINEL, ResponseStream};

/// Default engine binary, relative to the working directory.
pub const DEFAULT_ENGINE_PROGRAM: &str = "./main";

/// Default number of layers offloaded to the GPU.
pub const DEFAULT_GPU_LAYERS: u32 = 35;

/// Default context size in tokens.
pub const DEFAULT_CTX_SIZE: u32 = 4096;

/// A source of output units (characters) from the engine.
#[async_trait::async_trait]
pub trait UnitSource: Send {
    /// Returns the next unit, or `None` once the stream has closed.
    ///
    /// Blocks until a unit is available.
    async fn read_unit(&mut self) -> Result<Option<char>>;
}

/// A running engine: a unit source that also accepts prompt lines.
#[async_trait::async_trait]
pub trait Engine: UnitSource {
    /// Writes `text` followed by a newline and flushes it.
    async fn write_line(&mut self, text: &str) -> Result<()>;
}

/// How to launch the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSpec {
    /// Path of the engine binary.
    pub program: PathBuf,
    /// Model file passed with `-m`.
    pub model_path: Option<PathBuf>,
    /// Value of `--n-gpu-layers`.
    pub gpu_layers: u32,
    /// Value of `--ctx-size`.
    pub ctx_size: u32,
}

impl EngineSpec {
    /// Returns the argument vector passed to the engine.
    ///
    /// Fails with a startup error if no model path is configured.
    pub fn args(&self) -> Result<Vec<OsString>> {
        let Some(model_path) = &self.model_path else {
            return Err(Error::startup(
                "no model path configured (use --model or set model_path in the system config)",
                None,
            ));
        };
        Ok(vec![
            "-m".into(),
            model_path.clone().into_os_string(),
            "--n-gpu-layers".into(),
            self.gpu_layers.to_string().into(),
            "--ctx-size".into(),
            self.ctx_size.to_string().into(),
            "--color".into(),
            "--interactive".into(),
        ])
    }

    /// Builds the command that launches the engine.
    pub fn command(&self) -> Result<Command> {
        let mut command = Command::new(&self.program);
        command.args(self.args()?);
        Ok(command)
    }
}

impl Default for EngineSpec {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ENGINE_PROGRAM),
            model_path: None,
            gpu_layers: DEFAULT_GPU_LAYERS,
            ctx_size: DEFAULT_CTX_SIZE,
        }
    }
}

/// Exclusive owner of the engine child process and its stdio pipes.
pub struct ChildProcessChannel {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: CharReader<BufReader<ChildStdout>>,
}

impl ChildProcessChannel {
    /// Starts the engine described by `spec`.
    pub fn spawn(spec: &EngineSpec) -> Result<Self> {
        Self::spawn_command(spec.command()?)
    }

    /// Starts an arbitrary command as the engine.
    ///
    /// stdin and stdout are piped; stderr is discarded. The child is killed
    /// when the channel is dropped.
    pub fn spawn_command(mut command: Command) -> Result<Self> {
        let program = command.as_std().get_program().to_string_lossy().into_owned();
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let mut child = command.spawn().map_err(|err| {
            ENGINE_SPAWN_ERRORS.click();
            Error::startup(format!("failed to start engine {program}"), Some(err))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::startup("engine stdin was not captured", None))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::startup("engine stdout was not captured", None))?;
        ENGINE_SPAWNS.click();
        tracing::debug!(program = %program, pid = ?child.id(), "engine started");
        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: CharReader::new(BufReader::new(stdout)),
        })
    }

    /// Closes stdin, kills the child if it is still running, and reaps it.
    pub async fn shutdown(mut self) -> Result<ExitStatus> {
        drop(self.stdin.take());
        if self.child.try_wait()?.is_none() {
            // The engine may exit on its own before the kill lands.
            let _ = self.child.start_kill();
        }
        let status = self.child.wait().await?;
        tracing::debug!(%status, "engine stopped");
        Ok(status)
    }
}

#[async_trait::async_trait]
impl UnitSource for ChildProcessChannel {
    async fn read_unit(&mut self) -> Result<Option<char>> {
        self.stdout.next_char().await
    }
}

#[async_trait::async_trait]
impl Engine for ChildProcessChannel {
    async fn write_line(&mut self, text: &str) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(Error::stream_terminated("engine input is closed"));
        };
        let result = async {
            stdin.write_all(text.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;
        match result {
            Ok(()) => {
                ENGINE_WRITES.click();
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                self.stdin = None;
                Err(Error::stream_terminated(
                    "engine is no longer accepting input",
                ))
            }
            Err(err) => Err(Error::io("failed to write prompt to engine", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_follow_engine_flags() {
        let spec = EngineSpec {
            model_path: Some(PathBuf::from("/models/7b.gguf")),
            gpu_layers: 20,
            ctx_size: 2048,
            ..EngineSpec::default()
        };
        let args: Vec<String> = spec
            .args()
            .unwrap()
            .into_iter()
            .map(|arg| arg.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            vec![
                "-m",
                "/models/7b.gguf",
                "--n-gpu-layers",
                "20",
                "--ctx-size",
                "2048",
                "--color",
                "--interactive",
            ]
        );
    }

    #[test]
    fn missing_model_is_startup_failure() {
        let err = EngineSpec::default().args().unwrap_err();
        assert!(err.is_startup());
    }

    #[tokio::test]
    async fn spawn_failure_is_startup_failure() {
        let spec = EngineSpec {
            program: PathBuf::from("/nonexistent/llm-chat-engine"),
            model_path: Some(PathBuf::from("model.gguf")),
            ..EngineSpec::default()
        };
        match ChildProcessChannel::spawn(&spec) {
            Err(err) => assert!(err.is_startup()),
            Ok(_) => panic!("spawning a missing binary should fail"),
        }
    }
}
