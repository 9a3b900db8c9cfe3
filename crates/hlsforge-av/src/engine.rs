//! The transcoding engine as an injectable capability.
//!
//! [`Engine::start`] launches one run of an [`HlsInvocation`] and hands back
//! an [`EngineProcess`] that the caller can [`wait`](EngineProcess::wait) on
//! or [`kill`](EngineProcess::kill). [`FfmpegEngine`] is the real
//! implementation; tests substitute their own.
//!
//! Engine output is never parsed. Each line of stdout/stderr is forwarded to
//! `tracing` at debug level and success is judged by exit status alone.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::hls::HlsInvocation;
use crate::tools::{get_tool_path, FFMPEG};
use crate::{Error, Result};

/// How an engine process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineExit {
    code: Option<i32>,
}

impl EngineExit {
    /// A clean exit with status 0.
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    /// An exit with the given status code.
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Terminated by a signal, without an exit code.
    pub fn signaled() -> Self {
        Self { code: None }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for EngineExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl std::fmt::Display for EngineExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Something that can start a transcoding run.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Start a run. The returned process is already executing.
    async fn start(&self, invocation: &HlsInvocation) -> Result<Box<dyn EngineProcess>>;
}

/// A running engine process.
///
/// Dropping a process must terminate it.
#[async_trait]
pub trait EngineProcess: Send {
    /// Wait for the process to exit. Must be cancel safe: the caller races it
    /// against a deadline and calls [`kill`](Self::kill) if the deadline wins.
    async fn wait(&mut self) -> Result<EngineExit>;

    /// Forcibly terminate the process and reap it.
    async fn kill(&mut self) -> Result<()>;
}

/// Runs the ffmpeg binary.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
}

impl FfmpegEngine {
    /// Use the ffmpeg executable at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate ffmpeg, preferring a configured path over `PATH`.
    pub fn discover(configured: Option<&Path>) -> Result<Self> {
        get_tool_path(FFMPEG, configured).map(Self::new)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &str {
        FFMPEG
    }

    async fn start(&self, invocation: &HlsInvocation) -> Result<Box<dyn EngineProcess>> {
        let args = invocation.args();
        tracing::debug!(program = %self.program.display(), ?args, "starting engine");

        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        let process = ChildProcess::spawn(cmd, FFMPEG)?;
        tracing::debug!(pid = ?process.id(), "engine spawned");
        Ok(Box::new(process))
    }
}

/// An OS child process supervised through tokio.
///
/// The child is spawned with `kill_on_drop`, so abandoning a
/// `ChildProcess` (for example when the request that owns it is dropped)
/// terminates the external program.
pub struct ChildProcess {
    child: Child,
    tool: String,
}

impl ChildProcess {
    /// Spawn `cmd` with stdin closed and stdout/stderr forwarded to tracing.
    pub fn spawn(mut cmd: Command, tool: impl Into<String>) -> Result<Self> {
        let tool = tool.into();

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::spawn(tool.clone(), e.to_string()))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tool.clone(), "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tool.clone(), "stderr");
        }

        Ok(Self { child, tool })
    }

    /// OS process id, if the process has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[async_trait]
impl EngineProcess for ChildProcess {
    async fn wait(&mut self) -> Result<EngineExit> {
        self.child
            .wait()
            .await
            .map(EngineExit::from)
            .map_err(|e| Error::tool_failed(self.tool.clone(), format!("wait failed: {e}")))
    }

    async fn kill(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| Error::tool_failed(self.tool.clone(), format!("kill failed: {e}")))
    }
}

fn forward_lines<R>(reader: R, tool: String, stream: &'static str)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(tool = %tool, stream, "{}", line);
        }
    });
}
