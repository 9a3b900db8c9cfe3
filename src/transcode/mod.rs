//! Transcode orchestration.
//!
//! A [`Transcoder`] takes a persisted upload, runs the HLS engine on it under
//! a hard deadline, and reports one of three terminal states:
//!
//! ```text
//! Created -> Running -> Completed
//!                    -> TimedOut   (deadline elapsed, engine killed)
//!                    -> Failed     (bad exit status, spawn error, cancellation)
//! ```
//!
//! Success is judged by exit status only. On success an empty completion
//! marker is written next to the manifest. Whatever the outcome, the
//! transient upload is removed afterwards (best effort). Partial output of a
//! failed run is left in place for the reaper.
//!
//! Engine processes are admitted through a counting semaphore so the number
//! of concurrent engines never exceeds `max_concurrent_jobs`.

use hlsforge_av::{Engine, EngineExit, EngineProcess, HlsInvocation, HlsSettings};
use hlsforge_common::paths::marker_path;
use hlsforge_common::{Error, Namespace, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::TranscodeConfig;

/// Lifecycle of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Completed,
    TimedOut,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One transcode request bound to a namespace.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub namespace: Namespace,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub deadline: Duration,
    pub cancel: CancellationToken,
}

impl TranscodeJob {
    pub fn new(
        namespace: Namespace,
        input: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        deadline: Duration,
    ) -> Self {
        Self {
            namespace,
            input: input.into(),
            output_dir: output_dir.into(),
            deadline,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the job to an external cancellation token (e.g. server shutdown).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of a completed job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub namespace: Namespace,
    pub state: JobState,
    pub elapsed: Duration,
    pub manifest_path: PathBuf,
}

/// How the race between the engine, the deadline and cancellation ended.
enum Ending {
    Exited(hlsforge_av::Result<EngineExit>),
    DeadlineElapsed,
    Cancelled,
}

/// Runs HLS engine jobs with deadlines and admission control.
pub struct Transcoder {
    engine: Arc<dyn Engine>,
    settings: HlsSettings,
    kill_grace: Duration,
    admission: Arc<Semaphore>,
}

impl Transcoder {
    pub fn new(
        engine: Arc<dyn Engine>,
        settings: HlsSettings,
        max_concurrent_jobs: usize,
        kill_grace: Duration,
    ) -> Self {
        Self {
            engine,
            settings,
            kill_grace,
            admission: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    pub fn from_config(engine: Arc<dyn Engine>, config: &TranscodeConfig) -> Self {
        Self::new(
            engine,
            config.hls.clone(),
            config.max_concurrent_jobs,
            config.kill_grace(),
        )
    }

    /// Number of jobs that could start right now without waiting.
    pub fn available_permits(&self) -> usize {
        self.admission.available_permits()
    }

    /// Run `job` to a terminal state.
    ///
    /// # Errors
    ///
    /// - [`Error::TranscodeTimeout`] if the deadline elapsed and the engine
    ///   was killed.
    /// - [`Error::TranscodeFailed`] if the engine could not start, exited
    ///   unsuccessfully, or the job was cancelled.
    /// - [`Error::Storage`] if the completion marker could not be written.
    pub async fn run(&self, job: TranscodeJob) -> Result<JobReport> {
        let span = tracing::info_span!("transcode", namespace = %job.namespace);
        async move {
            let result = self.admit_and_run(&job).await;
            remove_input(&job.input).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn admit_and_run(&self, job: &TranscodeJob) -> Result<JobReport> {
        debug!(state = %JobState::Created, "waiting for admission");
        let _permit = tokio::select! {
            permit = self.admission.clone().acquire_owned() => {
                permit.map_err(|_| Error::internal("admission gate closed"))?
            }
            _ = job.cancel.cancelled() => {
                warn!(state = %JobState::Failed, "cancelled before start");
                return Err(Error::transcode_failed("cancelled before start"));
            }
        };

        self.supervise(job).await
    }

    async fn supervise(&self, job: &TranscodeJob) -> Result<JobReport> {
        let invocation = HlsInvocation::new(&job.input, &job.output_dir, self.settings.clone());
        let engine = self.engine.name().to_string();
        let started = Instant::now();

        let mut process = self.engine.start(&invocation).await.map_err(|e| {
            error!(state = %JobState::Failed, error = %e, "engine failed to start");
            Error::transcode_failed(format!("{engine} failed to start: {e}"))
        })?;
        info!(state = %JobState::Running, deadline_secs = job.deadline.as_secs(), "engine started");

        let ending = tokio::select! {
            exit = process.wait() => Ending::Exited(exit),
            _ = tokio::time::sleep(job.deadline) => Ending::DeadlineElapsed,
            _ = job.cancel.cancelled() => Ending::Cancelled,
        };

        match ending {
            Ending::Exited(Ok(exit)) if exit.is_success() => {
                let manifest_path = invocation.manifest_path();
                if !manifest_path.exists() {
                    warn!(path = %manifest_path.display(), "engine succeeded without writing a manifest");
                }
                tokio::fs::write(marker_path(&job.output_dir), b"")
                    .await
                    .map_err(|e| Error::storage(format!("write completion marker: {e}")))?;

                let elapsed = started.elapsed();
                info!(state = %JobState::Completed, elapsed_ms = elapsed.as_millis() as u64, "transcode finished");
                Ok(JobReport {
                    namespace: job.namespace.clone(),
                    state: JobState::Completed,
                    elapsed,
                    manifest_path,
                })
            }
            Ending::Exited(Ok(exit)) => {
                error!(state = %JobState::Failed, %exit, "engine exited unsuccessfully");
                Err(Error::transcode_failed(format!("{engine} {exit}")))
            }
            Ending::Exited(Err(e)) => {
                error!(state = %JobState::Failed, error = %e, "waiting on engine failed");
                self.terminate(process.as_mut()).await;
                Err(Error::transcode_failed(e.to_string()))
            }
            Ending::DeadlineElapsed => {
                self.terminate(process.as_mut()).await;
                error!(state = %JobState::TimedOut, deadline_secs = job.deadline.as_secs(), "engine killed at deadline");
                Err(Error::TranscodeTimeout {
                    after: job.deadline,
                })
            }
            Ending::Cancelled => {
                self.terminate(process.as_mut()).await;
                warn!(state = %JobState::Failed, "cancelled while running");
                Err(Error::transcode_failed("cancelled"))
            }
        }
    }

    /// Kill the engine, waiting at most the kill grace period. If the kill
    /// does not finish in time the process is still terminated when it is
    /// dropped.
    async fn terminate(&self, process: &mut dyn EngineProcess) {
        match tokio::time::timeout(self.kill_grace, process.kill()).await {
            Ok(Ok(())) => debug!("engine killed"),
            Ok(Err(e)) => warn!(error = %e, "failed to kill engine"),
            Err(_) => warn!(grace_secs = self.kill_grace.as_secs(), "engine kill exceeded grace period"),
        }
    }
}

/// Best-effort removal of the transient upload.
async fn remove_input(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove upload"),
    }
}
