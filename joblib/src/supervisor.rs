mod record;
mod signals;

use self::{
    record::JobRecord,
    signals::{Completion, JobSignals, WorkerSignals},
};
use crate::error::{self, Error, StartError};
use crate::status::JobStatus;
use crate::types::{JobCommand, JobId, Program};
use crate::worker::ProcessHandle;

use dashmap::DashMap;
use std::process::Stdio;
use tokio::process;
use tracing::{info, warn};

/// Tunables for a [`Supervisor`].
#[derive(Clone, Copy, Debug)]
pub struct SupervisorConfig {
    /// how many bytes each read of a job's stdout/stderr pipe asks for
    pub capture_chunk_size: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            capture_chunk_size: 4096,
        }
    }
}

/// Starts, stops, and reports on local jobs.
///
/// Every job has an entry in both the record store and the signal registry. Each job's
/// worker task owns its child process and publishes one terminal status on the
/// completion channel; `query` is the only place that status gets folded into the
/// record. Entries are locked records first, then signals, and never across an await.
///
/// Share it between callers with an `Arc`.
#[derive(Default)]
pub struct Supervisor {
    records: DashMap<JobId, JobRecord>,
    signals: DashMap<JobId, JobSignals>,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SupervisorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Start `program` with `args` as a new job.
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the process is
    /// spawned. On failure the returned error still carries the job id, and the job is
    /// queryable as `Errored`.
    pub fn start<I, S>(&self, program: impl Into<Program>, args: I) -> Result<JobId, StartError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.start_command(JobCommand::new(program, args))
    }

    /// Start a job with full control over its working directory and environment.
    pub fn start_command(&self, command: JobCommand) -> Result<JobId, StartError> {
        let job_id = uuid::Uuid::new_v4();

        let mut cmd = process::Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.envs.iter().map(|(var, val)| (var, val)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.dir {
            cmd.current_dir(dir);
        }

        // register before spawning so the id is queryable even if the spawn fails
        let (
            job_signals,
            WorkerSignals {
                cancel_rx,
                completion_tx,
            },
        ) = signals::pair();
        self.signals.insert(job_id, job_signals);
        self.records.insert(job_id, JobRecord::new());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                warn!(%job_id, program = %command.program, err = %source, "failed to spawn job");
                self.fail(job_id);
                return Err(StartError::Spawn { job_id, source });
            }
        };

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            (stdout, _) => {
                let stream = if stdout.is_none() { "stdout" } else { "stderr" };
                warn!(%job_id, stream, "failed to attach to job output");
                let _ = child.start_kill();
                self.fail(job_id);
                return Err(StartError::OutputUnavailable { job_id, stream });
            }
        };

        let process = ProcessHandle::spawn(
            job_id,
            child,
            stdout,
            stderr,
            cancel_rx,
            completion_tx,
            self.config.capture_chunk_size,
        );
        if let Some(mut record) = self.records.get_mut(&job_id) {
            record.attach(process);
        }
        info!(%job_id, program = %command.program, args = ?command.args, "job started");
        Ok(job_id)
    }

    /// Request that a running job be stopped.
    ///
    /// Resolves once the kill has been issued to the process; the job only shows up as
    /// `Stopped` in a later [`query`](Self::query). Stopping a finished job, or stopping
    /// the same job twice, is a no-op reported through [`Error::is_noop`].
    pub async fn stop(&self, job_id: JobId) -> error::Result<()> {
        let process = {
            let mut record = self.records.get_mut(&job_id).ok_or(Error::DoesNotExist)?;
            let process = record.begin_stop()?;
            // the cancel signal must be pending before the kill so the worker sees it
            if let Some(signals) = self.signals.get(&job_id) {
                signals.request_cancel();
            }
            process
        };

        match process.kill().await {
            Some(Ok(())) => {
                info!(%job_id, "job stop requested");
                Ok(())
            }
            Some(Err(err)) => {
                warn!(%job_id, %err, "failed to kill job");
                Err(Error::Kill(err))
            }
            None => Err(Error::AlreadyTerminal),
        }
    }

    /// Get the latest status of a job, or `None` for an unknown id.
    pub fn query(&self, job_id: JobId) -> Option<JobStatus> {
        let mut record = self.records.get_mut(&job_id)?;
        if !record.status().is_terminal() {
            if let Some(mut signals) = self.signals.get_mut(&job_id) {
                match signals.try_completion() {
                    Completion::Ready(status) => record.fold(status),
                    Completion::Pending => {}
                    Completion::Abandoned => {
                        warn!(%job_id, "job worker exited without publishing a status");
                        record.fail();
                    }
                }
            }
        }
        Some(record.status().clone())
    }

    fn fail(&self, job_id: JobId) {
        if let Some(mut record) = self.records.get_mut(&job_id) {
            record.fail();
        }
    }
}
