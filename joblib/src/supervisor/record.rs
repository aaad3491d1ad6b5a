use crate::error::{Error, Result};
use crate::status::JobStatus;
use crate::worker::ProcessHandle;

/// What the store knows about one job.
///
/// Only the supervisor writes to a record, and only while holding its map entry.
#[derive(Debug)]
pub struct JobRecord {
    process: Option<ProcessHandle>,
    status: JobStatus,
    stop_requested: bool,
}

impl JobRecord {
    pub fn new() -> Self {
        Self {
            process: None,
            status: JobStatus::running(),
            stop_requested: false,
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn attach(&mut self, process: ProcessHandle) {
        self.process = Some(process);
    }

    /// Mark a job whose process never started, or whose worker vanished, as errored.
    pub fn fail(&mut self) {
        self.process = None;
        self.status = JobStatus::errored();
    }

    /// Fold the worker's published status into the record.
    pub fn fold(&mut self, status: JobStatus) {
        debug_assert!(!self.status.is_terminal(), "terminal status folded twice");
        self.status = status;
    }

    /// Check the job can still be stopped and claim the stop for this caller.
    pub fn begin_stop(&mut self) -> Result<ProcessHandle> {
        if self.status.is_terminal() {
            return Err(Error::AlreadyTerminal);
        }
        let process = match &self.process {
            Some(process) if !process.is_released() => process.clone(),
            _ => return Err(Error::AlreadyTerminal),
        };
        if self.stop_requested {
            return Err(Error::StopPending);
        }
        self.stop_requested = true;
        Ok(process)
    }
}
