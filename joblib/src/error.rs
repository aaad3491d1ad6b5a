use crate::types::JobId;
use std::{io, result};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No such job exists")]
    DoesNotExist,
    #[error("Job has already terminated")]
    AlreadyTerminal,
    #[error("A stop has already been requested for this job")]
    StopPending,
    #[error("Failed to kill job process: {0}")]
    Kill(#[source] io::Error),
}

impl Error {
    /// True for errors which mean a stop request changed nothing.
    pub fn is_noop(&self) -> bool {
        matches!(self, Error::AlreadyTerminal | Error::StopPending)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Failure to launch a job. The job id is still registered and queryable as `Errored`.
#[derive(thiserror::Error, Debug)]
pub enum StartError {
    #[error("Failed to spawn job {job_id}: {source}")]
    Spawn {
        job_id: JobId,
        #[source]
        source: io::Error,
    },
    #[error("Job {job_id} has no {stream} pipe")]
    OutputUnavailable { job_id: JobId, stream: &'static str },
}

impl StartError {
    pub fn job_id(&self) -> JobId {
        match self {
            StartError::Spawn { job_id, .. } | StartError::OutputUnavailable { job_id, .. } => {
                *job_id
            }
        }
    }
}
