use crate::types::OutputBlob;
use serde::Serialize;
use std::{io, process::ExitStatus};

/// Exit code reported while a job is running, or when its process never produced one.
pub const NO_EXIT_CODE: i32 = -1;

/// The lifecycle state of a job. `Running` is the only non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum State {
    Running,
    Completed,
    Errored,
    Stopped,
}

impl State {
    pub fn is_terminal(self) -> bool {
        !matches!(self, State::Running)
    }
}

/// The captured stdout and stderr of a finished job.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobOutput {
    pub stdout: OutputBlob,
    pub stderr: OutputBlob,
}

/// A snapshot of a job, as returned by [`Supervisor::query`](crate::Supervisor::query).
///
/// `output` is `None` until the job is terminal, then holds everything the process wrote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: State,
    pub exit_code: i32,
    /// the signal which terminated the process, unix only
    pub signal: Option<i32>,
    #[serde(flatten)]
    pub output: Option<JobOutput>,
}

impl JobStatus {
    pub fn running() -> Self {
        Self {
            state: State::Running,
            exit_code: NO_EXIT_CODE,
            signal: None,
            output: None,
        }
    }

    /// Status of a job whose process never produced an exit status or output,
    /// because it could not be launched or its worker went away.
    pub fn errored() -> Self {
        Self {
            state: State::Errored,
            exit_code: NO_EXIT_CODE,
            signal: None,
            output: Some(JobOutput::default()),
        }
    }

    pub fn terminated(termination: Termination, outcome: ExitOutcome, output: JobOutput) -> Self {
        Self {
            state: termination.into(),
            exit_code: outcome.exit_code(),
            signal: outcome.signal(),
            output: Some(output),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// How the child process went away, as observed by its worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited { code: i32 },
    Killed { signal: i32 },
    /// waiting on the child failed, so its real exit status is unknown
    Lost,
}

impl ExitOutcome {
    pub fn from_wait(result: &io::Result<ExitStatus>) -> Self {
        match result {
            Ok(status) => {
                if let Some(code) = status.code() {
                    ExitOutcome::Exited { code }
                } else if let Some(signal) = exit_signal(status) {
                    ExitOutcome::Killed { signal }
                } else {
                    ExitOutcome::Lost
                }
            }
            Err(_) => ExitOutcome::Lost,
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            ExitOutcome::Exited { code } => code,
            _ => NO_EXIT_CODE,
        }
    }

    pub fn signal(self) -> Option<i32> {
        match self {
            ExitOutcome::Killed { signal } => Some(signal),
            _ => None,
        }
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// The terminal states a worker can publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Completed,
    Errored,
    Stopped,
}

impl From<Termination> for State {
    fn from(termination: Termination) -> Self {
        match termination {
            Termination::Completed => State::Completed,
            Termination::Errored => State::Errored,
            Termination::Stopped => State::Stopped,
        }
    }
}

/// Decide how a job ended.
///
/// A clean exit is always `Completed`. Any other outcome is ambiguous between a
/// requested kill and a failing command, and only a pending cancellation signal
/// makes it `Stopped`.
pub fn classify(outcome: ExitOutcome, cancel_pending: bool) -> Termination {
    match outcome {
        ExitOutcome::Exited { code: 0 } => Termination::Completed,
        _ if cancel_pending => Termination::Stopped,
        _ => Termination::Errored,
    }
}
