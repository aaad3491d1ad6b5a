use crate::status::JobStatus;
use tokio::sync::{
    mpsc,
    oneshot::{self, error::TryRecvError},
};

/// The supervisor's ends of a job's control channels.
#[derive(Debug)]
pub struct JobSignals {
    cancel_tx: mpsc::Sender<()>,
    completion_rx: Option<oneshot::Receiver<JobStatus>>,
}

/// The worker's ends of a job's control channels.
#[derive(Debug)]
pub struct WorkerSignals {
    pub cancel_rx: mpsc::Receiver<()>,
    pub completion_tx: oneshot::Sender<JobStatus>,
}

pub enum Completion {
    Pending,
    Ready(JobStatus),
    /// the worker went away without publishing a status
    Abandoned,
}

pub fn pair() -> (JobSignals, WorkerSignals) {
    // one pending cancellation is enough
    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    let (completion_tx, completion_rx) = oneshot::channel();
    (
        JobSignals {
            cancel_tx,
            completion_rx: Some(completion_rx),
        },
        WorkerSignals {
            cancel_rx,
            completion_tx,
        },
    )
}

impl JobSignals {
    /// Leave a cancellation signal for the worker. Never blocks; a signal that is
    /// already pending, or a worker that has finished, makes this a no-op.
    pub fn request_cancel(&self) {
        let _ = self.cancel_tx.try_send(());
    }

    /// Take the worker's published status if there is one.
    pub fn try_completion(&mut self) -> Completion {
        let completion_rx = match self.completion_rx.as_mut() {
            Some(completion_rx) => completion_rx,
            None => return Completion::Pending,
        };
        match completion_rx.try_recv() {
            Ok(status) => {
                self.completion_rx = None;
                Completion::Ready(status)
            }
            Err(TryRecvError::Empty) => Completion::Pending,
            Err(TryRecvError::Closed) => {
                self.completion_rx = None;
                Completion::Abandoned
            }
        }
    }
}
