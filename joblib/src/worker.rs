mod messages;
mod task;

use crate::status::JobStatus;
use crate::types::JobId;
use messages::KillRequest;
use std::io;
use task::Worker;
use tokio::{
    process::{Child, ChildStderr, ChildStdout},
    sync::{mpsc, oneshot},
};

/// Handle to the process owned by a job's worker task.
///
/// The worker is the only owner of the `Child`, so termination requests are
/// relayed to it and it answers with the result of the kill.
#[derive(Clone, Debug)]
pub struct ProcessHandle {
    sender: mpsc::UnboundedSender<KillRequest>,
}

impl ProcessHandle {
    /// Spawn the worker task for an already started child process.
    pub fn spawn(
        job_id: JobId,
        child: Child,
        stdout: ChildStdout,
        stderr: ChildStderr,
        cancel_rx: mpsc::Receiver<()>,
        completion_tx: oneshot::Sender<JobStatus>,
        chunk_size: usize,
    ) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        Worker::new(job_id, inbox, cancel_rx, completion_tx).spawn(child, stdout, stderr, chunk_size);
        Self { sender }
    }

    /// True once the worker has reaped the process.
    pub fn is_released(&self) -> bool {
        self.sender.is_closed()
    }

    /// Ask the worker to kill the process.
    ///
    /// Returns `None` if the process had already exited and been released.
    pub async fn kill(&self) -> Option<io::Result<()>> {
        let (tx, rx) = oneshot::channel();
        self.sender.send(KillRequest { response: tx }).ok()?;
        rx.await.ok()
    }
}
