use std::io;
use tokio::sync::oneshot;

/// Ask the worker to kill its child process, answered with the result of the kill.
#[derive(Debug)]
pub struct KillRequest {
    pub response: oneshot::Sender<io::Result<()>>,
}
