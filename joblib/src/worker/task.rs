use super::messages::KillRequest;
use crate::status::{classify, ExitOutcome, JobOutput, JobStatus};
use crate::types::{JobId, OutputBlob};

use bytes::BytesMut;
use std::{io, process::ExitStatus};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, ChildStderr, ChildStdout},
    select,
    sync::{mpsc, oneshot},
    task::JoinError,
};
use tracing::{debug, info, info_span, warn, Instrument};

/// The task which owns a job's child process from spawn until its status is published.
pub struct Worker {
    job_id: JobId,
    inbox: mpsc::UnboundedReceiver<KillRequest>,
    cancel_rx: mpsc::Receiver<()>,
    completion_tx: oneshot::Sender<JobStatus>,
}

impl Worker {
    pub fn new(
        job_id: JobId,
        inbox: mpsc::UnboundedReceiver<KillRequest>,
        cancel_rx: mpsc::Receiver<()>,
        completion_tx: oneshot::Sender<JobStatus>,
    ) -> Self {
        Self {
            job_id,
            inbox,
            cancel_rx,
            completion_tx,
        }
    }

    pub fn spawn(self, child: Child, stdout: ChildStdout, stderr: ChildStderr, chunk_size: usize) {
        let span = info_span!("job", job_id = %self.job_id);
        tokio::spawn(self.run(child, stdout, stderr, chunk_size).instrument(span));
    }

    async fn run(
        mut self,
        mut child: Child,
        stdout: ChildStdout,
        stderr: ChildStderr,
        chunk_size: usize,
    ) {
        // drain both pipes while the child runs so it never blocks on a full pipe
        let stdout_task = tokio::spawn(capture(stdout, chunk_size));
        let stderr_task = tokio::spawn(capture(stderr, chunk_size));

        let exit = wait_for_exit(&mut child, &mut self.inbox).await;
        // the process is gone, late kill requests must see that
        drop(self.inbox);

        let (stdout, stderr) = futures::future::join(stdout_task, stderr_task).await;
        let output = JobOutput {
            stdout: captured("stdout", stdout),
            stderr: captured("stderr", stderr),
        };

        let outcome = ExitOutcome::from_wait(&exit);
        if let Err(err) = &exit {
            warn!(%err, "failed to wait on child process");
        }
        let cancel_pending = self.cancel_rx.try_recv().is_ok();
        let termination = classify(outcome, cancel_pending);
        info!(?termination, ?outcome, "job terminated");

        if self
            .completion_tx
            .send(JobStatus::terminated(termination, outcome, output))
            .is_err()
        {
            debug!("supervisor dropped, discarding job status");
        }
    }
}

async fn wait_for_exit(
    child: &mut Child,
    inbox: &mut mpsc::UnboundedReceiver<KillRequest>,
) -> io::Result<ExitStatus> {
    let mut handle_open = true;
    loop {
        select! {
            request = inbox.recv(), if handle_open => match request {
                Some(KillRequest { response }) => {
                    let result = child.start_kill();
                    debug!(ok = result.is_ok(), "kill requested");
                    let _ = response.send(result);
                }
                None => {
                    // supervisor dropped, nobody can stop or query this job any more
                    handle_open = false;
                    let result = child.start_kill();
                    debug!(ok = result.is_ok(), "process handle dropped, killing child");
                }
            },
            exit = child.wait() => return exit,
        }
    }
}

fn captured(stream: &'static str, result: Result<OutputBlob, JoinError>) -> OutputBlob {
    result.unwrap_or_else(|err| {
        warn!(stream, %err, "output capture task failed, reporting no output");
        OutputBlob::new()
    })
}

/// Read a pipe to EOF, buffering everything.
async fn capture<R>(mut pipe: R, chunk_size: usize) -> OutputBlob
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(chunk_size);
    loop {
        buf.reserve(chunk_size);
        match pipe.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "output pipe read failed, keeping what was captured");
                break;
            }
        }
    }
    buf.freeze()
}
