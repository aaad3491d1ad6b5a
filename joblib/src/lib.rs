//! Run external commands as supervised jobs, stop them, and poll their status.

pub mod error;
mod status;
mod supervisor;
pub mod types;
mod worker;

pub use status::{classify, ExitOutcome, JobOutput, JobStatus, State, Termination, NO_EXIT_CODE};
pub use supervisor::{Supervisor, SupervisorConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, StartError};
    use crate::types::{JobCommand, JobId};
    use std::sync::Arc;
    use std::time::Duration;

    /// poll until the job leaves `Running`
    async fn wait_terminal(supervisor: &Supervisor, job_id: JobId) -> JobStatus {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let status = supervisor.query(job_id).expect("job disappeared");
                if status.is_terminal() {
                    return status;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not finish in time")
    }

    fn stdout_of(status: &JobStatus) -> String {
        let output = status.output.as_ref().expect("terminal job has output");
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[tokio::test]
    async fn sleep_runs_then_completes() {
        let supervisor = Supervisor::new();
        let job_id = supervisor.start("sleep", ["1"]).expect("job start err");

        let status = supervisor.query(job_id).expect("job not found");
        assert_eq!(status.state, State::Running);
        assert_eq!(status.exit_code, NO_EXIT_CODE);
        assert!(status.output.is_none());

        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Completed);
        assert_eq!(status.exit_code, 0);
    }

    #[tokio::test]
    async fn echo_output_is_captured() {
        let supervisor = Supervisor::new();
        let job_id = supervisor.start("echo", ["hello"]).expect("job start err");
        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Completed);
        assert_eq!(stdout_of(&status), "hello\n");
        assert!(status.output.unwrap().stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_errored() {
        let supervisor = Supervisor::new();
        let job_id = supervisor
            .start("sh", ["-c", "echo oops >&2; exit 3"])
            .expect("job start err");
        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Errored);
        assert_eq!(status.exit_code, 3);
        assert_eq!(status.signal, None);
        assert_eq!(&status.output.unwrap().stderr[..], b"oops\n");
    }

    #[tokio::test]
    async fn stop_running_job() {
        let supervisor = Supervisor::new();
        let job_id = supervisor.start("sleep", ["25"]).expect("job start err");
        supervisor.stop(job_id).await.expect("stop failed");

        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Stopped);
        assert_eq!(status.exit_code, NO_EXIT_CODE);
        #[cfg(unix)]
        assert_eq!(status.signal, Some(9));
    }

    #[tokio::test]
    async fn repeated_stop_is_noop() {
        let supervisor = Supervisor::new();
        let job_id = supervisor.start("sleep", ["25"]).expect("job start err");
        supervisor.stop(job_id).await.expect("first stop failed");

        let err = supervisor.stop(job_id).await.expect_err("second stop succeeded");
        assert!(err.is_noop());

        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Stopped);

        let err = supervisor.stop(job_id).await.expect_err("stop after terminal succeeded");
        assert!(matches!(err, Error::AlreadyTerminal));
        assert_eq!(supervisor.query(job_id), Some(status));
    }

    #[tokio::test]
    async fn stop_finished_job_keeps_status() {
        let supervisor = Supervisor::new();
        let job_id = supervisor.start("true", Vec::<String>::new()).expect("job start err");
        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Completed);

        let err = supervisor.stop(job_id).await.expect_err("stop succeeded");
        assert!(err.is_noop());
        assert_eq!(supervisor.query(job_id), Some(status));
    }

    #[tokio::test]
    async fn unknown_job() {
        let supervisor = Supervisor::new();
        let job_id = uuid::Uuid::new_v4();
        assert_eq!(supervisor.query(job_id), None);
        assert_eq!(supervisor.query(job_id), None);
        assert!(matches!(
            supervisor.stop(job_id).await,
            Err(Error::DoesNotExist)
        ));
    }

    #[tokio::test]
    async fn spawn_failure_is_recorded() {
        let supervisor = Supervisor::new();
        let err = supervisor
            .start("/nonexistent/definitely-not-a-program", ["x"])
            .expect_err("spawn succeeded");
        assert!(matches!(err, StartError::Spawn { .. }));

        let status = supervisor.query(err.job_id()).expect("failed job not registered");
        assert_eq!(status.state, State::Errored);
        assert_eq!(status.exit_code, NO_EXIT_CODE);
        assert_eq!(status.output, Some(JobOutput::default()));
    }

    #[tokio::test]
    async fn command_dir_and_envs() {
        let supervisor = Supervisor::new();
        let command = JobCommand::new("sh", ["-c", "pwd; echo $JOBLIB_GREETING"])
            .dir("/")
            .env("JOBLIB_GREETING", "hi there");
        let job_id = supervisor.start_command(command).expect("job start err");
        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Completed);
        assert_eq!(stdout_of(&status), "/\nhi there\n");
    }

    #[tokio::test]
    async fn large_output_does_not_deadlock() {
        let supervisor = Supervisor::new();
        // well past a pipe buffer on both streams
        let job_id = supervisor
            .start(
                "sh",
                ["-c", "head -c 300000 /dev/zero; head -c 300000 /dev/zero >&2"],
            )
            .expect("job start err");
        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(status.state, State::Completed);
        let output = status.output.unwrap();
        assert_eq!(output.stdout.len(), 300_000);
        assert_eq!(output.stderr.len(), 300_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_queries_agree() {
        let supervisor = Arc::new(Supervisor::new());
        let job_id = supervisor.start("echo", ["racing"]).expect("job start err");
        // give the worker time to publish without anyone draining it
        tokio::time::sleep(Duration::from_millis(500)).await;

        let queries: Vec<_> = (0..8)
            .map(|_| {
                let supervisor = supervisor.clone();
                tokio::spawn(async move { supervisor.query(job_id).expect("job not found") })
            })
            .collect();
        let statuses = futures::future::join_all(queries).await;
        let first = statuses[0].as_ref().expect("query panicked").clone();
        assert_eq!(first.state, State::Completed);
        for status in statuses {
            assert_eq!(status.expect("query panicked"), first);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_jobs_are_independent() {
        let supervisor = Supervisor::new();
        let first = supervisor.start("sleep", ["1"]).expect("job start err");
        let second = supervisor.start("sleep", ["1"]).expect("job start err");
        assert_ne!(first, second);

        let (a, b) = futures::future::join(
            wait_terminal(&supervisor, first),
            wait_terminal(&supervisor, second),
        )
        .await;
        for status in [a, b] {
            assert_eq!(status.state, State::Completed);
            assert_eq!(status.exit_code, 0);
            assert!(status.output.unwrap().stdout.is_empty());
        }
    }

    #[tokio::test]
    async fn small_capture_chunks() {
        let supervisor = Supervisor::with_config(SupervisorConfig {
            capture_chunk_size: 3,
        });
        let job_id = supervisor
            .start("echo", ["-n", "hello world!"])
            .expect("job start err");
        let status = wait_terminal(&supervisor, job_id).await;
        assert_eq!(stdout_of(&status), "hello world!");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropping_supervisor_kills_running_jobs() {
        let pid_file = std::env::temp_dir().join(format!("joblib-{}.pid", uuid::Uuid::new_v4()));
        let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());

        let supervisor = Supervisor::new();
        let job_id = supervisor.start("sh", ["-c", script.as_str()]).expect("job start err");

        let pid = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if let Ok(pid) = tokio::fs::read_to_string(&pid_file).await {
                    if pid.ends_with('\n') {
                        return pid.trim().to_string();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job never wrote its pid");
        assert_eq!(supervisor.query(job_id).unwrap().state, State::Running);

        drop(supervisor);

        let alive = || {
            std::process::Command::new("kill")
                .args(["-0", pid.as_str()])
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        };
        let gone = tokio::time::timeout(Duration::from_secs(10), async {
            while alive() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        let _ = std::fs::remove_file(&pid_file);
        assert!(gone.is_ok(), "job process {} outlived its supervisor", pid);
    }
}
