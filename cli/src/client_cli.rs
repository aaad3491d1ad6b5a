use std::collections::HashMap;
use std::error;
use std::path::Path;

use jobproto::{
    remote_jobs_client::RemoteJobsClient, JobState, StartRequest, StatusRequest, StatusResponse,
    StopRequest,
};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity};
use tonic::{Request, Status};
use uuid::Uuid;

pub struct TlsFiles<'a> {
    pub ca: &'a Path,
    pub identity: Option<(&'a Path, &'a Path)>,
}

pub struct ClientCli {
    inner: RemoteJobsClient<Channel>,
}

impl ClientCli {
    pub async fn connect(
        server_addr: &str,
        tls: Option<TlsFiles<'_>>,
    ) -> Result<Self, Box<dyn error::Error>> {
        let mut endpoint = Channel::from_shared(server_addr.to_string())?;
        if let Some(tls) = tls {
            let ca = Certificate::from_pem(tokio::fs::read(tls.ca).await?);
            let mut tls_config = ClientTlsConfig::new().ca_certificate(ca);
            if let Some((cert, key)) = tls.identity {
                let identity =
                    Identity::from_pem(tokio::fs::read(cert).await?, tokio::fs::read(key).await?);
                tls_config = tls_config.identity(identity);
            }
            endpoint = endpoint.tls_config(tls_config)?;
        }
        let channel = endpoint.connect().await?;
        Ok(Self {
            inner: RemoteJobsClient::new(channel),
        })
    }

    pub async fn start_job(
        &mut self,
        cmd: &str,
        args: &[String],
        dir: Option<&str>,
        envs: &[(String, String)],
    ) -> Result<(), Box<dyn error::Error>> {
        let request = Request::new(StartRequest {
            cmd: cmd.into(),
            args: args.into(),
            dir: dir.unwrap_or_default().into(),
            envs: HashMap::from_iter(envs.iter().cloned()),
        });
        let response = self.inner.start_job(request).await?;
        let uuid = Uuid::from_slice(&response.into_inner().job_id)?;
        println!("Started job id: {}", uuid);
        Ok(())
    }

    pub async fn stop_job(&mut self, job_id: Uuid) -> Result<(), Status> {
        let request = Request::new(StopRequest {
            job_id: job_id.as_bytes().to_vec(),
        });
        let response = self.inner.stop_job(request).await?.into_inner();
        if response.stopped {
            println!("Stopped job id: {}", job_id);
        } else {
            println!("Job {} had already finished or was already stopping", job_id);
        }
        Ok(())
    }

    pub async fn query_status(&mut self, job_id: Uuid) -> Result<(), Status> {
        let request = Request::new(StatusRequest {
            job_id: job_id.as_bytes().to_vec(),
        });
        let status = self.inner.query_status(request).await?.into_inner();
        println!("{}", describe_state(&status));
        if !status.stdout.is_empty() {
            println!("--- stdout ---\n{}", String::from_utf8_lossy(&status.stdout));
        }
        if !status.stderr.is_empty() {
            println!("--- stderr ---\n{}", String::from_utf8_lossy(&status.stderr));
        }
        Ok(())
    }
}

fn describe_state(status: &StatusResponse) -> String {
    match status.state() {
        JobState::Running => "Running".to_string(),
        JobState::Completed => format!("Completed with code: {}", status.exit_code),
        JobState::Errored if status.signal != 0 => {
            format!("Errored, killed by signal: {}", status.signal)
        }
        JobState::Errored => format!("Errored with code: {}", status.exit_code),
        JobState::Stopped => "Stopped".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(state: JobState, exit_code: i32, signal: i32) -> StatusResponse {
        StatusResponse {
            state: state as i32,
            exit_code,
            signal,
            ..Default::default()
        }
    }

    #[test]
    fn every_state_is_described() {
        assert_eq!(describe_state(&response(JobState::Running, -1, 0)), "Running");
        assert_eq!(
            describe_state(&response(JobState::Completed, 0, 0)),
            "Completed with code: 0"
        );
        assert_eq!(
            describe_state(&response(JobState::Errored, 3, 0)),
            "Errored with code: 3"
        );
        assert_eq!(
            describe_state(&response(JobState::Errored, -1, 9)),
            "Errored, killed by signal: 9"
        );
        assert_eq!(describe_state(&response(JobState::Stopped, -1, 9)), "Stopped");
    }

    #[test]
    fn unknown_wire_state_reads_as_running() {
        // prost maps out-of-range enum values to the default variant
        let status = StatusResponse {
            state: 4,
            ..Default::default()
        };
        assert_eq!(describe_state(&status), "Running");
    }
}
