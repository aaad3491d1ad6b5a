mod authorizer;
use self::authorizer::Authorizer;

use crate::interceptors::cert::UserExtension;
use joblib::error::Error as JobError;
use joblib::types::{JobCommand, JobId};
use joblib::{JobStatus, State, Supervisor};
use jobproto::remote_jobs_server::RemoteJobs;
use jobproto::{
    JobState, StartRequest, StartResponse, StatusRequest, StatusResponse, StopRequest,
    StopResponse,
};
use tonic::{Request, Response, Status};
use tracing::{info, warn};
use uuid::Uuid;

pub type UserId = String;

// tonic puts the service behind an Arc itself
pub struct RemoteJobsService {
    supervisor: Supervisor,
    authorizer: Authorizer,
}

impl RemoteJobsService {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor,
            authorizer: Authorizer::default(),
        }
    }

    /// Resolve the job a request names, if the caller may touch it.
    ///
    /// Jobs owned by someone else are reported exactly like unknown jobs.
    fn authorized_job(&self, user_id: &UserId, job_id: &[u8]) -> Result<JobId, Status> {
        let job_id =
            Uuid::from_slice(job_id).map_err(|err| Status::invalid_argument(err.to_string()))?;
        if !self.authorizer.is_authorized(user_id, job_id) {
            return Err(job_not_found(job_id));
        }
        Ok(job_id)
    }
}

fn user_of<T>(req: &Request<T>) -> Result<UserId, Status> {
    req.extensions()
        .get::<UserExtension>()
        .map(|ext| ext.user_id.clone())
        .ok_or_else(|| Status::unauthenticated("Request has no user"))
}

fn job_not_found(job_id: JobId) -> Status {
    Status::not_found(format!("No such job: {}", job_id))
}

fn status_response(status: JobStatus) -> StatusResponse {
    let state = match status.state {
        State::Running => JobState::Running,
        State::Completed => JobState::Completed,
        State::Errored => JobState::Errored,
        State::Stopped => JobState::Stopped,
    };
    let output = status.output.unwrap_or_default();
    let mut response = StatusResponse {
        state: 0,
        exit_code: status.exit_code,
        signal: status.signal.unwrap_or(0),
        stdout: output.stdout.to_vec(),
        stderr: output.stderr.to_vec(),
    };
    response.set_state(state);
    response
}

#[tonic::async_trait]
impl RemoteJobs for RemoteJobsService {
    async fn start_job(
        &self,
        req: Request<StartRequest>,
    ) -> Result<Response<StartResponse>, Status> {
        let user_id = user_of(&req)?;
        let StartRequest {
            cmd,
            args,
            dir,
            envs,
        } = req.into_inner();

        let mut command = JobCommand::new(cmd, args);
        if !dir.is_empty() {
            command = command.dir(dir);
        }
        command.envs = envs.into_iter().collect();

        match self.supervisor.start_command(command) {
            Ok(job_id) => {
                self.authorizer.add_job(job_id, &user_id);
                info!(%job_id, user = %user_id, "started job for user");
                Ok(Response::new(StartResponse {
                    job_id: job_id.as_bytes().to_vec(),
                }))
            }
            Err(err) => {
                // the failed job stays queryable by its owner
                self.authorizer.add_job(err.job_id(), &user_id);
                Err(Status::failed_precondition(err.to_string()))
            }
        }
    }

    async fn stop_job(&self, req: Request<StopRequest>) -> Result<Response<StopResponse>, Status> {
        let user_id = user_of(&req)?;
        let job_id = self.authorized_job(&user_id, &req.get_ref().job_id)?;

        let stopped = match self.supervisor.stop(job_id).await {
            Ok(()) => true,
            Err(err) if err.is_noop() => false,
            Err(JobError::DoesNotExist) => return Err(job_not_found(job_id)),
            Err(err) => {
                warn!(%job_id, %err, "stop failed");
                return Err(Status::internal(err.to_string()));
            }
        };
        Ok(Response::new(StopResponse { stopped }))
    }

    async fn query_status(
        &self,
        req: Request<StatusRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        let user_id = user_of(&req)?;
        let job_id = self.authorized_job(&user_id, &req.get_ref().job_id)?;

        let status = self
            .supervisor
            .query(job_id)
            .ok_or_else(|| job_not_found(job_id))?;
        Ok(Response::new(status_response(status)))
    }
}
