use super::UserId;
use joblib::types::JobId;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

type JobOwnerDb = HashMap<JobId, UserId>;

/// Tracks who started each job. Only a job's owner may stop or query it.
#[derive(Default)]
pub struct Authorizer {
    job_owners: Mutex<JobOwnerDb>,
}

impl Authorizer {
    pub fn add_job(&self, job_id: JobId, user_id: &UserId) {
        self.job_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, user_id.clone());
    }

    /// Unknown jobs are never authorized, so callers can't probe for other users' job ids.
    pub fn is_authorized(&self, user_id: &UserId, job_id: JobId) -> bool {
        self.job_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map_or(false, |owner| owner == user_id)
    }
}
