use tracing::debug;

use crate::error::PipelineError;
use crate::schema::{ErrorCode, Job, JobPatch, JobStatus, Stage};
use crate::store::JobStore;

/// Guards every job record write issued by the coordinator: status moves
/// only along allowed edges and stages only move forward.
pub struct JobTracker<'a> {
    jobs: &'a dyn JobStore,
}

impl<'a> JobTracker<'a> {
    pub fn new(jobs: &'a dyn JobStore) -> Self {
        Self { jobs }
    }

    pub fn get(&self, job_id: &str) -> Result<Job, PipelineError> {
        self.jobs
            .get(job_id)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))
    }

    pub fn transition(&self, job_id: &str, to: JobStatus) -> Result<Job, PipelineError> {
        let job = self.get(job_id)?;
        if !job.status.can_transition_to(to) {
            return Err(PipelineError::IllegalTransition {
                from: job.status,
                to,
            });
        }
        debug!("Job {}: {} -> {}", job_id, job.status, to);
        self.write(job_id, &JobPatch::status(to))
    }

    pub fn enter_stage(&self, job_id: &str, stage: Stage) -> Result<Job, PipelineError> {
        let job = self.get(job_id)?;
        if job.status != JobStatus::Processing {
            return Err(PipelineError::InvalidJob(format!(
                "cannot enter stage {} while job is {}",
                stage, job.status
            )));
        }
        if let Some(current) = job.current_stage {
            if stage < current {
                return Err(PipelineError::StageRegression {
                    from: current,
                    to: stage,
                });
            }
        }
        debug!("Job {}: entering stage {}", job_id, stage);
        self.write(job_id, &JobPatch::stage(stage))
    }

    /// Record `code` and `message` and force the job to `failed`. The stage
    /// the job failed in is kept.
    pub fn fail(&self, job_id: &str, code: ErrorCode, message: &str) -> Result<Job, PipelineError> {
        let job = self.get(job_id)?;
        if !job.status.can_transition_to(JobStatus::Failed) {
            return Err(PipelineError::IllegalTransition {
                from: job.status,
                to: JobStatus::Failed,
            });
        }
        let patch = JobPatch {
            status: Some(JobStatus::Failed),
            error_code: Some(code),
            error_message: Some(message.to_string()),
            ..Default::default()
        };
        self.write(job_id, &patch)
    }

    pub fn write(&self, job_id: &str, patch: &JobPatch) -> Result<Job, PipelineError> {
        self.jobs
            .update(job_id, patch)?
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))
    }
}
