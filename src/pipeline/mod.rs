//! Job coordinator: creates jobs, drives them through the stages and
//! records the outcome on the job record.

mod state;

pub use state::JobTracker;

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Config, ProviderName};
use crate::consolidate::{ConsolidationReport, Consolidator};
use crate::error::PipelineError;
use crate::ingest::{check_blocks, BlockExtractor, PlainTextExtractor};
use crate::output::{render_outputs, FinalReport, MarkdownRenderer, Renderer};
use crate::prompt::Playbook;
use crate::provider::Registry;
use crate::runner::{run_analysis, run_debate, run_verdict, RoundEnv};
use crate::schema::{
    ContractType, DebateMode, DocAst, Feedback, Job, JobPatch, JobStatus, Side, Stage, Validate,
};
use crate::store::{
    read_json, write_json, ArtifactStore, JobStore, CONSOLIDATED_BLOB, DOCAST_BLOB, INPUT_BLOB,
    REPORT_JSON_BLOB,
};

/// Request for a new review job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub contract_type: ContractType,
    pub side: Side,
    pub jurisdiction: Option<String>,
    pub tenant_id: Option<String>,
    pub debate_mode: DebateMode,
    pub selected_providers: Option<Vec<ProviderName>>,
}

pub struct Pipeline {
    config: Config,
    registry: Registry,
    jobs: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    playbook: Playbook,
    extractor: Box<dyn BlockExtractor>,
    renderer: Box<dyn Renderer>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        registry: Registry,
        jobs: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        playbook: Playbook,
    ) -> Self {
        Self {
            config,
            registry,
            jobs,
            artifacts,
            playbook,
            extractor: Box::new(PlainTextExtractor),
            renderer: Box::new(MarkdownRenderer),
        }
    }

    fn tracker(&self) -> JobTracker<'_> {
        JobTracker::new(self.jobs.as_ref())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, PipelineError> {
        self.tracker().get(job_id)
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, PipelineError> {
        Ok(self.jobs.list()?)
    }

    /// Validate the request, store the document and create the job record
    pub fn create_job(&self, request: NewJob, document: &[u8]) -> Result<Job, PipelineError> {
        let jurisdiction = request
            .jurisdiction
            .unwrap_or_else(|| self.config.default_jurisdiction.clone());
        if jurisdiction.trim().is_empty() {
            return Err(PipelineError::InvalidJob(
                "jurisdiction must not be empty".into(),
            ));
        }

        let tenant_id = request
            .tenant_id
            .unwrap_or_else(|| self.config.default_tenant.clone());
        if tenant_id.trim().is_empty() {
            return Err(PipelineError::InvalidJob("tenant must not be empty".into()));
        }

        let selected_providers = match request.selected_providers {
            Some(names) => {
                let distinct: BTreeSet<ProviderName> = names.into_iter().collect();
                if distinct.len() < 2 {
                    return Err(PipelineError::InvalidJob(
                        "select at least 2 distinct providers".into(),
                    ));
                }
                Some(distinct.into_iter().collect())
            }
            None => None,
        };

        if document.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(PipelineError::InvalidJob("document is empty".into()));
        }

        let now = Utc::now();
        let job = Job {
            job_id: Uuid::new_v4().to_string(),
            tenant_id,
            status: JobStatus::Created,
            contract_type: request.contract_type,
            side: request.side,
            jurisdiction: jurisdiction.trim().to_string(),
            current_stage: None,
            progress: None,
            debate_mode: request.debate_mode,
            selected_providers,
            error_code: None,
            error_message: None,
            feedback: None,
            created_at: now,
            updated_at: now,
        };

        self.jobs.create(&job)?;
        self.artifacts.write_blob(&job.job_id, INPUT_BLOB, document)?;

        info!(
            "Created job {} ({}, {}, {} mode)",
            job.job_id, job.contract_type, job.side, job.debate_mode
        );
        Ok(job)
    }

    /// Run a created job to a terminal state.
    ///
    /// A stage failure is recorded on the job, which is returned as `failed`.
    /// `Err` means the job could not be run or its failure not recorded.
    pub async fn run(&self, job_id: &str) -> Result<Job, PipelineError> {
        let start = Instant::now();
        info!("Job {}: pipeline started", job_id);

        match self.execute(job_id).await {
            Ok(()) => {
                let job = self.tracker().transition(job_id, JobStatus::Completed)?;
                info!(
                    "Job {}: completed in {:.1}s",
                    job_id,
                    start.elapsed().as_secs_f64()
                );
                Ok(job)
            }
            Err(err) => {
                let tracker = self.tracker();
                let recordable = tracker
                    .get(job_id)
                    .map(|job| job.status.can_transition_to(JobStatus::Failed))
                    .unwrap_or(false);
                if !recordable {
                    return Err(err);
                }

                error!(
                    "Job {}: failed after {:.1}s [{}]: {}",
                    job_id,
                    start.elapsed().as_secs_f64(),
                    err.code(),
                    err
                );
                tracker.fail(job_id, err.code(), &err.to_string())
            }
        }
    }

    async fn execute(&self, job_id: &str) -> Result<(), PipelineError> {
        let tracker = self.tracker();
        let job = tracker.transition(job_id, JobStatus::Processing)?;

        tracker.enter_stage(job_id, Stage::Ingest)?;
        let doc = self.ingest(&job)?;

        let env = RoundEnv {
            registry: &self.registry,
            jobs: self.jobs.as_ref(),
            artifacts: self.artifacts.as_ref(),
            thresholds: &self.config.rounds,
            concurrency: self.config.llm.concurrency,
        };

        tracker.enter_stage(job_id, Stage::Personas)?;
        run_analysis(&env, &job, &doc, &self.playbook).await?;

        if job.debate_mode == DebateMode::Debate {
            tracker.enter_stage(job_id, Stage::Debate)?;
            run_debate(&env, &job, &doc).await?;

            tracker.enter_stage(job_id, Stage::Verdict)?;
            run_verdict(&env, &job, &doc).await?;
        }

        tracker.enter_stage(job_id, Stage::Consolidate)?;
        let consolidated = self.consolidator().consolidate(&job)?;
        write_json(
            self.artifacts.as_ref(),
            job_id,
            CONSOLIDATED_BLOB,
            &consolidated,
        )?;

        tracker.enter_stage(job_id, Stage::Render)?;
        render_outputs(
            self.artifacts.as_ref(),
            &job,
            &consolidated,
            self.renderer.as_ref(),
        )?;

        Ok(())
    }

    fn ingest(&self, job: &Job) -> Result<DocAst, PipelineError> {
        let raw = self
            .artifacts
            .read_blob(&job.job_id, INPUT_BLOB)?
            .ok_or_else(|| PipelineError::MissingArtifact(INPUT_BLOB.into()))?;

        let blocks = check_blocks(self.extractor.extract(&raw)?)?;
        let doc = DocAst::new(&job.tenant_id, &job.job_id, blocks);
        write_json(self.artifacts.as_ref(), &job.job_id, DOCAST_BLOB, &doc)?;

        info!(
            "Job {}: extracted {} blocks",
            job.job_id, doc.metadata.total_blocks
        );
        Ok(doc)
    }

    fn consolidator(&self) -> Consolidator<'_> {
        Consolidator::new(self.artifacts.as_ref(), &self.config.consolidation)
    }

    /// The stored final report of a completed job
    pub fn final_report(&self, job_id: &str) -> Result<Option<FinalReport>, PipelineError> {
        Ok(read_json(self.artifacts.as_ref(), job_id, REPORT_JSON_BLOB)?)
    }

    /// Consolidate stored outputs again without touching the job
    pub fn reconsolidate(&self, job_id: &str) -> Result<ConsolidationReport, PipelineError> {
        let job = self.get_job(job_id)?;
        Ok(self.consolidator().consolidate(&job)?)
    }

    pub fn submit_feedback(&self, job_id: &str, feedback: Feedback) -> Result<Job, PipelineError> {
        let job = self.get_job(job_id)?;
        if job.status != JobStatus::Completed {
            return Err(PipelineError::FeedbackNotAllowed(job.status));
        }
        feedback
            .validate()
            .map_err(|issues| PipelineError::InvalidJob(format!("invalid feedback: {}", issues)))?;

        let patch = JobPatch {
            feedback: Some(feedback),
            ..Default::default()
        };
        let job = self.tracker().write(job_id, &patch)?;
        info!("Job {}: feedback recorded", job_id);
        Ok(job)
    }

    /// Expire jobs older than the configured lifetime and delete their files.
    /// With `purge` the job records are removed as well.
    pub fn expire_stale(&self, now: DateTime<Utc>, purge: bool) -> Result<Vec<String>, PipelineError> {
        let max_age = Duration::hours(self.config.jobs.expiration_hours as i64);
        let tracker = self.tracker();
        let mut expired = Vec::new();

        for job in self.jobs.list()? {
            if now.signed_duration_since(job.created_at) <= max_age {
                continue;
            }

            if job.status != JobStatus::Expired {
                if job.status == JobStatus::Processing {
                    warn!("Job {}: expiring while still processing", job.job_id);
                }
                tracker.transition(&job.job_id, JobStatus::Expired)?;
                self.artifacts.delete_job_files(&job.job_id)?;
                expired.push(job.job_id.clone());
            }

            if purge {
                self.jobs.delete(&job.job_id)?;
            }
        }

        if !expired.is_empty() {
            info!("Expired {} jobs", expired.len());
        }
        Ok(expired)
    }
}
