use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validate::{Issues, Validate};
use crate::config::ProviderName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Processing,
    Completed,
    Failed,
    Expired,
}

impl JobStatus {
    /// Allowed edges of the job lifecycle. `Failed` is reachable from any
    /// non-terminal state, `Expired` from anything but itself.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (*self, next),
            (Created, Processing)
                | (Created, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Created | Processing | Completed | Failed, Expired)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Expired => "expired",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing stages, declared in execution order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ingest,
    Personas,
    Debate,
    Verdict,
    Consolidate,
    Render,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Ingest => "ingest",
            Stage::Personas => "personas",
            Stage::Debate => "debate",
            Stage::Verdict => "verdict",
            Stage::Consolidate => "consolidate",
            Stage::Render => "render",
        };
        f.write_str(s)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Nda,
    Saas,
    Partnership,
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContractType::Nda => "nda",
            ContractType::Saas => "saas",
            ContractType::Partnership => "partnership",
        };
        f.write_str(s)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Contractor,
    Contracted,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Side::Contractor => "contractor",
            Side::Contracted => "contracted",
        };
        f.write_str(s)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DebateMode {
    #[default]
    Single,
    Debate,
}

impl std::fmt::Display for DebateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebateMode::Single => f.write_str("single"),
            DebateMode::Debate => f.write_str("debate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InsufficientProviders,
    InsufficientResponses,
    NoValidOutputs,
    PipelineError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InsufficientProviders => "INSUFFICIENT_PROVIDERS",
            ErrorCode::InsufficientResponses => "INSUFFICIENT_RESPONSES",
            ErrorCode::NoValidOutputs => "NO_VALID_OUTPUTS",
            ErrorCode::PipelineError => "PIPELINE_ERROR",
        };
        f.write_str(s)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Bad,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum FeedbackReason {
    IrrelevantFindings,
    MissedClauses,
    BadSuggestions,
    WrongSeverity,
    Other,
}

pub const MAX_FEEDBACK_COMMENT: usize = 500;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FeedbackReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Validate for Feedback {
    fn collect_issues(&self, issues: &mut Issues) {
        if let Some(comment) = &self.comment {
            if comment.chars().count() > MAX_FEEDBACK_COMMENT {
                issues.push(
                    "comment",
                    format!("must be at most {} characters", MAX_FEEDBACK_COMMENT),
                );
            }
        }
    }
}

/// The one mutable entity: a contract review request and its progress
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub tenant_id: String,
    pub status: JobStatus,
    pub contract_type: ContractType,
    pub side: Side,
    pub jurisdiction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub debate_mode: DebateMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_providers: Option<Vec<ProviderName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update. `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub current_stage: Option<Stage>,
    pub progress: Option<Progress>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    pub feedback: Option<Feedback>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn stage(stage: Stage) -> Self {
        Self {
            current_stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn progress(completed: usize, total: usize) -> Self {
        Self {
            progress: Some(Progress { completed, total }),
            ..Default::default()
        }
    }

    pub fn apply(&self, job: &mut Job, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(stage) = self.current_stage {
            job.current_stage = Some(stage);
        }
        if let Some(progress) = self.progress {
            job.progress = Some(progress);
        }
        if let Some(code) = self.error_code {
            job.error_code = Some(code);
        }
        if let Some(message) = &self.error_message {
            job.error_message = Some(message.clone());
        }
        if let Some(feedback) = &self.feedback {
            job.feedback = Some(feedback.clone());
        }
        job.updated_at = now;
    }
}
