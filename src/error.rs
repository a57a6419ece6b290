use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::ProviderName;
use crate::schema::{ErrorCode, JobStatus, Round, Stage};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Failed to load playbook '{path}': {message}")]
    Playbook { path: PathBuf, message: String },
}

/// Failure of a single provider call. Only `ValidationExhausted` is the
/// product of retries; every other variant ends the call on first occurrence.
#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    #[error("{provider}: request timed out after {after:?}")]
    Timeout {
        provider: ProviderName,
        after: Duration,
    },

    #[error("{provider}: HTTP {status}: {body}")]
    Http {
        provider: ProviderName,
        status: u16,
        body: String,
    },

    #[error("{provider}: transport error: {message}")]
    Transport {
        provider: ProviderName,
        message: String,
    },

    #[error("{provider}: unexpected response envelope: {message}")]
    Envelope {
        provider: ProviderName,
        message: String,
    },

    #[error("{provider}: failed after {attempts} attempts: {last_error}")]
    ValidationExhausted {
        provider: ProviderName,
        attempts: u32,
        last_error: String,
    },
}

impl AdapterError {
    pub fn provider(&self) -> ProviderName {
        match self {
            AdapterError::Timeout { provider, .. }
            | AdapterError::Http { provider, .. }
            | AdapterError::Transport { provider, .. }
            | AdapterError::Envelope { provider, .. }
            | AdapterError::ValidationExhausted { provider, .. } => *provider,
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),

    #[error("Corrupt record '{path}': {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Round output '{0}' already exists")]
    AlreadyExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Document contains no text blocks")]
    Empty,

    #[error("Duplicate block id '{0}'")]
    DuplicateBlockId(String),

    #[error("Document is not valid UTF-8 text")]
    Utf8,

    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("No valid outputs found for the {round} round")]
    NoValidOutputs { round: Round },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to render report: {0}")]
    Render(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Illegal status transition {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    #[error("Stage cannot move backwards from {from} to {to}")]
    StageRegression { from: Stage, to: Stage },

    #[error("Feedback is only accepted for completed jobs (job is {0})")]
    FeedbackNotAllowed(JobStatus),

    #[error("Insufficient providers configured: {available} usable, at least {required} required")]
    InsufficientProviders { available: usize, required: usize },

    #[error("Insufficient responses: {succeeded}/{total} providers succeeded, at least {required} required. Failures: {details}")]
    InsufficientResponses {
        succeeded: usize,
        total: usize,
        required: usize,
        details: String,
    },

    #[error("Missing artifact '{0}'")]
    MissingArtifact(String),

    #[error("Consolidation failed: {0}")]
    Consolidate(#[from] ConsolidateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PipelineError {
    /// Machine-readable code written onto a failed job record
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::InsufficientProviders { .. } => ErrorCode::InsufficientProviders,
            PipelineError::InsufficientResponses { .. } => ErrorCode::InsufficientResponses,
            PipelineError::Consolidate(ConsolidateError::NoValidOutputs { .. }) => {
                ErrorCode::NoValidOutputs
            }
            _ => ErrorCode::PipelineError,
        }
    }
}
