//! Durable storage for job records and per-job artifacts.

mod fs;

pub use fs::FsStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::config::ProviderName;
use crate::error::StoreError;
use crate::schema::{Job, JobPatch, Round, Validate};

pub const INPUT_BLOB: &str = "input";
pub const DOCAST_BLOB: &str = "docast.json";
pub const CONSOLIDATED_BLOB: &str = "consolidated.json";
pub const REPORT_JSON_BLOB: &str = "report.json";
pub const REPORT_MD_BLOB: &str = "report.md";

/// Job record persistence. `update` merges a partial patch and returns the
/// stored result, or `None` when the job does not exist.
pub trait JobStore: Send + Sync {
    fn create(&self, job: &Job) -> Result<(), StoreError>;

    fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    fn update(&self, job_id: &str, patch: &JobPatch) -> Result<Option<Job>, StoreError>;

    /// All jobs, newest first
    fn list(&self) -> Result<Vec<Job>, StoreError>;

    fn delete(&self, job_id: &str) -> Result<bool, StoreError>;
}

/// Per-job artifacts: one write-once record per (round, provider) plus
/// named blobs. A completed write is visible to the next read.
pub trait ArtifactStore: Send + Sync {
    fn read_round_output(
        &self,
        job_id: &str,
        round: Round,
        provider: ProviderName,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    fn write_round_output(
        &self,
        job_id: &str,
        round: Round,
        provider: ProviderName,
        bytes: &[u8],
    ) -> Result<(), StoreError>;

    fn read_blob(&self, job_id: &str, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn write_blob(&self, job_id: &str, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn delete_job_files(&self, job_id: &str) -> Result<(), StoreError>;
}

/// Every stored output of a round that still parses and validates, in
/// provider name order. Unreadable entries are skipped with a warning.
pub fn load_round_outputs<T>(
    artifacts: &dyn ArtifactStore,
    job_id: &str,
    round: Round,
) -> Result<Vec<(ProviderName, T)>, StoreError>
where
    T: DeserializeOwned + Validate,
{
    let mut outputs = Vec::new();

    for provider in ProviderName::ALL {
        let Some(bytes) = artifacts.read_round_output(job_id, round, provider)? else {
            continue;
        };

        match serde_json::from_slice::<T>(&bytes) {
            Ok(output) => match output.validate() {
                Ok(()) => outputs.push((provider, output)),
                Err(issues) => warn!(
                    "Skipping invalid {} output from {} for job {}: {}",
                    round, provider, job_id, issues
                ),
            },
            Err(e) => warn!(
                "Skipping unreadable {} output from {} for job {}: {}",
                round, provider, job_id, e
            ),
        }
    }

    Ok(outputs)
}

pub fn write_json<T: Serialize>(
    artifacts: &dyn ArtifactStore,
    job_id: &str,
    name: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)?;
    artifacts.write_blob(job_id, name, &json)
}

pub fn read_json<T: DeserializeOwned>(
    artifacts: &dyn ArtifactStore,
    job_id: &str,
    name: &str,
) -> Result<Option<T>, StoreError> {
    match artifacts.read_blob(job_id, name)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}
