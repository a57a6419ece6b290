use futures::stream::{FuturesUnordered, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::RoundEnv;
use crate::config::ProviderName;
use crate::error::{AdapterError, PipelineError};
use crate::provider::Adapter;
use crate::schema::{JobPatch, Round, Validate};

#[derive(Debug)]
pub struct ProviderSuccess<T> {
    pub provider: ProviderName,
    pub output: T,
    pub attempts: u32,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: ProviderName,
    pub reason: String,
}

/// Settled outcome of one round: every called provider lands in exactly
/// one of the two lists, each sorted by provider name.
#[derive(Debug)]
pub struct RoundReport<T> {
    pub round: Round,
    pub succeeded: Vec<ProviderSuccess<T>>,
    pub failed: Vec<ProviderFailure>,
    pub duration: Duration,
}

impl<T> RoundReport<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Successes that needed more than one attempt
    pub fn retried_successes(&self) -> usize {
        self.succeeded.iter().filter(|s| s.attempts > 1).count()
    }

    /// Failure reasons joined for error messages. Each reason already
    /// names its provider.
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|f| f.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn outputs(&self) -> Vec<(ProviderName, &T)> {
        self.succeeded
            .iter()
            .map(|s| (s.provider, &s.output))
            .collect()
    }
}

/// Call every adapter with its prompt concurrently and wait for all of them.
///
/// A failing or panicking call never cancels the others. Each success is
/// persisted as soon as it arrives, and job progress advances as each
/// provider finishes.
pub async fn run_round<T>(
    env: &RoundEnv<'_>,
    job_id: &str,
    round: Round,
    calls: Vec<(Arc<Adapter>, String)>,
) -> Result<RoundReport<T>, PipelineError>
where
    T: DeserializeOwned + Serialize + Validate + Send + 'static,
{
    let start = Instant::now();
    let total = calls.len();
    let semaphore = Arc::new(Semaphore::new(env.concurrency.max(1)));

    info!(
        "Running {} round for job {} with {} providers (concurrency {})",
        round, job_id, total, env.concurrency
    );
    env.jobs.update(job_id, &JobPatch::progress(0, total))?;

    let mut futures = FuturesUnordered::new();

    for (adapter, prompt) in calls {
        let provider = adapter.name();
        let semaphore = semaphore.clone();

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|e| {
                AdapterError::Transport {
                    provider,
                    message: format!("concurrency limiter closed: {}", e),
                }
            })?;
            adapter.call::<T>(&prompt).await
        });

        futures.push(async move { (provider, handle.await) });
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    let mut finished = 0;

    while let Some((provider, result)) = futures.next().await {
        finished += 1;

        match result {
            Ok(Ok(outcome)) => {
                match persist(env, job_id, round, provider, &outcome.data) {
                    Ok(()) => {
                        info!(
                            "{} {} round succeeded in {:.1}s ({} attempt{})",
                            provider,
                            round,
                            outcome.duration.as_secs_f64(),
                            outcome.attempts,
                            if outcome.attempts == 1 { "" } else { "s" }
                        );
                        succeeded.push(ProviderSuccess {
                            provider,
                            output: outcome.data,
                            attempts: outcome.attempts,
                            duration: outcome.duration,
                        });
                    }
                    Err(e) => {
                        warn!("Failed to persist {} output from {}: {}", round, provider, e);
                        failed.push(ProviderFailure {
                            provider,
                            reason: format!("{}: failed to persist output: {}", provider, e),
                        });
                    }
                }
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                warn!("Provider failed during {} round: {}", round, reason);
                failed.push(ProviderFailure { provider, reason });
            }
            Err(e) => {
                warn!("{} task panicked during {} round: {}", provider, round, e);
                failed.push(ProviderFailure {
                    provider,
                    reason: format!("{}: task panicked: {}", provider, e),
                });
            }
        }

        env.jobs
            .update(job_id, &JobPatch::progress(finished, total))?;
    }

    succeeded.sort_by_key(|s: &ProviderSuccess<T>| s.provider);
    failed.sort_by_key(|f| f.provider);

    let report = RoundReport {
        round,
        succeeded,
        failed,
        duration: start.elapsed(),
    };

    info!(
        "{} round completed for job {}: {} succeeded ({} after retries), {} failed",
        round,
        job_id,
        report.succeeded.len(),
        report.retried_successes(),
        report.failed.len()
    );

    Ok(report)
}

fn persist<T: Serialize>(
    env: &RoundEnv<'_>,
    job_id: &str,
    round: Round,
    provider: ProviderName,
    output: &T,
) -> Result<(), PipelineError> {
    let bytes = serde_json::to_vec_pretty(output)?;
    env.artifacts
        .write_round_output(job_id, round, provider, &bytes)?;
    Ok(())
}
