use tracing::{info, warn};

use super::{prompt_context, run_round, RoundEnv, RoundReport};
use crate::error::PipelineError;
use crate::prompt::debate_prompt;
use crate::schema::{DebateRoundOutput, DocAst, Job, PersonaOutput, Round};
use crate::store::load_round_outputs;

/// Analysis outputs a debate needs before it is worth running
const MIN_DEBATE_INPUTS: usize = 2;

/// Each provider reacts to the stored analysis outputs of the others.
///
/// Returns `None` when fewer than two analysis outputs exist. A thin debate
/// is logged but never fails the job.
pub async fn run_debate(
    env: &RoundEnv<'_>,
    job: &Job,
    doc: &DocAst,
) -> Result<Option<RoundReport<DebateRoundOutput>>, PipelineError> {
    let round1 = load_round_outputs::<PersonaOutput>(env.artifacts, &job.job_id, Round::Analysis)?;

    if round1.len() < MIN_DEBATE_INPUTS {
        warn!(
            "Job {}: skipping debate, only {} analysis outputs available",
            job.job_id,
            round1.len()
        );
        return Ok(None);
    }

    let ctx = prompt_context(job);
    let calls = env
        .registry
        .list_usable(job.selected_providers.as_deref())
        .into_iter()
        .map(|adapter| {
            let prompt = debate_prompt(adapter.name(), doc, &ctx, &round1)?;
            Ok((adapter, prompt))
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let report = run_round::<DebateRoundOutput>(env, &job.job_id, Round::Debate, calls).await?;

    if report.succeeded.len() < env.thresholds.min_enrichment_responses {
        warn!(
            "Job {}: only {}/{} debate responses ({} expected): {}",
            job.job_id,
            report.succeeded.len(),
            report.total(),
            env.thresholds.min_enrichment_responses,
            report.failure_summary()
        );
    } else {
        let stances: usize = report
            .succeeded
            .iter()
            .map(|s| s.output.responses.len())
            .sum();
        info!("Job {}: debate collected {} stances", job.job_id, stances);
    }

    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{LlmConfig, ProviderName, RoundsConfig};
    use crate::provider::testing::{
        provider_of, reply_for, test_directory, user_prompt, ScriptedTransport,
    };
    use crate::provider::{Registry, Transport, TransportError};
    use crate::runner::fixtures;
    use crate::schema::DebateMode;
    use crate::store::{ArtifactStore, FsStore, JobStore};

    fn seed_analysis(store: &FsStore, job_id: &str, providers: &[ProviderName]) {
        for name in providers {
            let reply = fixtures::persona_reply(*name, &[("b-1", "high")]);
            store
                .write_round_output(job_id, Round::Analysis, *name, reply.as_bytes())
                .unwrap();
        }
    }

    fn env<'a>(
        registry: &'a Registry,
        store: &'a FsStore,
        thresholds: &'a RoundsConfig,
    ) -> RoundEnv<'a> {
        RoundEnv {
            registry,
            jobs: store,
            artifacts: store,
            thresholds,
            concurrency: 3,
        }
    }

    #[tokio::test]
    async fn test_debate_sees_other_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let job = fixtures::job("job-d", DebateMode::Debate, None);
        store.create(&job).unwrap();
        seed_analysis(&store, "job-d", &[ProviderName::Claude, ProviderName::Gpt]);

        let transport = ScriptedTransport::new(|req| {
            let name = provider_of(req).unwrap_or(ProviderName::Gpt);
            reply_for(req, &fixtures::debate_reply(name, &[("gpt", "b-1")]))
        });
        let registry = Registry::new(
            test_directory(&[ProviderName::Claude, ProviderName::Gpt]),
            &LlmConfig::default(),
            transport.clone() as Arc<dyn Transport>,
        );
        let thresholds = RoundsConfig::default();

        let report = run_debate(&env(&registry, &store, &thresholds), &job, &fixtures::doc("job-d"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.succeeded.len(), 2);
        let prompt = user_prompt(&transport.requests()[0]);
        assert!(prompt.contains("b-1 flagged by claude"));
        assert!(prompt.contains("b-1 flagged by gpt"));
    }

    #[tokio::test]
    async fn test_skips_with_single_analysis_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let job = fixtures::job("job-d", DebateMode::Debate, None);
        store.create(&job).unwrap();
        seed_analysis(&store, "job-d", &[ProviderName::Claude]);

        let transport = ScriptedTransport::repeat(Err(TransportError::Timeout));
        let registry = Registry::new(
            test_directory(&ProviderName::ALL),
            &LlmConfig::default(),
            transport.clone() as Arc<dyn Transport>,
        );
        let thresholds = RoundsConfig::default();

        let report = run_debate(&env(&registry, &store, &thresholds), &job, &fixtures::doc("job-d"))
            .await
            .unwrap();

        assert!(report.is_none());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_debate_does_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let job = fixtures::job("job-d", DebateMode::Debate, None);
        store.create(&job).unwrap();
        seed_analysis(&store, "job-d", &[ProviderName::Claude, ProviderName::Gpt]);

        let registry = Registry::new(
            test_directory(&[ProviderName::Claude, ProviderName::Gpt]),
            &LlmConfig::default(),
            ScriptedTransport::repeat(Err(TransportError::Timeout)) as Arc<dyn Transport>,
        );
        let thresholds = RoundsConfig::default();

        let report = run_debate(&env(&registry, &store, &thresholds), &job, &fixtures::doc("job-d"))
            .await
            .unwrap()
            .unwrap();

        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(store
            .read_round_output("job-d", Round::Debate, ProviderName::Gpt)
            .unwrap()
            .is_none());
    }
}
