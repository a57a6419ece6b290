use tracing::{info, warn};

use super::{prompt_context, run_round, RoundEnv, RoundReport};
use crate::error::PipelineError;
use crate::prompt::{analysis_prompt, Playbook};
use crate::schema::{DocAst, Job, PersonaOutput, Round};

/// Independent analysis by every usable provider.
///
/// Fails before any call when too few providers are usable, and after the
/// round when too few of them produced a valid output.
pub async fn run_analysis(
    env: &RoundEnv<'_>,
    job: &Job,
    doc: &DocAst,
    playbook: &Playbook,
) -> Result<RoundReport<PersonaOutput>, PipelineError> {
    let adapters = env.registry.list_usable(job.selected_providers.as_deref());
    let required = if job.selected_providers.is_some() {
        env.thresholds.min_analysis_responses_selected
    } else {
        env.thresholds.min_analysis_responses
    };

    if adapters.len() < required {
        warn!(
            "Job {}: {} usable providers, {} required for analysis",
            job.job_id,
            adapters.len(),
            required
        );
        return Err(PipelineError::InsufficientProviders {
            available: adapters.len(),
            required,
        });
    }

    let ctx = prompt_context(job);
    let calls = adapters
        .into_iter()
        .map(|adapter| {
            let prompt = analysis_prompt(adapter.name(), doc, &ctx, playbook)?;
            Ok((adapter, prompt))
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let report = run_round::<PersonaOutput>(env, &job.job_id, Round::Analysis, calls).await?;

    if report.succeeded.len() < required {
        return Err(PipelineError::InsufficientResponses {
            succeeded: report.succeeded.len(),
            total: report.total(),
            required,
            details: report.failure_summary(),
        });
    }

    let findings: usize = report
        .succeeded
        .iter()
        .map(|s| s.output.findings.len())
        .sum();
    info!(
        "Job {}: analysis produced {} findings from {} providers",
        job.job_id,
        findings,
        report.succeeded.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{LlmConfig, ProviderName, RoundsConfig};
    use crate::provider::testing::{
        provider_of, reply_for, test_directory, user_prompt, ScriptedTransport,
    };
    use crate::provider::{Registry, Transport, TransportResponse};
    use crate::runner::fixtures;
    use crate::schema::DebateMode;
    use crate::store::{load_round_outputs, FsStore, JobStore};

    fn healthy_except(failing: &'static [ProviderName]) -> Arc<ScriptedTransport> {
        ScriptedTransport::new(move |req| {
            let name = provider_of(req).unwrap_or(ProviderName::Gpt);
            if failing.contains(&name) {
                return Ok(TransportResponse {
                    status: 503,
                    body: "overloaded".into(),
                });
            }
            reply_for(req, &fixtures::persona_reply(name, &[("b-1", "high")]))
        })
    }

    async fn analyse(
        store: &FsStore,
        available: &[ProviderName],
        transport: Arc<ScriptedTransport>,
        selected: Option<Vec<ProviderName>>,
    ) -> Result<RoundReport<PersonaOutput>, PipelineError> {
        let job = fixtures::job("job-a", DebateMode::Single, selected);
        store.create(&job).unwrap();

        let registry = Registry::new(
            test_directory(available),
            &LlmConfig::default(),
            transport as Arc<dyn Transport>,
        );
        let thresholds = RoundsConfig::default();
        let env = RoundEnv {
            registry: &registry,
            jobs: store,
            artifacts: store,
            thresholds: &thresholds,
            concurrency: 5,
        };

        run_analysis(&env, &job, &fixtures::doc("job-a"), &Playbook::embedded().unwrap()).await
    }

    #[tokio::test]
    async fn test_all_providers_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let transport = healthy_except(&[]);

        let report = analyse(&store, &ProviderName::ALL, transport.clone(), None)
            .await
            .unwrap();

        assert_eq!(report.succeeded.len(), 5);
        assert!(report.failed.is_empty());
        assert_eq!(transport.calls(), 5);

        let prompt = user_prompt(&transport.requests()[0]);
        assert!(prompt.contains("Liability is unlimited"));

        let stored = load_round_outputs::<PersonaOutput>(&store, "job-a", Round::Analysis).unwrap();
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    async fn test_too_few_providers_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let transport = healthy_except(&[]);

        let err = analyse(
            &store,
            &[ProviderName::Claude, ProviderName::Gpt],
            transport.clone(),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::InsufficientProviders {
                available: 2,
                required: 3
            }
        ));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_too_few_successes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let transport = healthy_except(&[ProviderName::Gemini, ProviderName::Mistral]);

        let err = analyse(
            &store,
            &[ProviderName::Claude, ProviderName::Gemini, ProviderName::Mistral],
            transport,
            None,
        )
        .await
        .unwrap_err();

        match err {
            PipelineError::InsufficientResponses {
                succeeded,
                total,
                required,
                details,
            } => {
                assert_eq!((succeeded, total, required), (1, 3, 3));
                assert!(details.contains("gemini: HTTP 503"));
                assert!(details.contains("mistral: HTTP 503"));
            }
            other => panic!("unexpected error: {}", other),
        }

        // Successes are kept even when the round fails
        let stored = load_round_outputs::<PersonaOutput>(&store, "job-a", Round::Analysis).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_selected_subset_uses_lower_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let transport = healthy_except(&[]);

        let report = analyse(
            &store,
            &ProviderName::ALL,
            transport.clone(),
            Some(vec![ProviderName::Claude, ProviderName::Llama]),
        )
        .await
        .unwrap();

        let called: Vec<_> = report.succeeded.iter().map(|s| s.provider).collect();
        assert_eq!(called, vec![ProviderName::Claude, ProviderName::Llama]);
        assert_eq!(transport.calls(), 2);
    }
}
