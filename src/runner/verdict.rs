use tracing::{info, warn};

use super::{prompt_context, run_round, RoundEnv, RoundReport};
use crate::error::PipelineError;
use crate::prompt::verdict_prompt;
use crate::schema::{DebateRoundOutput, DocAst, Job, PersonaOutput, Round, VerdictOutput};
use crate::store::load_round_outputs;

/// Final findings from each provider after reading the analysis and the
/// debate. Returns `None` when there is no debate to adjudicate.
pub async fn run_verdict(
    env: &RoundEnv<'_>,
    job: &Job,
    doc: &DocAst,
) -> Result<Option<RoundReport<VerdictOutput>>, PipelineError> {
    let round1 = load_round_outputs::<PersonaOutput>(env.artifacts, &job.job_id, Round::Analysis)?;
    let debate =
        load_round_outputs::<DebateRoundOutput>(env.artifacts, &job.job_id, Round::Debate)?;

    if debate.is_empty() {
        warn!("Job {}: skipping verdict, no debate outputs", job.job_id);
        return Ok(None);
    }

    let ctx = prompt_context(job);
    let calls = env
        .registry
        .list_usable(job.selected_providers.as_deref())
        .into_iter()
        .map(|adapter| {
            let prompt = verdict_prompt(adapter.name(), doc, &ctx, &round1, &debate)?;
            Ok((adapter, prompt))
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let report = run_round::<VerdictOutput>(env, &job.job_id, Round::Verdict, calls).await?;

    if report.succeeded.len() < env.thresholds.min_enrichment_responses {
        warn!(
            "Job {}: only {}/{} verdicts ({} expected): {}",
            job.job_id,
            report.succeeded.len(),
            report.total(),
            env.thresholds.min_enrichment_responses,
            report.failure_summary()
        );
    } else {
        info!(
            "Job {}: {} verdicts collected",
            job.job_id,
            report.succeeded.len()
        );
    }

    Ok(Some(report))
}
