//! Multi-provider rounds: fan one prompt per provider out concurrently,
//! settle every call and keep the successes.

mod analysis;
mod debate;
mod round;
mod verdict;

pub use analysis::run_analysis;
pub use debate::run_debate;
pub use round::{run_round, ProviderFailure, ProviderSuccess, RoundReport};
pub use verdict::run_verdict;

use crate::config::RoundsConfig;
use crate::prompt::PromptContext;
use crate::provider::Registry;
use crate::schema::Job;
use crate::store::{ArtifactStore, JobStore};

/// Everything a round needs besides its inputs
pub struct RoundEnv<'a> {
    pub registry: &'a Registry,
    pub jobs: &'a dyn JobStore,
    pub artifacts: &'a dyn ArtifactStore,
    pub thresholds: &'a RoundsConfig,
    pub concurrency: usize,
}

fn prompt_context(job: &Job) -> PromptContext<'_> {
    PromptContext {
        contract_type: job.contract_type,
        side: job.side,
        jurisdiction: &job.jurisdiction,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use serde_json::json;

    use crate::config::ProviderName;
    use crate::schema::{
        BlockType, ContractType, DebateMode, DocAst, DocBlock, Job, JobStatus, Side,
    };

    pub fn job(job_id: &str, debate_mode: DebateMode, selected: Option<Vec<ProviderName>>) -> Job {
        let now = Utc::now();
        Job {
            job_id: job_id.into(),
            tenant_id: "default".into(),
            status: JobStatus::Processing,
            contract_type: ContractType::Saas,
            side: Side::Contracted,
            jurisdiction: "Brazil".into(),
            current_stage: None,
            progress: None,
            debate_mode,
            selected_providers: selected,
            error_code: None,
            error_message: None,
            feedback: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn doc(job_id: &str) -> DocAst {
        DocAst::new(
            "default",
            job_id,
            vec![
                DocBlock {
                    block_id: "b-1".into(),
                    block_type: BlockType::Paragraph,
                    content: "The supplier may terminate at any time without notice.".into(),
                    level: None,
                    index: 0,
                },
                DocBlock {
                    block_id: "b-2".into(),
                    block_type: BlockType::Paragraph,
                    content: "Liability is unlimited for the customer.".into(),
                    level: None,
                    index: 1,
                },
            ],
        )
    }

    /// Analysis reply with one finding per `(blockId, severity)` pair
    pub fn persona_reply(provider: ProviderName, findings: &[(&str, &str)]) -> String {
        json!({
            "provider": provider,
            "findings": findings.iter().map(|(block, severity)| json!({
                "blockId": block,
                "severity": severity,
                "original": format!("original text of {}", block),
                "suggested": format!("{} rewritten by {}", block, provider),
                "justification": format!("{} flagged by {}", block, provider),
            })).collect::<Vec<_>>(),
            "generalSuggestions": [format!("suggestion from {}", provider)],
            "analyzedAt": "2026-01-01T00:00:00Z",
        })
        .to_string()
    }

    /// Debate reply agreeing with every listed `(originalProvider, blockId)`
    pub fn debate_reply(provider: ProviderName, agree_with: &[(&str, &str)]) -> String {
        json!({
            "provider": provider,
            "responses": agree_with.iter().map(|(original, block)| json!({
                "originalProvider": original,
                "blockId": block,
                "stance": "agree",
                "argument": "valid concern",
            })).collect::<Vec<_>>(),
            "analyzedAt": "2026-01-01T00:00:00Z",
        })
        .to_string()
    }

    /// Verdict reply with one finding per `(blockId, severity, confidence)`
    pub fn verdict_reply(provider: ProviderName, findings: &[(&str, &str, &str)]) -> String {
        json!({
            "provider": provider,
            "findings": findings.iter().map(|(block, severity, confidence)| json!({
                "blockId": block,
                "severity": severity,
                "original": format!("original text of {}", block),
                "suggested": format!("{} final wording", block),
                "justification": "confirmed in debate",
                "confidence": confidence,
                "debateNotes": format!("{} weighed in", provider),
            })).collect::<Vec<_>>(),
            "analyzedAt": "2026-01-01T00:00:00Z",
        })
        .to_string()
    }
}
