//! Consolidation engine: merges per-provider findings into one ranked list
//! with consensus counts, plus the edit plan derived from it.

mod group;

pub use group::{group_findings, Candidate, Group, Sourced};

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

use crate::config::{ConsolidationConfig, ProviderName};
use crate::error::ConsolidateError;
use crate::schema::{
    ConsolidatedFinding, DebateMode, DebateRoundOutput, Job, PatchAction, PatchPlan,
    PersonaOutput, Round, Stance, VerdictOutput,
};
use crate::store::{load_round_outputs, ArtifactStore};

/// Everything rendering needs; persisted as `consolidated.json`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    pub findings: Vec<ConsolidatedFinding>,
    pub patch_plan: PatchPlan,
    pub general_suggestions: Vec<String>,
    pub providers_used: Vec<ProviderName>,
    pub debate_mode: DebateMode,
    pub source_round: Round,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub agrees: usize,
    pub disagrees: usize,
}

/// Debate reactions keyed by (originating provider, blockId)
pub type StanceTally = HashMap<(String, String), Tally>;

/// Count debate stances per originating finding. `adjust` counts as agree.
pub fn tally_stances(debate: &[(ProviderName, DebateRoundOutput)]) -> StanceTally {
    let mut tally = StanceTally::new();

    for (_, output) in debate {
        for response in &output.responses {
            let key = (
                response.original_provider.trim().to_lowercase(),
                response.block_id.clone(),
            );
            let entry = tally.entry(key).or_default();
            match response.stance {
                Stance::Agree | Stance::Adjust => entry.agrees += 1,
                Stance::Disagree => entry.disagrees += 1,
            }
        }
    }

    tally
}

#[derive(Debug, Default, PartialEq)]
pub struct Merged {
    pub findings: Vec<ConsolidatedFinding>,
    pub general_suggestions: Vec<String>,
    pub providers_used: Vec<ProviderName>,
}

/// Group, resolve and rank the findings of one round.
///
/// `outputs` must arrive in provider name order for grouping to be
/// reproducible. Stance counts are attached when `stances` is given.
pub fn merge<'a, F: Candidate + 'a>(
    outputs: impl IntoIterator<Item = (ProviderName, &'a [F], &'a [String])>,
    stances: Option<&StanceTally>,
    max_distance: u8,
) -> Merged {
    let mut providers_used = Vec::new();
    let mut general_suggestions = Vec::new();
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (provider, findings, suggestions) in outputs {
        providers_used.push(provider);
        items.extend(findings.iter().map(|finding| Sourced { provider, finding }));
        for suggestion in suggestions {
            if seen.insert(suggestion.as_str()) {
                general_suggestions.push(suggestion.clone());
            }
        }
    }

    let groups = group_findings(items, max_distance);
    let mut findings: Vec<ConsolidatedFinding> =
        groups.iter().filter_map(|g| resolve(g, stances)).collect();

    findings.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.block_id.cmp(&b.block_id))
    });
    for (ordinal, finding) in findings.iter_mut().enumerate() {
        finding.id = fingerprint(ordinal, finding);
    }

    Merged {
        findings,
        general_suggestions,
        providers_used,
    }
}

fn resolve<F: Candidate>(
    group: &Group<'_, F>,
    stances: Option<&StanceTally>,
) -> Option<ConsolidatedFinding> {
    let rep = group.representative()?;
    let sources: BTreeSet<ProviderName> = group.members.iter().map(|m| m.provider).collect();

    let notes: Vec<&str> = group
        .members
        .iter()
        .filter_map(|m| m.finding.debate_notes())
        .filter(|n| !n.is_empty())
        .collect();

    let tally = stances
        .and_then(|t| {
            t.get(&(
                rep.provider.as_str().to_string(),
                rep.finding.block_id().to_string(),
            ))
        })
        .copied()
        .unwrap_or_default();

    Some(ConsolidatedFinding {
        id: String::new(),
        block_id: rep.finding.block_id().to_string(),
        severity: rep.finding.severity(),
        original: rep.finding.original().to_string(),
        suggested: rep.finding.suggested().to_string(),
        justification: rep.finding.justification().to_string(),
        consensus: sources.len(),
        sources: sources.into_iter().collect(),
        confidence: group
            .members
            .iter()
            .filter_map(|m| m.finding.confidence())
            .min(),
        debate_notes: (!notes.is_empty()).then(|| notes.join(" | ")),
        agrees_count: (tally.agrees > 0).then_some(tally.agrees),
        disagrees_count: (tally.disagrees > 0).then_some(tally.disagrees),
    })
}

/// Stable id from the finding's rank and content
fn fingerprint(ordinal: usize, finding: &ConsolidatedFinding) -> String {
    let sources: Vec<&str> = finding.sources.iter().map(|p| p.as_str()).collect();
    let input = format!(
        "{}|{}|{}|{}|{}",
        ordinal,
        finding.block_id,
        finding.severity,
        sources.join(","),
        finding.original,
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)[..12].to_string()
}

/// Reads a job's persisted round outputs and consolidates them
pub struct Consolidator<'a> {
    artifacts: &'a dyn ArtifactStore,
    settings: &'a ConsolidationConfig,
}

impl<'a> Consolidator<'a> {
    pub fn new(artifacts: &'a dyn ArtifactStore, settings: &'a ConsolidationConfig) -> Self {
        Self {
            artifacts,
            settings,
        }
    }

    /// Verdict findings enriched with debate stances when the job debated and
    /// enough verdicts exist, analysis findings otherwise.
    pub fn consolidate(&self, job: &Job) -> Result<ConsolidationReport, ConsolidateError> {
        let max_distance = self.settings.max_severity_distance;

        let (merged, source_round) = match self.verdict_inputs(job)? {
            Some(verdicts) => {
                let debate = load_round_outputs::<DebateRoundOutput>(
                    self.artifacts,
                    &job.job_id,
                    Round::Debate,
                )?;
                let stances = tally_stances(&debate);
                let merged = merge(
                    verdicts.iter().map(|(p, o)| {
                        (
                            *p,
                            o.findings.as_slice(),
                            o.general_suggestions.as_deref().unwrap_or(&[]),
                        )
                    }),
                    Some(&stances),
                    max_distance,
                );
                (merged, Round::Verdict)
            }
            None => {
                let analysis = load_round_outputs::<PersonaOutput>(
                    self.artifacts,
                    &job.job_id,
                    Round::Analysis,
                )?;
                let merged = merge(
                    analysis.iter().map(|(p, o)| {
                        (
                            *p,
                            o.findings.as_slice(),
                            o.general_suggestions.as_deref().unwrap_or(&[]),
                        )
                    }),
                    None,
                    max_distance,
                );
                (merged, Round::Analysis)
            }
        };

        if merged.providers_used.is_empty() {
            return Err(ConsolidateError::NoValidOutputs {
                round: source_round,
            });
        }

        let actions: Vec<PatchAction> = merged
            .findings
            .iter()
            .filter_map(PatchAction::from_finding)
            .collect();

        info!(
            "Job {}: consolidated {} findings from {} providers ({} round, {} patch actions)",
            job.job_id,
            merged.findings.len(),
            merged.providers_used.len(),
            source_round,
            actions.len()
        );

        Ok(ConsolidationReport {
            patch_plan: PatchPlan {
                tenant_id: job.tenant_id.clone(),
                job_id: job.job_id.clone(),
                actions,
                generated_at: Utc::now(),
            },
            findings: merged.findings,
            general_suggestions: merged.general_suggestions,
            providers_used: merged.providers_used,
            debate_mode: job.debate_mode,
            source_round,
        })
    }

    fn verdict_inputs(
        &self,
        job: &Job,
    ) -> Result<Option<Vec<(ProviderName, VerdictOutput)>>, ConsolidateError> {
        if job.debate_mode != DebateMode::Debate {
            return Ok(None);
        }

        let verdicts =
            load_round_outputs::<VerdictOutput>(self.artifacts, &job.job_id, Round::Verdict)?;

        if verdicts.len() >= self.settings.min_verdict_outputs {
            Ok(Some(verdicts))
        } else {
            warn!(
                "Job {}: {} verdict outputs (need {}), falling back to analysis findings",
                job.job_id,
                verdicts.len(),
                self.settings.min_verdict_outputs
            );
            Ok(None)
        }
    }
}
