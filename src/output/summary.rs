use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::ProviderName;
use crate::consolidate::ConsolidationReport;
use crate::schema::{
    ConsolidatedFinding, ContractType, DebateMode, Job, PatchAction, Round, Severity, Side,
};

/// Machine-readable final report, persisted as `report.json`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub tenant_id: String,
    pub job_id: String,
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub findings: Vec<ConsolidatedFinding>,
    pub actions: Vec<PatchAction>,
    pub general_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub contract_type: ContractType,
    pub side: Side,
    pub jurisdiction: String,
    pub analyzed_at: DateTime<Utc>,
    pub providers_used: Vec<ProviderName>,
    pub debate_mode: DebateMode,
    pub source_round: Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_findings: usize,
    pub by_severity: SeverityCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn tally(findings: &[ConsolidatedFinding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }
}

impl FinalReport {
    pub fn build(job: &Job, consolidated: &ConsolidationReport, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            tenant_id: job.tenant_id.clone(),
            job_id: job.job_id.clone(),
            metadata: ReportMetadata {
                contract_type: job.contract_type,
                side: job.side,
                jurisdiction: job.jurisdiction.clone(),
                analyzed_at,
                providers_used: consolidated.providers_used.clone(),
                debate_mode: consolidated.debate_mode,
                source_round: consolidated.source_round,
            },
            summary: ReportSummary {
                total_findings: consolidated.findings.len(),
                by_severity: SeverityCounts::tally(&consolidated.findings),
            },
            findings: consolidated.findings.clone(),
            actions: consolidated.patch_plan.actions.clone(),
            general_suggestions: consolidated.general_suggestions.clone(),
        }
    }
}
