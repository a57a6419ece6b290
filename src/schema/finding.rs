use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::validate::{Issues, Validate};
use crate::config::ProviderName;

/// Ordered severity scale; `Ord` follows rank so `min()` is the most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    pub fn distance(&self, other: Severity) -> u8 {
        self.rank().abs_diff(other.rank())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict agreement strength; `Ord` puts the strongest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Strong,
    Moderate,
    Weak,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Confidence::Strong => "strong",
            Confidence::Moderate => "moderate",
            Confidence::Weak => "weak",
        };
        f.write_str(s)
    }
}

/// A claim about one block, as produced by the analysis round
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonaFinding {
    pub block_id: String,
    pub severity: Severity,
    pub original: String,
    pub suggested: String,
    pub justification: String,
}

impl PersonaFinding {
    pub(crate) fn check(&self, path: &str, issues: &mut Issues) {
        issues.require_non_empty(format!("{}.blockId", path), &self.block_id);
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerdictFinding {
    pub block_id: String,
    pub severity: Severity,
    pub original: String,
    pub suggested: String,
    pub justification: String,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate_notes: Option<String>,
}

impl VerdictFinding {
    pub(crate) fn check(&self, path: &str, issues: &mut Issues) {
        issues.require_non_empty(format!("{}.blockId", path), &self.block_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Agree,
    Disagree,
    Adjust,
}

/// A debate reaction to another provider's analysis finding
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebateStance {
    pub original_provider: String,
    pub block_id: String,
    pub stance: Stance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_severity: Option<Severity>,
    pub argument: String,
}

/// One merged record per group of equivalent findings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedFinding {
    pub id: String,
    pub block_id: String,
    pub severity: Severity,
    pub original: String,
    pub suggested: String,
    pub justification: String,
    pub consensus: usize,
    pub sources: Vec<ProviderName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agrees_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disagrees_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchAction {
    pub block_id: String,
    pub original: String,
    pub suggested: String,
    pub justification: String,
    pub severity: Severity,
    pub consensus: usize,
    pub sources: Vec<ProviderName>,
}

impl PatchAction {
    /// Edit instruction for a finding, when it actually changes the text
    pub fn from_finding(finding: &ConsolidatedFinding) -> Option<Self> {
        if finding.suggested.trim().is_empty() || finding.suggested == finding.original {
            return None;
        }

        Some(Self {
            block_id: finding.block_id.clone(),
            original: finding.original.clone(),
            suggested: finding.suggested.clone(),
            justification: finding.justification.clone(),
            severity: finding.severity,
            consensus: finding.consensus,
            sources: finding.sources.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatchPlan {
    pub tenant_id: String,
    pub job_id: String,
    pub actions: Vec<PatchAction>,
    pub generated_at: DateTime<Utc>,
}

impl Validate for ConsolidatedFinding {
    fn collect_issues(&self, issues: &mut Issues) {
        issues.require_non_empty("blockId", &self.block_id);
        if self.consensus == 0 {
            issues.push("consensus", "must be at least 1");
        }
        if self.consensus > self.sources.len() {
            issues.push("consensus", "exceeds the number of sources");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(original: &str, suggested: &str) -> ConsolidatedFinding {
        ConsolidatedFinding {
            id: "abc".into(),
            block_id: "B1".into(),
            severity: Severity::High,
            original: original.into(),
            suggested: suggested.into(),
            justification: "j".into(),
            consensus: 1,
            sources: vec![ProviderName::Gpt],
            confidence: None,
            debate_notes: None,
            agrees_count: None,
            disagrees_count: None,
        }
    }

    #[test]
    fn test_severity_order_and_distance() {
        assert!(Severity::Critical < Severity::Low);
        assert_eq!(
            [Severity::Medium, Severity::Critical, Severity::High]
                .into_iter()
                .min(),
            Some(Severity::Critical)
        );
        assert_eq!(Severity::High.distance(Severity::Critical), 1);
        assert_eq!(Severity::Low.distance(Severity::Critical), 3);
    }

    #[test]
    fn test_confidence_order() {
        let best = [Confidence::Weak, Confidence::Strong, Confidence::Moderate]
            .into_iter()
            .min();
        assert_eq!(best, Some(Confidence::Strong));
    }

    #[test]
    fn test_patch_action_requires_changed_text() {
        assert!(PatchAction::from_finding(&finding("a", "a")).is_none());
        assert!(PatchAction::from_finding(&finding("a", "")).is_none());
        let action = PatchAction::from_finding(&finding("a", "b")).unwrap();
        assert_eq!(action.suggested, "b");
        assert_eq!(action.sources, vec![ProviderName::Gpt]);
    }

    #[test]
    fn test_consolidated_skips_absent_optionals() {
        let json = serde_json::to_value(finding("a", "b")).unwrap();
        assert_eq!(json["blockId"], "B1");
        assert_eq!(json["severity"], "high");
        assert!(json.get("confidence").is_none());
        assert!(json.get("agreesCount").is_none());
    }
}
