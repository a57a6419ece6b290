use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::finding::{DebateStance, PersonaFinding, VerdictFinding};
use super::validate::{Issues, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    Analysis,
    Debate,
    Verdict,
}

impl Round {
    pub fn as_str(&self) -> &'static str {
        match self {
            Round::Analysis => "analysis",
            Round::Debate => "debate",
            Round::Verdict => "verdict",
        }
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis round output of one provider
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersonaOutput {
    pub provider: String,
    pub findings: Vec<PersonaFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_suggestions: Option<Vec<String>>,
    pub analyzed_at: String,
}

impl Validate for PersonaOutput {
    fn collect_issues(&self, issues: &mut Issues) {
        for (i, finding) in self.findings.iter().enumerate() {
            finding.check(&format!("findings[{}]", i), issues);
        }
    }
}

/// Debate round output: stances on other providers' findings plus any new ones
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebateRoundOutput {
    pub provider: String,
    pub responses: Vec<DebateStance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_findings: Option<Vec<PersonaFinding>>,
    pub analyzed_at: String,
}

impl Validate for DebateRoundOutput {
    fn collect_issues(&self, issues: &mut Issues) {
        for (i, stance) in self.responses.iter().enumerate() {
            issues.require_non_empty(format!("responses[{}].blockId", i), &stance.block_id);
        }
        for (i, finding) in self.new_findings.iter().flatten().enumerate() {
            finding.check(&format!("newFindings[{}]", i), issues);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerdictOutput {
    pub provider: String,
    pub findings: Vec<VerdictFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_suggestions: Option<Vec<String>>,
    pub analyzed_at: String,
}

impl Validate for VerdictOutput {
    fn collect_issues(&self, issues: &mut Issues) {
        for (i, finding) in self.findings.iter().enumerate() {
            finding.check(&format!("findings[{}]", i), issues);
        }
    }
}

/// Minimal reply used by the connectivity check
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ProbeReply {
    pub status: String,
}

impl Validate for ProbeReply {
    fn collect_issues(&self, issues: &mut Issues) {
        if self.status != "ok" {
            issues.push("status", "must be \"ok\"");
        }
    }
}
