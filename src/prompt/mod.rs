//! Prompt builders for the three rounds.
//!
//! Templates live in `prompts/` and are compiled in. Each prompt carries the
//! JSON Schema of the reply it expects, generated from the wire types.

mod playbook;

pub use playbook::Playbook;

use chrono::{SecondsFormat, Utc};
use schemars::{schema_for, JsonSchema};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::config::ProviderName;
use crate::schema::{
    ContractType, DebateRoundOutput, DocAst, PersonaOutput, Side, VerdictOutput,
};

const ANALYSIS_TEMPLATE: &str = include_str!("../../prompts/analysis.md");
const DEBATE_TEMPLATE: &str = include_str!("../../prompts/debate.md");
const VERDICT_TEMPLATE: &str = include_str!("../../prompts/verdict.md");

const BLOCK_CLIP: usize = 300;
const FINDING_TEXT_CLIP: usize = 200;
const ARGUMENT_CLIP: usize = 200;
const JUSTIFICATION_CLIP: usize = 150;

pub const PROBE_PROMPT: &str = r#"Connectivity check. Reply with exactly this JSON object and nothing else: {"status": "ok"}"#;

/// Job attributes every round prompt states up front
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub contract_type: ContractType,
    pub side: Side,
    pub jurisdiction: &'a str,
}

pub fn analysis_prompt(
    provider: ProviderName,
    doc: &DocAst,
    ctx: &PromptContext<'_>,
    playbook: &Playbook,
) -> Result<String, serde_json::Error> {
    let document = json!({
        "blocks": doc.blocks.iter().map(|b| json!({
            "blockId": b.block_id,
            "type": b.block_type,
            "content": b.content,
            "index": b.index,
        })).collect::<Vec<_>>()
    });

    let mut vars = base_vars(provider, ctx);
    vars.insert("PLAYBOOK", playbook.as_str().to_string());
    vars.insert("DOCUMENT", document.to_string());
    vars.insert("SCHEMA", schema_text::<PersonaOutput>()?);

    Ok(render(ANALYSIS_TEMPLATE, &vars))
}

pub fn debate_prompt(
    provider: ProviderName,
    doc: &DocAst,
    ctx: &PromptContext<'_>,
    round1: &[(ProviderName, PersonaOutput)],
) -> Result<String, serde_json::Error> {
    let summary: Vec<Value> = round1
        .iter()
        .map(|(name, output)| {
            json!({
                "provider": name,
                "findings": output.findings.iter().map(|f| json!({
                    "blockId": f.block_id,
                    "severity": f.severity,
                    "original": clip(&f.original, FINDING_TEXT_CLIP),
                    "suggested": clip(&f.suggested, FINDING_TEXT_CLIP),
                    "justification": f.justification,
                })).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut vars = base_vars(provider, ctx);
    vars.insert("DOCUMENT", abridged_document(doc).to_string());
    vars.insert("ROUND1", serde_json::to_string_pretty(&summary)?);
    vars.insert("SCHEMA", schema_text::<DebateRoundOutput>()?);

    Ok(render(DEBATE_TEMPLATE, &vars))
}

pub fn verdict_prompt(
    provider: ProviderName,
    doc: &DocAst,
    ctx: &PromptContext<'_>,
    round1: &[(ProviderName, PersonaOutput)],
    debate: &[(ProviderName, DebateRoundOutput)],
) -> Result<String, serde_json::Error> {
    let round1_summary: Vec<Value> = round1
        .iter()
        .map(|(name, output)| {
            json!({
                "provider": name,
                "findingsCount": output.findings.len(),
                "findings": output.findings.iter().map(|f| json!({
                    "blockId": f.block_id,
                    "severity": f.severity,
                    "justification": clip(&f.justification, JUSTIFICATION_CLIP),
                })).collect::<Vec<_>>()
            })
        })
        .collect();

    let debate_summary: Vec<Value> = debate
        .iter()
        .map(|(name, output)| {
            json!({
                "provider": name,
                "responses": output.responses.iter().map(|r| json!({
                    "originalProvider": r.original_provider,
                    "blockId": r.block_id,
                    "stance": r.stance,
                    "adjustedSeverity": r.adjusted_severity,
                    "argument": clip(&r.argument, ARGUMENT_CLIP),
                })).collect::<Vec<_>>(),
                "newFindings": output.new_findings.iter().flatten().map(|f| json!({
                    "blockId": f.block_id,
                    "severity": f.severity,
                    "original": clip(&f.original, FINDING_TEXT_CLIP),
                    "suggested": clip(&f.suggested, FINDING_TEXT_CLIP),
                    "justification": clip(&f.justification, JUSTIFICATION_CLIP),
                })).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut vars = base_vars(provider, ctx);
    vars.insert("DOCUMENT", abridged_document(doc).to_string());
    vars.insert("ROUND1", serde_json::to_string_pretty(&round1_summary)?);
    vars.insert("DEBATE", serde_json::to_string_pretty(&debate_summary)?);
    vars.insert("SCHEMA", schema_text::<VerdictOutput>()?);

    Ok(render(VERDICT_TEMPLATE, &vars))
}

/// First `max` characters of `s`
pub fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn base_vars(provider: ProviderName, ctx: &PromptContext<'_>) -> HashMap<&'static str, String> {
    HashMap::from([
        ("PROVIDER", provider.to_string()),
        ("CONTRACT_TYPE", ctx.contract_type.to_string()),
        ("SIDE", ctx.side.to_string()),
        ("JURISDICTION", ctx.jurisdiction.to_string()),
        (
            "ANALYZED_AT",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
    ])
}

fn abridged_document(doc: &DocAst) -> Value {
    json!({
        "blocks": doc.blocks.iter().map(|b| json!({
            "blockId": b.block_id,
            "type": b.block_type,
            "content": clip(&b.content, BLOCK_CLIP),
            "index": b.index,
        })).collect::<Vec<_>>()
    })
}

fn schema_text<T: JsonSchema>() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(T))
}

/// Single-pass `{{NAME}}` substitution, so inserted text is never rescanned.
/// Unknown placeholders are left as they are.
fn render(template: &str, vars: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let value = after
            .find("}}")
            .and_then(|end| vars.get(&after[..end]).map(|v| (v, end)));

        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
