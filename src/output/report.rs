use std::fmt::Write;

use super::{FinalReport, Renderer};
use crate::error::OutputError;
use crate::schema::{Confidence, DebateMode, Severity};
use crate::store::REPORT_MD_BLOB;

/// Human-readable report: summary table, then one section per finding that
/// proposes a change, then general suggestions.
#[derive(Debug, Default)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn blob_name(&self) -> &'static str {
        REPORT_MD_BLOB
    }

    fn render(&self, report: &FinalReport) -> Result<String, OutputError> {
        write_markdown(report).map_err(|e| OutputError::Render(e.to_string()))
    }
}

fn write_markdown(report: &FinalReport) -> Result<String, std::fmt::Error> {
    let meta = &report.metadata;
    let counts = &report.summary.by_severity;
    let mut content = String::new();

    writeln!(
        content,
        "# Contract Review: {}\n",
        meta.contract_type.to_string().to_uppercase()
    )?;
    writeln!(
        content,
        "Side: {} | Jurisdiction: {} | Date: {}\n",
        meta.side,
        meta.jurisdiction,
        meta.analyzed_at.format("%Y-%m-%d")
    )?;
    writeln!(
        content,
        "> **Disclaimer:** this analysis does not replace professional legal advice. \
         Results are suggestions and must be validated by a qualified lawyer.\n"
    )?;

    content.push_str("| Metric | Value |\n");
    content.push_str("|--------|-------|\n");
    writeln!(content, "| Findings | {} |", report.summary.total_findings)?;
    writeln!(content, "| Critical | {} |", counts.critical)?;
    writeln!(content, "| High | {} |", counts.high)?;
    writeln!(content, "| Medium | {} |", counts.medium)?;
    writeln!(content, "| Low | {} |", counts.low)?;
    let providers: Vec<&str> = meta.providers_used.iter().map(|p| p.as_str()).collect();
    writeln!(content, "| Providers | {} |", providers.join(", "))?;
    if meta.debate_mode == DebateMode::Debate {
        writeln!(content, "| Mode | debate (findings from {} round) |", meta.source_round)?;
    }
    content.push_str("\n---\n\n");

    let total_providers = meta.providers_used.len();
    let changes: Vec<_> = report
        .findings
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.suggested.trim().is_empty() && f.suggested != f.original)
        .collect();

    if changes.is_empty() {
        content.push_str("*No suggested changes*\n\n");
    } else {
        content.push_str("## Findings and Suggestions\n\n");

        for (i, finding) in changes {
            write!(
                content,
                "### #{} [{}]",
                i + 1,
                severity_label(finding.severity)
            )?;
            if let Some(confidence) = finding.confidence {
                write!(content, " [{}]", confidence_label(confidence))?;
            }
            writeln!(
                content,
                " Consensus: {}/{} providers\n",
                finding.consensus, total_providers
            )?;

            writeln!(content, "- **Block:** `{}`", finding.block_id)?;
            writeln!(content, "- **Before:** ~~{}~~", finding.original)?;
            writeln!(content, "- **After:** {}", finding.suggested)?;
            writeln!(content, "- **Justification:** *{}*", finding.justification)?;
            if let Some(notes) = &finding.debate_notes {
                writeln!(content, "- **Debate notes:** {}", notes)?;
            }
            if finding.agrees_count.is_some() || finding.disagrees_count.is_some() {
                writeln!(
                    content,
                    "- **Debate:** {} agree, {} disagree",
                    finding.agrees_count.unwrap_or(0),
                    finding.disagrees_count.unwrap_or(0)
                )?;
            }
            content.push_str("\n---\n\n");
        }
    }

    if !report.general_suggestions.is_empty() {
        content.push_str("## General Suggestions\n\n");
        for suggestion in &report.general_suggestions {
            writeln!(content, "- {}", suggestion)?;
        }
    }

    Ok(content)
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL",
        Severity::High => "HIGH",
        Severity::Medium => "MEDIUM",
        Severity::Low => "LOW",
    }
}

fn confidence_label(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::Strong => "strong consensus",
        Confidence::Moderate => "moderate consensus",
        Confidence::Weak => "weak consensus",
    }
}
