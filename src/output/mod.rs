mod report;
mod summary;

pub use report::MarkdownRenderer;
pub use summary::{FinalReport, ReportMetadata, ReportSummary, SeverityCounts};

use chrono::Utc;
use tracing::info;

use crate::consolidate::ConsolidationReport;
use crate::error::OutputError;
use crate::schema::Job;
use crate::store::{write_json, ArtifactStore, REPORT_JSON_BLOB};

/// Turns a final report into a user-facing document stored under `blob_name`
pub trait Renderer: Send + Sync {
    fn blob_name(&self) -> &'static str;

    fn render(&self, report: &FinalReport) -> Result<String, OutputError>;
}

/// Build the final report, store it as JSON and store the rendered document
pub fn render_outputs(
    artifacts: &dyn ArtifactStore,
    job: &Job,
    consolidated: &ConsolidationReport,
    renderer: &dyn Renderer,
) -> Result<FinalReport, OutputError> {
    let report = FinalReport::build(job, consolidated, Utc::now());

    write_json(artifacts, &job.job_id, REPORT_JSON_BLOB, &report)?;

    let document = renderer.render(&report)?;
    artifacts.write_blob(&job.job_id, renderer.blob_name(), document.as_bytes())?;

    info!(
        "Job {}: rendered {} findings to {} and {}",
        job.job_id,
        report.summary.total_findings,
        REPORT_JSON_BLOB,
        renderer.blob_name()
    );

    Ok(report)
}
