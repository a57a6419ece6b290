use anyhow::Context;
use std::path::Path;
use tracing::{error, info};

use crate::cli::{build_pipeline, load_config, RunArgs};
use crate::pipeline::NewJob;
use crate::schema::JobStatus;

pub async fn execute(config_path: &Path, args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;

    if let Some(concurrency) = args.concurrency {
        config.llm.concurrency = concurrency;
    }
    config.validate()?;

    let document = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read contract {:?}", args.file))?;

    let pipeline = build_pipeline(config)?;
    let job = pipeline.create_job(
        NewJob {
            contract_type: args.contract_type,
            side: args.side,
            jurisdiction: args.jurisdiction,
            tenant_id: args.tenant,
            debate_mode: args.mode,
            selected_providers: args.providers,
        },
        &document,
    )?;
    println!("Job {} created", job.job_id);

    let job = pipeline.run(&job.job_id).await?;

    if job.status == JobStatus::Failed {
        let code = job
            .error_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "PIPELINE_ERROR".to_string());
        anyhow::bail!(
            "Job {} failed [{}]: {}",
            job.job_id,
            code,
            job.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    let Some(report) = pipeline.final_report(&job.job_id)? else {
        anyhow::bail!("Job {} completed without a report", job.job_id);
    };

    let counts = &report.summary.by_severity;
    println!(
        "Job {} {}: {} findings ({} critical, {} high, {} medium, {} low) from {} providers",
        job.job_id,
        job.status,
        report.summary.total_findings,
        counts.critical,
        counts.high,
        counts.medium,
        counts.low,
        report.metadata.providers_used.len()
    );
    info!(
        "Job {}: findings taken from the {} round",
        job.job_id, report.metadata.source_round
    );

    if args.fail_on_critical && counts.critical > 0 {
        error!("Exiting with error: {} critical findings", counts.critical);
        std::process::exit(1);
    }

    Ok(())
}
