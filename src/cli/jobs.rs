use chrono::Utc;
use std::path::Path;

use crate::cli::{
    build_pipeline, load_config, CleanupArgs, ConsolidateArgs, FeedbackArgs, ListArgs, StatusArgs,
};
use crate::schema::{Feedback, Job};

pub fn status(config_path: &Path, args: StatusArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(load_config(config_path)?)?;
    let job = pipeline.get_job(&args.job_id)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!("Job:          {}", job.job_id);
    println!("Tenant:       {}", job.tenant_id);
    println!("Status:       {}", job.status);
    println!(
        "Contract:     {} ({}, {})",
        job.contract_type, job.side, job.jurisdiction
    );
    println!("Mode:         {}", job.debate_mode);
    if let Some(providers) = &job.selected_providers {
        let names: Vec<&str> = providers.iter().map(|p| p.as_str()).collect();
        println!("Providers:    {}", names.join(", "));
    }
    if let Some(stage) = job.current_stage {
        match job.progress {
            Some(p) => println!("Stage:        {} ({}/{})", stage, p.completed, p.total),
            None => println!("Stage:        {}", stage),
        }
    }
    if let Some(code) = job.error_code {
        println!(
            "Error:        [{}] {}",
            code,
            job.error_message.as_deref().unwrap_or("")
        );
    }
    if let Some(feedback) = &job.feedback {
        println!("Feedback:     {:?}", feedback.rating);
    }
    println!("Created:      {}", job.created_at.to_rfc3339());
    println!("Updated:      {}", job.updated_at.to_rfc3339());

    Ok(())
}

pub fn list(config_path: &Path, args: ListArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(load_config(config_path)?)?;
    let jobs = pipeline.list_jobs()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }
    for job in &jobs {
        println!("{}", list_line(job));
    }
    Ok(())
}

fn list_line(job: &Job) -> String {
    format!(
        "{}  {:<10}  {:<8}  {:<10}  {}",
        job.job_id,
        job.status.to_string(),
        job.debate_mode.to_string(),
        job.contract_type.to_string(),
        job.created_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn consolidate(config_path: &Path, args: ConsolidateArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(load_config(config_path)?)?;
    let report = pipeline.reconsolidate(&args.job_id)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn feedback(config_path: &Path, args: FeedbackArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(load_config(config_path)?)?;
    let job = pipeline.submit_feedback(
        &args.job_id,
        Feedback {
            rating: args.rating,
            reason: args.reason,
            comment: args.comment,
            created_at: Utc::now(),
        },
    )?;
    println!("Feedback recorded for job {}", job.job_id);
    Ok(())
}

pub fn cleanup(config_path: &Path, args: CleanupArgs) -> anyhow::Result<()> {
    let pipeline = build_pipeline(load_config(config_path)?)?;
    let expired = pipeline.expire_stale(Utc::now(), args.purge)?;

    if expired.is_empty() {
        println!("No jobs to expire");
    } else {
        for job_id in &expired {
            println!("Expired {}", job_id);
        }
    }
    Ok(())
}
