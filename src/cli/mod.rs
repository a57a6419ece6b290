pub mod jobs;
pub mod providers;
pub mod run;
pub mod schema;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, ProviderDirectory, ProviderName};
use crate::pipeline::Pipeline;
use crate::prompt::Playbook;
use crate::provider::{HttpTransport, Registry, Transport};
use crate::schema::{ContractType, DebateMode, FeedbackReason, Rating, Side};
use crate::store::{ArtifactStore, FsStore, JobStore};

#[derive(Parser)]
#[command(name = "contract-consensus")]
#[command(
    author,
    version,
    about = "Multi-provider contract review with debate rounds and consensus consolidation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "contract-consensus.yaml")]
    pub config: PathBuf,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review a contract and write the consolidated report
    Run(RunArgs),

    /// Show a job record
    Status(StatusArgs),

    /// List jobs, newest first
    List(ListArgs),

    /// Re-run consolidation over a job's stored outputs
    Consolidate(ConsolidateArgs),

    /// Rate a completed job
    Feedback(FeedbackArgs),

    /// Expire old jobs and delete their files
    Cleanup(CleanupArgs),

    /// Show configured providers, optionally probing each one
    Providers(ProvidersArgs),

    /// Print JSON Schema for the config file or a stored record
    Schema(SchemaArgs),
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Contract document (plain text or markdown)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Contract type
    #[arg(long = "type", value_enum)]
    pub contract_type: ContractType,

    /// Party the review is written for
    #[arg(long, value_enum)]
    pub side: Side,

    /// Governing jurisdiction (default from config)
    #[arg(long)]
    pub jurisdiction: Option<String>,

    /// Tenant id (default from config)
    #[arg(long)]
    pub tenant: Option<String>,

    /// Run the debate and verdict rounds after analysis
    #[arg(long, value_enum, default_value_t = DebateMode::Single)]
    pub mode: DebateMode,

    /// Use only these providers (comma-separated, at least 2)
    #[arg(long, value_delimiter = ',', value_enum)]
    pub providers: Option<Vec<ProviderName>>,

    /// Override provider fan-out limit
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Exit 1 if the report has critical findings (CI mode)
    #[arg(long)]
    pub fail_on_critical: bool,
}

#[derive(Parser, Clone)]
pub struct StatusArgs {
    pub job_id: String,

    /// Print the raw job record as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct ListArgs {
    /// Print job records as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct ConsolidateArgs {
    pub job_id: String,
}

#[derive(Parser, Clone)]
pub struct FeedbackArgs {
    pub job_id: String,

    #[arg(long, value_enum)]
    pub rating: Rating,

    #[arg(long, value_enum)]
    pub reason: Option<FeedbackReason>,

    /// Free-form comment (at most 500 characters)
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Parser, Clone)]
pub struct CleanupArgs {
    /// Also delete the job records of expired jobs
    #[arg(long)]
    pub purge: bool,
}

#[derive(Parser, Clone)]
pub struct ProvidersArgs {
    /// Send a connectivity probe to every usable provider
    #[arg(long)]
    pub check: bool,
}

#[derive(Parser, Clone)]
pub struct SchemaArgs {
    #[arg(value_enum, default_value_t = SchemaTarget::Config)]
    pub target: SchemaTarget,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum SchemaTarget {
    Config,
    Job,
    Report,
}

/// Adapter registry over live HTTP, with credentials resolved from the
/// config and the environment
pub fn build_registry(config: &Config) -> anyhow::Result<Registry> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
    let directory = ProviderDirectory::from_env(config);
    Ok(Registry::new(directory, &config.llm, transport))
}

pub fn build_pipeline(config: Config) -> anyhow::Result<Pipeline> {
    let playbook = Playbook::load_or_embedded(config.playbook_file.as_deref())?;
    let registry = build_registry(&config)?;

    info!("Storing jobs under {:?}", config.data_dir);
    let store = Arc::new(FsStore::new(&config.data_dir));

    Ok(Pipeline::new(
        config,
        registry,
        store.clone() as Arc<dyn JobStore>,
        store as Arc<dyn ArtifactStore>,
        playbook,
    ))
}

pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    info!("Loading config from {:?}", path);
    Ok(Config::load_or_default(path)?)
}
