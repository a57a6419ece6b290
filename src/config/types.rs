use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;
use super::ProviderName;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root directory for job records and per-job artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    #[serde(default = "default_jurisdiction")]
    pub default_jurisdiction: String,

    /// YAML playbook injected into analysis prompts (embedded default when unset)
    #[serde(default)]
    pub playbook_file: Option<PathBuf>,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub rounds: RoundsConfig,

    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct LlmConfig {
    /// Per-call timeout, covering the whole request/response exchange
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// Additional attempts after a malformed or schema-invalid reply
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum provider calls in flight per round
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_sec: default_timeout_sec(),
            max_retries: default_max_retries(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RoundsConfig {
    #[serde(default = "default_min_analysis_responses")]
    pub min_analysis_responses: usize,

    /// Threshold used instead when the job names an explicit provider subset
    #[serde(default = "default_min_analysis_responses_selected")]
    pub min_analysis_responses_selected: usize,

    /// Below this, debate and verdict rounds only warn
    #[serde(default = "default_min_enrichment_responses")]
    pub min_enrichment_responses: usize,
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            min_analysis_responses: default_min_analysis_responses(),
            min_analysis_responses_selected: default_min_analysis_responses_selected(),
            min_enrichment_responses: default_min_enrichment_responses(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ConsolidationConfig {
    /// Findings on the same block merge when their severity ranks differ by at most this
    #[serde(default = "default_max_severity_distance")]
    pub max_severity_distance: u8,

    /// Verdict outputs required before the verdict round replaces the analysis round
    #[serde(default = "default_min_verdict_outputs")]
    pub min_verdict_outputs: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            max_severity_distance: default_max_severity_distance(),
            min_verdict_outputs: default_min_verdict_outputs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct JobsConfig {
    #[serde(default = "default_expiration_hours")]
    pub expiration_hours: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            expiration_hours: default_expiration_hours(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub claude: ProviderConfig,

    #[serde(default)]
    pub gemini: ProviderConfig,

    #[serde(default)]
    pub gpt: ProviderConfig,

    #[serde(default)]
    pub llama: ProviderConfig,

    #[serde(default)]
    pub mistral: ProviderConfig,
}

impl ProvidersConfig {
    pub fn get(&self, name: ProviderName) -> &ProviderConfig {
        match name {
            ProviderName::Claude => &self.claude,
            ProviderName::Gemini => &self.gemini,
            ProviderName::Gpt => &self.gpt,
            ProviderName::Llama => &self.llama,
            ProviderName::Mistral => &self.mistral,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProviderConfig {
    /// Inline credential; the environment variable takes precedence when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the credential (provider default when unset)
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,
}
