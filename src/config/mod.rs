mod defaults;
mod providers;
mod types;

pub use providers::*;
pub use types::*;

use crate::error::ConfigError;
use defaults::*;
use std::path::Path;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            default_tenant: default_tenant(),
            default_jurisdiction: default_jurisdiction(),
            playbook_file: None,
            llm: LlmConfig::default(),
            rounds: RoundsConfig::default(),
            consolidation: ConsolidationConfig::default(),
            jobs: JobsConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.timeout_sec == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.timeout_sec",
                message: "must be greater than zero".into(),
            });
        }

        if self.llm.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.concurrency",
                message: "must be greater than zero".into(),
            });
        }

        if self.rounds.min_analysis_responses == 0 || self.rounds.min_analysis_responses_selected == 0
        {
            return Err(ConfigError::InvalidValue {
                key: "rounds",
                message: "analysis thresholds must be at least 1".into(),
            });
        }

        if self.consolidation.max_severity_distance > 3 {
            return Err(ConfigError::InvalidValue {
                key: "consolidation.max_severity_distance",
                message: "severity scale has four ranks, distance must be 0..=3".into(),
            });
        }

        if self.default_tenant.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_tenant",
                message: "must not be empty".into(),
            });
        }

        Ok(())
    }
}
