use std::path::Path;

use crate::error::ConfigError;

const EMBEDDED_PLAYBOOK: &str = include_str!("../../prompts/playbook.yaml");

/// Contract review rules injected into analysis prompts, normalised to YAML
#[derive(Debug, Clone, PartialEq)]
pub struct Playbook(String);

impl Playbook {
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::parse(EMBEDDED_PLAYBOOK, Path::new("<embedded>"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Playbook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&raw, path)
    }

    /// `path` when configured, the embedded default otherwise
    pub fn load_or_embedded(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::embedded(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::Playbook {
            path: path.to_path_buf(),
            message,
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        if !value.is_mapping() {
            return Err(invalid("playbook must be a YAML mapping".into()));
        }

        // Re-serialising drops comments and normalises layout
        let normalised = serde_yaml::to_string(&value).map_err(|e| invalid(e.to_string()))?;
        Ok(Self(normalised))
    }
}
