use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::Config;

/// Known providers. Declaration order is lexicographic so `Ord` matches
/// name order, which every round and the grouping pass rely on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Claude,
    Gemini,
    Gpt,
    Llama,
    Mistral,
}

impl ProviderName {
    pub const ALL: [ProviderName; 5] = [
        ProviderName::Claude,
        ProviderName::Gemini,
        ProviderName::Gpt,
        ProviderName::Llama,
        ProviderName::Mistral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Claude => "claude",
            ProviderName::Gemini => "gemini",
            ProviderName::Gpt => "gpt",
            ProviderName::Llama => "llama",
            ProviderName::Mistral => "mistral",
        }
    }

    /// Environment variable consulted when the config does not override it
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderName::Claude => "ANTHROPIC_API_KEY",
            ProviderName::Gemini => "GOOGLE_AI_API_KEY",
            ProviderName::Gpt => "OPENAI_API_KEY",
            ProviderName::Llama => "LLAMA_API_KEY",
            ProviderName::Mistral => "MISTRAL_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderName::Claude => "https://api.anthropic.com",
            ProviderName::Gemini => "https://generativelanguage.googleapis.com",
            ProviderName::Gpt => "https://api.openai.com/v1",
            ProviderName::Llama => "https://api.together.xyz/v1",
            ProviderName::Mistral => "https://api.mistral.ai/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderName::Claude => "claude-haiku-4-5-20251001",
            ProviderName::Gemini => "gemini-2.0-flash",
            ProviderName::Gpt => "gpt-4o-mini",
            ProviderName::Llama => "meta-llama/Llama-3.1-8B-Instruct-Turbo",
            ProviderName::Mistral => "mistral-small-latest",
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown provider '{}'", s))
    }
}

/// Resolved connection details for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Immutable snapshot of credentials, endpoints and models.
///
/// Built once from a `Config` plus an environment lookup and passed
/// explicitly to the registry. Reloading means building a new directory;
/// jobs already holding a snapshot keep it.
#[derive(Debug, Clone, Default)]
pub struct ProviderDirectory {
    entries: BTreeMap<ProviderName, ProviderEntry>,
}

impl ProviderDirectory {
    pub fn resolve(config: &Config, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut entries = BTreeMap::new();

        for name in ProviderName::ALL {
            let provider = config.providers.get(name);
            let env_key = provider.api_key_env.as_deref().unwrap_or(name.env_key());

            // Environment wins over the inline key; blank values count as unset
            let api_key = env(env_key)
                .filter(|k| !k.trim().is_empty())
                .or_else(|| provider.api_key.clone().filter(|k| !k.trim().is_empty()));

            let base_url = provider
                .base_url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| name.default_base_url().to_string());

            let model = provider
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| name.default_model().to_string());

            entries.insert(
                name,
                ProviderEntry {
                    api_key,
                    base_url,
                    model,
                },
            );
        }

        Self { entries }
    }

    pub fn from_env(config: &Config) -> Self {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Providers holding a non-empty credential, in name order
    pub fn list_usable_providers(&self) -> Vec<ProviderName> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.api_key.is_some())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn base_url(&self, name: ProviderName) -> &str {
        self.entries
            .get(&name)
            .map(|e| e.base_url.as_str())
            .unwrap_or(name.default_base_url())
    }

    pub fn api_key(&self, name: ProviderName) -> Option<&str> {
        self.entries.get(&name).and_then(|e| e.api_key.as_deref())
    }

    pub fn selected_model(&self, name: ProviderName) -> &str {
        self.entries
            .get(&name)
            .map(|e| e.model.as_str())
            .unwrap_or(name.default_model())
    }
}
