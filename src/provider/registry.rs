use std::sync::Arc;
use std::time::Duration;

use super::{create_protocol, Adapter, Transport};
use crate::config::{LlmConfig, ProviderDirectory, ProviderName};

/// Builds adapters for the providers that currently hold credentials.
pub struct Registry {
    directory: ProviderDirectory,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    max_retries: u32,
}

impl Registry {
    pub fn new(directory: ProviderDirectory, llm: &LlmConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            directory,
            transport,
            timeout: Duration::from_secs(llm.timeout_sec),
            max_retries: llm.max_retries,
        }
    }

    pub fn directory(&self) -> &ProviderDirectory {
        &self.directory
    }

    /// Usable adapters in name order, intersected with `subset` when given.
    /// An empty subset selects nothing.
    pub fn list_usable(&self, subset: Option<&[ProviderName]>) -> Vec<Arc<Adapter>> {
        self.directory
            .list_usable_providers()
            .into_iter()
            .filter(|name| subset.map(|s| s.contains(name)).unwrap_or(true))
            .filter_map(|name| self.resolve_one(name))
            .collect()
    }

    pub fn resolve_one(&self, name: ProviderName) -> Option<Arc<Adapter>> {
        let protocol = create_protocol(name, &self.directory)?;
        Some(Arc::new(Adapter::new(
            name,
            self.directory.selected_model(name).to_string(),
            protocol,
            self.transport.clone(),
            self.timeout,
            self.max_retries,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::{test_directory, ScriptedTransport};
    use crate::provider::TransportError;

    fn registry(names: &[ProviderName]) -> Registry {
        Registry::new(
            test_directory(names),
            &LlmConfig::default(),
            ScriptedTransport::repeat(Err(TransportError::Timeout)),
        )
    }

    fn names(adapters: &[Arc<Adapter>]) -> Vec<ProviderName> {
        adapters.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_list_usable_sorted() {
        let registry = registry(&[ProviderName::Mistral, ProviderName::Claude, ProviderName::Gpt]);
        assert_eq!(
            names(&registry.list_usable(None)),
            vec![ProviderName::Claude, ProviderName::Gpt, ProviderName::Mistral]
        );
    }

    #[test]
    fn test_subset_intersects() {
        let registry = registry(&[ProviderName::Claude, ProviderName::Gpt]);
        let subset = [ProviderName::Gpt, ProviderName::Gemini];
        assert_eq!(
            names(&registry.list_usable(Some(&subset))),
            vec![ProviderName::Gpt]
        );
        assert!(registry.list_usable(Some(&[])).is_empty());
    }

    #[test]
    fn test_resolve_one() {
        let registry = registry(&[ProviderName::Gemini]);
        let adapter = registry.resolve_one(ProviderName::Gemini).unwrap();
        assert_eq!(adapter.model(), ProviderName::Gemini.default_model());
        assert!(registry.resolve_one(ProviderName::Claude).is_none());
    }
}
