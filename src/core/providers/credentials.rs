//! Credential lookup for speech vendors.
//!
//! Credential presence is queryable without side effects; the registry and the
//! config validator both use it, and only the registry ever consumes the key.

use std::collections::HashMap;
use std::env;

use crate::config::settings::ProviderId;

/// Abstracted secret lookup for provider API keys.
pub trait CredentialStore: Send + Sync {
    /// Returns the API key for a provider, if configured.
    fn api_key(&self, provider: ProviderId) -> Option<String>;

    /// Pure presence check; performs no I/O beyond the lookup itself.
    fn credentials_present(&self, provider: ProviderId) -> bool {
        self.api_key(provider).is_some()
    }
}

/// Environment-backed credential store used in production.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentials;

impl EnvCredentials {
    fn var_name(provider: ProviderId) -> &'static str {
        match provider {
            ProviderId::Openai => "OPENAI_API_KEY",
            ProviderId::Google => "GOOGLE_SPEECH_API_KEY",
            ProviderId::Yandex => "YANDEX_API_KEY",
        }
    }
}

impl CredentialStore for EnvCredentials {
    fn api_key(&self, provider: ProviderId) -> Option<String> {
        env::var(Self::var_name(provider))
            .ok()
            .filter(|v| !v.is_empty())
    }
}

/// Fixed credential set, used by tests and embedding callers.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    keys: HashMap<ProviderId, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store where each listed provider has a dummy key present.
    pub fn with_providers(providers: &[ProviderId]) -> Self {
        let keys = providers
            .iter()
            .map(|p| (*p, format!("test-key-{p}")))
            .collect();
        Self { keys }
    }

    pub fn insert(&mut self, provider: ProviderId, key: impl Into<String>) {
        self.keys.insert(provider, key.into());
    }
}

impl CredentialStore for StaticCredentials {
    fn api_key(&self, provider: ProviderId) -> Option<String> {
        self.keys.get(&provider).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_store_presence() {
        let store = StaticCredentials::with_providers(&[ProviderId::Openai]);
        assert!(store.credentials_present(ProviderId::Openai));
        assert!(!store.credentials_present(ProviderId::Yandex));
        assert!(store.api_key(ProviderId::Google).is_none());
    }

    #[test]
    fn env_var_names_are_distinct() {
        let names: std::collections::HashSet<_> = ProviderId::ALL
            .iter()
            .map(|p| EnvCredentials::var_name(*p))
            .collect();
        assert_eq!(names.len(), ProviderId::ALL.len());
    }
}
