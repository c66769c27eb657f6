//! Agent voice configuration validation.
//!
//! Validation is pure and side-effect free: it parses the raw configuration
//! into [`VoiceSettings`], applies the documented rules, and consults the
//! credential store for advisory provider availability. It may run repeatedly
//! (e.g. on a validate-config request) without mutating any state.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use super::settings::{IntentMode, ProviderId, VoiceSettings, limits};
use crate::core::providers::credentials::CredentialStore;

/// Outcome of validating a raw agent configuration.
///
/// `missing_credentials` and `supported_providers` are advisory; a provider
/// without credentials does not invalidate the configuration, it just fails
/// fast at request time and lets fallback move on.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub supported_providers: Vec<ProviderId>,
    pub missing_credentials: Vec<ProviderId>,
    /// Parsed settings, present only when validation produced no errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<VoiceSettings>,
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates and normalizes a raw agent voice configuration.
    pub fn validate(raw: &Value, credentials: &dyn CredentialStore) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Required fields checked up front so their absence produces a clear
        // message instead of a generic deserialization failure.
        if raw.get("enabled").is_none() {
            errors.push("'enabled' is required".to_string());
        }
        if raw.get("intent_detection_mode").is_none() {
            errors.push("'intent_detection_mode' is required".to_string());
        }

        let settings = if errors.is_empty() {
            match serde_json::from_value::<VoiceSettings>(raw.clone()) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    errors.push(format!("configuration does not parse: {e}"));
                    None
                }
            }
        } else {
            None
        };

        let mut supported_providers = Vec::new();
        let mut missing_credentials = Vec::new();

        if let Some(settings) = &settings {
            Self::check_rules(settings, &mut errors, &mut warnings);

            // Credential presence is a query, not an initialization.
            for provider in settings.providers.iter().map(|p| p.provider) {
                if credentials.credentials_present(provider) {
                    if !supported_providers.contains(&provider) {
                        supported_providers.push(provider);
                    }
                } else if !missing_credentials.contains(&provider) {
                    missing_credentials.push(provider);
                }
            }
        }

        let valid = errors.is_empty();
        ValidationReport {
            valid,
            errors,
            warnings,
            supported_providers,
            missing_credentials,
            settings: if valid { settings } else { None },
        }
    }

    fn check_rules(settings: &VoiceSettings, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        if settings.intent_detection_mode == IntentMode::Keywords
            && settings.intent_keywords.is_empty()
        {
            // Degrades to never-voice rather than failing the whole config.
            warnings.push(
                "intent_detection_mode is 'keywords' but intent_keywords is empty; \
                 replies will never be voiced"
                    .to_string(),
            );
        }

        if settings.providers.is_empty() {
            errors.push("at least one provider must be configured".to_string());
        }

        let mut seen_priorities = HashSet::new();
        for provider in &settings.providers {
            if !seen_priorities.insert(provider.priority) {
                errors.push(format!(
                    "provider priorities must be unique (duplicate priority {})",
                    provider.priority
                ));
            }
        }

        if !limits::MAX_FILE_SIZE_MB.contains(&settings.max_file_size_mb) {
            errors.push(format!(
                "max_file_size_mb must be between {} and {} (got {})",
                limits::MAX_FILE_SIZE_MB.start(),
                limits::MAX_FILE_SIZE_MB.end(),
                settings.max_file_size_mb
            ));
        }

        if !limits::CACHE_TTL_HOURS.contains(&settings.cache_ttl_hours) {
            errors.push(format!(
                "cache_ttl_hours must be between {} and {} (got {})",
                limits::CACHE_TTL_HOURS.start(),
                limits::CACHE_TTL_HOURS.end(),
                settings.cache_ttl_hours
            ));
        }

        if !limits::RATE_LIMIT_PER_MINUTE.contains(&settings.rate_limit_per_minute) {
            errors.push(format!(
                "rate_limit_per_minute must be between {} and {} (got {})",
                limits::RATE_LIMIT_PER_MINUTE.start(),
                limits::RATE_LIMIT_PER_MINUTE.end(),
                settings.rate_limit_per_minute
            ));
        }
    }
}
