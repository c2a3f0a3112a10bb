//! Provider configuration snapshot.
//!
//! Built once from the settings table at run start and passed by value into
//! the provider; nothing re-reads settings mid-run. Validation happens here
//! so a bad configuration fails before a run is opened.

use spectrail_core::WorkbenchError;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_PROVIDER_NAME: &str = "openai";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_MAX_TOKENS: i64 = 4000;

/// Environment fallback consulted when the stored `api_key` is empty.
pub const API_KEY_ENV: &str = "SPECTRAIL_API_KEY";

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_name: String,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f64,
    pub max_tokens: i64,
    pub extra_headers: serde_json::Map<String, serde_json::Value>,
    pub dev_mode: bool,
}

fn get<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

impl ProviderConfig {
    /// Build and validate a snapshot from the raw settings map.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, WorkbenchError> {
        let base_url = get(settings, "base_url").unwrap_or(DEFAULT_BASE_URL).to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(WorkbenchError::InvalidConfig(format!(
                "base_url must start with http:// or https:// (got '{base_url}')"
            )));
        }

        let temperature = match get(settings, "temperature") {
            None => DEFAULT_TEMPERATURE,
            Some(raw) => raw.parse::<f64>().ok().filter(|t| (0.0..=2.0).contains(t)).ok_or_else(
                || {
                    WorkbenchError::InvalidConfig(format!(
                        "temperature must be a number in [0, 2] (got '{raw}')"
                    ))
                },
            )?,
        };

        let max_tokens = match get(settings, "max_tokens") {
            None => DEFAULT_MAX_TOKENS,
            Some(raw) => raw.parse::<i64>().ok().filter(|t| *t > 0).ok_or_else(|| {
                WorkbenchError::InvalidConfig(format!(
                    "max_tokens must be a positive integer (got '{raw}')"
                ))
            })?,
        };

        let extra_headers = match get(settings, "extra_headers_json") {
            None => serde_json::Map::new(),
            Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(serde_json::Value::Object(map)) => map,
                _ => {
                    return Err(WorkbenchError::InvalidConfig(
                        "extra_headers_json must be a JSON object".to_string(),
                    ))
                }
            },
        };

        let api_key = match get(settings, "api_key") {
            Some(key) => key.to_string(),
            None => std::env::var(API_KEY_ENV).unwrap_or_default(),
        };
        if api_key.is_empty() {
            return Err(WorkbenchError::InvalidCredentials);
        }

        let dev_mode = get(settings, "dev_mode").is_some_and(|v| v != "0");
        if dev_mode {
            debug!("dev_mode enabled");
        }

        Ok(ProviderConfig {
            provider_name: get(settings, "provider_name")
                .unwrap_or(DEFAULT_PROVIDER_NAME)
                .to_string(),
            base_url,
            model: get(settings, "model").unwrap_or(DEFAULT_MODEL).to_string(),
            api_key,
            temperature,
            max_tokens,
            extra_headers,
            dev_mode,
        })
    }

    /// `{base_url}/chat/completions`, tolerant of a trailing slash.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
