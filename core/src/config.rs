//! Client configuration.
//!
//! # Design
//! Everything the client needs is fixed at construction: the base endpoint,
//! how requests are signed, and how success bodies are wrapped. The static
//! header set is computed from this once and applied to every request.

use std::env;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// How requests identify the caller to the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `Authorization: Bearer {api_key}` plus `X-Store-Id: {store_id}`.
    ApiKey { api_key: String, store_id: String },
    /// A single `X-Store-Token` header.
    StoreToken(String),
}

/// Where the entity sits in a success body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// `{"data": <entity>}`
    #[default]
    Data,
    /// The body is the entity itself.
    Bare,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth: AuthMode,
    #[serde(default)]
    pub envelope: ResponseEnvelope,
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str, auth: AuthMode) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            envelope: ResponseEnvelope::default(),
            timeout: None,
        }
    }

    pub fn with_envelope(mut self, envelope: ResponseEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load from `AUTH_SDK_*` environment variables.
    ///
    /// `AUTH_SDK_BASE_URL` is required, together with either
    /// `AUTH_SDK_API_KEY` and `AUTH_SDK_STORE_ID`, or `AUTH_SDK_STORE_TOKEN`.
    /// `AUTH_SDK_ENVELOPE` (`data` or `bare`) and `AUTH_SDK_TIMEOUT_SECS` are
    /// optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("AUTH_SDK_BASE_URL").ok_or(ConfigError::Missing("AUTH_SDK_BASE_URL"))?;

        let auth = match (lookup("AUTH_SDK_API_KEY"), lookup("AUTH_SDK_STORE_TOKEN")) {
            (Some(api_key), _) => AuthMode::ApiKey {
                api_key,
                store_id: lookup("AUTH_SDK_STORE_ID").ok_or(ConfigError::Missing("AUTH_SDK_STORE_ID"))?,
            },
            (None, Some(token)) => AuthMode::StoreToken(token),
            (None, None) => return Err(ConfigError::Missing("AUTH_SDK_STORE_TOKEN")),
        };

        let mut config = Self::new(&base_url, auth);

        if let Some(value) = lookup("AUTH_SDK_ENVELOPE") {
            config.envelope = match value.to_ascii_lowercase().as_str() {
                "data" => ResponseEnvelope::Data,
                "bare" => ResponseEnvelope::Bare,
                _ => return Err(ConfigError::Invalid { name: "AUTH_SDK_ENVELOPE", value }),
            };
        }

        if let Some(value) = lookup("AUTH_SDK_TIMEOUT_SECS") {
            let secs: u64 = value
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "AUTH_SDK_TIMEOUT_SECS", value: value.clone() })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Headers attached to every request unless a call overrides one.
    pub fn default_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        match &self.auth {
            AuthMode::ApiKey { api_key, store_id } => {
                headers.push(("Authorization".to_string(), format!("Bearer {api_key}")));
                headers.push(("X-Store-Id".to_string(), store_id.clone()));
            }
            AuthMode::StoreToken(token) => {
                headers.push(("X-Store-Token".to_string(), token.clone()));
            }
        }
        headers
    }
}
