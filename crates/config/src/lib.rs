//! Configuration loading, validation, and management for balas.
//!
//! Loads configuration from `balas.toml` in the working directory (or an
//! explicit path) with environment variable overrides. Validates all
//! settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `balas.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the JSON data files (contacts, knowledge, QA,
    /// org profile).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Completion backend settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Control-surface HTTP settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("completion", &self.completion)
            .field("gateway", &self.gateway)
            .field("session", &self.session)
            .finish()
    }
}

/// Completion backend settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API key. Usually supplied via `BALAS_API_KEY` or `GROQ_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
        }
    }
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiescence window after teardown, in seconds. New session starts
    /// are rejected until it elapses.
    #[serde(default = "default_cleanup_window_secs")]
    pub cleanup_window_secs: u64,

    /// Directory the transport keeps its auth session in. Removed by
    /// `balas cleanup`.
    #[serde(default = "default_auth_dir")]
    pub auth_dir: PathBuf,
}

fn default_cleanup_window_secs() -> u64 {
    30
}
fn default_auth_dir() -> PathBuf {
    PathBuf::from(".wa-auth")
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cleanup_window_secs: default_cleanup_window_secs(),
            auth_dir: default_auth_dir(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `balas.toml` in the working directory.
    ///
    /// Also checks environment variables:
    /// - `BALAS_API_KEY` (highest priority), then `GROQ_API_KEY`
    /// - `BALAS_MODEL`
    /// - `BALAS_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(Path::new("balas.toml"))?;

        if config.completion.api_key.is_none() {
            config.completion.api_key = std::env::var("BALAS_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("BALAS_MODEL") {
            config.completion.model = model;
        }

        if let Ok(port) = std::env::var("BALAS_PORT") {
            config.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("BALAS_PORT is not a port number: {port}"))
            })?;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "completion.api_url must not be empty".into(),
            ));
        }

        if self.session.cleanup_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session.cleanup_window_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.completion.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            completion: CompletionConfig::default(),
            gateway: GatewayConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
