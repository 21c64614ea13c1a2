//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults -> config file -> env vars -> CLI flags.
//!
//! Config lives at `~/.courier/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::llm::{DEFAULT_MODEL_TTL, ProviderConfig};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub general: GeneralSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProviderSection {
    pub label: Option<String>,
    pub description: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralSection {
    pub default_model: Option<String>,
    pub model_ttl_secs: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_PROVIDER_LABEL: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub label: String,
    pub description: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: String,
    pub model_ttl: Duration,
}

impl ResolvedConfig {
    /// Provider configuration for constructing the client.
    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new(&self.label);
        if let Some(description) = &self.description {
            config = config.with_description(description);
        }
        if let Some(api_key) = &self.api_key {
            config = config.with_credential(api_key);
        }
        if let Some(base_url) = &self.base_url {
            config = config.with_endpoint(base_url);
        }
        config
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.courier/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".courier").join("config.toml"))
}

/// Load config from `~/.courier/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `CourierConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<CourierConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(CourierConfig::default());
        }
    };

    if !path.exists() {
        info!(
            "No config file found, generating default at {}",
            path.display()
        );
        generate_default_config(&path);
        return Ok(CourierConfig::default());
    }

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config: CourierConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &PathBuf) {
    let default_content = r#"# Courier Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults -> this file -> env vars -> CLI flags.

# [provider]
# label = "openai"
# description = "Hosted OpenAI endpoint"
# api_key = "sk-..."                 # Or set COURIER_API_KEY / OPENAI_API_KEY
# base_url = "https://api.openai.com/v1"

# [general]
# default_model = "gpt-4o-mini"      # Or set COURIER_MODEL
# model_ttl_secs = 300               # How long the fetched model list stays valid
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults -> config file -> env vars.
pub fn resolve(config: &CourierConfig) -> ResolvedConfig {
    let label = config
        .provider
        .label
        .clone()
        .unwrap_or_else(|| DEFAULT_PROVIDER_LABEL.to_string());

    // API key: env -> config
    let api_key = std::env::var("COURIER_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .or_else(|| config.provider.api_key.clone());

    // Base URL: env -> config (None falls back to the client's default endpoint)
    let base_url = std::env::var("COURIER_BASE_URL")
        .ok()
        .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
        .or_else(|| config.provider.base_url.clone());

    // Model: env -> config -> default
    let default_model = std::env::var("COURIER_MODEL")
        .ok()
        .or_else(|| config.general.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    ResolvedConfig {
        label,
        description: config.provider.description.clone(),
        api_key,
        base_url,
        default_model,
        model_ttl: config
            .general
            .model_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_MODEL_TTL),
    }
}
