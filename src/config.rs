//! Configuration types for the coaching service.
//!
//! Every section carries defaults so the server starts with a missing or
//! empty config file. Unknown fields in the TOML are ignored, which lets
//! older configs keep working across upgrades.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable probed for an API key when none is configured.
pub const DEFAULT_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable that overrides the configured model name.
pub const MODEL_OVERRIDE_VAR: &str = "OPENAI_MODEL";

/// Top-level configuration for the coaching service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completion provider settings.
    pub llm: LlmConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Session persistence settings.
    pub store: StoreConfig,
    /// Per-caller rate limiting settings.
    pub limits: LimitsConfig,
}

/// Chat-completion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the provider (the client appends `/v1/chat/completions`).
    pub api_url: String,
    /// Model name sent with every request.
    pub api_model: String,
    /// Where the API key comes from.
    pub api_key: ApiKeySource,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens to generate per reply.
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_string(),
            api_model: "gpt-4".to_string(),
            api_key: ApiKeySource::default(),
            temperature: 0.7,
            max_tokens: 300,
        }
    }
}

/// Where the provider API key is resolved from.
///
/// TOML form: `api_key = { type = "env", var = "MY_KEY" }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiKeySource {
    /// Probe [`DEFAULT_KEY_VAR`] and run keyless when it is unset.
    #[default]
    Auto,
    /// No key. Requests are sent without an `Authorization` header,
    /// which local endpoints accept.
    None,
    /// Key written directly in the config file.
    Literal { value: String },
    /// Key read from a named environment variable at startup.
    Env { var: String },
}

impl ApiKeySource {
    /// Resolve to the key string. An empty string means keyless.
    ///
    /// # Errors
    ///
    /// Returns a config error when a named environment variable is
    /// missing or blank. `Auto` never errors: an unset [`DEFAULT_KEY_VAR`]
    /// just yields an empty key.
    pub fn resolve(&self) -> crate::error::Result<String> {
        match self {
            Self::Auto => Ok(std::env::var(DEFAULT_KEY_VAR).unwrap_or_default()),
            Self::None => Ok(String::new()),
            Self::Literal { value } => Ok(value.clone()),
            Self::Env { var } => {
                let value = std::env::var(var).map_err(|_| {
                    crate::error::CoachError::Config(format!("api key env var is missing: {var}"))
                })?;
                if value.trim().is_empty() {
                    return Err(crate::error::CoachError::Config(format!(
                        "api key env var is empty: {var}"
                    )));
                }
                Ok(value)
            }
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Upper bound on end-to-end request handling, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            request_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for a listener bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Whether sessions are persisted at all.
    pub enabled: bool,
    /// Directory holding the database file. `None` means the platform
    /// default data directory.
    pub root_dir: Option<PathBuf>,
    /// How many prior sessions feed the prompt as journey context.
    pub history_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root_dir: None,
            history_limit: 5,
        }
    }
}

impl StoreConfig {
    /// Directory the database file lives in.
    pub fn data_dir(&self) -> PathBuf {
        self.root_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// Per-caller rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Requests allowed per window for one caller.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::CoachError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CoachError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment overrides. [`MODEL_OVERRIDE_VAR`] replaces the
    /// configured model name when set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var(MODEL_OVERRIDE_VAR) {
            if !model.trim().is_empty() {
                self.llm.api_model = model;
            }
        }
    }

    /// Returns the default config file path: `~/.config/braindoc/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("braindoc").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("braindoc")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/braindoc-config/config.toml")
        }
    }
}

/// Returns the default data directory: `~/.local/share/braindoc`.
pub fn default_data_dir() -> PathBuf {
    if let Some(data) = std::env::var_os("XDG_DATA_HOME") {
        PathBuf::from(data).join("braindoc")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("braindoc")
    } else {
        PathBuf::from("/tmp/braindoc-data")
    }
}
