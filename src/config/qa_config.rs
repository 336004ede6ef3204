//! QA Configuration - server, database, auth, report and assistant settings
//!
//! Every struct implements `Default` with the values from
//! [`super::defaults`], so the service runs with no config file at all.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "QA_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "qa_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a QA deployment.
///
/// Load with `QaConfig::load()` which searches:
/// 1. an explicit path (CLI `--config`)
/// 2. `$QA_CONFIG`
/// 3. `./qa_config.toml`
/// 4. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub report: ReportConfig,

    /// External text-generation service
    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QaConfig {
    /// Load configuration using the standard search order, then apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::discover(explicit)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. CLI path: a missing or broken file is fatal, the operator asked for it
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded config from --config");
            return Ok(config);
        }

        // 2. Env var
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV);
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV);
            }
        }

        // 3. ./qa_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 4. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse a TOML document, warning about unknown keys.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Environment variables win over file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("QA_SERVER_ADDR") {
            self.server.addr = addr;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if self.assistant.api_key.is_none() {
            self.assistant.api_key = std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty());
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every value the service would fail on at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }
        if self.server.session_idle_timeout_secs == 0 {
            errors.push("server.session_idle_timeout_secs must be > 0".to_string());
        }
        if self.server.max_sessions == 0 {
            errors.push("server.max_sessions must be > 0".to_string());
        }
        if self.database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            errors.push(format!(
                "auth.bcrypt_cost = {} is outside bcrypt's range (4-31)",
                self.auth.bcrypt_cost
            ));
        }
        if self.report.output_dir.as_os_str().is_empty() {
            errors.push("report.output_dir must not be empty".to_string());
        }

        let a = &self.assistant;
        if a.model.trim().is_empty() {
            errors.push("assistant.model must not be empty".to_string());
        }
        if a.timeout_secs == 0 {
            errors.push("assistant.timeout_secs must be > 0".to_string());
        }
        Self::check_temperature(a.suggestion_temperature, "assistant.suggestion_temperature", &mut errors);
        Self::check_temperature(a.chat_temperature, "assistant.chat_temperature", &mut errors);
        if a.suggestion_max_tokens == 0 || a.chat_max_tokens == 0 {
            errors.push("assistant max_tokens values must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_temperature(value: f32, name: &str, errors: &mut Vec<String>) {
        // NaN fails every comparison, so test the accepted range positively
        if !(0.0..=2.0).contains(&value) {
            errors.push(format!("{name} = {value} must be within 0.0-2.0"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Extra origins allowed by CORS (same-origin only when empty)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Idle time after which a session token stops resolving
    #[serde(default = "default_session_idle_timeout")]
    pub session_idle_timeout_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

const fn default_session_idle_timeout() -> u64 {
    defaults::SESSION_IDLE_TIMEOUT_SECS
}

const fn default_max_sessions() -> usize {
    defaults::MAX_SESSIONS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            cors_origins: Vec::new(),
            session_idle_timeout_secs: default_session_idle_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite://qa_app.sqlite?mode=rwc`
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seed the sample machine when the catalog is empty
    #[serde(default = "default_true")]
    pub seed_sample_machine: bool,
}

fn default_database_url() -> String {
    defaults::DATABASE_URL.to_string()
}
const fn default_max_connections() -> u32 {
    defaults::DATABASE_MAX_CONNECTIONS
}
const fn default_true() -> bool {
    true
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            seed_sample_machine: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

const fn default_bcrypt_cost() -> u32 {
    defaults::BCRYPT_COST
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory receiving `report_{id}.pdf` files
    #[serde(default = "default_report_dir")]
    pub output_dir: PathBuf,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(defaults::REPORT_OUTPUT_DIR)
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_report_dir(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Disable to run without any outbound calls
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible API root (the `/chat/completions` path is appended)
    #[serde(default = "default_assistant_url")]
    pub base_url: String,

    #[serde(default = "default_assistant_model")]
    pub model: String,

    /// Falls back to `$GROQ_API_KEY`. Not serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_assistant_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_suggestion_temperature")]
    pub suggestion_temperature: f32,

    #[serde(default = "default_suggestion_max_tokens")]
    pub suggestion_max_tokens: u32,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,

    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
}

fn default_assistant_url() -> String {
    defaults::ASSISTANT_BASE_URL.to_string()
}

fn default_assistant_model() -> String {
    defaults::ASSISTANT_MODEL.to_string()
}

const fn default_assistant_timeout() -> u64 {
    defaults::ASSISTANT_TIMEOUT_SECS
}

const fn default_suggestion_temperature() -> f32 {
    defaults::SUGGESTION_TEMPERATURE
}

const fn default_suggestion_max_tokens() -> u32 {
    defaults::SUGGESTION_MAX_TOKENS
}

const fn default_chat_temperature() -> f32 {
    defaults::CHAT_TEMPERATURE
}

const fn default_chat_max_tokens() -> u32 {
    defaults::CHAT_MAX_TOKENS
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("suggestion_temperature", &self.suggestion_temperature)
            .field("suggestion_max_tokens", &self.suggestion_max_tokens)
            .field("chat_temperature", &self.chat_temperature)
            .field("chat_max_tokens", &self.chat_max_tokens)
            .finish()
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_assistant_url(),
            model: default_assistant_model(),
            api_key: None,
            timeout_secs: default_assistant_timeout(),
            suggestion_temperature: default_suggestion_temperature(),
            suggestion_max_tokens: default_suggestion_max_tokens(),
            chat_temperature: default_chat_temperature(),
            chat_max_tokens: default_chat_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(QaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = QaConfig::from_toml_str(
            r#"
[server]
addr = "0.0.0.0:9000"

[assistant]
model = "llama-3.3-70b-versatile"
"#,
        )
        .unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:9000");
        assert_eq!(config.assistant.model, "llama-3.3-70b-versatile");
        assert_eq!(config.assistant.chat_max_tokens, defaults::CHAT_MAX_TOKENS);
        assert_eq!(config.database.url, defaults::DATABASE_URL);
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut config = QaConfig::default();
        config.auth.bcrypt_cost = 2;
        config.database.max_connections = 0;
        config.assistant.chat_temperature = f32::NAN;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = QaConfig::default();
        config.assistant.api_key = Some("secret".to_string());
        let toml_str = config.to_toml().unwrap();
        assert!(!toml_str.contains("secret"));
        assert!(toml_str.contains("[assistant]"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = QaConfig::default();
        config.assistant.api_key = Some("gsk_live_value".to_string());
        let printed = format!("{config:?}");
        assert!(!printed.contains("gsk_live_value"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_session_limits_validated() {
        let mut config = QaConfig::default();
        config.server.max_sessions = 0;
        config.server.session_idle_timeout_secs = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa_config.toml");
        std::fs::write(&path, "[server\naddr = 1").unwrap();
        let err = QaConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
    }
}
