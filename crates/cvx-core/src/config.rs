//! CVX Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. Credentials for downstream services
//! only ever live here and are handed to the dispatch layer at startup.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Upload API server configuration
    pub server: ServerConfig,

    /// Extraction pipeline configuration
    pub extraction: ExtractionConfig,

    /// Downstream dispatch configuration
    pub dispatch: DispatchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply every variable that `lookup` returns a value for
    ///
    /// Fields whose variable is unset keep their current value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("CVX_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CVX_PORT") {
            self.server.port = parse_var("CVX_PORT", port)?;
        }
        if let Some(size) = lookup("CVX_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse_var("CVX_MAX_UPLOAD_BYTES", size)?;
        }

        // Extraction
        if let Some(policy) = lookup("CVX_ENTITY_POLICY") {
            self.extraction.entity_policy = policy.parse()?;
        }
        if let Some(enabled) = lookup("CVX_NER_ENABLED") {
            self.extraction.ner_enabled = parse_var("CVX_NER_ENABLED", enabled)?;
        }
        if let Some(backend) = lookup("CVX_NER_BACKEND") {
            self.extraction.ner_backend = backend.parse()?;
        }
        if let Some(dir) = lookup("CVX_NER_MODEL_DIR") {
            self.extraction.ner_model_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup("CVX_NER_MODEL") {
            self.extraction.ner_model_path = Some(PathBuf::from(path));
        }
        if let Some(workers) = lookup("CVX_WORKERS") {
            self.extraction.workers = parse_var("CVX_WORKERS", workers)?;
        }

        // Dispatch
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.dispatch.webhook_url = Some(url);
        }
        if let Some(email) = lookup("X_CANDIDATE_EMAIL") {
            self.dispatch.candidate_email_header = Some(email);
        }
        if let Some(status) = lookup("CVX_DISPATCH_STATUS") {
            self.dispatch.status = status;
        }
        if let Some(time) = lookup("CVX_FOLLOWUP_TIME") {
            self.dispatch.followup_time = time;
        }
        if let Some(sender) = lookup("EMAIL_ADDRESS") {
            self.dispatch.followup_sender = Some(sender);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(self)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path)?.with_env_override(),
            None => Self::from_env(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum decoded upload size in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// What to do when the entity model cannot be used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityPolicy {
    /// Produce the record with empty `entities`
    #[default]
    Degrade,
    /// Fail the document with `ModelUnavailable`
    Abort,
}

impl std::str::FromStr for EntityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "abort" => Ok(Self::Abort),
            _ => Err(ConfigError::InvalidValue {
                key: "CVX_ENTITY_POLICY".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Entity recognizer implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NerBackend {
    /// Pretrained BERT token classifier loaded from `ner_model_dir`
    #[default]
    Bert,
    /// Lexicon span scorer (`ner_model_path` or the bundled lexicon)
    Lexicon,
}

impl std::str::FromStr for NerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bert" => Ok(Self::Bert),
            "lexicon" => Ok(Self::Lexicon),
            _ => Err(ConfigError::InvalidValue {
                key: "CVX_NER_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for NerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Bert => "bert",
            Self::Lexicon => "lexicon",
        })
    }
}

/// Extraction pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Policy applied when the entity model is unavailable
    pub entity_policy: EntityPolicy,

    /// Run the entity recognizer at all
    pub ner_enabled: bool,

    /// Which recognizer to run
    pub ner_backend: NerBackend,

    /// Directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors` of a BERT token-classification checkpoint
    pub ner_model_dir: Option<PathBuf>,

    /// Lexicon model file (JSON); the bundled lexicon is used when unset
    pub ner_model_path: Option<PathBuf>,

    /// Worker threads for batch processing (0 = one per core)
    pub workers: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            entity_policy: EntityPolicy::Degrade,
            ner_enabled: true,
            ner_backend: NerBackend::Bert,
            ner_model_dir: None,
            ner_model_path: None,
            workers: 0,
        }
    }
}

/// Downstream dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Webhook endpoint receiving processed records
    pub webhook_url: Option<String>,

    /// Value sent in the `X-Candidate-Email` header and payload metadata
    pub candidate_email_header: Option<String>,

    /// Status tag placed in payload metadata
    pub status: String,

    /// Webhook request timeout in seconds
    pub timeout_secs: u64,

    /// Time of day (UTC, `HH:MM`) at which follow-up emails go out
    pub followup_time: String,

    /// Sender address for follow-up emails
    pub followup_sender: Option<String>,

    /// Subject line for follow-up emails
    pub followup_subject: String,

    /// Team name used in the follow-up signature
    pub followup_signature: String,
}

impl DispatchConfig {
    /// Parse `followup_time` into a time of day
    pub fn followup_time_of_day(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.followup_time, "%H:%M").map_err(|_| {
            ConfigError::InvalidValue {
                key: "dispatch.followup_time".to_string(),
                value: self.followup_time.clone(),
            }
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            candidate_email_header: None,
            status: "prod".to_string(),
            timeout_secs: 30,
            followup_time: "09:00".to_string(),
            followup_sender: None,
            followup_subject: "Your Job Application is Under Review".to_string(),
            followup_signature: "Recruitment Team".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
