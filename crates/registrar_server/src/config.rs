//! Server configuration
//!
//! Values come from the process environment, after `.env` is loaded with
//! `dotenvy`. Every key falls back to a named default; malformed values are
//! errors, never silently replaced by the default.

use registrar_core::model::attachment::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES};
use registrar_core::{default_log_level, ActorId, UploadPolicy};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default SQLite database file.
pub const DEFAULT_DATABASE_PATH: &str = "registrar.sqlite3";

/// Default root directory of attachment bytes.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Default log directory, resolved against the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default CORS allowed origin.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub storage_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    /// Always absolute.
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub allowed_extensions: Vec<String>,
}

impl UploadConfig {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.max_bytes, &self.allowed_extensions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Bearer token -> actor id.
    pub tokens: BTreeMap<String, ActorId>,
    /// Reject anonymous mutations with 401.
    pub require_actor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from `.env`, the environment and defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let log_dir = PathBuf::from(text("REGISTRAR_LOG_DIR", DEFAULT_LOG_DIR));
        let log_dir = if log_dir.is_absolute() {
            log_dir
        } else {
            std::env::current_dir()
                .map_err(ConfigError::WorkingDir)?
                .join(log_dir)
        };

        let allowed_extensions = match lookup("REGISTRAR_ALLOWED_EXTENSIONS") {
            Some(list) if !list.trim().is_empty() => split_list(&list),
            _ => DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        };

        let config = Config {
            server: ServerConfig {
                host: text("REGISTRAR_HOST", DEFAULT_SERVER_HOST),
                port: parsed(&lookup, "REGISTRAR_PORT", DEFAULT_SERVER_PORT)?,
                shutdown_timeout_secs: parsed(
                    &lookup,
                    "REGISTRAR_SHUTDOWN_TIMEOUT_SECS",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                )?,
            },
            storage: StorageConfig {
                database_path: PathBuf::from(text(
                    "REGISTRAR_DATABASE_PATH",
                    DEFAULT_DATABASE_PATH,
                )),
                storage_dir: PathBuf::from(text("REGISTRAR_STORAGE_DIR", DEFAULT_STORAGE_DIR)),
            },
            logging: LoggingConfig {
                level: text("REGISTRAR_LOG_LEVEL", default_log_level()),
                log_dir,
            },
            uploads: UploadConfig {
                max_bytes: parsed(&lookup, "REGISTRAR_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
                allowed_extensions,
            },
            auth: AuthConfig {
                tokens: parse_tokens(lookup("REGISTRAR_API_TOKENS").as_deref().unwrap_or(""))?,
                require_actor: parsed(&lookup, "REGISTRAR_REQUIRE_ACTOR", false)?,
            },
            cors: CorsConfig {
                allowed_origins: split_list(&text(
                    "REGISTRAR_CORS_ALLOWED_ORIGINS",
                    DEFAULT_CORS_ALLOWED_ORIGIN,
                )),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("REGISTRAR_PORT", "0", "port must be greater than 0"));
        }
        if self.uploads.max_bytes == 0 {
            return Err(invalid(
                "REGISTRAR_MAX_UPLOAD_BYTES",
                "0",
                "upload limit must be greater than 0",
            ));
        }
        if self.uploads.allowed_extensions.is_empty() {
            return Err(invalid(
                "REGISTRAR_ALLOWED_EXTENSIONS",
                "",
                "at least one extension is required",
            ));
        }
        Ok(())
    }

    /// `host:port` socket address string.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|err: T::Err| invalid(key, &value, err.to_string())),
        _ => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `token=actor_id` pairs separated by commas.
fn parse_tokens(value: &str) -> Result<BTreeMap<String, ActorId>, ConfigError> {
    let mut tokens = BTreeMap::new();
    for pair in split_list(value) {
        let (token, actor) = pair
            .split_once('=')
            .ok_or_else(|| invalid("REGISTRAR_API_TOKENS", &pair, "expected token=actor_id"))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid("REGISTRAR_API_TOKENS", &pair, "token is empty"));
        }
        let actor = actor
            .trim()
            .parse::<ActorId>()
            .map_err(|err| invalid("REGISTRAR_API_TOKENS", &pair, err.to_string()))?;
        tokens.insert(token.to_string(), actor);
    }
    Ok(tokens)
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}
