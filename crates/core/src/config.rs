use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::chain::ChainPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub chain: ChainConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChainConfig {
    pub worker_max_depth: u32,
    pub general_max_depth: u32,
    pub management_max_depth: u32,
    pub terminal_roles: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub from_address: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let policy = ChainPolicy::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://appraisy.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            chain: ChainConfig {
                worker_max_depth: policy.worker_max_depth,
                general_max_depth: policy.general_max_depth,
                management_max_depth: policy.management_max_depth,
                terminal_roles: policy.terminal_roles,
            },
            notifications: NotificationsConfig {
                enabled: false,
                from_address: "appraisals@example.com".to_string(),
                smtp_host: "localhost".to_string(),
                smtp_port: 25,
                smtp_username: None,
                smtp_password: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    chain: Option<ChainPatch>,
    notifications: Option<NotificationsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChainPatch {
    worker_max_depth: Option<u32>,
    general_max_depth: Option<u32>,
    management_max_depth: Option<u32>,
    terminal_roles: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct NotificationsPatch {
    enabled: Option<bool>,
    from_address: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("appraisy.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn chain_policy(&self) -> ChainPolicy {
        ChainPolicy {
            worker_max_depth: self.chain.worker_max_depth,
            general_max_depth: self.chain.general_max_depth,
            management_max_depth: self.chain.management_max_depth,
            terminal_roles: self.chain.terminal_roles.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(chain) = patch.chain {
            if let Some(depth) = chain.worker_max_depth {
                self.chain.worker_max_depth = depth;
            }
            if let Some(depth) = chain.general_max_depth {
                self.chain.general_max_depth = depth;
            }
            if let Some(depth) = chain.management_max_depth {
                self.chain.management_max_depth = depth;
            }
            if let Some(terminal_roles) = chain.terminal_roles {
                self.chain.terminal_roles = terminal_roles;
            }
        }

        if let Some(notifications) = patch.notifications {
            if let Some(enabled) = notifications.enabled {
                self.notifications.enabled = enabled;
            }
            if let Some(from_address) = notifications.from_address {
                self.notifications.from_address = from_address;
            }
            if let Some(smtp_host) = notifications.smtp_host {
                self.notifications.smtp_host = smtp_host;
            }
            if let Some(smtp_port) = notifications.smtp_port {
                self.notifications.smtp_port = smtp_port;
            }
            if let Some(smtp_username) = notifications.smtp_username {
                self.notifications.smtp_username = Some(smtp_username);
            }
            if let Some(smtp_password) = notifications.smtp_password {
                self.notifications.smtp_password = Some(smtp_password.into());
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("APPRAISY_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("APPRAISY_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("APPRAISY_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("APPRAISY_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("APPRAISY_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("APPRAISY_CHAIN_WORKER_MAX_DEPTH") {
            self.chain.worker_max_depth = parse_u32("APPRAISY_CHAIN_WORKER_MAX_DEPTH", &value)?;
        }
        if let Some(value) = read_env("APPRAISY_CHAIN_GENERAL_MAX_DEPTH") {
            self.chain.general_max_depth = parse_u32("APPRAISY_CHAIN_GENERAL_MAX_DEPTH", &value)?;
        }
        if let Some(value) = read_env("APPRAISY_CHAIN_MANAGEMENT_MAX_DEPTH") {
            self.chain.management_max_depth =
                parse_u32("APPRAISY_CHAIN_MANAGEMENT_MAX_DEPTH", &value)?;
        }

        if let Some(value) = read_env("APPRAISY_NOTIFICATIONS_ENABLED") {
            self.notifications.enabled = parse_bool("APPRAISY_NOTIFICATIONS_ENABLED", &value)?;
        }
        if let Some(value) = read_env("APPRAISY_NOTIFICATIONS_FROM_ADDRESS") {
            self.notifications.from_address = value;
        }
        if let Some(value) = read_env("APPRAISY_SMTP_HOST") {
            self.notifications.smtp_host = value;
        }
        if let Some(value) = read_env("APPRAISY_SMTP_PORT") {
            self.notifications.smtp_port = parse_u16("APPRAISY_SMTP_PORT", &value)?;
        }
        if let Some(value) = read_env("APPRAISY_SMTP_USERNAME") {
            self.notifications.smtp_username = Some(value);
        }
        if let Some(value) = read_env("APPRAISY_SMTP_PASSWORD") {
            self.notifications.smtp_password = Some(value.into());
        }

        if let Some(value) = read_env("APPRAISY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("APPRAISY_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.notifications_enabled {
            self.notifications.enabled = enabled;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        for (key, depth) in [
            ("chain.worker_max_depth", self.chain.worker_max_depth),
            ("chain.general_max_depth", self.chain.general_max_depth),
            ("chain.management_max_depth", self.chain.management_max_depth),
        ] {
            if depth == 0 {
                return Err(ConfigError::Validation(format!("{key} must be at least 1")));
            }
        }

        if self.notifications.enabled {
            if self.notifications.from_address.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "notifications.from_address is required when notifications are enabled"
                        .to_string(),
                ));
            }
            if self.notifications.smtp_host.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "notifications.smtp_host is required when notifications are enabled"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn resolve_config_path(requested: Option<&Path>) -> Option<PathBuf> {
    match requested {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => {
            let default = PathBuf::from("appraisy.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
