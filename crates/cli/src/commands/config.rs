use serde::Serialize;

use appraisy_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct ConfigReport {
    database_url: String,
    database_max_connections: u32,
    database_timeout_secs: u64,
    chain_worker_max_depth: u32,
    chain_general_max_depth: u32,
    chain_management_max_depth: u32,
    chain_terminal_roles: Vec<String>,
    notifications_enabled: bool,
    notifications_from_address: String,
    smtp_host: String,
    smtp_port: u16,
    smtp_username: Option<String>,
    smtp_password: Option<&'static str>,
    log_level: String,
    log_format: &'static str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return format!("{{\"command\":\"config\",\"status\":\"error\",\"message\":\"{error}\"}}");
        }
    };

    let report = ConfigReport {
        database_url: config.database.url,
        database_max_connections: config.database.max_connections,
        database_timeout_secs: config.database.timeout_secs,
        chain_worker_max_depth: config.chain.worker_max_depth,
        chain_general_max_depth: config.chain.general_max_depth,
        chain_management_max_depth: config.chain.management_max_depth,
        chain_terminal_roles: config.chain.terminal_roles,
        notifications_enabled: config.notifications.enabled,
        notifications_from_address: config.notifications.from_address,
        smtp_host: config.notifications.smtp_host,
        smtp_port: config.notifications.smtp_port,
        smtp_username: config.notifications.smtp_username,
        smtp_password: config.notifications.smtp_password.as_ref().map(|_| "[redacted]"),
        log_level: config.logging.level,
        log_format: match config.logging.format {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        },
    };

    serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"))
}
