pub mod backend;
pub mod database;
pub mod server;
pub mod setup;

use once_cell::sync::Lazy;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server: server::ServerConfig,
    pub database: database::DatabaseConfig,
    pub backend: backend::BackendConfig,
    pub setup: setup::SetupConfig,

    // Build info
    pub commit_hash: String,
    pub build_time: String,
    pub version: String,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let server = server::ServerConfig::from_env();
        let backend = backend::BackendConfig::from_env(&server.host, server.port);

        Self {
            server,
            database: database::DatabaseConfig::from_env(),
            backend,
            setup: setup::SetupConfig::from_env(),

            // Build info
            commit_hash: env::var("COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string()),
            build_time: env::var("BUILD_TIME").unwrap_or_else(|_| "unknown".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            // Logging
            log_level: env::var("VIDEOPOPUP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: LogFormat::parse(&env::var("VIDEOPOPUP_LOG_FORMAT").unwrap_or_default()),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
