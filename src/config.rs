use std::str::FromStr;
use tracing::Level;

use crate::infrastructure::logging::LoggingConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub log_to_file: bool,
    pub max_log_files: usize,
}

impl AppConfig {
    /// Reads overrides from the process environment (after loading `.env`,
    /// if one exists). Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(lookup("PORT")).unwrap_or(defaults.port),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: lookup("LOG_DIR").unwrap_or(defaults.log_dir),
            log_to_file: parse_var(lookup("LOG_TO_FILE")).unwrap_or(defaults.log_to_file),
            max_log_files: parse_var(lookup("MAX_LOG_FILES")).unwrap_or(defaults.max_log_files),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            log_dir: self.log_dir.clone(),
            max_files: self.max_log_files,
            enable_console: true,
            enable_file: self.log_to_file,
            log_level: Level::from_str(&self.log_level).unwrap_or(Level::INFO),
        }
    }
}

fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            log_to_file: false,
            max_log_files: 30,
        }
    }
}
