//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Directory of the browser client, served for any non-API path
    pub static_dir: Option<PathBuf>,
    /// Allowed client origins for CORS; any origin when empty
    pub client_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(server_addr))?;

        let static_dir = match var("STATIC_DIR").filter(|s| !s.trim().is_empty()) {
            Some(dir) => {
                let dir = PathBuf::from(dir.trim());
                if !dir.is_dir() {
                    return Err(ConfigError::InvalidStaticDir(dir));
                }
                Some(dir)
            }
            None => None,
        };

        let client_origins = var("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json")),
            static_dir,
            client_origins,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Static directory does not exist: {}", .0.display())]
    InvalidStaticDir(PathBuf),
}
