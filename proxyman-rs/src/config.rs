use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub nginx: NginxConfig,
    pub rules: RulesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NginxConfig {
    /// Path to the nginx binary invoked for test/reload/version commands
    pub binary: String,
    /// Directory holding one generated .conf file per domain-scoped rule
    pub config_dir: PathBuf,
    /// Directory holding per-certificate subdirectories with PEM material
    pub ssl_dir: PathBuf,
    /// Upper bound on waiting for an in-flight reload, in seconds
    #[serde(default = "default_reload_timeout")]
    pub reload_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    /// Ceiling on the number of stored rules
    #[serde(default = "default_max_rules")]
    pub max_rules: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_reload_timeout() -> u64 {
    5
}

fn default_max_rules() -> usize {
    100
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::ProxymanError::Config(e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| crate::error::ProxymanError::Config(e.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:8080".to_string(),
            },
            nginx: NginxConfig {
                binary: "nginx".to_string(),
                config_dir: PathBuf::from("/etc/nginx/conf.d"),
                ssl_dir: PathBuf::from("/etc/nginx/ssl"),
                reload_timeout_secs: 5,
            },
            rules: RulesConfig { max_rules: 100 },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
