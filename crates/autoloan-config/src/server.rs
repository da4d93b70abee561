use std::env;

use crate::{ConfigError, env_flag, parse_env};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub log_dir: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            metrics_port: parse_env("METRICS_PORT", 9090)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "storage/logs".to_string()),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn metrics_address(&self) -> String {
        format!("{}:{}", self.host, self.metrics_port)
    }
}

/// Who may create which accounts through `POST /signup`.
#[derive(Clone, Debug, Default)]
pub struct SignupConfig {
    /// Admin accounts are normally created with the CLI only.
    pub allow_admin_signup: bool,
}

impl SignupConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            allow_admin_signup: env_flag("ALLOW_ADMIN_SIGNUP", false)?,
        })
    }
}
