//! # AutoLoan Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: token signing keys
//! - [`cors`]: allowed browser origins
//! - [`upload`]: attachment directory, size ceiling and visibility
//! - [`server`]: listen addresses, log directory and signup policy
//!
//! # Example
//!
//! ```ignore
//! use autoloan_config::{CorsConfig, JwtConfig, ServerConfig, UploadConfig};
//!
//! let jwt_config = JwtConfig::from_env()?;
//! let cors_config = CorsConfig::from_env();
//! let upload_config = UploadConfig::from_env()?;
//! let server_config = ServerConfig::from_env()?;
//! ```

use std::env;
use std::str::FromStr;

use thiserror::Error;

pub mod cors;
pub mod jwt;
pub mod server;
pub mod upload;

pub use cors::CorsConfig;
pub use jwt::{JwtConfig, SigningKey};
pub use server::{ServerConfig, SignupConfig};
pub use upload::UploadConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Reads and parses `name`, falling back to `default` when it is unset.
pub(crate) fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Accepts `true/false`, `1/0`, `yes/no` in any case.
pub(crate) fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

pub(crate) fn env_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => parse_flag(name, &raw),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("X", "TRUE"), Ok(true));
        assert_eq!(parse_flag("X", " 0 "), Ok(false));
        assert_eq!(parse_flag("X", "yes"), Ok(true));
        assert!(matches!(
            parse_flag("X", "maybe"),
            Err(ConfigError::Invalid { name: "X", .. })
        ));
    }
}
