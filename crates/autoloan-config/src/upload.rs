use std::env;
use std::path::PathBuf;

use crate::{ConfigError, env_flag, parse_env};

pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    /// Serve `/uploads/{filename}` without a token.
    pub public: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_bytes: DEFAULT_MAX_BYTES,
            public: false,
        }
    }
}

impl UploadConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_bytes = parse_env("UPLOAD_MAX_BYTES", DEFAULT_MAX_BYTES)?;
        if max_bytes == 0 {
            return Err(ConfigError::Invalid {
                name: "UPLOAD_MAX_BYTES",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_bytes,
            public: env_flag("ATTACHMENTS_PUBLIC", false)?,
        })
    }
}
