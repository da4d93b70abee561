use std::env;
use std::fmt;

use crate::ConfigError;

/// Lifetime of every issued token.
pub const TOKEN_TTL_SECS: i64 = 3600;

pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_KEY_ID: &str = "v1";

/// An HMAC secret together with the key id stamped into token headers.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub kid: String,
    pub secret: String,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Token signing configuration.
///
/// New tokens are always signed with `current`. Tokens carrying the key id of
/// one of `previous` still verify, so a secret can be rotated without logging
/// everybody out.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub current: SigningKey,
    pub previous: Vec<SigningKey>,
}

impl JwtConfig {
    /// Loads `JWT_SECRET` (required), `JWT_KEY_ID` and `JWT_PREVIOUS_KEYS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let kid = env::var("JWT_KEY_ID").unwrap_or_else(|_| DEFAULT_KEY_ID.to_string());
        let previous = match env::var("JWT_PREVIOUS_KEYS") {
            Ok(raw) => parse_previous_keys(&raw)?,
            Err(_) => Vec::new(),
        };

        let config = Self::new(kid, secret)?;
        previous
            .into_iter()
            .try_fold(config, |config, key| config.with_previous_key(key.kid, key.secret))
    }

    pub fn new(kid: impl Into<String>, secret: impl Into<String>) -> Result<Self, ConfigError> {
        let current = SigningKey {
            kid: kid.into(),
            secret: secret.into(),
        };
        check_key(&current, "JWT_SECRET")?;

        Ok(Self {
            current,
            previous: Vec::new(),
        })
    }

    pub fn with_previous_key(
        mut self,
        kid: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let key = SigningKey {
            kid: kid.into(),
            secret: secret.into(),
        };
        check_key(&key, "JWT_PREVIOUS_KEYS")?;

        if key.kid == self.current.kid || self.previous.iter().any(|k| k.kid == key.kid) {
            return Err(ConfigError::Invalid {
                name: "JWT_PREVIOUS_KEYS",
                reason: format!("duplicate key id '{}'", key.kid),
            });
        }

        self.previous.push(key);
        Ok(self)
    }

    /// Secret for a key id, if that key is still accepted.
    pub fn secret_for(&self, kid: &str) -> Option<&str> {
        std::iter::once(&self.current)
            .chain(self.previous.iter())
            .find(|key| key.kid == kid)
            .map(|key| key.secret.as_str())
    }
}

fn check_key(key: &SigningKey, name: &'static str) -> Result<(), ConfigError> {
    if key.kid.trim().is_empty() {
        return Err(ConfigError::Invalid {
            name,
            reason: "key id must not be empty".to_string(),
        });
    }

    if key.secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("secret must be at least {} bytes", MIN_SECRET_LEN),
        });
    }

    Ok(())
}

/// Parses `kid:secret,kid:secret`.
pub fn parse_previous_keys(raw: &str) -> Result<Vec<SigningKey>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once(':')
                .map(|(kid, secret)| SigningKey {
                    kid: kid.trim().to_string(),
                    secret: secret.trim().to_string(),
                })
                .ok_or_else(|| ConfigError::Invalid {
                    name: "JWT_PREVIOUS_KEYS",
                    reason: "entries must look like kid:secret".to_string(),
                })
        })
        .collect()
}
