//! Client configuration.
//!
//! The backend base address is fixed at build time through
//! `MAILCAL_API_BASE_URL`; `from_env` lets a running process override it.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MAILCAL_API_BASE_URL` | build-time value, else `http://localhost:8000` | Backend base address |
//! | `MAILCAL_STRICT_DECODE` | unset (lenient) | `1`/`true` raises on malformed JSON bodies |
//! | `MAILCAL_TOKEN_DIR` | unset (memory) | Directory holding the persisted credential slot |

use std::path::PathBuf;

pub const FALLBACK_BASE_URL: &str = "http://localhost:8000";

/// Base address baked in at compile time.
pub const BUILD_BASE_URL: Option<&str> = option_env!("MAILCAL_API_BASE_URL");

/// What to do when a response declares JSON but the body does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Substitute an empty object and log a warning.
    #[default]
    Lenient,
    /// Fail with `ApiError::Decode`.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefixed to every relative request path. Stored without a trailing `/`.
    pub base_url: String,
    pub decode_policy: DecodePolicy,
    /// `None` keeps the credential in memory only.
    pub token_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(BUILD_BASE_URL.unwrap_or(FALLBACK_BASE_URL))
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            decode_policy: DecodePolicy::default(),
            token_dir: None,
        }
    }

    /// Start from the build-time defaults and apply runtime overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("MAILCAL_API_BASE_URL") {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(strict) = std::env::var("MAILCAL_STRICT_DECODE") {
            if matches!(strict.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.decode_policy = DecodePolicy::Strict;
            }
        }
        config.token_dir = std::env::var_os("MAILCAL_TOKEN_DIR").map(PathBuf::from);
        config
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }

    pub fn with_token_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.token_dir = Some(dir.into());
        self
    }
}
