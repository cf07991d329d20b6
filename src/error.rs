use std::time::Duration;

/// Errors raised by the identity extension.
///
/// Only `Configuration` ever reaches callers, and only from the constructor.
/// The remaining variants describe why a registry lookup failed; the level
/// store absorbs them and falls back to `IdentityLevel::Unknown`.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Failed to encode registry call: {0}")]
    Encoding(#[from] ethers::abi::Error),
    #[error("Registry call failed: {0}")]
    Transport(String),
    #[error("Registry call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Failed to decode registry response: {0}")]
    Decoding(String),
}

impl IdentityError {
    /// Lookup failures that degrade to the `Unknown` tier instead of propagating.
    pub fn is_registry_unavailable(&self) -> bool {
        !matches!(self, IdentityError::Configuration(_))
    }

    /// Short label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            IdentityError::Configuration(_) => "configuration",
            IdentityError::Encoding(_) => "encoding",
            IdentityError::Transport(_) => "transport",
            IdentityError::Timeout(_) => "timeout",
            IdentityError::Decoding(_) => "decoding",
        }
    }
}
