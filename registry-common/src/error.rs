//! Domain error types.
//!
//! Precondition rejections on lifecycle messages are NOT errors: they are
//! silent no-ops per spec (see `registry_state`'s dispatch). `RegistryError`
//! covers the small closed set of failures that should actually propagate —
//! malformed configuration and schema mismatches a caller needs to see.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
