//! Typed domain error enums.
//!
//! All variants are precondition or platform failures that abort the run
//! before (or instead of) mutating state. They implement `thiserror::Error`
//! and convert to `anyhow::Error` via the `?` operator.

use thiserror::Error;

/// Fatal provisioning errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Service directory already exists: {0}. Use --overwrite to replace it.")]
    ServiceDirExists(String),

    #[error("Unpack location already exists: {0}. Remove it or re-run with --overwrite.")]
    UnpackDestExists(String),

    #[error("Unsupported OS: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid node name '{0}': must match ^[a-z0-9]([a-z0-9-]*[a-z0-9])?$")]
    InvalidNodeName(String),
}
