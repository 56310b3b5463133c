//! Error types for vault-backup

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for vault operations
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("`{command}` failed with status {status:?}: {stderr}")]
    ProcessFailure {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("Unexpected status format, need 'XY path': {token:?}")]
    MalformedStatus { token: String },

    #[error("No rename source after {token:?}")]
    MissingRenameSource { token: String },

    #[error("Dirty tree under {dir}: {status}")]
    DirtyTree { dir: String, status: String },

    #[error("Not fully committed under {dir}: {status}")]
    NotFullyCommitted { dir: String, status: String },

    #[error("Blob store failure at {path}: {reason}")]
    BlobStoreIo { path: PathBuf, reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Module {name}: {source}")]
    Module {
        name: String,
        #[source]
        source: Box<VaultError>,
    },
}

impl VaultError {
    /// Tag an error with the name of the module it belongs to.
    pub fn for_module(self, name: &str) -> Self {
        VaultError::Module {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;
