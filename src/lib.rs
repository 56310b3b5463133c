//! # vault-backup
//!
//! Module-based backup engine that uses a git repository as an append-only,
//! content-addressed snapshot store.
//!
//! Each data source ("module") is backed up by invoking an external export
//! hook into an isolated staging subtree, deduplicating large files into a
//! content-addressed blob store under `.git/blobs`, committing the result
//! transactionally, and tagging named snapshots. Restore checks out a
//! snapshot and invokes the import hook per module.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vault_backup::vault::{BackupOptions, Vault};
//!
//! # fn main() -> vault_backup::Result<()> {
//! let vault = Vault::new("/home/user/.vault");
//! vault.init(&[])?;
//! let result = vault.backup(&BackupOptions {
//!     home: "/home/user".into(),
//!     module: None,
//!     message: Some("nightly".into()),
//! })?;
//! println!("snapshot: {:?}", result.snapshot);
//! # Ok(())
//! # }
//! ```

pub mod blobs;
pub mod cli;
pub mod error;
pub mod git;
pub mod hooks;
pub mod logging;
pub mod module;
pub mod process;
pub mod registry;
pub mod snapshot;
pub mod status;
pub mod vault;

// Re-export commonly used types
pub use error::{Result, VaultError};
pub use registry::{ModuleConfig, Registry};
pub use snapshot::Snapshot;
pub use vault::{BackupOptions, RestoreOptions, RunResult, Vault};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
