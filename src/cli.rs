//! Command-line interface for the vault backup tool.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Module-based backup tool keeping deduplicated snapshots in a git
/// repository
#[derive(Parser)]
#[command(name = "vault")]
#[command(about = "Module-based backup tool keeping deduplicated snapshots in a git repository")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path of the vault repository
    #[arg(long, global = true, default_value = ".")]
    pub vault: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new vault repository
    Init(InitArgs),
    /// Back up registered modules and tag a snapshot
    Backup(BackupArgs),
    /// Restore modules from a snapshot
    Restore(RestoreArgs),
    /// List snapshots in tag order
    ListSnapshots,
    /// Register a backup module
    Register(RegisterArgs),
    /// Unregister a backup module
    Unregister(UnregisterArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Extra git config overrides as key=value,key=value
    #[arg(short, long)]
    pub git_config: Option<String>,
}

#[derive(Args)]
pub struct BackupArgs {
    /// Home directory handed to export hooks
    #[arg(short = 'H', long, default_value = ".")]
    pub home: PathBuf,

    /// Back up only this module
    #[arg(short = 'M', long)]
    pub module: Option<String>,

    /// Free-text message recorded with the snapshot
    #[arg(short, long)]
    pub message: Option<String>,
}

#[derive(Args)]
pub struct RestoreArgs {
    /// Home directory handed to import hooks
    #[arg(short = 'H', long, default_value = ".")]
    pub home: PathBuf,

    /// Snapshot to restore from
    #[arg(short, long)]
    pub tag: String,

    /// Restore only this module
    #[arg(short = 'M', long)]
    pub module: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Module description as name=...,script=...[,key=value...]
    #[arg(short, long)]
    pub data: String,
}

#[derive(Args)]
pub struct UnregisterArgs {
    /// Name of the module to unregister
    #[arg(short = 'M', long)]
    pub module: String,
}
