//! vault - module-based backup tool
//!
//! Main binary entry point for the command-line interface.

use anyhow::Context;
use clap::Parser;
use vault_backup::cli::{Cli, Commands};
use vault_backup::logging::init_logging;
use vault_backup::vault::{
    parse_git_config, parse_module_data, BackupOptions, RestoreOptions, RunResult, Vault,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let vault = Vault::new(&cli.vault);

    match cli.command {
        Commands::Init(args) => {
            let overrides = args
                .git_config
                .as_deref()
                .map(parse_git_config)
                .unwrap_or_default();
            vault
                .init(&overrides)
                .with_context(|| format!("failed to init vault at {}", cli.vault.display()))?;
            println!("Initialized vault at {}", cli.vault.display());
        }
        Commands::Backup(args) => {
            let result = vault
                .backup(&BackupOptions {
                    home: args.home,
                    module: args.module,
                    message: args.message,
                })
                .context("backup run failed")?;
            if let Some(snapshot) = &result.snapshot {
                println!("Snapshot: {}", snapshot);
            }
            report(&result);
        }
        Commands::Restore(args) => {
            let result = vault
                .restore(&RestoreOptions {
                    home: args.home,
                    snapshot: args.tag,
                    module: args.module,
                })
                .context("restore run failed")?;
            report(&result);
        }
        Commands::ListSnapshots => {
            for snapshot in vault.snapshots().context("failed to list snapshots")? {
                match snapshot.note {
                    Some(note) => println!("{}  {}", snapshot.tag, note),
                    None => println!("{}", snapshot.tag),
                }
            }
        }
        Commands::Register(args) => {
            let config = parse_module_data(&args.data)?;
            let name = config.name.clone();
            vault
                .register(config)
                .with_context(|| format!("failed to register module {}", name))?;
            println!("Registered module {}", name);
        }
        Commands::Unregister(args) => {
            vault
                .unregister(&args.module)
                .with_context(|| format!("failed to unregister module {}", args.module))?;
            println!("Unregistered module {}", args.module);
        }
    }

    Ok(())
}

/// Print per-module outcomes. A run with failed modules still exits 0; only
/// setup and configuration errors abort the invocation.
fn report(result: &RunResult) {
    if !result.succeeded.is_empty() {
        println!("Succeeded: {}", result.succeeded.join(", "));
    }
    if !result.failed.is_empty() {
        println!("Failed: {}", result.failed.join(", "));
    }
}
