//! The vault engine.
//!
//! A vault is a git repository used as an append-only snapshot store. Each
//! registered module is backed up transactionally (commit or roll back),
//! then the run is sealed with a timestamp snapshot tag, a movable `latest`
//! pointer, and an optional annotation note.

use crate::git::Git;
use crate::hooks::{HookRunner, ScriptHook};
use crate::module::ModuleRunner;
use crate::process::{CommandRunner, SystemRunner};
use crate::registry::{ModuleConfig, Registry, REGISTRY_FILE};
use crate::snapshot::{Snapshot, SnapshotManager};
use crate::{Result, VaultError};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// File holding the vault creation timestamp, committed at init.
pub const ANCHOR_FILE: &str = ".vault";
/// File holding the snapshot tag and free-text message of the last run.
pub const MESSAGE_FILE: &str = ".message";

/// Options for a backup run.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Home directory handed to export hooks.
    pub home: PathBuf,
    /// Back up only this module instead of all registered ones.
    pub module: Option<String>,
    /// Free-text message recorded with the snapshot.
    pub message: Option<String>,
}

/// Options for a restore run.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Home directory handed to import hooks.
    pub home: PathBuf,
    /// Snapshot to restore from (without the reserved prefix).
    pub snapshot: String,
    /// Restore only this module instead of all registered ones.
    pub module: Option<String>,
}

/// Per-module outcome of a backup or restore run.
///
/// Module failures never abort a run; they are rolled back and recorded
/// here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub snapshot: Option<String>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

pub struct Vault {
    root: PathBuf,
    git: Git,
    runner: Arc<dyn CommandRunner>,
    hooks: Box<dyn HookRunner>,
}

impl Vault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_runner(root, Arc::new(SystemRunner))
    }

    /// Construct with an injected process executor (used by both the git
    /// adapter and the default hook runner).
    pub fn with_runner(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        let root = root.into();
        Self {
            git: Git::new(root.as_path(), runner.clone()),
            hooks: Box::new(ScriptHook::new(runner.clone(), None)),
            runner,
            root,
        }
    }

    /// Replace the hook runner entirely.
    pub fn with_hooks(mut self, hooks: Box<dyn HookRunner>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Kill export/import hooks that run longer than `timeout`.
    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hooks = Box::new(ScriptHook::new(self.runner.clone(), Some(timeout)));
        self
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the vault repository.
    ///
    /// Fails if the directory already exists; on any later failure the
    /// partially created directory is removed again.
    pub fn init(&self, config_overrides: &[(String, String)]) -> Result<()> {
        if self.root.exists() {
            return Err(VaultError::Config {
                reason: format!("vault directory {} already exists", self.root.display()),
            });
        }
        fs::create_dir_all(&self.root)?;

        let result = self.init_repository(config_overrides);
        if result.is_err() {
            let _ = fs::remove_dir_all(&self.root);
        }
        result
    }

    fn init_repository(&self, config_overrides: &[(String, String)]) -> Result<()> {
        self.git.init()?;
        if !self.root.join(".git").is_dir() {
            return Err(VaultError::Config {
                reason: format!("no .git after init in {}", self.root.display()),
            });
        }

        // Untracked-file visibility is what makes status-driven change
        // detection see fresh module exports; the identity keys make
        // commits possible on hosts without git configuration.
        let mut config = vec![
            ("status.showUntrackedFiles".to_string(), "all".to_string()),
            ("user.name".to_string(), "vault".to_string()),
            ("user.email".to_string(), "vault@localhost".to_string()),
        ];
        config.extend(config_overrides.iter().cloned());
        for (key, value) in &config {
            self.git.config(key, value)?;
        }

        let stamp = timestamp_tag(Utc::now());
        fs::write(self.root.join(ANCHOR_FILE), format!("{}\n", stamp))?;
        self.git.add(ANCHOR_FILE)?;
        self.git.commit("anchor")?;
        self.git.tag_create("anchor")?;

        info!("initialized vault at {}", self.root.display());
        Ok(())
    }

    /// Back up the selected modules and seal the run with a snapshot.
    pub fn backup(&self, opts: &BackupOptions) -> Result<RunResult> {
        let registry = Registry::load(&self.root)?;
        let selected = select_modules(&registry, opts.module.as_deref())?;
        let stamp = timestamp_tag(Utc::now());

        let mut result = RunResult::default();
        for config in selected {
            let mut runner = ModuleRunner::new(&self.git, self.hooks.as_ref(), config, &opts.home);
            match runner.backup(&stamp) {
                Ok(outcome) => {
                    info!("backed up {} ({:?})", runner.name(), outcome);
                    result.succeeded.push(config.name.clone());
                }
                Err(err) => {
                    let err = err.for_module(&config.name);
                    error!("failed to backup {}: {}", config.name, err);
                    if let Err(rollback_err) = runner.rollback() {
                        error!("rollback of {} failed: {}", config.name, rollback_err);
                    }
                    result.failed.push(config.name.clone());
                }
            }
        }

        let message = opts.message.clone().unwrap_or_default();
        fs::write(
            self.root.join(MESSAGE_FILE),
            format!("{}\n{}\n", stamp, message),
        )?;
        self.git.add(MESSAGE_FILE)?;
        self.git.commit(&stamp)?;

        let snapshots = SnapshotManager::new(&self.git);
        snapshots.create(&stamp)?;
        snapshots.retag_latest()?;
        if !message.is_empty() {
            snapshots.annotate(&stamp, &message)?;
        }

        info!(
            "backup run {} finished: {} succeeded, {} failed",
            stamp,
            result.succeeded.len(),
            result.failed.len()
        );
        result.snapshot = Some(stamp);
        Ok(result)
    }

    /// Activate a snapshot and run the import hooks of the selected modules.
    pub fn restore(&self, opts: &RestoreOptions) -> Result<RunResult> {
        let branch = self.git.current_branch()?;
        let snapshots = SnapshotManager::new(&self.git);
        snapshots.activate(&opts.snapshot)?;

        let result = self.restore_modules(opts);

        // Always leave the working tree back on the branch, even when a
        // module import failed.
        if let Err(err) = self.git.checkout(&branch) {
            if result.is_ok() {
                return Err(err);
            }
            error!("failed to return to branch {}: {}", branch, err);
        }
        result
    }

    fn restore_modules(&self, opts: &RestoreOptions) -> Result<RunResult> {
        // The registry is read after activation, so the module set matches
        // the snapshot being restored.
        let registry = Registry::load(&self.root)?;
        let selected = select_modules(&registry, opts.module.as_deref())?;

        let mut result = RunResult {
            snapshot: Some(opts.snapshot.clone()),
            ..RunResult::default()
        };
        for config in selected {
            let runner = ModuleRunner::new(&self.git, self.hooks.as_ref(), config, &opts.home);
            match runner.restore() {
                Ok(()) => {
                    info!("restored {}", config.name);
                    result.succeeded.push(config.name.clone());
                }
                Err(err) => {
                    error!(
                        "failed to restore {}: {}",
                        config.name,
                        err.for_module(&config.name)
                    );
                    result.failed.push(config.name.clone());
                }
            }
        }
        Ok(result)
    }

    /// All snapshots in tag order.
    pub fn snapshots(&self) -> Result<Vec<Snapshot>> {
        SnapshotManager::new(&self.git).list()
    }

    /// Current module registry.
    pub fn registry(&self) -> Result<Registry> {
        Registry::load(&self.root)
    }

    /// Add a module to the registry; the mutation gets its own commit.
    pub fn register(&self, config: ModuleConfig) -> Result<()> {
        let name = config.name.clone();
        let mut registry = Registry::load(&self.root)?;
        registry.insert(config)?;
        registry.save(&self.root)?;
        self.git.add(REGISTRY_FILE)?;
        self.git.commit(&format!("+{}", name))?;
        info!("registered module {}", name);
        Ok(())
    }

    /// Remove a module from the registry; the mutation gets its own commit.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let mut registry = Registry::load(&self.root)?;
        registry.remove(name)?;
        registry.save(&self.root)?;
        self.git.add(REGISTRY_FILE)?;
        self.git.commit(&format!("-{}", name))?;
        info!("unregistered module {}", name);
        Ok(())
    }
}

fn select_modules<'a>(
    registry: &'a Registry,
    module: Option<&str>,
) -> Result<Vec<&'a ModuleConfig>> {
    match module {
        Some(name) => {
            let config = registry.get(name).ok_or_else(|| VaultError::Config {
                reason: format!("module {} is not registered", name),
            })?;
            Ok(vec![config])
        }
        None => Ok(registry.modules().values().collect()),
    }
}

/// ISO-8601 timestamp with `:` replaced by `-`, usable as a git tag.
pub fn timestamp_tag(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string()
}

/// Parse `key=value,key=value` git config overrides; malformed pairs are
/// skipped.
pub fn parse_git_config(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse a `name=...,script=...[,key=value...]` module description.
pub fn parse_module_data(raw: &str) -> Result<ModuleConfig> {
    let mut name = None;
    let mut script = None;
    let mut extra = std::collections::BTreeMap::new();

    for (key, value) in parse_git_config(raw) {
        match key.as_str() {
            "name" => name = Some(value),
            "script" => script = Some(PathBuf::from(value)),
            _ => {
                extra.insert(key, value);
            }
        }
    }

    match (name, script) {
        (Some(name), Some(script)) => Ok(ModuleConfig {
            name,
            script,
            extra,
        }),
        _ => Err(VaultError::Config {
            reason: "module data needs at least name=...,script=...".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_timestamp_tag_has_no_colons() {
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 10, 2, 3).unwrap();
        let tag = timestamp_tag(at);
        assert_eq!(tag, "2026-08-23T10-02-03.000Z");
        assert!(!tag.contains(':'));
    }

    #[test]
    fn test_parse_git_config_skips_malformed_pairs() {
        let parsed = parse_git_config("core.compression=9,=oops,nopair,user.name=me");
        assert_eq!(
            parsed,
            vec![
                ("core.compression".to_string(), "9".to_string()),
                ("user.name".to_string(), "me".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_module_data_collects_extra_fields() -> Result<()> {
        let config = parse_module_data("name=contacts,script=/usr/share/contacts/hook,group=pim")?;
        assert_eq!(config.name, "contacts");
        assert_eq!(config.script, PathBuf::from("/usr/share/contacts/hook"));
        assert_eq!(config.extra.get("group"), Some(&"pim".to_string()));
        Ok(())
    }

    #[test]
    fn test_parse_module_data_requires_name_and_script() {
        assert!(matches!(
            parse_module_data("name=contacts"),
            Err(VaultError::Config { .. })
        ));
        assert!(matches!(
            parse_module_data("script=/bin/hook"),
            Err(VaultError::Config { .. })
        ));
    }
}
