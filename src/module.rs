//! Per-module backup/restore orchestration.
//!
//! A module owns a subtree `<name>/` of the vault with `data/` for regular
//! files and `blobs/` for large files that go through the content-addressed
//! store. Backup is transactional per module: either the module's changes
//! end up in exactly one commit, or the subtree is rolled back to the state
//! it had before this module started.

use crate::blobs::BlobStore;
use crate::git::Git;
use crate::hooks::{HookAction, HookContext, HookRunner};
use crate::registry::ModuleConfig;
use crate::status;
use crate::{Result, VaultError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a successful backup did for one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The module's changes were committed.
    Committed,
    /// The export hook produced no changes; nothing was committed.
    Unchanged,
}

pub struct ModuleRunner<'a> {
    git: &'a Git,
    hooks: &'a dyn HookRunner,
    config: &'a ModuleConfig,
    home: &'a Path,
    blobs: BlobStore,
    data_dir: PathBuf,
    blobs_dir: PathBuf,
    rel_root: String,
    rel_blobs: String,
    /// Commit to roll back to if this module fails; recorded at the start
    /// of `backup`.
    head_before: Option<String>,
}

impl<'a> ModuleRunner<'a> {
    pub fn new(
        git: &'a Git,
        hooks: &'a dyn HookRunner,
        config: &'a ModuleConfig,
        home: &'a Path,
    ) -> Self {
        let root_dir = git.path().join(&config.name);
        let data_dir = root_dir.join("data");
        let blobs_dir = root_dir.join("blobs");
        let rel_root = config.name.clone();
        let rel_blobs = format!("{}/blobs", config.name);
        Self {
            git,
            hooks,
            config,
            home,
            blobs: BlobStore::new(git.path()),
            data_dir,
            blobs_dir,
            rel_root,
            rel_blobs,
            head_before: None,
        }
    }

    fn hook_context(&self) -> HookContext {
        HookContext {
            data_dir: self.data_dir.clone(),
            blobs_dir: self.blobs_dir.clone(),
            home_dir: self.home.to_path_buf(),
        }
    }

    /// Export the module into its staging subtree, dedup blobs, and commit.
    ///
    /// `stamp` is the run's timestamp tag, folded into the commit message so
    /// each module commit names the run it belongs to.
    pub fn backup(&mut self, stamp: &str) -> Result<Outcome> {
        self.head_before = Some(self.git.rev_parse("HEAD")?);

        self.stage()?;

        self.hooks
            .run(&self.config.script, HookAction::Export, &self.hook_context())?;

        // Route exported blobs through the content-addressed store; a
        // working-tree deletion means the file disappeared from the source
        // and must leave the index too.
        for entry in self.git.status(Some(&self.rel_blobs))? {
            if entry.is_deletion() {
                self.git.rm(&entry.path)?;
            } else {
                self.blobs.add(self.git, &entry.path)?;
            }
        }

        let changes = self.git.status(Some(&self.rel_root))?;
        if changes.is_empty() {
            info!("nothing to backup for {}", self.config.name);
            return Ok(Outcome::Unchanged);
        }

        self.git.add_all(&self.rel_root)?;

        // After staging, every tracked change must be index-only.
        let staged = self.git.status(Some(&self.rel_root))?;
        if staged.iter().any(|e| !e.is_tree_clean()) {
            return Err(VaultError::DirtyTree {
                dir: self.rel_root.clone(),
                status: status::dump(&staged),
            });
        }

        self.git.commit(&format!("{} {}", self.config.name, stamp))?;

        let residue = self.git.status(Some(&self.rel_root))?;
        if residue.iter().any(|e| !e.is_clean()) {
            return Err(VaultError::NotFullyCommitted {
                dir: self.rel_root.clone(),
                status: status::dump(&residue),
            });
        }

        Ok(Outcome::Committed)
    }

    /// Recreate the module's staging directories from scratch.
    fn stage(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.blobs_dir] {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
        }
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(&self.blobs_dir)?;
        Ok(())
    }

    /// Reset the repository to the pre-module commit and drop untracked
    /// residue under the module subtree.
    pub fn rollback(&self) -> Result<()> {
        if let Some(head) = &self.head_before {
            debug!("rolling back {} to {}", self.config.name, head);
            self.git.reset_hard(head)?;
            self.git.clean_untracked(Some(&self.rel_root))?;
        }
        Ok(())
    }

    /// Feed the checked-out snapshot back through the module's import hook.
    pub fn restore(&self) -> Result<()> {
        self.hooks
            .run(&self.config.script, HookAction::Import, &self.hook_context())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandRunner, ExecOutput};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Fake git: answers each `status` call with the next scripted porcelain
    /// payload, everything else succeeds silently.
    struct ScriptedGit {
        statuses: Mutex<VecDeque<&'static str>>,
    }

    impl ScriptedGit {
        fn new(statuses: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
            })
        }
    }

    impl CommandRunner for ScriptedGit {
        fn run(
            &self,
            _program: &str,
            args: &[String],
            _cwd: &Path,
            _timeout: Option<Duration>,
        ) -> Result<ExecOutput> {
            let stdout = match args.first().map(String::as_str) {
                Some("rev-parse") => "0000000000000000000000000000000000000000\n".to_string(),
                Some("status") => self
                    .statuses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or("")
                    .to_string(),
                _ => String::new(),
            };
            Ok(ExecOutput {
                status: Some(0),
                stdout: stdout.into_bytes(),
                stderr: Vec::new(),
            })
        }
    }

    struct NoopHook;

    impl HookRunner for NoopHook {
        fn run(&self, _script: &Path, _action: HookAction, _ctx: &HookContext) -> Result<()> {
            Ok(())
        }
    }

    fn run_backup(statuses: &[&'static str]) -> Result<Outcome> {
        let tmp = TempDir::new().unwrap();
        let git = Git::new(tmp.path(), ScriptedGit::new(statuses));
        let config = ModuleConfig {
            name: "m".to_string(),
            script: "/bin/true".into(),
            extra: Default::default(),
        };
        let hooks = NoopHook;
        let mut runner = ModuleRunner::new(&git, &hooks, &config, tmp.path());
        runner.backup("2026-08-23T10-00-00.000Z")
    }

    #[test]
    fn test_empty_module_status_means_unchanged() -> Result<()> {
        // blob status, then module status: both empty.
        assert_eq!(run_backup(&["", ""])?, Outcome::Unchanged);
        Ok(())
    }

    #[test]
    fn test_clean_staging_commits() -> Result<()> {
        let outcome = run_backup(&[
            "",                 // blob subtree untouched
            "?? m/data/f\0",    // module has a fresh export
            "A  m/data/f\0",    // fully staged after add -A
            "",                 // clean after commit
        ])?;
        assert_eq!(outcome, Outcome::Committed);
        Ok(())
    }

    #[test]
    fn test_unstaged_residue_after_add_is_a_dirty_tree() {
        let result = run_backup(&[
            "",
            "?? m/data/f\0",
            "?M m/data/f\0", // tree state still dirty after staging
        ]);
        assert!(matches!(result, Err(VaultError::DirtyTree { .. })));
    }

    #[test]
    fn test_leftover_index_entry_after_commit_fails() {
        let result = run_backup(&[
            "",
            "?? m/data/f\0",
            "A  m/data/f\0",
            "A  m/data/f\0", // commit left the entry behind
        ]);
        assert!(matches!(result, Err(VaultError::NotFullyCommitted { .. })));
    }
}
