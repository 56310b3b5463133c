//! Typed facade over the `git` command line.
//!
//! Every repository primitive the engine needs (status, add, rm, commit,
//! tag, notes, config, hash-object, rev-parse, checkout, reset, clean) is a
//! method here, so the rest of the crate never builds git argument lists.

use crate::process::{render_command, CommandRunner, ExecOutput};
use crate::status::{self, StatusEntry};
use crate::{Result, VaultError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct Git {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
            timeout: None,
        }
    }

    /// Kill git invocations that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Working-tree root the commands run in.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Run a git subcommand; non-zero exit is reported in the output, not
    /// as an error.
    fn run(&self, args: &[&str]) -> Result<ExecOutput> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.runner.run("git", &args, &self.root, self.timeout)
    }

    /// Run a git subcommand and fail on non-zero exit.
    fn check_run(&self, args: &[&str]) -> Result<ExecOutput> {
        let output = self.run(args)?;
        if !output.success() {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            return Err(VaultError::ProcessFailure {
                command: render_command("git", &args),
                status: output.status,
                stderr: output.stderr_utf8(),
            });
        }
        Ok(output)
    }

    /// First stdout line of a checked invocation, trimmed.
    fn check_line(&self, args: &[&str]) -> Result<String> {
        let output = self.check_run(args)?;
        Ok(output
            .stdout_utf8()
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string())
    }

    pub fn init(&self) -> Result<()> {
        self.check_run(&["init"])?;
        Ok(())
    }

    pub fn config(&self, key: &str, value: &str) -> Result<()> {
        self.check_run(&["config", key, value])?;
        Ok(())
    }

    /// Porcelain status, optionally restricted to a pathspec.
    pub fn status(&self, pathspec: Option<&str>) -> Result<Vec<StatusEntry>> {
        let mut args = vec!["status", "-z"];
        if let Some(path) = pathspec {
            args.push("--");
            args.push(path);
        }
        let output = self.check_run(&args)?;
        let raw = output.stdout_utf8();
        status::parse(raw.split('\0'))
    }

    /// Stage everything under a pathspec, including deletions.
    pub fn add_all(&self, pathspec: &str) -> Result<()> {
        self.check_run(&["add", "-A", "--", pathspec])?;
        Ok(())
    }

    pub fn add(&self, path: &str) -> Result<()> {
        self.check_run(&["add", "--", path])?;
        Ok(())
    }

    pub fn rm(&self, path: &str) -> Result<()> {
        self.check_run(&["rm", "--", path])?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.check_run(&["commit", "-m", message])?;
        Ok(())
    }

    /// Content hash of a working-tree file via the repository's own
    /// object-hashing primitive.
    pub fn hash_object(&self, path: &str) -> Result<String> {
        self.check_line(&["hash-object", path])
    }

    pub fn rev_parse(&self, rev: &str) -> Result<String> {
        self.check_line(&["rev-parse", rev])
    }

    /// Short name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        self.check_line(&["symbolic-ref", "--short", "HEAD"])
    }

    pub fn tag_create(&self, name: &str) -> Result<()> {
        self.check_run(&["tag", name])?;
        Ok(())
    }

    /// Delete a tag if it exists; missing tags are not an error.
    pub fn tag_delete(&self, name: &str) -> Result<()> {
        self.run(&["tag", "-d", name])?;
        Ok(())
    }

    pub fn tag_list(&self) -> Result<Vec<String>> {
        let output = self.check_run(&["tag"])?;
        Ok(output
            .stdout_utf8()
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub fn checkout(&self, rev: &str) -> Result<()> {
        self.check_run(&["checkout", rev])?;
        Ok(())
    }

    pub fn reset_hard(&self, rev: &str) -> Result<()> {
        self.check_run(&["reset", "--hard", rev])?;
        Ok(())
    }

    /// Remove untracked files and directories, optionally scoped to a
    /// pathspec.
    pub fn clean_untracked(&self, pathspec: Option<&str>) -> Result<()> {
        let mut args = vec!["clean", "-fd"];
        if let Some(path) = pathspec {
            args.push("--");
            args.push(path);
        }
        self.check_run(&args)?;
        Ok(())
    }

    /// Attach (or replace) a note on the commit `rev` resolves to.
    pub fn notes_add(&self, rev: &str, message: &str) -> Result<()> {
        self.check_run(&["notes", "add", "-f", "-m", message, rev])?;
        Ok(())
    }

    /// Note attached to the commit `rev` resolves to, if any.
    pub fn notes_show(&self, rev: &str) -> Result<Option<String>> {
        let output = self.run(&["notes", "show", rev])?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout_utf8().trim_end().to_string()))
    }
}
