//! Module hook contract.
//!
//! Each module supplies an opaque executable invoked as
//! `script --action {export|import} --dir <data> --bin-dir <blobs>
//! --home-dir <home>`. Exit code 0 is success; anything else is a
//! module-scoped failure.

use crate::process::{render_command, CommandRunner};
use crate::{Result, VaultError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Export,
    Import,
}

impl HookAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookAction::Export => "export",
            HookAction::Import => "import",
        }
    }
}

/// Directories handed to a hook invocation.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub data_dir: PathBuf,
    pub blobs_dir: PathBuf,
    pub home_dir: PathBuf,
}

/// Seam for invoking module hooks; injected into the vault engine.
pub trait HookRunner {
    fn run(&self, script: &Path, action: HookAction, ctx: &HookContext) -> Result<()>;
}

/// Default hook runner: spawns the script as a subprocess.
pub struct ScriptHook {
    runner: Arc<dyn CommandRunner>,
    timeout: Option<Duration>,
}

impl ScriptHook {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Option<Duration>) -> Self {
        Self { runner, timeout }
    }
}

impl HookRunner for ScriptHook {
    fn run(&self, script: &Path, action: HookAction, ctx: &HookContext) -> Result<()> {
        let program = script.to_string_lossy().into_owned();
        let args = vec![
            "--action".to_string(),
            action.as_str().to_string(),
            "--dir".to_string(),
            ctx.data_dir.to_string_lossy().into_owned(),
            "--bin-dir".to_string(),
            ctx.blobs_dir.to_string_lossy().into_owned(),
            "--home-dir".to_string(),
            ctx.home_dir.to_string_lossy().into_owned(),
        ];

        // Hooks get absolute directories via flags; the working directory
        // is left as the caller's.
        let output = self.runner.run(&program, &args, Path::new("."), self.timeout)?;

        let stdout = output.stdout_utf8();
        if !stdout.trim().is_empty() {
            info!("hook output: {}", stdout.trim_end());
        }

        if !output.success() {
            return Err(VaultError::ProcessFailure {
                command: render_command(&program, &args),
                status: output.status,
                stderr: output.stderr_utf8(),
            });
        }
        Ok(())
    }
}
