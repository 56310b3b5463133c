//! Blocking subprocess execution.
//!
//! Everything the engine spawns (git subcommands, module hook scripts) goes
//! through the [`CommandRunner`] trait so callers can inject their own
//! executor. [`SystemRunner`] is the real one.

use crate::{Result, VaultError};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Captured result of one subprocess invocation.
///
/// A non-zero exit is not an error at this layer; callers decide whether a
/// given invocation is allowed to fail.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Render a command line for logs and error payloads.
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string());
    parts.extend(args.iter().cloned());
    parts.join(" ")
}

/// Process-execution seam injected into the vault engine.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `cwd`, blocking until it exits or the
    /// optional timeout expires.
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput>;
}

/// Real executor built on `std::process::Command`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        let command = render_command(program, args);
        debug!("exec: {} (cwd: {})", command, cwd.display());

        let mut child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VaultError::ProcessFailure {
                command: command.clone(),
                status: None,
                stderr: format!("failed to start: {}", e),
            })?;

        // Drain both pipes off-thread so a chatty child cannot deadlock on a
        // full pipe buffer while we wait for it.
        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let status = match timeout {
            None => Some(child.wait()?),
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break Some(status);
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        break None;
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        match status {
            Some(status) => Ok(ExecOutput {
                status: status.code(),
                stdout,
                stderr,
            }),
            None => Err(VaultError::ProcessFailure {
                command,
                status: None,
                stderr: format!("timed out after {:?}", timeout.unwrap_or_default()),
            }),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_status() -> Result<()> {
        let out = SystemRunner.run(
            "sh",
            &["-c".to_string(), "echo hello".to_string()],
            Path::new("."),
            None,
        )?;
        assert!(out.success());
        assert_eq!(out.stdout_utf8().trim(), "hello");
        Ok(())
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() -> Result<()> {
        let out = SystemRunner.run(
            "sh",
            &["-c".to_string(), "exit 7".to_string()],
            Path::new("."),
            None,
        )?;
        assert!(!out.success());
        assert_eq!(out.status, Some(7));
        Ok(())
    }

    #[test]
    fn test_timeout_kills_the_child() {
        let result = SystemRunner.run(
            "sh",
            &["-c".to_string(), "sleep 5".to_string()],
            Path::new("."),
            Some(Duration::from_millis(100)),
        );
        assert!(matches!(
            result,
            Err(VaultError::ProcessFailure { status: None, .. })
        ));
    }

    #[test]
    fn test_spawn_failure_carries_command() {
        let result = SystemRunner.run(
            "definitely-not-a-real-binary",
            &[],
            Path::new("."),
            None,
        );
        match result {
            Err(VaultError::ProcessFailure { command, .. }) => {
                assert!(command.contains("definitely-not-a-real-binary"));
            }
            other => panic!("expected ProcessFailure, got {:?}", other.map(|_| ())),
        }
    }
}
