#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Build script execution for buildwatch
//!
//! A build is an ordered list of shell commands run sequentially in the
//! project's working directory. The first command that does not succeed
//! stops the run; its output becomes the build's output. Command failure is
//! data, not an error: the runner always returns a [`BuildStatus`].

use async_trait::async_trait;
use buildwatch_core::BuildStatus;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

/// Executes a project's build script
///
/// A trait so the scheduling layer can be exercised with recording fakes.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Runs `script` in order inside `working_dir`, stopping at the first
    /// failure, and reports the outcome
    async fn execute(&self, working_dir: &Path, script: &[String]) -> BuildStatus;
}

/// [`BuildRunner`] that runs each command through the platform shell
#[derive(Debug, Default)]
pub struct ShellBuildRunner;

impl ShellBuildRunner {
    /// Creates a shell runner
    pub fn new() -> Self {
        Self
    }

    #[cfg(unix)]
    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }

    #[cfg(windows)]
    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    }
}

#[async_trait]
impl BuildRunner for ShellBuildRunner {
    async fn execute(&self, working_dir: &Path, script: &[String]) -> BuildStatus {
        // Empty script: vacuous success with no output.
        let mut status = BuildStatus::new(true, "", "");

        for command in script {
            debug!("Running `{command}` in {}", working_dir.display());

            let output = Self::shell_command(command)
                .current_dir(working_dir)
                .output()
                .await;

            match output {
                Ok(output) => {
                    status = BuildStatus::new(
                        output.status.success(),
                        String::from_utf8_lossy(&output.stdout),
                        String::from_utf8_lossy(&output.stderr),
                    );
                    if !status.succeeded {
                        debug!("Command `{command}` exited with {}", output.status);
                        break;
                    }
                }
                Err(e) => {
                    // Spawn failures (missing shell, bad cwd) are reported in
                    // the status like any failing command.
                    warn!("Failed to spawn `{command}`: {e}");
                    status = BuildStatus::new(false, "", format!("Failed to run `{command}`: {e}"));
                    break;
                }
            }
        }

        status
    }
}
