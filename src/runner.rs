//! Sequential shell task execution.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::LitePipeConfig;
use crate::error::{LitePipeError, Result};
use crate::run::{TaskResult, TaskStatus};

/// Runs the configured tasks one after another.
///
/// A failing task never stops the sequence: every task is attempted and gets
/// its own [`TaskResult`].
#[derive(Debug, Clone)]
pub struct TaskRunner {
    tasks: Vec<String>,
    working_directory: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl TaskRunner {
    pub fn new(tasks: Vec<String>, working_directory: Option<PathBuf>) -> Self {
        Self {
            tasks,
            working_directory,
            timeout: None,
        }
    }

    /// Kill and fail any single task that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &LitePipeConfig) -> Self {
        Self::new(config.tasks.clone(), config.tasks_working_directory.clone())
            .with_timeout(config.task_timeout())
    }

    /// Executes every task in order and returns their results in the same
    /// order. Returns only once the last task has finished.
    pub async fn run(&self) -> Vec<TaskResult> {
        let total = self.tasks.len();
        let mut results = Vec::with_capacity(total);

        for (index, command) in self.tasks.iter().enumerate() {
            let ordinal = index + 1;
            info!("({}/{}): {}", ordinal, total, command);

            let started_at = Utc::now();
            let start = Instant::now();
            let outcome = self.run_task(command).await;
            let elapsed = start.elapsed();

            let result = match outcome {
                Ok(status) => {
                    info!("Task completed in {:?}", elapsed);
                    TaskResult {
                        ordinal,
                        command: command.clone(),
                        status: TaskStatus::Success,
                        exit_code: status.code(),
                        error: None,
                        started_at,
                        elapsed,
                    }
                }
                Err(e) => {
                    error!("Task failed: {} in {:?}", e, elapsed);
                    let exit_code = match &e {
                        LitePipeError::TaskExitStatus(status) => status.code(),
                        _ => None,
                    };
                    TaskResult {
                        ordinal,
                        command: command.clone(),
                        status: TaskStatus::Failed,
                        exit_code,
                        error: Some(e.to_string()),
                        started_at,
                        elapsed,
                    }
                }
            };
            results.push(result);
        }

        results
    }

    async fn run_task(&self, command: &str) -> Result<ExitStatus> {
        let mut cmd = shell_command(command);
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        // Output goes straight to our own stdout/stderr as it is produced
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(LitePipeError::TaskSpawnFailed)?;

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        kill_task(&mut child).await;
                        return Err(LitePipeError::TaskTimedOut(limit));
                    }
                }
            }
            None => child.wait().await?,
        };

        if status.success() {
            Ok(status)
        } else {
            Err(LitePipeError::TaskExitStatus(status))
        }
    }
}

/// Kills the task's whole process group, not just the shell, and reaps it.
async fn kill_task(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_process_group(pid);
    }
    if let Err(e) = child.kill().await {
        warn!("Failed to kill timed out task: {}", e);
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // The shell was started with process_group(0), so its pid is the group id
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        warn!(
            "Failed to kill process group {}: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(windows)]
fn kill_process_group(_pgid: u32) {}

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
