use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, timeout_at};
use tracing::{info, warn};

use super::{Tool, ToolResult, floor_char_boundary, log_denial};
use crate::admission::CommandAdmissionFilter;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_OUTPUT_BYTES: usize = 100_000;
/// Bytes kept per stream; the slack leaves room to cut on a char boundary.
const CAPTURE_LIMIT: usize = MAX_OUTPUT_BYTES + 4;
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteShellArgs {
    pub command: Vec<String>,
    /// Seconds; zero or negative falls back to the default
    #[serde(default)]
    pub timeout: Option<i64>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteShellResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub command: String,
    pub success: bool,
}

impl ExecuteShellResult {
    fn failure(command: String, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: -1,
            command,
            success: false,
        }
    }
}

impl ToolResult for ExecuteShellResult {
    fn succeeded(&self) -> bool {
        self.success
    }
}

/// Tool for launching a whitelisted program without a shell
pub struct ExecuteShellTool {
    commands: CommandAdmissionFilter,
}

impl ExecuteShellTool {
    pub fn new(commands: CommandAdmissionFilter) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl Tool for ExecuteShellTool {
    type Args = ExecuteShellArgs;
    type Output = ExecuteShellResult;

    fn name(&self) -> &str {
        "execute_shell_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return the complete results including stdout, stderr, and exit code"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "The command to execute as an array of strings"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Maximum execution time in seconds (default: 60, max: 300)"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Working directory for command execution"
                }
            },
            "required": ["command"]
        })
    }

    async fn run(&self, args: ExecuteShellArgs) -> ExecuteShellResult {
        let command_line = args.command.join(" ");
        let Some((program, rest)) = args.command.split_first() else {
            return ExecuteShellResult::failure(command_line, "Empty command");
        };

        let timeout_secs = args
            .timeout
            .and_then(|t| u64::try_from(t).ok())
            .filter(|&t| t > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .min(MAX_TIMEOUT_SECS);

        let executable = match self.commands.resolve(program) {
            Ok(exe) => exe,
            Err(reason) => {
                log_denial(self.name(), program, &reason);
                return ExecuteShellResult::failure(
                    command_line,
                    format!("Command '{}' is not allowed: {}", program, reason),
                );
            }
        };

        let working_dir = match args.working_dir.as_deref() {
            None => None,
            Some(dir) => match self.commands.paths().resolve(dir) {
                Ok(resolved) => Some(resolved),
                Err(reason) => {
                    log_denial(self.name(), dir, &reason);
                    return ExecuteShellResult::failure(
                        command_line,
                        format!("Working directory is not allowed: {}", reason),
                    );
                }
            },
        };

        let mut cmd = Command::new(&executable);
        cmd.args(rest);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        if let Some(dir) = &working_dir {
            cmd.current_dir(dir);
        }

        info!(command = %command_line, timeout_secs, "launching command");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecuteShellResult::failure(
                    command_line,
                    format!("Error starting command: {}", e),
                );
            }
        };

        // Pipes are drained concurrently so a timeout still has the output so far
        let stdout = Capture::spawn(child.stdout.take());
        let stderr = Capture::spawn(child.stderr.take());
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return ExecuteShellResult::failure(
                    command_line,
                    format!("Error waiting for command: {}", e),
                );
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(command = %command_line, error = %e, "failed to kill timed out command");
                }
                let grace = Instant::now() + DRAIN_GRACE;
                let partial_stdout = stdout.finish(grace).await;
                let partial_stderr = stderr.finish(grace).await;
                return ExecuteShellResult {
                    stdout: partial_stdout,
                    stderr: format!(
                        "Command timed out after {} seconds\n{}",
                        timeout_secs, partial_stderr
                    ),
                    exit_code: -1,
                    command: command_line,
                    success: false,
                };
            }
        };

        // A background grandchild may hold the pipes open past the deadline
        let grace = deadline.max(Instant::now() + DRAIN_GRACE);
        ExecuteShellResult {
            stdout: stdout.finish(grace).await,
            stderr: stderr.finish(grace).await,
            exit_code: status.code().unwrap_or(-1),
            command: command_line,
            success: status.success(),
        }
    }
}

/// Collects one child pipe in the background.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else { return };
            let mut chunk = [0u8; 8192];
            loop {
                let n = match reader.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                // Keep draining past the cap so the child never blocks on a full pipe
                if let Ok(mut held) = sink.lock() {
                    let room = CAPTURE_LIMIT.saturating_sub(held.len());
                    held.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        });
        Self { buf, task }
    }

    /// Wait for EOF until `deadline`, then return whatever was read.
    async fn finish(mut self, deadline: Instant) -> String {
        if timeout_at(deadline, &mut self.task).await.is_err() {
            self.task.abort();
        }
        let bytes = self.buf.lock().map(|held| held.clone()).unwrap_or_default();
        truncate_output(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Truncate if too long (find nearest char boundary to avoid panic)
fn truncate_output(mut text: String) -> String {
    if text.len() > MAX_OUTPUT_BYTES {
        let boundary = floor_char_boundary(&text, MAX_OUTPUT_BYTES);
        text.truncate(boundary);
        text.push_str("\n... [output truncated]");
    }
    text
}
