//! Subprocess plumbing for the capabilities that shell out.

use std::path::Path;
use std::process::Stdio;

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::ToolResult;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished process.
#[derive(Debug)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandOutput {
    /// `stdout`/`stderr`/`exit_code` as a tool result; failure on non-zero exit.
    pub fn into_result(self) -> ToolResult {
        let data = data! {
            "stdout" => self.stdout,
            "stderr" => self.stderr,
            "exit_code" => self.exit_code,
        };
        if self.success {
            return ToolResult::ok(data);
        }
        let error = match (self.exit_code, data["stderr"].as_str()) {
            (_, Some(stderr)) if !stderr.is_empty() => stderr.to_string(),
            (Some(code), _) => format!("Command exited with status {code}"),
            (None, _) => "Command terminated by signal".to_string(),
        };
        ToolResult::failure(data, error)
    }
}

/// Run `command` through the platform shell.
pub async fn shell(command: &str, cwd: Option<&Path>) -> Result<CommandOutput, ToolError> {
    if cfg!(target_os = "windows") {
        run("cmd", &["/C", command], cwd).await
    } else {
        run("sh", &["-c", command], cwd).await
    }
}

/// Run a program with an argument vector and capture its output.
///
/// stdin is closed so a command never blocks on the terminal, and the child
/// is killed if the future is dropped (e.g. on Ctrl-C).
pub async fn run(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput, ToolError> {
    debug!(program, ?args, "Spawning process");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command.output().await.map_err(|source| ToolError::Spawn {
        program: program.to_string(),
        source,
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        exit_code: output.status.code(),
        success: output.status.success(),
    })
}
