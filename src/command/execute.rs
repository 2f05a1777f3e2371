//! Shell dispatch and typed execution errors.
//!
//! The executor receives a command that already passed extraction, safety
//! and sandbox checks, then hands it to the host shell with inherited
//! stdio. Child failures are classified from the exit status so the REPL
//! can print a useful remedy.

use std::process::Command;
use thiserror::Error;

use crate::command::{safety, sandbox::DirectorySandbox, sandbox::SandboxViolation};
use crate::domain::{Env, ExecuteConfig, Shell};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command")]
    Empty,
    #[error("command blocked for safety: {0}")]
    Blocked(String),
    #[error("command has unbalanced quotes: {0}")]
    UnmatchedQuote(String),
    #[error("command cancelled by user")]
    Cancelled,
    #[error("sandbox violation: {0}")]
    Sandbox(#[from] SandboxViolation),
    #[error("failed to start shell: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("command not found (exit {code})")]
    CommandNotFound { code: i32 },
    #[error("permission denied (exit {code})")]
    PermissionDenied { code: i32 },
    #[error("shell syntax error (exit {code})")]
    SyntaxError { code: i32 },
    #[error("no such file or directory: {path}")]
    NoSuchFile { path: String },
    #[error("command exited with status {code}")]
    Failed { code: i32 },
    #[error("command terminated by signal")]
    Signalled,
}

impl ExecError {
    /// A one-line remedy suitable for the REPL.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ExecError::CommandNotFound { .. } => {
                Some("The command or program may not be installed")
            }
            ExecError::NoSuchFile { .. } => Some("Check if the file or directory exists"),
            ExecError::PermissionDenied { .. } => {
                Some("You may need elevated privileges for this command")
            }
            ExecError::SyntaxError { .. } => {
                Some("The command has shell syntax errors; try rephrasing your request")
            }
            ExecError::UnmatchedQuote(_) => Some("There are unmatched quotes or parentheses"),
            _ => None,
        }
    }
}

/// Validate against the sandbox, then execute.
pub fn run_in_sandbox(
    command: &str,
    config: &ExecuteConfig,
    env: &Env,
    sandbox: &DirectorySandbox,
) -> Result<(), ExecError> {
    sandbox.validate_command(command)?;
    execute_command(command, config, env)
}

/// Execute a validated command in the host shell.
pub fn execute_command(command: &str, config: &ExecuteConfig, env: &Env) -> Result<(), ExecError> {
    let command = command.trim();
    if command.is_empty() {
        return Err(ExecError::Empty);
    }

    if config.safe_mode && !safety::is_command_safe(command) {
        return Err(ExecError::Blocked(command.to_string()));
    }

    let single = command.matches('\'').count();
    let double = command.matches('"').count();
    if (single % 2 != 0 && single > 1) || (double % 2 != 0 && double > 1) {
        return Err(ExecError::UnmatchedQuote(command.to_string()));
    }

    if config.dry_run {
        println!("Dry run - command not executed: {command}");
        return Ok(());
    }

    if !config.auto_confirm && safety::is_potentially_dangerous(command) {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("This command might be dangerous. Continue?")
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            return Err(ExecError::Cancelled);
        }
    }

    let mut child = shell_invocation(command, env);
    let status = child.status()?;

    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(127) => Err(ExecError::CommandNotFound { code: 127 }),
        Some(126) => Err(ExecError::PermissionDenied { code: 126 }),
        Some(code @ (1 | 2)) => {
            // Many tools exit 1/2 for a missing operand; surface the more
            // precise error when a path-looking argument does not exist.
            if let Some(path) = missing_path_argument(command) {
                return Err(ExecError::NoSuchFile { path });
            }
            if code == 2 {
                Err(ExecError::SyntaxError { code })
            } else {
                Err(ExecError::Failed { code })
            }
        }
        Some(code) => Err(ExecError::Failed { code }),
        None => Err(ExecError::Signalled),
    }
}

/// Build the shell invocation for the detected environment. Child stdio is
/// inherited from the parent.
fn shell_invocation(command: &str, env: &Env) -> Command {
    match env.shell {
        Shell::PowerShell => {
            let mut cmd = Command::new("powershell");
            cmd.args(["-Command", command]);
            cmd
        }
        Shell::Cmd => {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", command]);
            cmd
        }
        Shell::Bash | Shell::Zsh | Shell::Fish => {
            let mut cmd = Command::new(env.shell.name());
            cmd.args(["-c", command]);
            cmd
        }
        Shell::Unknown => {
            if cfg!(windows) {
                let mut cmd = Command::new("cmd");
                cmd.args(["/C", command]);
                cmd
            } else {
                let mut cmd = Command::new("sh");
                cmd.args(["-c", command]);
                cmd
            }
        }
    }
}

/// First non-flag argument that looks like a path but does not exist.
fn missing_path_argument(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .skip(1)
        .map(|token| token.trim_matches(|c| c == '\'' || c == '"'))
        .filter(|token| !token.starts_with('-'))
        .filter(|token| token.contains('/') || token.contains('.'))
        .filter(|token| !token.contains('*') && !token.contains('$'))
        .find(|token| !std::path::Path::new(token).exists())
        .map(str::to_string)
}
