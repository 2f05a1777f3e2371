//! Host environment detection.
//!
//! Inspects the OS and environment variables to figure out which shell the
//! user runs, who they are and where home is. Detection never fails: unknown
//! values degrade to `Shell::Unknown` and the executor picks a per-OS
//! fallback.

use crate::domain::{Env, Shell};
use std::path::{Path, PathBuf};

/// Detect the current environment from `SHELL`, `USER`/`USERNAME`,
/// `HOME`/`USERPROFILE` and the Windows shell markers `PSModulePath` and
/// `ComSpec`.
pub fn detect_environment() -> Env {
    let os = std::env::consts::OS.to_string();
    let (mut shell, mut shell_path) = detect_shell_from_env();

    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();

    let home = crate::config::home_dir().unwrap_or_else(|_| PathBuf::from("/tmp"));

    if os == "windows" {
        if std::env::var_os("PSModulePath").is_some() && command_exists("powershell") {
            shell = Shell::PowerShell;
            shell_path = "powershell.exe".to_string();
        }
        if shell == Shell::Unknown {
            if let Ok(comspec) = std::env::var("ComSpec") {
                if !comspec.is_empty() {
                    shell = Shell::Cmd;
                    shell_path = comspec;
                }
            }
        }
        if git_bash_available() {
            shell = Shell::Bash;
            shell_path = "bash.exe".to_string();
        }
    }

    Env { os, shell, shell_path, user, home }
}

fn detect_shell_from_env() -> (Shell, String) {
    let Ok(raw) = std::env::var("SHELL") else {
        return (Shell::Unknown, String::new());
    };
    let lower = raw.to_lowercase();

    let shell = if lower.contains("bash") {
        Shell::Bash
    } else if lower.contains("zsh") {
        Shell::Zsh
    } else if lower.contains("fish") {
        Shell::Fish
    } else if lower.contains("powershell") {
        Shell::PowerShell
    } else if lower.contains("cmd") {
        Shell::Cmd
    } else {
        Shell::Unknown
    };

    (shell, raw)
}

fn git_bash_available() -> bool {
    const CANDIDATES: &[&str] = &[
        "C:\\Program Files\\Git\\bin\\bash.exe",
        "C:\\Program Files (x86)\\Git\\bin\\bash.exe",
    ];
    CANDIDATES.iter().any(|p| Path::new(p).exists()) || command_exists("git-bash")
}

/// True when `name` resolves to an executable on `PATH`.
pub fn command_exists(name: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };

    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return true;
        }
        if cfg!(windows) && is_executable(&candidate.with_extension("exe")) {
            return true;
        }
    }
    false
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_environment_reports_current_os() {
        let env = detect_environment();
        assert_eq!(env.os, std::env::consts::OS);
    }

    #[test]
    fn command_exists_finds_a_universal_binary() {
        // `sh` is present on every Unix; on Windows `cmd` resolves via PATH.
        if cfg!(unix) {
            assert!(command_exists("sh"));
        }
        assert!(!command_exists("definitely-not-a-real-binary-2f9a"));
    }
}
