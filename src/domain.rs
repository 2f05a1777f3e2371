//! Shared value types used across subsystems.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Detected host environment: operating system, shell and user identity.
#[derive(Debug, Clone)]
pub struct Env {
    pub os: String,
    pub shell: Shell,
    pub shell_path: String,
    pub user: String,
    pub home: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Cmd,
    Unknown,
}

impl Shell {
    pub fn name(&self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::PowerShell => "powershell",
            Shell::Cmd => "cmd",
            Shell::Unknown => "unknown",
        }
    }

    pub fn is_unix_like(&self) -> bool {
        matches!(self, Shell::Bash | Shell::Zsh | Shell::Fish)
    }
}

/// A parsed manual entry for one command. Immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManPage {
    pub name: String,
    pub description: String,
    pub synopsis: String,
    pub options: Vec<String>,
    pub examples: Vec<String>,
    pub category: String,
    pub source_path: String,
    pub full_text: String,
}

/// Merged, deduplicated view of everything the store knows about one command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub synopsis: String,
    pub options: Vec<String>,
    pub examples: Vec<String>,
}

/// Output of a retrieval query.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub commands: Vec<CommandInfo>,
    pub query: String,
    pub elapsed: Duration,
    pub used_rag: bool,
}

/// A command suggested for a user intent, with a confidence in [0, 1].
#[derive(Debug, Clone)]
pub struct CommandSuggestion {
    pub command: String,
    pub description: String,
    pub confidence: f32,
}

/// Execution preferences threaded through the command pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecuteConfig {
    pub dry_run: bool,
    pub auto_confirm: bool,
    pub safe_mode: bool,
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        ExecuteConfig { dry_run: false, auto_confirm: false, safe_mode: true }
    }
}
