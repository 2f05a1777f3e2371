//! Append-only command history.
//!
//! Plain text, one line per REPL input, created with user-only permissions.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Append one line to the history file, creating it if missing.
pub fn append(path: &Path, line: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to open history file {}", path.display()))?;
    writeln!(file, "{line}")
        .with_context(|| format!("failed to append to history file {}", path.display()))
}

/// Previous history lines; any read error yields an empty history.
pub fn load(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(data) => data.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}
