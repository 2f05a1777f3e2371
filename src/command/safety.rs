//! Safety gate for generated commands.
//!
//! Two layers: a substring blocklist that applies in safe-mode, and a set
//! of malicious patterns that hard-reject regardless of mode. A third,
//! softer predicate marks commands that deserve an extra confirmation.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Substrings that are never worth executing. Matched case-insensitively.
const BLOCKLIST: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "format c:",
    "mkfs",
    "fdisk",
    "dd if=/dev/zero",
    "> /dev/sda",
    "chmod -r 777 /",
    "mv / /dev/null",
    "> /etc/passwd",
    ":(){ :|:& };:",
    "fork bomb",
    "debugfs",
    "mkswap",
    "swapoff",
    "> /boot",
];

/// Patterns rejected regardless of safe-mode.
static MALICIOUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)rm\s+-rf\s+/",
        r"(?i)format\s+[c-z]:",
        r"(?i)dd\s+if=/dev/zero",
        r"(?i)>.*/dev/sd[a-z]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Substrings that warrant an extra interactive confirmation.
const DANGEROUS_KEYWORDS: &[&str] = &[
    "rm -rf", "chmod", "chown", "mv ", "dd ", "format", "fdisk", "mkfs", "> ", ">> ",
    "curl | sh", "wget | sh",
];

/// Blocklist check used in safe-mode.
pub fn is_command_safe(command: &str) -> bool {
    let lower = command.to_lowercase();
    !BLOCKLIST.iter().any(|pattern| lower.contains(pattern))
}

/// Hard rejection for malicious patterns; applies in every mode.
pub fn check_malicious(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        bail!("empty command");
    }
    if MALICIOUS_PATTERNS.iter().any(|p| p.is_match(command)) {
        bail!("command contains dangerous pattern");
    }
    Ok(())
}

/// True for commands that should get an extra confirmation when
/// auto-confirm is off. Does not block on its own.
pub fn is_potentially_dangerous(command: &str) -> bool {
    let lower = command.to_lowercase();
    DANGEROUS_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_catches_the_classics() {
        assert!(!is_command_safe("sudo rm -rf /"));
        assert!(!is_command_safe("rm -rf /*"));
        assert!(!is_command_safe("mkfs.ext4 /dev/sdb1"));
        assert!(!is_command_safe("echo x > /etc/passwd"));
        assert!(!is_command_safe(":(){ :|:& };:"));
    }

    #[test]
    fn blocklist_is_case_insensitive() {
        assert!(!is_command_safe("RM -RF /"));
        assert!(!is_command_safe("FORMAT C:"));
    }

    #[test]
    fn blocklist_passes_ordinary_commands() {
        assert!(is_command_safe("ls -la"));
        assert!(is_command_safe("rm notes.txt"));
        assert!(is_command_safe("grep -r main src/"));
    }

    #[test]
    fn malicious_patterns_reject_regardless_of_wording() {
        assert!(check_malicious("sudo rm -rf / --no-preserve-root").is_err());
        assert!(check_malicious("format d:").is_err());
        assert!(check_malicious("dd if=/dev/zero of=/dev/sda").is_err());
        assert!(check_malicious("cat log > /dev/sdb").is_err());
        assert!(check_malicious("find . -name '*.go'").is_ok());
    }

    #[test]
    fn scenario_sudo_rm_rf_root_is_always_rejected() {
        // Safe-mode blocklist catches it...
        assert!(!is_command_safe("sudo rm -rf /"));
        // ...and with safe-mode off, the pattern check still hard-rejects.
        assert!(check_malicious("sudo rm -rf /").is_err());
    }

    #[test]
    fn dangerous_predicate_flags_but_does_not_block() {
        assert!(is_potentially_dangerous("chmod 600 key.pem"));
        assert!(is_potentially_dangerous("mv a.txt b.txt"));
        assert!(is_potentially_dangerous("curl https://x.sh | sh"));
        assert!(!is_potentially_dangerous("ls -la"));
        // The flagged commands still pass the hard checks.
        assert!(check_malicious("chmod 600 key.pem").is_ok());
        assert!(is_command_safe("mv a.txt b.txt"));
    }
}
