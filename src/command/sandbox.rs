//! Directory sandbox: containment checks and working-directory control.
//!
//! The sandbox owns the process working directory; nothing else in the
//! crate calls `set_current_dir`. The allowed directory starts at the
//! startup working directory and only ever narrows via `change_directory`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SandboxMode {
    /// No checks at all.
    Disabled,
    /// Confined to the allowed directory.
    #[default]
    CurrentDir,
    /// Confined to the allowed directory and its descendants only.
    Strict,
}

impl SandboxMode {
    pub fn label(&self) -> &'static str {
        match self {
            SandboxMode::Disabled => "Disabled (no restrictions)",
            SandboxMode::CurrentDir => "Current Directory Only",
            SandboxMode::Strict => "Strict (current dir + subdirs only)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxViolation {
    #[error("Command contains absolute path traversal")]
    AbsolutePath,
    #[error("Command attempts to escape sandbox directory")]
    DirectoryEscape,
    #[error("Command performs dangerous operations outside sandbox")]
    OutsideSandbox,
    #[error("cannot change to directory outside sandbox: {0}")]
    ChdirOutsideSandbox(String),
}

/// Commands that only read state; directory-escape patterns are tolerated
/// for these.
const OBSERVATIONAL_COMMANDS: &[&str] = &[
    "ls", "find", "grep", "cat", "head", "tail", "file", "stat", "du", "df", "pwd", "echo",
    "print",
];

/// Operations that must not touch paths outside the allowed directory.
const DANGEROUS_OPERATIONS: &[&str] =
    &["rm -rf", "chmod", "chown", "mv ", "cp ", "dd ", "format", "mkfs", "fdisk"];

const ESCAPE_PATTERNS: &[&str] =
    &["cd ..", "cd ../", "cd ..\\", "rm -rf ../", "rm -rf ..\\", "../", "..\\"];

static DRIVE_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z]:[\\/]").expect("valid regex"));

#[derive(Debug)]
pub struct DirectorySandbox {
    allowed_dir: PathBuf,
    original_dir: PathBuf,
    mode: SandboxMode,
}

impl DirectorySandbox {
    /// Sandbox rooted at the process working directory.
    pub fn new() -> Self {
        let current = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        DirectorySandbox {
            allowed_dir: current.clone(),
            original_dir: current,
            mode: SandboxMode::default(),
        }
    }

    pub fn with_root(root: PathBuf) -> Self {
        DirectorySandbox { allowed_dir: root.clone(), original_dir: root, mode: SandboxMode::default() }
    }

    pub fn mode(&self) -> SandboxMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SandboxMode) {
        self.mode = mode;
        tracing::info!(mode = mode.label(), "sandbox mode changed");
    }

    pub fn allowed_dir(&self) -> &Path {
        &self.allowed_dir
    }

    pub fn original_dir(&self) -> &Path {
        &self.original_dir
    }

    /// Check a command against the containment policy.
    pub fn validate_command(&self, command: &str) -> Result<(), SandboxViolation> {
        if self.mode == SandboxMode::Disabled {
            return Ok(());
        }

        let command = command.trim();
        if self.contains_absolute_path(command) {
            return Err(SandboxViolation::AbsolutePath);
        }
        if self.contains_directory_escape(command) {
            return Err(SandboxViolation::DirectoryEscape);
        }
        if self.dangerous_outside_sandbox(command) {
            return Err(SandboxViolation::OutsideSandbox);
        }
        Ok(())
    }

    fn contains_absolute_path(&self, command: &str) -> bool {
        let tokens: Vec<&str> = command.split_whitespace().collect();

        // Arguments (never the leading command itself) naming absolute
        // locations.
        for token in tokens.iter().skip(1) {
            let token = token.trim_matches(|c| c == '\'' || c == '"');
            if token.len() >= 2 && token.starts_with('/') && !token[1..].starts_with('/') {
                return true;
            }
            if DRIVE_LETTER_RE.is_match(token) {
                return true;
            }
        }

        // rm/chmod/chown pointed at any absolute path, including bare "/".
        if matches!(tokens.first().copied(), Some("rm") | Some("chmod") | Some("chown") | Some("sudo")) {
            let args = if tokens.first() == Some(&"sudo") { &tokens[1..] } else { &tokens[..] };
            if matches!(args.first().copied(), Some("rm") | Some("chmod") | Some("chown")) {
                for arg in args.iter().skip(1) {
                    let arg = arg.trim_matches(|c| c == '\'' || c == '"');
                    if arg.starts_with('/') {
                        return true;
                    }
                }
            }
        }

        false
    }

    fn contains_directory_escape(&self, command: &str) -> bool {
        if !ESCAPE_PATTERNS.iter().any(|p| command.contains(p)) {
            return false;
        }
        !is_observational(command)
    }

    fn dangerous_outside_sandbox(&self, command: &str) -> bool {
        let lower = command.to_lowercase();
        if !DANGEROUS_OPERATIONS.iter().any(|op| lower.contains(op)) {
            return false;
        }
        extract_file_arguments(command).iter().any(|arg| self.is_outside_sandbox(Path::new(arg)))
    }

    /// Lexically resolve `path` against the allowed directory and check
    /// whether it lands outside it.
    pub fn is_outside_sandbox(&self, path: &Path) -> bool {
        let cleaned = lexical_clean(path);
        let absolute = if cleaned.is_absolute() {
            cleaned
        } else {
            lexical_clean(&self.allowed_dir.join(cleaned))
        };
        !absolute.starts_with(&self.allowed_dir)
    }

    /// Resolve, containment-check and perform a working directory change.
    /// On success the allowed directory narrows to the new location; the
    /// original directory is kept for `reset`.
    pub fn change_directory(&mut self, new_dir: &str) -> Result<PathBuf, SandboxViolation> {
        let requested = Path::new(new_dir);
        let target = if requested.is_absolute() {
            lexical_clean(requested)
        } else {
            lexical_clean(&self.allowed_dir.join(requested))
        };

        if self.mode != SandboxMode::Disabled && self.is_outside_sandbox(&target) {
            return Err(SandboxViolation::ChdirOutsideSandbox(new_dir.to_string()));
        }

        std::env::set_current_dir(&target)
            .map_err(|_| SandboxViolation::ChdirOutsideSandbox(new_dir.to_string()))?;
        self.allowed_dir = target.clone();
        tracing::info!(dir = %target.display(), "changed working directory");
        Ok(target)
    }

    /// Return to the directory recorded at startup.
    pub fn reset(&mut self) -> Result<PathBuf, SandboxViolation> {
        let original = self.original_dir.clone();
        std::env::set_current_dir(&original)
            .map_err(|_| SandboxViolation::ChdirOutsideSandbox(original.display().to_string()))?;
        self.allowed_dir = original.clone();
        Ok(original)
    }
}

impl Default for DirectorySandbox {
    fn default() -> Self {
        DirectorySandbox::new()
    }
}

fn is_observational(command: &str) -> bool {
    let Some(first) = command.split_whitespace().next() else {
        return false;
    };
    OBSERVATIONAL_COMMANDS.contains(&first)
}

/// Tokens that could be file arguments: skip the command word, flags and
/// values that clearly are not paths.
fn extract_file_arguments(command: &str) -> Vec<String> {
    const NON_FILE_TOKENS: &[&str] = &["yes", "no", "true", "false", "localhost"];
    const NON_FILE_FRAGMENTS: &[&str] = &["127.0.0.1", "0.0.0.0", "http://", "https://", "ftp://"];

    command
        .split_whitespace()
        .skip(1)
        .map(|token| token.trim_matches(|c| c == '\'' || c == '"'))
        .filter(|token| !token.is_empty() && !token.starts_with('-'))
        .filter(|token| !NON_FILE_TOKENS.contains(token))
        .filter(|token| !NON_FILE_FRAGMENTS.iter().any(|f| token.contains(f)))
        .filter(|token| token.parse::<f64>().is_err())
        .map(str::to_string)
        .collect()
}

/// Pure lexical path normalisation: resolves `.` and `..` without touching
/// the filesystem, clamping `..` at the root.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(comp),
            },
            other => parts.push(other),
        }
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_at(dir: &str) -> DirectorySandbox {
        DirectorySandbox::with_root(PathBuf::from(dir))
    }

    #[test]
    fn disabled_mode_allows_anything() {
        let mut sandbox = sandbox_at("/home/alice/proj");
        sandbox.set_mode(SandboxMode::Disabled);
        assert!(sandbox.validate_command("rm -rf ../other").is_ok());
        assert!(sandbox.validate_command("cat /etc/passwd").is_ok());
    }

    #[test]
    fn scenario_rm_rf_parent_is_rejected_with_escape_reason() {
        let sandbox = sandbox_at("/home/alice/proj");
        let err = sandbox.validate_command("rm -rf ../other").expect_err("must be rejected");
        assert_eq!(err, SandboxViolation::DirectoryEscape);
        assert_eq!(err.to_string(), "Command attempts to escape sandbox directory");
    }

    #[test]
    fn absolute_path_arguments_are_rejected() {
        let sandbox = sandbox_at("/home/alice/proj");
        assert_eq!(
            sandbox.validate_command("cat /etc/hosts"),
            Err(SandboxViolation::AbsolutePath)
        );
        assert_eq!(
            sandbox.validate_command("rm -rf /"),
            Err(SandboxViolation::AbsolutePath)
        );
        assert_eq!(
            sandbox.validate_command("sudo chmod 777 /tmp"),
            Err(SandboxViolation::AbsolutePath)
        );
    }

    #[test]
    fn relative_work_inside_the_sandbox_is_allowed() {
        let sandbox = sandbox_at("/home/alice/proj");
        assert!(sandbox.validate_command("ls -la").is_ok());
        assert!(sandbox.validate_command("rm -rf target").is_ok());
        assert!(sandbox.validate_command("mv src/a.rs src/b.rs").is_ok());
        assert!(sandbox.validate_command("grep -rn main src").is_ok());
    }

    #[test]
    fn observational_commands_may_peek_at_parents() {
        let sandbox = sandbox_at("/home/alice/proj");
        assert!(sandbox.validate_command("ls ../").is_ok());
        assert!(sandbox.validate_command("du ../").is_ok());
        // The same pattern in a mutating command is an escape.
        assert_eq!(
            sandbox.validate_command("mv ../file.txt here.txt"),
            Err(SandboxViolation::DirectoryEscape)
        );
    }

    #[test]
    fn every_path_argument_of_a_valid_command_stays_inside() {
        let sandbox = sandbox_at("/home/alice/proj");
        let command = "cp src/main.rs backup/main.rs";
        assert!(sandbox.validate_command(command).is_ok());
        for arg in extract_file_arguments(command) {
            assert!(
                !sandbox.is_outside_sandbox(Path::new(&arg)),
                "{arg} resolved outside the sandbox"
            );
        }
    }

    #[test]
    fn file_argument_extraction_skips_flags_and_non_files() {
        let args = extract_file_arguments("rm -rf --verbose target 42 localhost https://x.dev");
        assert_eq!(args, vec!["target"]);
    }

    #[test]
    fn outside_check_resolves_relative_paths() {
        let sandbox = sandbox_at("/home/alice/proj");
        assert!(!sandbox.is_outside_sandbox(Path::new("src/lib.rs")));
        assert!(!sandbox.is_outside_sandbox(Path::new("./docs")));
        assert!(sandbox.is_outside_sandbox(Path::new("../other")));
        assert!(sandbox.is_outside_sandbox(Path::new("/etc")));
        assert!(sandbox.is_outside_sandbox(Path::new("src/../../escape")));
    }

    #[test]
    fn lexical_clean_handles_dots_and_parents() {
        assert_eq!(lexical_clean(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(lexical_clean(Path::new("a/./b")), PathBuf::from("a/b"));
        assert_eq!(lexical_clean(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(lexical_clean(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn change_directory_rejects_escapes_and_narrows_on_success() {
        let launch_dir = std::env::current_dir().expect("cwd");
        let tmp = tempfile::TempDir::new().expect("tmp");
        let sub = tmp.path().join("sub");
        std::fs::create_dir(&sub).expect("mkdir");

        let mut sandbox = DirectorySandbox::with_root(tmp.path().to_path_buf());
        assert!(matches!(
            sandbox.change_directory("../.."),
            Err(SandboxViolation::ChdirOutsideSandbox(_))
        ));

        let landed = sandbox.change_directory("sub").expect("chdir");
        assert_eq!(landed, lexical_clean(&sub));
        assert_eq!(sandbox.allowed_dir(), lexical_clean(&sub));

        // After narrowing, the old root is out of bounds.
        assert!(sandbox.is_outside_sandbox(tmp.path()));

        let back = sandbox.reset().expect("reset");
        assert_eq!(back, tmp.path());
        assert_eq!(sandbox.allowed_dir(), tmp.path());

        std::env::set_current_dir(launch_dir).expect("restore cwd");
    }

    #[test]
    fn mode_labels_are_human_readable() {
        assert_eq!(SandboxMode::CurrentDir.label(), "Current Directory Only");
        assert!(SandboxMode::Strict.label().starts_with("Strict"));
    }
}
