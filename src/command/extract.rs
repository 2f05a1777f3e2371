//! Reduce a free-form model completion to one executable command, with
//! best-effort repairs for the mistakes small local models actually make:
//! dropped wildcards in file patterns, stray closing parentheses and
//! truncated quotes.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::safety;

/// Strip model noise and return the first plausible command line.
pub fn extract_command(model_output: &str) -> String {
    let mut text = model_output.to_string();
    for marker in ["```bash", "```sh", "```", "`", "**"] {
        text = text.replace(marker, "");
    }

    let command = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("//") && !line.starts_with('#'))
        .unwrap_or("");

    command.trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

/// File patterns where the model dropped the `*`: `-name '.go'` and
/// friends, for the extensions it generates most.
static FILE_PATTERN_FIXES: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    const EXTENSIONS: &[&str] = &["go", "py", "js", "md", "txt", "java", "cpp", "c", "html", "css"];
    let mut fixes = Vec::new();
    for ext in EXTENSIONS {
        fixes.push((format!("-name '.{ext}'"), format!("-name '*.{ext}'")));
        fixes.push((format!("-name \".{ext}\""), format!("-name \"*.{ext}\"")));
    }
    fixes.push(("-name .go".to_string(), "-name '*.go'".to_string()));
    fixes
});

/// Generic form of the same mistake, any extension, possibly unquoted.
static NAME_DOT_PATTERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"-name\s+['"]?(\.[A-Za-z0-9]+)['"]?"#).expect("valid regex"));

/// Apply conservative repairs; idempotent, and a no-op for commands that
/// need none.
pub fn repair_command(command: &str) -> String {
    let mut command = command.trim().to_string();

    for (wrong, correct) in FILE_PATTERN_FIXES.iter() {
        if command.contains(wrong.as_str()) {
            command = command.replacen(wrong.as_str(), correct, 1);
        }
    }

    let dot_pattern = NAME_DOT_PATTERN_RE
        .captures(&command)
        .map(|caps| (caps[0].to_string(), caps[1].to_string()));
    if let Some((whole, extension)) = dot_pattern {
        let fixed = whole.replacen(&extension, &format!("*{extension}"), 1);
        command = command.replacen(&whole, &fixed, 1);
    }

    if let Some(stripped) = command.strip_suffix(");") {
        command = stripped.trim_end().to_string();
    }
    if command.ends_with(')') && !command.contains('(') {
        command.pop();
        command = command.trim_end().to_string();
    }

    command = fix_unmatched_quotes(&command);

    if let Some(stripped) = command.strip_prefix("git find") {
        command = format!("find{stripped}");
    }

    command
}

/// Append the missing quote only when the command clearly contains a
/// truncated quoted file pattern; anything cleverer does more harm than
/// good.
pub fn fix_unmatched_quotes(command: &str) -> String {
    let single = command.matches('\'').count();
    let double = command.matches('"').count();

    if single % 2 == 0 && double % 2 == 0 {
        return command.to_string();
    }
    if double % 2 != 0 && command.contains("\"*.") {
        return format!("{command}\"");
    }
    if single % 2 != 0 && command.contains("'*.") {
        return format!("{command}'");
    }
    command.to_string()
}

pub fn has_balanced_quotes(command: &str) -> bool {
    command.matches('\'').count() % 2 == 0 && command.matches('"').count() % 2 == 0
}

/// Obvious shell syntax errors worth warning about before execution.
/// Purely a predicate; never mutates the command.
pub fn has_syntax_errors(command: &str) -> bool {
    let single = command.matches('\'').count();
    let double = command.matches('"').count();
    if (single % 2 != 0 && single > 1) || (double % 2 != 0 && double > 1) {
        return true;
    }

    let trimmed = command.trim();
    if trimmed.ends_with(')') && !trimmed.contains('(') {
        return true;
    }

    const BROKEN_SENTINELS: &[&str] =
        &["&&)", "||)", "|)", ">)", ">>)", "<)", "find .)", "grep )", "ls )"];
    BROKEN_SENTINELS.iter().any(|s| command.contains(s))
}

/// Final cleaning gate before execution: strip residual markers, balance
/// quotes, reduce to one line and reject malicious patterns.
pub fn sanitize_command(command: &str) -> Result<String> {
    let mut command = command.trim().to_string();

    for marker in ["```", "`", "**", "*"] {
        // `*` only when it is formatting noise at the edges; wildcards in
        // the middle of a command must survive.
        if marker == "*" {
            command = command.trim_matches('*').to_string();
        } else {
            command = command.replace(marker, "");
        }
    }
    command = command.trim_matches(|c| c == '"' || c == '\'').trim().to_string();

    command = fix_unmatched_quotes(&command);
    if !has_balanced_quotes(&command) {
        bail!("command has unmatched quotes: {command}");
    }

    if let Some(first_line) = command.lines().next() {
        command = first_line.trim().to_string();
    }
    if command.is_empty() {
        bail!("empty command after cleaning");
    }

    safety::check_malicious(&command)?;
    Ok(command)
}
