//! Text helpers.

/// Truncate a string to `max_len` characters, ellipsising when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// True when `s` contains any of the given substrings.
pub fn contains_any(s: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| s.contains(n))
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_strings_alone() {
        assert_eq!(truncate("ls -la", 20), "ls -la");
    }

    #[test]
    fn truncate_ellipsises_long_strings() {
        let out = truncate("list directory contents recursively", 20);
        assert_eq!(out.chars().count(), 20);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn collapse_whitespace_flattens_runs() {
        assert_eq!(collapse_whitespace("ls   [OPTION]...\n  [FILE]..."), "ls [OPTION]... [FILE]...");
    }
}
