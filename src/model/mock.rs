//! Rule-based responses for degraded (mock) mode.
//!
//! When no model can be loaded the REPL keeps working: `/cmd` is served
//! from a small request-pattern table, `/ask` from stock responses, and
//! `/explain` from per-command fallback text.

use crate::domain::Env;

/// Rule-table replacement for command generation.
pub fn mock_command(request: &str, env: &Env) -> String {
    let request = request.to_lowercase();
    let unix = env.shell.is_unix_like() || env.os != "windows";

    if request.contains("list") && request.contains("file") {
        return if unix { "ls -la".to_string() } else { "dir".to_string() };
    }
    if request.contains("current directory") {
        return if unix { "pwd".to_string() } else { "cd".to_string() };
    }
    if request.contains("disk space") {
        return if unix {
            "df -h".to_string()
        } else {
            "wmic logicaldisk get size,freespace,caption".to_string()
        };
    }
    if request.contains("process") {
        return if unix { "ps aux".to_string() } else { "tasklist".to_string() };
    }
    if request.contains("go file") || request.contains(".go") {
        return "find . -name \"*.go\" -type f".to_string();
    }
    format!("echo 'Mock command for: {request}'")
}

/// Stock deferral answers for `/ask` without a model.
pub fn mock_answer(question: &str) -> String {
    let question = question.to_lowercase();

    if question.contains("what can you do") || question.contains("help") {
        return "I can convert natural language to commands (/cmd), answer questions (/ask), \
                explain commands (/explain) and manage packages (/install, /update, /remove). \
                Try /help for the full list."
            .to_string();
    }
    if question.contains("weather") {
        return "I'm running in offline mode and can't reach live weather data. Try a weather \
                service once you're online."
            .to_string();
    }
    if question.contains("hello") || question.contains("hi") {
        return "Hello! I'm Helix, your terminal assistant. How can I help?".to_string();
    }
    format!(
        "I understand you're asking about: '{question}'. This is a simulated response because \
         no model is loaded; in full mode I would answer from the local model."
    )
}

pub fn mock_explanation(command: &str) -> String {
    format!(
        "The command '{command}' appears to be a system command. Without a loaded model I \
         can't give a detailed explanation; try 'man' or '--help' for specifics."
    )
}

/// Rule-based explanation used when the model returns nothing useful.
pub fn fallback_explanation(command: &str) -> String {
    let command = command.to_lowercase();

    let canned: &[(&[&str], &str)] = &[
        (&["find", "-exec"], "This find command searches for files and executes another command on each result. Powerful but can be slow on large directories."),
        (&["grep"], "Searches for text patterns in files. Essential for code analysis and log inspection."),
        (&["curl"], "Downloads or transfers data from networks. Commonly used for API testing and file downloads."),
        (&["wget"], "Downloads or transfers data from networks. Commonly used for API testing and file downloads."),
        (&["git merge"], "Combines changes from different branches. Can modify commit history - use carefully."),
        (&["docker"], "Container management command. Handles isolated application environments."),
        (&["chmod"], "Changes file permissions. Affects security and access controls."),
        (&["chown"], "Changes file ownership. Requires appropriate privileges."),
        (&["rm "], "Removes files or directories. Can cause data loss - double-check paths."),
        (&["mv "], "Moves or renames files. Overwrites existing files without warning."),
        (&["cp "], "Copies files or directories. Preserves originals but can overwrite destinations."),
        (&["ssh "], "Secure shell connection to remote servers. Provides encrypted terminal access."),
        (&["scp "], "Securely copies files between systems over SSH."),
        (&["rsync"], "Efficient file synchronization between locations. Great for backups."),
        (&["tar "], "Archives files into a single package. Commonly used for compression and distribution."),
        (&["sed "], "Stream editor for text transformation. Powerful for batch file editing."),
        (&["awk "], "Pattern scanning and processing language. Excellent for data extraction and reporting."),
        (&["xargs"], "Converts input into command arguments. Useful for processing large file lists."),
        (&["|"], "Uses pipes to chain multiple commands together. Output of one becomes input to the next."),
        (&[">>"], "Redirects output to a file, appending to existing content."),
        (&[">"], "Redirects output to a file, overwriting existing content."),
    ];

    for (needles, explanation) in canned {
        if needles.iter().all(|n| command.contains(n)) {
            return explanation.to_string();
        }
    }

    match command.split_whitespace().next() {
        Some(main) => format!(
            "This appears to be a '{main}' command. For detailed information, try 'man {main}' \
             or '{main} --help'."
        ),
        None => "This command performs a system operation. Use manual pages (man) for detailed \
                 information."
            .to_string(),
    }
}

/// Last-resort command guess when both the model and its simple-prompt
/// retry return nothing.
pub fn fallback_command(request: &str, env: &Env) -> Option<String> {
    let request = request.to_lowercase();
    let unix = env.shell.is_unix_like() || env.os != "windows";

    if request.contains("file") || request.contains("list") || request.contains("show") {
        return Some(if unix { "ls -la".to_string() } else { "dir".to_string() });
    }
    if request.contains("directory") || request.contains("folder") {
        return Some(if unix { "pwd".to_string() } else { "cd".to_string() });
    }
    if request.contains("go file") || request.contains(".go") {
        return Some("find . -name \"*.go\" -type f".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Shell;
    use std::path::PathBuf;

    fn unix_env() -> Env {
        Env {
            os: "linux".to_string(),
            shell: Shell::Bash,
            shell_path: "/bin/bash".to_string(),
            user: "alice".to_string(),
            home: PathBuf::from("/home/alice"),
        }
    }

    #[test]
    fn mock_command_matches_common_requests() {
        let env = unix_env();
        assert_eq!(mock_command("list all files here", &env), "ls -la");
        assert_eq!(mock_command("show current directory", &env), "pwd");
        assert_eq!(mock_command("how much disk space is left", &env), "df -h");
    }

    #[test]
    fn mock_command_falls_back_to_echo() {
        let env = unix_env();
        let out = mock_command("do something inscrutable", &env);
        assert!(out.starts_with("echo "));
    }

    #[test]
    fn fallback_explanation_knows_common_tools() {
        assert!(fallback_explanation("grep -r TODO src/").contains("text patterns"));
        assert!(fallback_explanation("rm -i notes.txt").contains("data loss"));
        assert!(fallback_explanation("find . -name '*.rs' -exec wc -l {} +")
            .contains("executes another command"));
    }

    #[test]
    fn fallback_explanation_defaults_to_man_hint() {
        let out = fallback_explanation("frobnicate --fast");
        assert!(out.contains("man frobnicate"));
    }

    #[test]
    fn fallback_command_gives_up_gracefully() {
        assert_eq!(fallback_command("transcend the terminal", &unix_env()), None);
    }
}
