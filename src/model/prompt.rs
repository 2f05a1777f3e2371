//! Prompt templates for command synthesis, Q&A, explanation and package
//! operations, with optional RAG enrichment.

use std::sync::Arc;

use crate::domain::Env;
use crate::rag::RagSystem;

pub struct PromptBuilder {
    env: Env,
    online: bool,
    rag: Option<Arc<RagSystem>>,
}

impl PromptBuilder {
    pub fn new(env: Env, online: bool) -> Self {
        PromptBuilder { env, online, rag: None }
    }

    pub fn with_rag(env: Env, online: bool, rag: Arc<RagSystem>) -> Self {
        PromptBuilder { env, online, rag: Some(rag) }
    }

    /// RAG is consulted dynamically: background indexing may finish long
    /// after this builder was constructed.
    pub fn rag_available(&self) -> bool {
        self.rag.as_ref().map(|r| r.is_initialized()).unwrap_or(false)
    }

    pub fn rag(&self) -> Option<&Arc<RagSystem>> {
        self.rag.as_ref()
    }

    /// Command-synthesis prompt, enriched with manual-page context when the
    /// RAG system has something relevant.
    pub fn command_prompt(&self, user_input: &str) -> String {
        let base = self.base_command_prompt(user_input);
        match &self.rag {
            Some(rag) if rag.is_initialized() => rag.enhance_prompt(user_input, &base),
            _ => base,
        }
    }

    /// Q&A prompt; enriched only when the question sounds command-related.
    pub fn ask_prompt(&self, user_input: &str) -> String {
        let base = self.base_ask_prompt(user_input);
        if !is_command_related(user_input) {
            return base;
        }
        match &self.rag {
            Some(rag) if rag.is_initialized() => rag.enhance_prompt(user_input, &base),
            _ => base,
        }
    }

    /// Explanation prompt. A store-derived explanation short-circuits the
    /// model entirely when the command is indexed.
    pub fn explain_prompt(&self, command: &str) -> ExplainPrompt {
        if let Some(rag) = &self.rag {
            if rag.is_initialized() {
                if let Ok(explanation) = rag.explain_command(command) {
                    return ExplainPrompt::Direct(explanation);
                }
            }
        }
        ExplainPrompt::Model(self.base_explain_prompt(command))
    }

    pub fn package_prompt(&self, package: &str, action: &str) -> String {
        let verb = match action {
            "install" => "install",
            "update" => "update to the latest version",
            "remove" => "remove",
            other => other,
        };

        format!(
            "Provide the shell command to {verb} package \"{package}\" on {os} using the \
             appropriate package manager.\n\n\
             Rules:\n\
             - Output ONLY the command\n\
             - Use the most common package manager for {os}\n\
             - Include sudo if typically required\n\n\
             Command:",
            os = self.env.os
        )
    }

    fn base_command_prompt(&self, user_input: &str) -> String {
        format!(
            "You are Helix, an advanced CLI assistant. Convert the user's natural language \
             request into a single, safe, fully executable shell command for {os} ({shell}).\n\n\
             STRICT RULES - FOLLOW EXACTLY:\n\
             1. Output ONLY the raw shell command with no explanations, notes, or formatting\n\
             2. Never include backticks, code blocks, or extra punctuation\n\
             3. Do NOT prepend or append any text\n\
             4. Always produce a safe command; avoid destructive operations like rm -rf or \
             anything that modifies critical system files\n\
             5. Use the correct package manager or system tool for the OS\n\
             6. Keep the command concise, efficient, and fully executable\n\
             7. Ensure all quotes are properly matched and escaped, including within wildcards\n\
             8. Use quotes for all file patterns and paths (e.g., '*.go' or '/path/to/file')\n\
             9. Do NOT use unquoted wildcards that could expand unexpectedly\n\
             10. Never add trailing semicolons, parentheses, or invalid characters\n\
             11. If multiple commands are needed, combine them safely with && only\n\
             12. Ensure the command works correctly in a real shell before outputting\n\n\
             User request: {user_input}\n\n\
             Command:",
            os = self.env.os,
            shell = self.env.shell.name()
        )
    }

    fn base_ask_prompt(&self, user_input: &str) -> String {
        let status = if self.online { "online" } else { "offline" };
        format!(
            "You are Helix, a helpful CLI assistant. The user is asking a question.\n\n\
             IMPORTANT: Provide a direct, helpful response to the user's question. Do not ask \
             questions back. Do not be meta. Just answer helpfully.\n\n\
             Current status: {status}\n\
             User's shell: {shell} on {os}\n\
             User question: {user_input}\n\n\
             Provide a concise, helpful answer:",
            shell = self.env.shell.name(),
            os = self.env.os
        )
    }

    fn base_explain_prompt(&self, command: &str) -> String {
        format!(
            "Explain what this shell command does in simple, clear terms: \"{command}\"\n\n\
             IMPORTANT RULES:\n\
             1. Provide a clear explanation of what the command does\n\
             2. Keep it under 3 sentences\n\
             3. Focus on the main purpose and potential risks\n\
             4. Do not ask questions back\n\
             5. Do not be meta - just explain the command\n\
             6. If you don't know, say you're not sure\n\n\
             Explanation:"
        )
    }
}

/// An explanation either comes straight from the manual-page store or needs
/// a model call.
pub enum ExplainPrompt {
    Direct(String),
    Model(String),
}

/// Heuristic for questions that benefit from manual-page context.
fn is_command_related(question: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "command", "how to", "what is", "what does", "explain", "meaning of", "usage of",
        "how do i", "how can i", "what's the", "what are", "difference between", "vs ",
        " versus ", "alternative to", "replace", "equivalent of", "similar to",
    ];
    let question = question.to_lowercase();
    KEYWORDS.iter().any(|k| question.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StateDirs;
    use crate::domain::{ManPage, Shell};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn env() -> Env {
        Env {
            os: "linux".to_string(),
            shell: Shell::Zsh,
            shell_path: "/bin/zsh".to_string(),
            user: "alice".to_string(),
            home: PathBuf::from("/home/alice"),
        }
    }

    #[test]
    fn command_prompt_includes_os_shell_and_request() {
        let pb = PromptBuilder::new(env(), true);
        let prompt = pb.command_prompt("show files");
        assert!(prompt.contains("linux (zsh)"));
        assert!(prompt.contains("User request: show files"));
        assert!(prompt.contains("STRICT RULES"));
        assert!(prompt.ends_with("Command:"));
    }

    #[test]
    fn command_prompt_without_rag_equals_base_template() {
        // An unavailable RAG system must leave the prompt byte-identical.
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let rag = Arc::new(RagSystem::new(&dirs));

        let plain = PromptBuilder::new(env(), true);
        let with_rag = PromptBuilder::with_rag(env(), true, rag);
        assert_eq!(with_rag.command_prompt("show files"), plain.command_prompt("show files"));
    }

    #[test]
    fn command_prompt_is_enriched_when_rag_has_context() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let rag = Arc::new(RagSystem::new(&dirs));
        rag.index_pages_for_test(&[ManPage {
            name: "ls".to_string(),
            description: "list directory contents".to_string(),
            synopsis: "ls [OPTION]...".to_string(),
            ..ManPage::default()
        }])
        .expect("index");

        let pb = PromptBuilder::with_rag(env(), true, rag);
        let prompt = pb.command_prompt("list files");
        assert!(prompt.starts_with("ADDITIONAL CONTEXT FROM SYSTEM MANUAL PAGES:"));
        assert!(prompt.contains("ORIGINAL PROMPT:"));
    }

    #[test]
    fn ask_prompt_reports_online_status() {
        let online = PromptBuilder::new(env(), true).ask_prompt("what is tar?");
        let offline = PromptBuilder::new(env(), false).ask_prompt("what is tar?");
        assert!(online.contains("Current status: online"));
        assert!(offline.contains("Current status: offline"));
    }

    #[test]
    fn explain_prompt_prefers_store_explanation() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let rag = Arc::new(RagSystem::new(&dirs));
        rag.index_pages_for_test(&[ManPage {
            name: "tar".to_string(),
            description: "an archiving utility".to_string(),
            ..ManPage::default()
        }])
        .expect("index");

        let pb = PromptBuilder::with_rag(env(), false, rag);
        match pb.explain_prompt("tar") {
            ExplainPrompt::Direct(text) => assert!(text.contains("archiving utility")),
            ExplainPrompt::Model(_) => panic!("expected a store-derived explanation"),
        }
        match pb.explain_prompt("frobnicate") {
            ExplainPrompt::Model(text) => assert!(text.contains("frobnicate")),
            ExplainPrompt::Direct(_) => panic!("unknown command cannot come from the store"),
        }
    }

    #[test]
    fn command_related_heuristic() {
        assert!(is_command_related("how do I list files"));
        assert!(is_command_related("what does tar -xvf do"));
        assert!(!is_command_related("tell me a story about a fox"));
    }

    #[test]
    fn package_prompt_names_the_action_and_os() {
        let pb = PromptBuilder::new(env(), true);
        let prompt = pb.package_prompt("ripgrep", "install");
        assert!(prompt.contains("install package \"ripgrep\" on linux"));
        let update = pb.package_prompt("ripgrep", "update");
        assert!(update.contains("update to the latest version"));
    }
}
