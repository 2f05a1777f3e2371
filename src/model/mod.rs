//! Model-inference contract.
//!
//! Inference is a single synchronous text completion behind the
//! `ModelBackend` trait. This build ships no accelerator backend; when the
//! weights are missing or no backend is linked, the REPL degrades to mock
//! mode and keeps running.

pub mod mock;
pub mod prompt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        SamplingParams {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            max_tokens: 150,
            stop: vec!["\n".to_string(), "```".to_string(), "`".to_string()],
        }
    }
}

impl SamplingParams {
    /// More deterministic settings for direct Q&A.
    pub fn for_ask() -> Self {
        SamplingParams { temperature: 0.3, top_p: 0.7, top_k: 20, ..SamplingParams::default() }
    }
}

/// One synchronous text completion. Only one concurrent call is safe; the
/// REPL owns the handle and calls from the foreground thread.
pub trait ModelBackend: Send + Sync {
    fn complete(&self, prompt: &str, params: &SamplingParams) -> Result<String>;
}

/// Run a completion with default sampling and clean the output.
pub fn run_model(backend: &dyn ModelBackend, prompt: &str) -> Result<String> {
    run_model_with(backend, prompt, &SamplingParams::default())
}

pub fn run_model_with(
    backend: &dyn ModelBackend,
    prompt: &str,
    params: &SamplingParams,
) -> Result<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        bail!("empty prompt");
    }
    let raw = backend.complete(prompt, params)?;
    Ok(clean_response(&raw))
}

/// Load a backend for the weights at `path`. Fails when the weights are
/// missing or when no accelerator backend is compiled in; the caller
/// degrades to mock mode on failure.
pub fn load_backend(path: &Path) -> Result<Box<dyn ModelBackend>> {
    if !path.exists() {
        bail!("model not found at {}", path.display());
    }
    bail!("no model backend is compiled into this build")
}

/// Trim and normalise a raw completion: drop chat-style prefixes and fold
/// over-long output down to its first line.
pub fn clean_response(raw: &str) -> String {
    let mut out = raw.trim().to_string();

    if out.len() > 200 {
        if let Some(first_line) = out.lines().next() {
            out = first_line.trim().to_string();
        }
    }

    for prefix in ["Assistant:", "AI:", "Helix:", "Response:", "Answer:"] {
        if let Some(stripped) = out.strip_prefix(prefix) {
            out = stripped.trim().to_string();
            break;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl ModelBackend for Canned {
        fn complete(&self, _prompt: &str, _params: &SamplingParams) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn run_model_rejects_empty_prompts() {
        assert!(run_model(&Canned("ls"), "   ").is_err());
    }

    #[test]
    fn clean_response_strips_chat_prefixes() {
        assert_eq!(clean_response("Assistant: ls -la"), "ls -la");
        assert_eq!(clean_response("Answer:  df -h"), "df -h");
        assert_eq!(clean_response("ls -la"), "ls -la");
    }

    #[test]
    fn clean_response_folds_long_output_to_first_line() {
        let long = format!("ls -la\n{}", "explanatory prose ".repeat(20));
        assert_eq!(clean_response(&long), "ls -la");
    }

    #[test]
    fn ask_params_are_more_deterministic() {
        let ask = SamplingParams::for_ask();
        let default = SamplingParams::default();
        assert!(ask.temperature < default.temperature);
        assert!(ask.top_k < default.top_k);
        assert_eq!(ask.max_tokens, 150);
    }

    #[test]
    fn load_backend_fails_for_missing_weights() {
        assert!(load_backend(Path::new("/nonexistent/model.gguf")).is_err());
    }
}
