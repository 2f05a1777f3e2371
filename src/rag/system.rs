//! RAG lifecycle orchestration: indexing, persistence and prompt
//! enrichment.
//!
//! Startup tries three paths in order: a valid state file, an orphan
//! vector index, and finally a bounded fresh indexing run. A failed or
//! empty run leaves the system unavailable; prompts then pass through
//! unenriched and everything else keeps working.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{write_json_atomic, StateDirs};
use crate::domain::{CommandInfo, CommandSuggestion, RetrievalResult};
use crate::rag::indexer::ManIndexer;
use crate::rag::store::{tokenize, VectorStore};
use crate::utils::format_duration;

const INDEX_VERSION: &str = "1.0";
const DEFAULT_INDEXING_BUDGET: Duration = Duration::from_secs(5 * 60);
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);
/// Conservative guess at how many useful pages a host carries, for ETA
/// reporting only.
const ESTIMATED_TOTAL_PAGES: usize = 500;
const MAX_ENRICHMENT_COMMANDS: usize = 3;
const MAX_ENRICHMENT_OPTIONS: usize = 5;
const MAX_ENRICHMENT_EXAMPLES: usize = 2;

/// Durable record written after a successful index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemState {
    pub version: String,
    pub initialized: bool,
    pub indexed_time: DateTime<Utc>,
    pub total_pages: usize,
    pub total_commands: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RagStatus {
    Completed,
    Processing(usize),
    Scanning,
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RagStatus::Completed => write!(f, "COMPLETED"),
            RagStatus::Processing(pages) => write!(f, "PROCESSING ({pages} pages)"),
            RagStatus::Scanning => write!(f, "SCANNING"),
        }
    }
}

pub struct RagSystem {
    rag_dir: PathBuf,
    state_file: PathBuf,
    indexer: ManIndexer,
    store: VectorStore,
    initialized: AtomicBool,
    indexing_budget: Duration,
}

impl RagSystem {
    pub fn new(dirs: &StateDirs) -> Self {
        RagSystem {
            rag_dir: dirs.rag_index_dir.clone(),
            state_file: dirs.rag_state_file(),
            indexer: ManIndexer::new(),
            store: VectorStore::new(dirs.vector_index_file()),
            initialized: AtomicBool::new(false),
            indexing_budget: DEFAULT_INDEXING_BUDGET,
        }
    }

    #[cfg(test)]
    pub fn with_indexing_budget(mut self, budget: Duration) -> Self {
        self.indexing_budget = budget;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Fast startup paths: existing state file, then orphan vector index.
    /// Returns true when either succeeded and no indexing run is needed.
    pub fn try_load_existing(&self) -> bool {
        if let Err(err) = std::fs::create_dir_all(&self.rag_dir) {
            tracing::warn!("could not create RAG index directory: {err}");
            return false;
        }

        if self.load_system_state() {
            tracing::info!("RAG system loaded from existing state");
            return true;
        }

        match self.store.load() {
            Ok(true) => {
                self.initialized.store(true, Ordering::Release);
                if let Err(err) = self.save_system_state() {
                    tracing::warn!("could not write RAG state file: {err}");
                }
                tracing::info!("RAG system recovered from orphan vector index");
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::warn!("could not load existing vector index: {err}");
                false
            }
        }
    }

    /// Full initialisation: fast paths first, then a bounded indexing run
    /// with a progress ticker and a wall-clock watchdog. Partial results
    /// are kept; zero pages leaves the system unavailable.
    pub fn initialize(&self) -> Result<()> {
        if self.try_load_existing() {
            return Ok(());
        }

        tracing::info!("starting manual page indexing (first time setup)");
        let start = Instant::now();
        let cancel = AtomicBool::new(false);
        let finished = AtomicBool::new(false);

        std::thread::scope(|scope| {
            // Watchdog: enforce the wall-clock budget by flipping the
            // cooperative cancellation flag.
            scope.spawn(|| {
                let deadline = start + self.indexing_budget;
                while !finished.load(Ordering::Acquire) {
                    if Instant::now() >= deadline {
                        cancel.store(true, Ordering::Release);
                        tracing::warn!(
                            elapsed = %format_duration(start.elapsed()),
                            "indexing budget elapsed, keeping partial results"
                        );
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(200));
                }
            });

            // Progress reporter.
            scope.spawn(|| {
                let mut last_report = Instant::now();
                while !finished.load(Ordering::Acquire) && !cancel.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(200));
                    if last_report.elapsed() < PROGRESS_INTERVAL {
                        continue;
                    }
                    last_report = Instant::now();
                    let indexed = self.indexer.indexed_count();
                    tracing::info!(
                        pages = indexed,
                        elapsed = %format_duration(start.elapsed()),
                        "RAG indexing in progress"
                    );
                    if indexed > 100 {
                        let pages_per_second = indexed as f64 / start.elapsed().as_secs_f64();
                        let remaining = ESTIMATED_TOTAL_PAGES.saturating_sub(indexed);
                        if pages_per_second > 0.0 && remaining > 0 {
                            let eta =
                                Duration::from_secs_f64(remaining as f64 / pages_per_second);
                            tracing::info!(eta = %format_duration(eta), "estimated time remaining");
                        }
                    }
                }
            });

            if let Err(err) = self.indexer.index_available_pages(&cancel) {
                tracing::warn!("manual page indexing had issues: {err}");
            }
            finished.store(true, Ordering::Release);
        });

        let pages = self.indexer.pages();
        if pages.is_empty() {
            tracing::warn!("no manual pages indexed, RAG features disabled");
            self.initialized.store(false, Ordering::Release);
            let _ = self.save_system_state();
            return Ok(());
        }

        tracing::info!(pages = pages.len(), "building vector index");
        match self.store.index_pages(&pages) {
            Ok(documents) => {
                self.initialized.store(true, Ordering::Release);
                tracing::info!(
                    pages = pages.len(),
                    documents,
                    elapsed = %format_duration(start.elapsed()),
                    "RAG system initialized"
                );
            }
            Err(err) => {
                // Keep the initialized mark so startup does not loop on a
                // host where vector indexing cannot succeed.
                tracing::warn!("vector indexing failed: {err}");
                self.initialized.store(true, Ordering::Release);
            }
        }

        self.save_system_state()
    }

    /// Kick off `initialize` on a background thread unless state already
    /// exists on disk.
    pub fn initialize_in_background(self: Arc<Self>) {
        if self.has_existing_state() {
            tracing::debug!("RAG state already present, skipping background indexing");
            return;
        }
        std::thread::spawn(move || {
            if let Err(err) = self.initialize() {
                tracing::warn!("background RAG indexing failed: {err}");
            }
        });
    }

    /// Retrieve relevant command context for a query. Never fails: an
    /// uninitialised system or a search error yields an empty result.
    pub fn retrieve(&self, query: &str) -> RetrievalResult {
        if !self.is_initialized() {
            return RetrievalResult::default();
        }

        let start = Instant::now();

        let relevant = match self.store.relevant_commands(query, MAX_ENRICHMENT_COMMANDS) {
            Ok(commands) => commands,
            Err(err) => {
                tracing::warn!("RAG search failed: {err}");
                return RetrievalResult::default();
            }
        };
        let filtered: Vec<CommandInfo> =
            relevant.into_iter().filter(|cmd| is_relevant_command(query, cmd)).collect();

        // Words in the query that could name a command get an exact lookup,
        // surfaced ahead of the similarity results.
        let mut commands = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for candidate in potential_commands(query) {
            if let Ok(info) = self.store.command_info(&candidate) {
                if seen.insert(info.name.clone()) {
                    commands.push(info);
                }
            }
        }
        for info in filtered {
            if seen.insert(info.name.clone()) {
                commands.push(info);
            }
        }

        RetrievalResult {
            used_rag: !commands.is_empty(),
            commands,
            query: query.to_string(),
            elapsed: start.elapsed(),
        }
    }

    /// Prepend retrieved command context to `original_prompt`. The prompt
    /// is returned unchanged when there is nothing to add.
    pub fn enhance_prompt(&self, user_input: &str, original_prompt: &str) -> String {
        if !self.is_initialized() || user_input.trim().is_empty() {
            return original_prompt.to_string();
        }

        let result = self.retrieve(user_input);
        if !result.used_rag || result.commands.is_empty() {
            return original_prompt.to_string();
        }

        tracing::debug!(
            query = %result.query,
            commands = result.commands.len(),
            elapsed = %format_duration(result.elapsed),
            "enhancing prompt with manual page context"
        );
        build_enhanced_prompt(original_prompt, &result)
    }

    /// Rich explanation assembled straight from the store, no model call.
    pub fn explain_command(&self, command: &str) -> Result<String> {
        if !self.is_initialized() {
            anyhow::bail!("RAG system not initialized");
        }
        let info = self
            .store
            .command_info(command)
            .with_context(|| format!("no information found for command: {command}"))?;
        Ok(render_explanation(&info))
    }

    /// Commands suggested for a user intent, best first.
    pub fn command_suggestions(&self, user_input: &str) -> Vec<CommandSuggestion> {
        if !self.is_initialized() {
            return Vec::new();
        }

        let result = self.retrieve(user_input);
        let mut suggestions: Vec<CommandSuggestion> = result
            .commands
            .iter()
            .map(|cmd| CommandSuggestion {
                command: cmd.name.clone(),
                description: cmd.description.clone(),
                confidence: suggestion_confidence(user_input, cmd),
            })
            .collect();
        suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.command.cmp(&b.command))
        });
        suggestions
    }

    pub fn status(&self) -> RagStatus {
        if self.is_initialized() {
            return RagStatus::Completed;
        }
        match self.indexer.indexed_count() {
            0 => RagStatus::Scanning,
            pages => RagStatus::Processing(pages),
        }
    }

    pub fn stats(&self) -> RagStats {
        let store = self.store.stats();
        RagStats {
            initialized: self.is_initialized(),
            indexed_pages: self.indexer.indexed_count(),
            total_documents: store.total_documents,
            unique_commands: store.unique_commands,
            index_tokens: store.index_tokens,
        }
    }

    /// Drop the persisted state and reindex in the background. Both the
    /// state file and the vector index are removed; leaving the index in
    /// place would make the fresh run adopt it instead of reindexing.
    pub fn reindex(self: Arc<Self>) -> Result<()> {
        std::fs::remove_file(&self.state_file).ok();
        if let Some(vector_dir) = self.store_index_dir() {
            std::fs::remove_file(vector_dir.join("vector_index.json")).ok();
        }
        self.initialized.store(false, Ordering::Release);
        std::thread::spawn(move || {
            if let Err(err) = self.initialize() {
                tracing::warn!("RAG reindexing failed: {err}");
            }
        });
        Ok(())
    }

    /// Remove all RAG state from disk; the next startup reindexes.
    pub fn reset(&self) -> Result<()> {
        self.initialized.store(false, Ordering::Release);
        if self.rag_dir.exists() {
            std::fs::remove_dir_all(&self.rag_dir).with_context(|| {
                format!("failed to remove RAG directory {}", self.rag_dir.display())
            })?;
        }
        if let Some(vector_dir) = self.store_index_dir() {
            if vector_dir.exists() {
                std::fs::remove_dir_all(&vector_dir).with_context(|| {
                    format!("failed to remove vector index directory {}", vector_dir.display())
                })?;
            }
        }
        Ok(())
    }

    fn store_index_dir(&self) -> Option<PathBuf> {
        // rag_dir and vector_index are siblings under the state root.
        self.rag_dir.parent().map(|root| root.join("vector_index"))
    }

    fn has_existing_state(&self) -> bool {
        self.state_file.exists() || self.store.stats().total_documents > 0
    }

    fn load_system_state(&self) -> bool {
        let Ok(data) = std::fs::read_to_string(&self.state_file) else {
            return false;
        };
        let Ok(state) = serde_json::from_str::<SystemState>(&data) else {
            tracing::warn!("ignoring corrupt RAG state file");
            return false;
        };
        if state.version != INDEX_VERSION || !state.initialized {
            return false;
        }

        match self.store.load() {
            Ok(true) => {
                self.initialized.store(true, Ordering::Release);
                tracing::info!(commands = state.total_commands, "loaded RAG index");
                true
            }
            _ => false,
        }
    }

    fn save_system_state(&self) -> Result<()> {
        let state = SystemState {
            version: INDEX_VERSION.to_string(),
            initialized: self.is_initialized(),
            indexed_time: Utc::now(),
            total_pages: self.indexer.indexed_count(),
            total_commands: self.store.stats().total_documents,
        };
        write_json_atomic(&self.state_file, &state)
    }

    #[cfg(test)]
    pub fn index_pages_for_test(&self, pages: &[crate::domain::ManPage]) -> Result<()> {
        self.store.index_pages(pages)?;
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RagStats {
    pub initialized: bool,
    pub indexed_pages: usize,
    pub total_documents: usize,
    pub unique_commands: usize,
    pub index_tokens: usize,
}

/// Drop retrieval hits that are clearly off-topic for the query, plus
/// entries with throwaway descriptions.
fn is_relevant_command(query: &str, cmd: &CommandInfo) -> bool {
    let query_lower = query.to_lowercase();
    let name = cmd.name.to_lowercase();

    if name.starts_with("git-") && !query_lower.contains("git") {
        return false;
    }
    if name.starts_with("kubectl") && !query_lower.contains("kube") {
        return false;
    }
    if matches!(name.as_str(), "killall" | "rm")
        && !query_lower.contains("kill")
        && !query_lower.contains("remove")
    {
        return false;
    }
    cmd.description.len() >= 10
}

/// Words in the query that plausibly name a command: right shape, not a
/// common English or instruction word.
fn potential_commands(query: &str) -> Vec<String> {
    const COMMON_WORDS: &[&str] = &[
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "up", "down", "how", "what", "when", "where", "why", "list", "show", "display",
        "find", "search", "get", "set", "create", "delete", "remove", "install", "update",
        "upgrade",
    ];

    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.len() >= 2 && word.len() <= 20)
        .filter(|word| !COMMON_WORDS.contains(word))
        .filter(|word| {
            word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        })
        .map(str::to_string)
        .collect()
}

fn build_enhanced_prompt(original_prompt: &str, result: &RetrievalResult) -> String {
    let mut out = String::new();
    out.push_str("ADDITIONAL CONTEXT FROM SYSTEM MANUAL PAGES:\n");
    out.push_str("The following command information is available on this system:\n\n");

    for (i, cmd) in result.commands.iter().take(MAX_ENRICHMENT_COMMANDS).enumerate() {
        out.push_str(&format!("COMMAND {}: {}\n", i + 1, cmd.name));
        if !cmd.description.is_empty() {
            out.push_str(&format!("Description: {}\n", cmd.description));
        }
        if !cmd.synopsis.is_empty() {
            out.push_str(&format!("Usage: {}\n", cmd.synopsis));
        }
        if !cmd.options.is_empty() {
            out.push_str("Common Options: ");
            out.push_str(&cmd.options.iter().take(MAX_ENRICHMENT_OPTIONS).cloned().collect::<Vec<_>>().join(", "));
            if cmd.options.len() > MAX_ENRICHMENT_OPTIONS {
                out.push_str("...");
            }
            out.push('\n');
        }
        if !cmd.examples.is_empty() {
            out.push_str("Examples: ");
            out.push_str(&cmd.examples.iter().take(MAX_ENRICHMENT_EXAMPLES).cloned().collect::<Vec<_>>().join(" | "));
            if cmd.examples.len() > MAX_ENRICHMENT_EXAMPLES {
                out.push_str("...");
            }
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("ORIGINAL PROMPT:\n");
    out.push_str(original_prompt);
    out
}

fn render_explanation(info: &CommandInfo) -> String {
    let mut out = format!("**{}** - Command Explanation\n\n", info.name);

    if !info.description.is_empty() {
        out.push_str(&format!("**Description**: {}\n\n", info.description));
    }
    if !info.synopsis.is_empty() {
        out.push_str(&format!("**Usage**: `{}`\n\n", info.synopsis));
    }
    if !info.options.is_empty() {
        out.push_str("**Common Options**:\n");
        for option in &info.options {
            out.push_str(&format!("  - {option}\n"));
        }
        out.push('\n');
    }
    if !info.examples.is_empty() {
        out.push_str("**Examples**:\n");
        for example in info.examples.iter().take(3) {
            out.push_str(&format!("  ```\n  {example}\n  ```\n"));
        }
    }
    out
}

/// Confidence that a command fits the user intent:
/// +0.7 substring match, +0.8 whole-token match, +0.1 per meaningful
/// description-token overlap, capped at 1.0.
fn suggestion_confidence(user_input: &str, cmd: &CommandInfo) -> f32 {
    let input = user_input.to_lowercase();
    let name = cmd.name.to_lowercase();
    let mut confidence = 0.0_f32;

    if input.contains(&name) {
        confidence += 0.7;
    }
    if input.split_whitespace().any(|word| word == name) {
        confidence += 0.8;
    }

    let description_tokens: std::collections::HashSet<String> =
        tokenize(&cmd.description).into_iter().collect();
    let matches = input
        .split_whitespace()
        .filter(|word| word.len() > 3 && description_tokens.contains(*word))
        .count();
    confidence += matches as f32 * 0.1;

    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManPage;
    use tempfile::TempDir;

    fn page(name: &str, description: &str) -> ManPage {
        ManPage {
            name: name.to_string(),
            description: description.to_string(),
            synopsis: format!("{name} [OPTION]..."),
            options: vec!["-a".to_string()],
            examples: vec![format!("$ {name} -a")],
            ..ManPage::default()
        }
    }

    fn system_with(tmp: &TempDir, pages: &[ManPage]) -> Arc<RagSystem> {
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let system = Arc::new(RagSystem::new(&dirs));
        system.index_pages_for_test(pages).expect("index");
        system
    }

    #[test]
    fn enhance_prompt_passes_through_when_uninitialized() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let system = RagSystem::new(&dirs);

        let original = "Convert this request into a command";
        assert_eq!(system.enhance_prompt("list files", original), original);
    }

    #[test]
    fn enhance_prompt_passes_through_when_nothing_matches() {
        let tmp = TempDir::new().expect("tmp");
        let system = system_with(&tmp, &[page("tar", "an archiving utility")]);

        let original = "Convert this request into a command";
        // Nothing relevant for a query about quantum entanglement.
        assert_eq!(system.enhance_prompt("quantum entanglement", original), original);
    }

    #[test]
    fn enhance_prompt_prepends_context_and_keeps_original() {
        let tmp = TempDir::new().expect("tmp");
        let system = system_with(&tmp, &[page("ls", "list directory contents")]);

        let original = "Convert this request into a command";
        let enhanced = system.enhance_prompt("list files", original);
        assert!(enhanced.starts_with("ADDITIONAL CONTEXT FROM SYSTEM MANUAL PAGES:"));
        assert!(enhanced.contains("COMMAND 1: ls"));
        assert!(enhanced.ends_with(&format!("ORIGINAL PROMPT:\n{original}")));
    }

    #[test]
    fn enrichment_caps_commands_options_and_examples() {
        let tmp = TempDir::new().expect("tmp");
        let mut pages = Vec::new();
        for name in ["ls", "find", "dir", "stat", "file"] {
            let mut p = page(name, "list files in a directory tree");
            p.options = (0..8).map(|i| format!("-{i}")).collect();
            p.examples = (0..4).map(|i| format!("$ {name} {i}")).collect();
            pages.push(p);
        }
        let system = system_with(&tmp, &pages);

        let enhanced = system.enhance_prompt("list files", "PROMPT");
        let command_blocks = enhanced.matches("COMMAND ").count();
        assert!(command_blocks <= 3, "got {command_blocks} command blocks");
        // Five of eight options shown, then ellipsised.
        assert!(enhanced.contains("-0, -1, -2, -3, -4..."));
        assert!(!enhanced.contains("-5,"));
    }

    #[test]
    fn retrieve_filters_off_topic_commands() {
        let tmp = TempDir::new().expect("tmp");
        let system = system_with(
            &tmp,
            &[
                page("ls", "list directory contents"),
                page("git-log", "show commit logs for listed files"),
            ],
        );

        let result = system.retrieve("list files");
        assert!(result.commands.iter().all(|c| c.name != "git-log"));
    }

    #[test]
    fn retrieve_surfaces_exact_command_mentions_first() {
        let tmp = TempDir::new().expect("tmp");
        let system = system_with(
            &tmp,
            &[page("tar", "an archiving utility"), page("gzip", "compress or expand files")],
        );

        let result = system.retrieve("how do I use tar");
        assert!(result.used_rag);
        assert_eq!(result.commands[0].name, "tar");
    }

    #[test]
    fn explain_command_renders_store_content() {
        let tmp = TempDir::new().expect("tmp");
        let system = system_with(&tmp, &[page("ls", "list directory contents")]);

        let explanation = system.explain_command("ls").expect("explanation");
        assert!(explanation.contains("**ls**"));
        assert!(explanation.contains("list directory contents"));
        assert!(explanation.contains("ls [OPTION]..."));
    }

    #[test]
    fn explain_unknown_command_fails() {
        let tmp = TempDir::new().expect("tmp");
        let system = system_with(&tmp, &[page("ls", "list directory contents")]);
        assert!(system.explain_command("frobnicate").is_err());
    }

    #[test]
    fn suggestion_confidence_rewards_exact_token() {
        let info = CommandInfo {
            name: "tar".to_string(),
            description: "an archiving utility for tape archives".to_string(),
            ..CommandInfo::default()
        };
        // "tar" appears both as substring and as whole token.
        let c = suggestion_confidence("use tar to pack this", &info);
        assert!(c >= 1.0 - f32::EPSILON, "got {c}");

        let weak = suggestion_confidence("pack this directory", &info);
        assert!(weak < 0.5);
    }

    #[test]
    fn suggestion_confidence_is_capped_at_one() {
        let info = CommandInfo {
            name: "tar".to_string(),
            description: "archiving utility handling archives nicely always".to_string(),
            ..CommandInfo::default()
        };
        let c = suggestion_confidence("tar archiving utility archives nicely always", &info);
        assert!(c <= 1.0);
    }

    #[test]
    fn state_round_trips_and_skips_reindexing() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");

        {
            let system = Arc::new(RagSystem::new(&dirs));
            system.index_pages_for_test(&[page("ls", "list directory contents")]).expect("index");
            std::fs::create_dir_all(&dirs.rag_index_dir).expect("mkdir");
            system.save_system_state().expect("save state");
        }

        let fresh = RagSystem::new(&dirs);
        assert!(fresh.try_load_existing(), "state file + index should load");
        assert!(fresh.is_initialized());
        assert_eq!(fresh.status(), RagStatus::Completed);
    }

    #[test]
    fn orphan_vector_index_is_adopted() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");

        {
            let system = RagSystem::new(&dirs);
            system.index_pages_for_test(&[page("ls", "list directory contents")]).expect("index");
            // No state file written: simulates a crash after index save.
        }

        let fresh = RagSystem::new(&dirs);
        assert!(fresh.try_load_existing(), "orphan index should be adopted");
        assert!(dirs.rag_state_file().exists(), "fresh state file gets written");
    }

    #[test]
    fn reset_removes_state_directories() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let system = Arc::new(RagSystem::new(&dirs));
        system.index_pages_for_test(&[page("ls", "list directory contents")]).expect("index");
        std::fs::create_dir_all(&dirs.rag_index_dir).expect("mkdir");

        system.reset().expect("reset");
        assert!(!dirs.rag_index_dir.exists());
        assert!(!dirs.vector_index_file().exists());

        let fresh = RagSystem::new(&dirs);
        assert!(!fresh.try_load_existing());
    }

    #[test]
    fn state_file_is_valid_json_after_save() {
        let tmp = TempDir::new().expect("tmp");
        let dirs = StateDirs::resolve(Some(tmp.path())).expect("dirs");
        let system = RagSystem::new(&dirs);
        std::fs::create_dir_all(&dirs.rag_index_dir).expect("mkdir");
        system.save_system_state().expect("save");

        let data = std::fs::read_to_string(dirs.rag_state_file()).expect("read");
        let state: SystemState = serde_json::from_str(&data).expect("valid state JSON");
        assert_eq!(state.version, "1.0");
    }
}
