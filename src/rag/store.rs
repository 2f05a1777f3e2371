//! Inverted-index retrieval store over manual-page documents.
//!
//! Each indexed man page contributes up to five documents (command,
//! description, options, examples, synopsis). Queries are scored with
//! TF-IDF over an inverted index, then adjusted by a boost/penalty pass
//! that favours exact and partial command-name matches and demotes
//! commands that are clearly off-topic for the query.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;

use crate::config::write_json_atomic;
use crate::domain::{CommandInfo, ManPage};

/// Results below this score are noise and never surfaced.
const SCORE_THRESHOLD: f32 = 0.1;

/// One retrievable unit derived from a man-page section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub content: String,
    pub metadata: DocMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocMeta {
    pub command: String,
    pub section: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// A document together with its query score.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub doc: VectorDocument,
    pub score: f32,
}

#[derive(Default)]
struct StoreInner {
    documents: HashMap<String, VectorDocument>,
    /// token -> posting list of document ids (duplicates allowed).
    index: HashMap<String, Vec<String>>,
    initialized: bool,
}

/// Thread-safe store: writers take the exclusive guard, readers the shared
/// one, so queries issued after an index write always observe it.
pub struct VectorStore {
    index_file: PathBuf,
    inner: RwLock<StoreInner>,
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "this", "that", "from", "are", "was", "were", "have", "has",
        "had", "will", "would", "could", "should", "can", "may", "might", "which", "what", "when",
        "where", "why", "how", "who", "whom", "whose",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, split on whitespace, strip surrounding ASCII punctuation,
/// drop short tokens and stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c| ".,!?;:\"'()[]{}".contains(c)))
        .filter(|word| word.len() > 2 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

impl VectorStore {
    pub fn new(index_file: PathBuf) -> Self {
        VectorStore { index_file, inner: RwLock::new(StoreInner::default()) }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.read().expect("store lock poisoned").initialized
    }

    /// Replace the store contents with documents derived from `pages` and
    /// persist the result.
    pub fn index_pages(&self, pages: &[ManPage]) -> Result<usize> {
        if pages.is_empty() {
            bail!("no man pages to index");
        }

        let mut count = 0;
        {
            let mut inner = self.inner.write().expect("store lock poisoned");
            *inner = StoreInner::default();
            for page in pages {
                for doc in derive_documents(page) {
                    inner.add(doc);
                    count += 1;
                }
            }
            inner.initialized = true;
        }

        self.save()?;
        Ok(count)
    }

    /// Top-`limit` similarity search over the query text.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredDocument>> {
        let inner = self.inner.read().expect("store lock poisoned");
        if !inner.initialized {
            bail!("vector store not initialized");
        }

        let total_docs = inner.documents.len() as f32;
        let query_tokens = tokenize(query);
        let mut scores: HashMap<&str, f32> = HashMap::new();

        for token in &query_tokens {
            if let Some(posting) = inner.index.get(token.as_str()) {
                let df = posting.len() as f32;
                let tf = df / total_docs;
                let idf = (total_docs / df).ln();
                let weight = tf * idf;
                for id in posting {
                    *scores.entry(id.as_str()).or_default() += weight;
                }
            }
        }

        let query_lower = query.to_lowercase();
        let list_file_query = query_lower.contains("list") && query_lower.contains("file");
        let dir_query = query_lower.contains("directory") || query_lower.contains("folder");
        let exact_ids: HashSet<&str> =
            exact_documents(&inner, query).into_iter().map(|doc| doc.id.as_str()).collect();

        // Boost pass. Boosts may surface documents the TF-IDF pass missed.
        for (id, doc) in &inner.documents {
            let command = doc.metadata.command.to_lowercase();
            let mut bonus = 0.0_f32;

            if list_file_query && matches!(command.as_str(), "ls" | "find" | "dir") {
                bonus += 3.0;
            }
            if dir_query && matches!(command.as_str(), "ls" | "pwd" | "dir") {
                bonus += 2.0;
            }
            if exact_ids.contains(id.as_str()) {
                bonus += 2.0;
            }
            if query_lower.contains(&command) {
                bonus += 1.5;
            }
            for token in &query_tokens {
                if command.contains(token.as_str()) {
                    bonus += 0.5;
                }
            }

            if bonus > 0.0 {
                *scores.entry(id.as_str()).or_default() += bonus;
            }
        }

        // Penalty pass: demote commands that are off-topic for the query.
        for (id, score) in scores.iter_mut() {
            let command = inner.documents[*id].metadata.command.to_lowercase();
            if command.starts_with("git-") && !query_lower.contains("git") {
                *score *= 0.1;
            }
            if command.starts_with("kubectl") && !query_lower.contains("kube") {
                *score *= 0.1;
            }
            if matches!(command.as_str(), "killall" | "rm")
                && !query_lower.contains("kill")
                && !query_lower.contains("remove")
            {
                *score *= 0.1;
            }
        }

        let mut results: Vec<(&str, f32)> =
            scores.into_iter().filter(|(_, score)| *score > SCORE_THRESHOLD).collect();
        // Ties break on document id so ranking is stable across runs and
        // across a save/load round trip.
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(b.0))
        });
        results.truncate(limit);

        Ok(results
            .into_iter()
            .map(|(id, score)| ScoredDocument { doc: inner.documents[id].clone(), score })
            .collect())
    }

    /// Every document whose command equals the query, case-insensitive.
    pub fn search_exact(&self, query: &str) -> Vec<VectorDocument> {
        let inner = self.inner.read().expect("store lock poisoned");
        exact_documents(&inner, query).into_iter().cloned().collect()
    }

    /// Merge every document of `command` into one record, deduplicating
    /// options and examples in first-seen order. Not-found when the merged
    /// description is empty.
    pub fn command_info(&self, command: &str) -> Result<CommandInfo> {
        let inner = self.inner.read().expect("store lock poisoned");
        if !inner.initialized {
            bail!("vector store not initialized");
        }

        let mut info = CommandInfo { name: command.to_string(), ..CommandInfo::default() };
        let mut docs: Vec<&VectorDocument> = inner.documents.values().collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        for doc in docs {
            if doc.metadata.command != command {
                continue;
            }
            match doc.metadata.section.as_str() {
                "command" => info.description = doc.metadata.description.clone(),
                "synopsis" => info.synopsis = doc.content.clone(),
                "options" => info.options.extend(doc.metadata.options.iter().cloned()),
                "examples" => info.examples.extend(doc.metadata.examples.iter().cloned()),
                _ => {}
            }
        }

        info.options = dedupe(info.options);
        info.examples = dedupe(info.examples);

        if info.description.is_empty() {
            bail!("no information found for command: {command}");
        }
        Ok(info)
    }

    /// Best document per distinct command from a top-2k search, resolved to
    /// full command records.
    pub fn relevant_commands(&self, query: &str, max_results: usize) -> Result<Vec<CommandInfo>> {
        let hits = self.search(query, max_results * 2)?;

        // Hits are already score-ordered, so the first hit per command is
        // its best one.
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for hit in hits {
            if !seen.insert(hit.doc.metadata.command.clone()) {
                continue;
            }
            if let Ok(info) = self.command_info(&hit.doc.metadata.command) {
                results.push(info);
            }
            if results.len() >= max_results {
                break;
            }
        }
        Ok(results)
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.read().expect("store lock poisoned");
        let commands: HashSet<&str> =
            inner.documents.values().map(|d| d.metadata.command.as_str()).collect();
        StoreStats {
            total_documents: inner.documents.len(),
            unique_commands: commands.len(),
            index_tokens: inner.index.len(),
            initialized: inner.initialized,
        }
    }

    /// Persist the document set as a flat JSON map, atomically.
    pub fn save(&self) -> Result<()> {
        let inner = self.inner.read().expect("store lock poisoned");
        // BTreeMap keeps the on-disk file stably ordered.
        let documents: BTreeMap<&str, &VectorDocument> =
            inner.documents.iter().map(|(id, doc)| (id.as_str(), doc)).collect();
        write_json_atomic(&self.index_file, &documents)?;
        tracing::debug!(documents = documents.len(), "saved vector index");
        Ok(())
    }

    /// Load the persisted document map and rebuild the inverted index by
    /// re-tokenising every document. Returns false when no index exists.
    pub fn load(&self) -> Result<bool> {
        let data = match std::fs::read_to_string(&self.index_file) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read vector index {}", self.index_file.display())
                });
            }
        };

        let documents: BTreeMap<String, VectorDocument> = serde_json::from_str(&data)
            .with_context(|| format!("corrupt vector index {}", self.index_file.display()))?;
        if documents.is_empty() {
            return Ok(false);
        }

        let mut inner = self.inner.write().expect("store lock poisoned");
        *inner = StoreInner::default();
        for (_, doc) in documents {
            inner.add(doc);
        }
        inner.initialized = true;
        tracing::debug!(documents = inner.documents.len(), "loaded vector index");
        Ok(true)
    }
}

impl StoreInner {
    fn add(&mut self, doc: VectorDocument) {
        for token in tokenize(&doc.content) {
            self.index.entry(token).or_default().push(doc.id.clone());
        }
        self.documents.insert(doc.id.clone(), doc);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    pub total_documents: usize,
    pub unique_commands: usize,
    pub index_tokens: usize,
    pub initialized: bool,
}

/// Derive the per-section documents for one page, skipping sections whose
/// source field is empty.
pub fn derive_documents(page: &ManPage) -> Vec<VectorDocument> {
    let mut docs = Vec::with_capacity(5);

    docs.push(VectorDocument {
        id: format!("{}-command", page.name),
        content: format!("command {}: {}", page.name, page.description),
        metadata: DocMeta {
            command: page.name.clone(),
            section: "command".to_string(),
            description: page.description.clone(),
            ..DocMeta::default()
        },
    });

    if !page.description.is_empty() {
        docs.push(VectorDocument {
            id: format!("{}-description", page.name),
            content: page.description.clone(),
            metadata: DocMeta {
                command: page.name.clone(),
                section: "description".to_string(),
                ..DocMeta::default()
            },
        });
    }

    if !page.options.is_empty() {
        docs.push(VectorDocument {
            id: format!("{}-options", page.name),
            content: format!("options for {}: {}", page.name, page.options.join(" | ")),
            metadata: DocMeta {
                command: page.name.clone(),
                section: "options".to_string(),
                options: page.options.clone(),
                ..DocMeta::default()
            },
        });
    }

    if !page.examples.is_empty() {
        docs.push(VectorDocument {
            id: format!("{}-examples", page.name),
            content: format!("examples for {}: {}", page.name, page.examples.join(" | ")),
            metadata: DocMeta {
                command: page.name.clone(),
                section: "examples".to_string(),
                examples: page.examples.clone(),
                ..DocMeta::default()
            },
        });
    }

    if !page.synopsis.is_empty() {
        docs.push(VectorDocument {
            id: format!("{}-synopsis", page.name),
            content: page.synopsis.clone(),
            metadata: DocMeta {
                command: page.name.clone(),
                section: "synopsis".to_string(),
                ..DocMeta::default()
            },
        });
    }

    docs
}

/// Documents whose command equals the query, case-insensitive, in stable
/// id order.
fn exact_documents<'a>(inner: &'a StoreInner, query: &str) -> Vec<&'a VectorDocument> {
    let needle = query.trim().to_lowercase();
    let mut docs: Vec<&VectorDocument> = inner
        .documents
        .values()
        .filter(|doc| doc.metadata.command.to_lowercase() == needle)
        .collect();
    docs.sort_by(|a, b| a.id.cmp(&b.id));
    docs
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page(name: &str, description: &str) -> ManPage {
        ManPage {
            name: name.to_string(),
            description: description.to_string(),
            synopsis: format!("{name} [OPTION]... [FILE]..."),
            options: vec!["-a".to_string(), "-l".to_string()],
            examples: vec![format!("$ {name} -la")],
            ..ManPage::default()
        }
    }

    fn store_with(pages: &[ManPage]) -> (TempDir, VectorStore) {
        let tmp = TempDir::new().expect("tmp");
        let store = VectorStore::new(tmp.path().join("vector_index.json"));
        store.index_pages(pages).expect("index");
        (tmp, store)
    }

    #[test]
    fn indexing_one_page_yields_five_documents() {
        let (_tmp, store) = store_with(&[page("ls", "list directory contents")]);
        let stats = store.stats();
        assert_eq!(stats.total_documents, 5);
        assert_eq!(stats.unique_commands, 1);

        for id in ["ls-command", "ls-description", "ls-options", "ls-examples", "ls-synopsis"] {
            let hits = store.search_exact("ls");
            assert!(hits.iter().any(|d| d.id == id), "missing document {id}");
        }
    }

    #[test]
    fn empty_sections_are_skipped() {
        let bare = ManPage { name: "true".to_string(), ..ManPage::default() };
        let (_tmp, store) = store_with(&[bare]);
        // Only the unconditional command document remains.
        assert_eq!(store.stats().total_documents, 1);
    }

    #[test]
    fn tokenize_drops_short_tokens_and_stop_words() {
        let tokens = tokenize("The ls command, and (that) is for listing!");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"and".to_string()));
        assert!(!tokens.contains(&"ls".to_string()), "len <= 2 never enters the index");
        assert!(tokens.contains(&"command".to_string()));
        assert!(tokens.contains(&"listing".to_string()));
    }

    #[test]
    fn search_list_files_ranks_ls_first() {
        let (_tmp, store) = store_with(&[
            page("ls", "list directory contents"),
            page("tar", "an archiving utility"),
        ]);

        let hits = store.search("list files", 3).expect("search");
        assert!(!hits.is_empty());
        assert_eq!(hits[0].doc.metadata.command, "ls");
    }

    #[test]
    fn off_topic_commands_are_penalized() {
        let (_tmp, store) = store_with(&[
            page("ls", "list directory contents"),
            page("git-log", "show commit logs for files"),
            page("kubectl", "list resources in a cluster of files"),
        ]);

        let hits = store.search("list files", 10).expect("search");
        assert_eq!(hits[0].doc.metadata.command, "ls");

        let ls_score = hits[0].score;
        for hit in &hits[1..] {
            if hit.doc.metadata.command != "ls" {
                assert!(
                    hit.score < ls_score,
                    "{} should score below ls ({} >= {ls_score})",
                    hit.doc.metadata.command,
                    hit.score
                );
            }
        }
    }

    #[test]
    fn directory_boost_stacks_with_list_file_boost() {
        let (_tmp, store) = store_with(&[page("ls", "list directory contents")]);

        let plain = store.search("list file", 5).expect("search");
        let stacked = store.search("list file directory", 5).expect("search");
        let best_plain = plain.iter().map(|h| h.score).fold(0.0_f32, f32::max);
        let best_stacked = stacked.iter().map(|h| h.score).fold(0.0_f32, f32::max);
        assert!(best_stacked > best_plain, "directory boost should add on top");
    }

    #[test]
    fn low_scores_are_dropped() {
        let (_tmp, store) = store_with(&[page("rm", "remove files or directories")]);
        // "rm" is penalized x0.1 for queries without kill/remove, dropping
        // every document under the threshold.
        let hits = store.search("something unrelated entirely", 10).expect("search");
        assert!(hits.is_empty());
    }

    #[test]
    fn ranking_is_deterministic() {
        let (_tmp, store) = store_with(&[
            page("ls", "list directory contents"),
            page("find", "search for files in a directory hierarchy"),
            page("dir", "list directory contents"),
        ]);

        let a = store.search("list files", 10).expect("search");
        let b = store.search("list files", 10).expect("search");
        let ids_a: Vec<&str> = a.iter().map(|h| h.doc.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|h| h.doc.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn command_info_merges_and_dedupes() {
        let mut p = page("ls", "list directory contents");
        p.options = vec!["-a".to_string(), "-l".to_string(), "-a".to_string()];
        let (_tmp, store) = store_with(&[p]);

        let info = store.command_info("ls").expect("info");
        assert_eq!(info.description, "list directory contents");
        assert_eq!(info.options, vec!["-a", "-l"]);
        assert_eq!(info.examples, vec!["$ ls -la"]);
    }

    #[test]
    fn command_info_without_description_is_not_found() {
        let bare = ManPage {
            name: "mystery".to_string(),
            synopsis: "mystery [FLAGS]".to_string(),
            ..ManPage::default()
        };
        let (_tmp, store) = store_with(&[bare]);
        assert!(store.command_info("mystery").is_err());
    }

    #[test]
    fn relevant_commands_returns_one_record_per_command() {
        let (_tmp, store) = store_with(&[
            page("ls", "list directory contents"),
            page("find", "search for files in a directory hierarchy"),
        ]);

        let commands = store.relevant_commands("list files", 3).expect("relevant");
        assert!(!commands.is_empty());
        let names: HashSet<&str> = commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), commands.len(), "no duplicate commands");
        assert!(names.contains("ls"));
        assert!(names.contains("find"));
    }

    #[test]
    fn save_load_round_trip_preserves_search_order() {
        let tmp = TempDir::new().expect("tmp");
        let index_file = tmp.path().join("vector_index.json");

        let store = VectorStore::new(index_file.clone());
        store
            .index_pages(&[
                page("ls", "list directory contents"),
                page("find", "search for files in a directory hierarchy"),
                page("pwd", "print name of current directory"),
            ])
            .expect("index");

        let before: Vec<(String, f32)> = store
            .search("list files in a directory", 10)
            .expect("search")
            .into_iter()
            .map(|h| (h.doc.id, h.score))
            .collect();

        let fresh = VectorStore::new(index_file);
        assert!(fresh.load().expect("load"));
        let after: Vec<(String, f32)> = fresh
            .search("list files in a directory", 10)
            .expect("search")
            .into_iter()
            .map(|h| (h.doc.id, h.score))
            .collect();

        assert_eq!(before.len(), after.len());
        for ((id_a, score_a), (id_b, score_b)) in before.iter().zip(after.iter()) {
            assert_eq!(id_a, id_b);
            assert!((score_a - score_b).abs() < 1e-5);
        }
    }

    #[test]
    fn search_on_uninitialized_store_fails() {
        let tmp = TempDir::new().expect("tmp");
        let store = VectorStore::new(tmp.path().join("vector_index.json"));
        assert!(store.search("anything", 3).is_err());
    }

    #[test]
    fn load_reports_false_when_no_index_exists() {
        let tmp = TempDir::new().expect("tmp");
        let store = VectorStore::new(tmp.path().join("vector_index.json"));
        assert!(!store.load().expect("load"));
        assert!(!store.is_initialized());
    }
}
