//! State-directory layout and atomic file writes.
//!
//! Everything Helix persists lives under one state root (`~/.helix` by
//! default). State files are written via a temp file followed by a rename so
//! a reader never observes a half-written file.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_DIR_NAME: &str = ".helix";
pub const MODEL_DIR_ENV: &str = "HELIX_MODEL_DIR";

/// Resolved locations of every on-disk artifact.
#[derive(Debug, Clone)]
pub struct StateDirs {
    pub root: PathBuf,
    pub model_dir: PathBuf,
    pub rag_index_dir: PathBuf,
    pub vector_index_dir: PathBuf,
    pub man_index_dir: PathBuf,
    pub config_file: PathBuf,
    pub history_file: PathBuf,
}

impl StateDirs {
    /// Resolve the layout, honouring an explicit root override and the
    /// `HELIX_MODEL_DIR` environment variable.
    pub fn resolve(override_root: Option<&Path>) -> Result<Self> {
        let root = match override_root {
            Some(dir) => dir.to_path_buf(),
            None => home_dir()?.join(STATE_DIR_NAME),
        };

        let model_dir = match std::env::var_os(MODEL_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => root.join("models"),
        };

        Ok(StateDirs {
            model_dir,
            rag_index_dir: root.join("rag_index"),
            vector_index_dir: root.join("vector_index"),
            man_index_dir: root.join("man_index"),
            config_file: root.join("config.json"),
            history_file: root.join("helix_history"),
            root,
        })
    }

    /// Create the state root, model directory and the auxiliary page-cache
    /// directory. Fatal when this fails: nothing else can persist without
    /// it.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create state directory {}", self.root.display()))?;
        fs::create_dir_all(&self.model_dir).with_context(|| {
            format!("failed to create model directory {}", self.model_dir.display())
        })?;
        fs::create_dir_all(&self.man_index_dir).with_context(|| {
            format!("failed to create cache directory {}", self.man_index_dir.display())
        })?;
        Ok(())
    }

    pub fn rag_state_file(&self) -> PathBuf {
        self.rag_index_dir.join("rag_state.json")
    }

    pub fn vector_index_file(&self) -> PathBuf {
        self.vector_index_dir.join("vector_index.json")
    }

    pub fn model_file(&self) -> PathBuf {
        self.model_dir.join("llama-2-7b-chat.Q4_0.gguf")
    }
}

/// Home directory from `HOME`, falling back to `USERPROFILE` on Windows.
pub fn home_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    if let Some(profile) = std::env::var_os("USERPROFILE") {
        if !profile.is_empty() {
            return Ok(PathBuf::from(profile));
        }
    }
    bail!("could not determine home directory (HOME/USERPROFILE unset)")
}

/// Serialise `value` as pretty JSON and write it atomically: temp file in
/// the target directory, then rename over the destination.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().context("state file path has no parent directory")?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let data = serde_json::to_vec_pretty(value).context("failed to serialise state")?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &data)
        .with_context(|| format!("failed to write temporary file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace state file {}", path.display()))?;
    Ok(())
}
