//! Retrieval-augmented generation over the host's manual pages.

pub mod indexer;
pub mod store;
pub mod system;

pub use store::VectorStore;
pub use system::{RagStats, RagStatus, RagSystem};
