//! helix: an AI-powered terminal assistant.
//!
//! Turns natural-language requests into sandboxed shell commands, answers
//! questions and explains commands, backed by a locally loaded model and a
//! retrieval layer built over the host's manual pages.

use anyhow::Result;

mod cli;
mod command;
mod config;
mod domain;
mod git;
mod history;
mod model;
mod net;
mod pkg;
mod rag;
mod shell;
mod utils;

fn main() -> Result<()> {
    cli::run()
}
