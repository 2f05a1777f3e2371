//! Interactive read-eval loop and startup sequence.
//!
//! Startup builds one `Context` value holding everything the handlers
//! need; nothing in the crate relies on global mutable state. The loop
//! itself never holds locks across input reads and catches every handler
//! error, so a failed command never takes the session down.

use anyhow::{Context as _, Result};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{handlers, Cli};
use crate::command::DirectorySandbox;
use crate::config::{Config, StateDirs};
use crate::domain::{Env, ExecuteConfig};
use crate::git::GitManager;
use crate::model::prompt::PromptBuilder;
use crate::model::ModelBackend;
use crate::rag::RagSystem;

const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Startup monitor: one status line every 3 s while background indexing
/// runs, for at most 30 checks.
const MONITOR_INTERVAL: Duration = Duration::from_secs(3);
const MONITOR_MAX_CHECKS: u32 = 30;

/// Everything the handlers operate on, built once at startup and passed
/// explicitly.
pub struct Context {
    pub dirs: StateDirs,
    pub config: Config,
    pub env: Env,
    pub online: bool,
    pub exec_config: ExecuteConfig,
    pub sandbox: DirectorySandbox,
    pub prompts: PromptBuilder,
    pub rag: Option<Arc<RagSystem>>,
    pub model: Option<Box<dyn ModelBackend>>,
    pub git: GitManager,
    pub mock_mode: bool,
}

impl Context {
    pub fn prompt_label(&self) -> &'static str {
        if self.mock_mode {
            "[helix-mock]> "
        } else {
            "[helix]> "
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    println!("Helix {} - AI-powered terminal assistant", env!("CARGO_PKG_VERSION"));

    // Unrecoverable startup failures: state directory and config.
    let dirs = StateDirs::resolve(cli.state_dir.as_deref())?;
    dirs.ensure().context("cannot set up the state directory")?;
    let config = Config::load(&dirs)?;

    let env = crate::shell::detect_environment();
    println!("Detected: {} ({} shell)", env.os, env.shell.name());

    let online = !cli.offline && crate::net::is_online(STARTUP_PROBE_TIMEOUT);
    if online {
        println!("Online mode - real-time capabilities available");
    } else {
        println!("Offline mode - using local AI only");
    }

    let mut exec_config = config.execute_config;
    exec_config.dry_run |= cli.dry_run;
    exec_config.auto_confirm |= config.user_preferences.auto_confirm;
    exec_config.safe_mode = config.user_preferences.safe_mode;

    let sandbox = DirectorySandbox::new();
    let git = GitManager::new(sandbox.original_dir().to_path_buf());

    // Model errors degrade to mock mode; the session continues.
    let model: Option<Box<dyn ModelBackend>> = if cli.mock {
        None
    } else {
        match crate::model::load_backend(&dirs.model_file()) {
            Ok(backend) => {
                println!("AI model loaded");
                Some(backend)
            }
            Err(err) => {
                tracing::warn!("model unavailable: {err}");
                None
            }
        }
    };

    let mock_mode = model.is_none();
    if mock_mode {
        println!("Running in mock mode: AI responses are simulated and dry-run is forced.");
        exec_config.dry_run = true;
    }

    // RAG only runs alongside a real model, matching the degraded mode's
    // reduced surface.
    let rag = if mock_mode {
        None
    } else {
        let rag = Arc::new(RagSystem::new(&dirs));
        if rag.try_load_existing() {
            println!("RAG system ready: command documentation available");
        } else {
            println!("RAG system indexing manual pages in the background...");
            Arc::clone(&rag).initialize_in_background();
            spawn_rag_monitor(&rag);
        }
        Some(rag)
    };

    let prompts = match &rag {
        Some(rag) => PromptBuilder::with_rag(env.clone(), online, Arc::clone(rag)),
        None => PromptBuilder::new(env.clone(), online),
    };

    let mut ctx = Context {
        dirs,
        config,
        env,
        online,
        exec_config,
        sandbox,
        prompts,
        rag,
        model,
        git,
        mock_mode,
    };

    println!("Helix is ready. Type '/help' for available commands.");
    run_loop(&mut ctx)
}

fn spawn_rag_monitor(rag: &Arc<RagSystem>) {
    let rag = Arc::clone(rag);
    std::thread::spawn(move || {
        for _ in 0..MONITOR_MAX_CHECKS {
            std::thread::sleep(MONITOR_INTERVAL);
            if rag.is_initialized() {
                tracing::info!("RAG system is now active");
                return;
            }
            tracing::debug!(status = %rag.status(), "RAG indexing");
        }
        tracing::info!("RAG monitoring finished; indexing continues in the background");
    });
}

fn run_loop(ctx: &mut Context) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut rag_banner_shown = false;

    loop {
        if !rag_banner_shown {
            if let Some(rag) = &ctx.rag {
                if rag.is_initialized() {
                    println!("RAG system is now active. Enhanced commands available.");
                    rag_banner_shown = true;
                }
            }
        }

        print!("{}", ctx.prompt_label());
        std::io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            // EOF is a clean exit.
            println!();
            return Ok(());
        };
        let input = line.context("failed to read input")?.trim().to_string();

        if input.is_empty() {
            continue;
        }
        if input == "/exit" {
            println!("Exiting Helix. Goodbye!");
            return Ok(());
        }
        if input == "exit" {
            println!("Use '/exit' to quit.");
            continue;
        }

        if !ctx.mock_mode {
            if let Err(err) = crate::history::append(&ctx.dirs.history_file, &input) {
                tracing::debug!("could not append history: {err}");
            }
        }

        dispatch(ctx, &input);
    }
}

fn dispatch(ctx: &mut Context, input: &str) {
    let (command, rest) = match input.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        "/debug" => handlers::show_debug(ctx),
        "/help" => handlers::show_help(),
        "/online" => handlers::check_online(),
        "/test-ai" => handlers::test_ai(ctx),
        "/rag-status" => handlers::rag_status(ctx),
        "/rag-reindex" => handlers::rag_reindex(ctx),
        "/rag-reset" => handlers::rag_reset(ctx),
        "/cmd" => handlers::handle_cmd(ctx, rest),
        "/ask" => handlers::handle_ask(ctx, rest),
        "/explain" => handlers::handle_explain(ctx, rest),
        "/install" => handlers::handle_package(ctx, "install", rest),
        "/update" => handlers::handle_package(ctx, "update", rest),
        "/remove" => handlers::handle_package(ctx, "remove", rest),
        "/git" => handlers::handle_git(ctx, rest),
        "/sandbox" => handlers::handle_sandbox(ctx, rest),
        "/cd" => handlers::handle_cd(ctx, rest),
        "/dry-run" => handlers::toggle_dry_run(ctx),
        _ => {
            println!("Tip: start with '/ask' for questions or '/cmd' for command generation.");
        }
    }
}
