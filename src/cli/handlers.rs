//! Slash-command handlers.
//!
//! Every handler reports its outcome and returns; failures abort the
//! current command only, never the session.

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use std::io::Write as _;
use std::time::{Duration, Instant};

use crate::cli::repl::Context;
use crate::command::{execute, extract, tokenizer, DirectorySandbox, SandboxMode};
use crate::git::{ai_git_prompt, GitOperation};
use crate::model::{self, mock, prompt::ExplainPrompt, SamplingParams};
use crate::pkg::PackageManager;
use crate::utils::{contains_any, format_duration, truncate};

/// Interactive yes/no gate; auto-confirm answers yes without prompting.
fn confirm(ctx: &Context, prompt: &str) -> bool {
    if ctx.exec_config.auto_confirm {
        return true;
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

// ---------------------------------------------------------------- /cmd ---

pub fn handle_cmd(ctx: &mut Context, request: &str) {
    if request.is_empty() {
        println!("Usage: /cmd <natural language command>");
        println!("Example: /cmd 'list all files in current directory'");
        return;
    }

    println!("Processing: {request}");
    let Some(response) = generate_command_text(ctx, request) else {
        return;
    };

    let mut command = extract::extract_command(&response);
    if command.is_empty() {
        println!("The model did not produce a usable command.");
        println!("Raw response: {}", truncate(&response, 200));
        return;
    }

    let repaired = extract::repair_command(&command);
    if repaired != command {
        println!("Repaired command:");
        println!("  before: {command}");
        println!("  after:  {repaired}");
        command = repaired;
    }

    command = match extract::sanitize_command(&command) {
        Ok(clean) => clean,
        Err(err) => {
            println!("Command validation failed: {err}");
            match offer_manual_edit(ctx, &command) {
                Some(edited) => edited,
                None => {
                    println!("Command cancelled.");
                    return;
                }
            }
        }
    };

    if extract::has_syntax_errors(&command) {
        println!("Warning: the command has syntax errors and may fail.");
        if !confirm(ctx, "Execute anyway? (likely to fail)") {
            println!("Execution cancelled.");
            return;
        }
    } else if !ctx.exec_config.auto_confirm && confirm(ctx, "Show command breakdown?") {
        print_command_breakdown(&command);
    }

    println!("Command: {command}");

    if should_offer_explanation(&command) && confirm(ctx, "Would you like an explanation of this command?") {
        handle_explain(ctx, &command);
    }

    if !confirm(ctx, "Execute this command?") {
        println!("Command ready to use: {command}");
        return;
    }

    match execute::run_in_sandbox(&command, &ctx.exec_config, &ctx.env, &ctx.sandbox) {
        Ok(()) => println!("Command completed."),
        Err(err) => report_exec_error(err),
    }
}

/// Model call with the empty-response fallback ladder: full prompt, then a
/// bare prompt, then the rule table.
fn generate_command_text(ctx: &Context, request: &str) -> Option<String> {
    let Some(backend) = &ctx.model else {
        let mocked = mock::mock_command(request, &ctx.env);
        println!("[mock] {mocked}");
        return Some(mocked);
    };

    let prompt = ctx.prompts.command_prompt(request);
    let start = Instant::now();
    let response = match model::run_model(backend.as_ref(), &prompt) {
        Ok(response) => response,
        Err(err) => {
            println!("Model error: {err}");
            return None;
        }
    };
    tracing::debug!(elapsed = %format_duration(start.elapsed()), "model call finished");

    if !response.trim().is_empty() {
        return Some(response);
    }

    println!("The model returned an empty response; retrying with a simpler prompt.");
    let simple = format!("Command to {request}:");
    if let Ok(retry) = model::run_model(backend.as_ref(), &simple) {
        if !retry.trim().is_empty() {
            return Some(retry);
        }
    }

    match mock::fallback_command(request, &ctx.env) {
        Some(fallback) => {
            println!("[fallback] {fallback}");
            Some(fallback)
        }
        None => {
            let mocked = mock::mock_command(request, &ctx.env);
            println!("[fallback] {mocked}");
            Some(mocked)
        }
    }
}

/// One-line manual editor for commands that failed cleaning. Returns the
/// corrected command, or None when the user declines or the edit is still
/// invalid.
fn offer_manual_edit(ctx: &Context, command: &str) -> Option<String> {
    if !confirm(ctx, "Would you like to manually edit the command?") {
        return None;
    }

    let edited: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Corrected command")
        .with_initial_text(command)
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    let edited = edited.trim();
    if edited.is_empty() {
        return None;
    }

    match extract::sanitize_command(edited) {
        Ok(clean) => {
            println!("Manual edit accepted: {clean}");
            Some(clean)
        }
        Err(err) => {
            println!("Manual edit still invalid: {err}");
            None
        }
    }
}

fn print_command_breakdown(command: &str) {
    println!("Command breakdown:");
    for (token, explanation) in tokenizer::component_breakdown(command) {
        println!("  {:<12} {explanation}", token.text);
    }
}

fn should_offer_explanation(command: &str) -> bool {
    const COMPLEX: &[&str] = &[
        "rm -", "chmod", "chown", "dd", "find", "grep", "sed", "awk", "curl", "wget", "ssh",
        "scp", "rsync", "tar", "gzip",
    ];
    contains_any(&command.to_lowercase(), COMPLEX)
}

fn report_exec_error(err: execute::ExecError) {
    println!("Command failed: {err}");
    if let Some(hint) = err.hint() {
        println!("Hint: {hint}");
    }
}

// ---------------------------------------------------------------- /ask ---

pub fn handle_ask(ctx: &Context, question: &str) {
    if question.is_empty() {
        println!("Usage: /ask <question>");
        println!("Example: /ask 'how do I check disk space?'");
        return;
    }

    println!("Thinking about: {question}");

    let response = match &ctx.model {
        None => mock::mock_answer(question),
        Some(backend) => {
            let prompt = ctx.prompts.ask_prompt(question);
            let start = Instant::now();
            match model::run_model_with(backend.as_ref(), &prompt, &SamplingParams::for_ask()) {
                Ok(response) => {
                    tracing::debug!(elapsed = %format_duration(start.elapsed()), "model call finished");
                    response
                }
                Err(err) => {
                    println!("Model error: {err}");
                    return;
                }
            }
        }
    };

    let response = response.trim();
    if response.is_empty() {
        println!("The model generated an empty response.");
        return;
    }
    println!("{response}");
}

// ------------------------------------------------------------ /explain ---

pub fn handle_explain(ctx: &Context, command: &str) {
    if command.is_empty() {
        println!("Usage: /explain <command>");
        println!("Example: /explain 'git push origin main'");
        return;
    }

    println!("Explaining: {command}");

    match ctx.prompts.explain_prompt(command) {
        ExplainPrompt::Direct(explanation) => println!("{explanation}"),
        ExplainPrompt::Model(prompt) => {
            let explanation = match &ctx.model {
                None => mock::mock_explanation(command),
                Some(backend) => match model::run_model(backend.as_ref(), &prompt) {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => mock::fallback_explanation(command),
                    Err(err) => {
                        println!("Model error: {err}");
                        return;
                    }
                },
            };
            println!("{explanation}");
        }
    }
}

// ------------------------------------------- /install /update /remove ---

pub fn handle_package(ctx: &Context, action: &str, package: &str) {
    if package.is_empty() {
        println!("Usage: /{action} <package-name>");
        return;
    }

    let Some(manager) = PackageManager::detect(&ctx.env) else {
        println!("No supported package manager detected.");
        println!("Supported: apt, brew, choco, winget, pacman, yum, dnf, zypper, snap");
        return;
    };

    println!("Package manager: {}", manager.name());
    let info = manager.check_package(package);

    if info.installed {
        if info.version.is_empty() {
            println!("{package} is installed");
        } else {
            println!("{package} is installed (v{})", info.version);
        }
        if action == "install" {
            println!("Package is already installed. Use '/update {package}' to update.");
            return;
        }
    } else {
        println!("{package} is not installed");
        if action == "update" {
            println!("Package not installed. Use '/install {package}' first.");
            return;
        }
        if action == "remove" {
            println!("Package not installed, nothing to remove.");
            return;
        }
    }

    let command = match action {
        "install" => manager.install_command(package),
        "update" => manager.update_command(package),
        "remove" => manager.remove_command(package),
        other => {
            println!("Unknown package action: {other}");
            return;
        }
    };

    println!("Command: {command}");
    if manager.requires_sudo() {
        println!("Note: this command may require administrator privileges.");
    }

    if !confirm(ctx, "Execute this command?") {
        println!("Command cancelled. You can run it manually: {command}");
        return;
    }

    match execute::execute_command(&command, &ctx.exec_config, &ctx.env) {
        Ok(()) => println!("Command completed."),
        Err(err) => report_exec_error(err),
    }
}

// ---------------------------------------------------------------- /git ---

pub fn handle_git(ctx: &mut Context, request: &str) {
    if request.is_empty() {
        println!("Usage: /git <git operation>");
        println!("Examples:");
        println!("  /git merge feature-branch with squash and accept all changes");
        println!("  /git undo last commit");
        println!("  /git clean untracked files");
        return;
    }

    if !ctx.git.is_repository() {
        println!("Not a git repository: {}", ctx.git.workdir().display());
        println!("Navigate to a git repository first or run 'git init'.");
        return;
    }

    match ctx.git.detect_operation(request) {
        Some(operation) => run_git_operation(ctx, operation),
        None => run_ai_git_request(ctx, request),
    }
}

fn run_git_operation(ctx: &Context, operation: &GitOperation) {
    println!("Operation: {}", operation.description);
    if let Ok(branch) = ctx.git.current_branch() {
        println!("Current branch: {branch}");
    }
    if !operation.risks.is_empty() {
        println!("Risks:");
        for risk in operation.risks {
            println!("  - {risk}");
        }
    }

    if !confirm(ctx, operation.confirmation) {
        println!("Operation cancelled.");
        return;
    }

    let target_branch = if operation.needs_branch() {
        match prompt_target_branch(ctx) {
            Some(branch) => branch,
            None => {
                println!("No branch specified, operation cancelled.");
                return;
            }
        }
    } else {
        String::new()
    };

    if operation.is_destructive()
        && !confirm(ctx, "This is a destructive operation. Final confirmation?")
    {
        println!("Operation cancelled.");
        return;
    }

    let steps = operation.steps();
    for (i, step) in steps.iter().enumerate() {
        println!("Step {}/{}: {step}", i + 1, steps.len());

        if step.contains("${COMMIT_CMD}") {
            if let Err(err) = run_commit_step(ctx, &target_branch) {
                println!("Commit failed: {err}");
                println!("Operation incomplete. Check git status.");
                return;
            }
            continue;
        }

        let command = step.replace("${BRANCH}", &target_branch);
        if let Err(err) = execute::run_in_sandbox(&command, &ctx.exec_config, &ctx.env, &ctx.sandbox)
        {
            println!("Command failed at step {}: {err}", i + 1);
            println!("Operation incomplete. Check git status.");
            return;
        }
    }
    println!("All steps completed.");
}

/// Commit with a message file to sidestep shell escaping entirely.
fn run_commit_step(ctx: &Context, target_branch: &str) -> anyhow::Result<()> {
    let default_message = format!("Merge {target_branch} with squash");

    let choice = if ctx.exec_config.auto_confirm {
        0
    } else {
        let items = [
            format!("Use default message ('{default_message}')"),
            "Enter custom message".to_string(),
            "Open editor for message".to_string(),
        ];
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Commit message")
            .items(&items)
            .default(0)
            .interact()
            .unwrap_or(2)
    };

    let message = match choice {
        0 => default_message,
        1 => {
            let custom: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Commit message")
                .allow_empty(true)
                .interact_text()
                .unwrap_or_default();
            if custom.trim().is_empty() {
                default_message
            } else {
                custom
            }
        }
        _ => {
            return execute::run_in_sandbox(
                "git commit",
                &ctx.exec_config,
                &ctx.env,
                &ctx.sandbox,
            )
            .map_err(Into::into);
        }
    };

    let mut message_file = tempfile::NamedTempFile::new()?;
    message_file.write_all(message.as_bytes())?;
    let command = format!("git commit -F {}", message_file.path().display());
    execute::run_in_sandbox(&command, &ctx.exec_config, &ctx.env, &ctx.sandbox)
        .map_err(Into::into)
}

fn prompt_target_branch(ctx: &Context) -> Option<String> {
    if let Ok(branches) = ctx.git.branches() {
        if !branches.is_empty() {
            println!("Available branches:");
            for branch in branches.iter().take(10) {
                println!("  {branch}");
            }
        }
    }

    let branch: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Target branch")
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    let branch = branch.trim().to_string();
    if branch.is_empty() {
        None
    } else {
        Some(branch)
    }
}

fn run_ai_git_request(ctx: &Context, request: &str) {
    let Some(backend) = &ctx.model else {
        println!("This git request needs the model, which is unavailable in mock mode.");
        println!("Recognised shortcuts: merge squash, undo last commit, clean untracked, stash all, amend.");
        return;
    };

    let branch = ctx.git.current_branch().unwrap_or_default();
    let prompt = ai_git_prompt(request, ctx.git.workdir(), &branch);

    let response = match model::run_model(backend.as_ref(), &prompt) {
        Ok(response) => response,
        Err(err) => {
            println!("Model error: {err}");
            return;
        }
    };

    let mut command = extract::extract_command(&response);
    if command.is_empty() {
        println!("The model did not produce a usable git command.");
        return;
    }
    if !command.starts_with("git ") {
        command = format!("git {command}");
    }

    println!("Generated command: {command}");
    if !confirm(ctx, "Execute this git command?") {
        println!("Command ready: {command}");
        return;
    }

    match execute::run_in_sandbox(&command, &ctx.exec_config, &ctx.env, &ctx.sandbox) {
        Ok(()) => println!("Command completed."),
        Err(err) => report_exec_error(err),
    }
}

// ------------------------------------------------------- /sandbox /cd ---

pub fn handle_sandbox(ctx: &mut Context, mode: &str) {
    if mode.is_empty() {
        print_sandbox_status(&ctx.sandbox);
        println!("Usage: /sandbox <off|current|strict>");
        return;
    }

    match mode.to_lowercase().as_str() {
        "off" | "disable" | "none" => ctx.sandbox.set_mode(SandboxMode::Disabled),
        "current" | "dir" | "normal" => ctx.sandbox.set_mode(SandboxMode::CurrentDir),
        "strict" | "tight" | "restricted" => ctx.sandbox.set_mode(SandboxMode::Strict),
        other => {
            println!("Unknown sandbox mode: {other}");
            println!("Available modes: off, current, strict");
            return;
        }
    }
    println!("Sandbox mode: {}", ctx.sandbox.mode().label());
}

fn print_sandbox_status(sandbox: &DirectorySandbox) {
    println!("Sandbox status:");
    println!("  Mode:              {}", sandbox.mode().label());
    println!("  Allowed directory: {}", sandbox.allowed_dir().display());
    println!("  Original directory: {}", sandbox.original_dir().display());
}

pub fn handle_cd(ctx: &mut Context, dir: &str) {
    if dir.is_empty() {
        match std::env::current_dir() {
            Ok(cwd) => println!("Current directory: {}", cwd.display()),
            Err(err) => println!("Cannot determine current directory: {err}"),
        }
        return;
    }

    match ctx.sandbox.change_directory(dir) {
        Ok(path) => println!("Changed to directory: {}", path.display()),
        Err(err) => println!("Failed to change directory: {err}"),
    }
}

// ---------------------------------------------------------- utilities ---

pub fn toggle_dry_run(ctx: &mut Context) {
    ctx.exec_config.dry_run = !ctx.exec_config.dry_run;
    if ctx.exec_config.dry_run {
        println!("Dry-run mode enabled - commands will be shown but not executed.");
    } else {
        println!("Dry-run mode disabled - commands will be executed.");
    }
}

pub fn check_online() {
    println!("Checking internet connectivity...");
    if crate::net::is_online(Duration::from_secs(3)) {
        println!("Online - real-time capabilities available.");
    } else {
        println!("Offline - using local AI only.");
    }
}

pub fn rag_status(ctx: &Context) {
    println!("RAG system status:");
    let Some(rag) = &ctx.rag else {
        println!("  RAG system not available in this mode.");
        return;
    };

    let stats = rag.stats();
    println!("  Status:           {}", rag.status());
    println!("  Indexed pages:    {}", stats.indexed_pages);
    if stats.initialized {
        println!("  Vector documents: {}", stats.total_documents);
        println!("  Unique commands:  {}", stats.unique_commands);
        println!("  Index tokens:     {}", stats.index_tokens);
    }
}

pub fn rag_reindex(ctx: &Context) {
    let Some(rag) = &ctx.rag else {
        println!("RAG system not available in this mode.");
        return;
    };
    match std::sync::Arc::clone(rag).reindex() {
        Ok(()) => println!("RAG reindexing started in the background."),
        Err(err) => println!("Failed to start reindexing: {err}"),
    }
}

pub fn rag_reset(ctx: &Context) {
    let Some(rag) = &ctx.rag else {
        println!("RAG system not available in this mode.");
        return;
    };
    match rag.reset() {
        Ok(()) => println!("RAG state removed. The next startup reindexes."),
        Err(err) => println!("Failed to reset RAG state: {err}"),
    }
}

pub fn show_debug(ctx: &Context) {
    println!("Debug info:");
    println!("  OS:         {}", ctx.env.os);
    println!("  Shell:      {} ({})", ctx.env.shell.name(), ctx.env.shell_path);
    println!("  User:       {}", ctx.env.user);
    println!("  Home:       {}", ctx.env.home.display());
    println!("  Online:     {}", ctx.online);
    println!("  Mock mode:  {}", ctx.mock_mode);
    println!("  Dry run:    {}", ctx.exec_config.dry_run);
    println!("  Safe mode:  {}", ctx.exec_config.safe_mode);
    println!("  Default mode: {}", ctx.config.user_preferences.default_mode);
    println!("  State dir:  {}", ctx.dirs.root.display());
    println!("  Model file: {}", ctx.dirs.model_file().display());
    println!("  History:    {} entries", crate::history::load(&ctx.dirs.history_file).len());
    print_sandbox_status(&ctx.sandbox);
    if let Some(rag) = &ctx.rag {
        println!("  RAG status: {}", rag.status());
    }
}

pub fn show_help() {
    println!("Available commands:");
    println!("  /ask <question>        Ask a free-form question");
    println!("  /cmd <request>         Convert natural language into a shell command");
    println!("  /explain <command>     Explain what a command does");
    println!("  /install <package>     Install a package");
    println!("  /update <package>      Update a package");
    println!("  /remove <package>      Remove a package");
    println!("  /git <request>         Git helper workflows");
    println!("  /sandbox <mode>        Sandbox mode: off, current, strict");
    println!("  /cd <dir>              Sandbox-aware directory change");
    println!("  /dry-run               Toggle dry-run mode");
    println!("  /online                Check internet connectivity");
    println!("  /rag-status            Show RAG system status");
    println!("  /rag-reindex           Rebuild the manual page index");
    println!("  /rag-reset             Remove all RAG state");
    println!("  /test-ai               Probe the model with test prompts");
    println!("  /debug                 Show environment and configuration");
    println!("  /help                  This help");
    println!("  /exit                  Quit");
}

pub fn test_ai(ctx: &Context) {
    let Some(backend) = &ctx.model else {
        println!("No model loaded; /test-ai is unavailable in mock mode.");
        return;
    };

    const TESTS: &[(&str, &str)] = &[
        ("Simple Q&A", "Q: What is the sun?\nA:"),
        ("Instruction", "Instruction: Answer in one sentence. What is the sun?\nAnswer:"),
        ("Strict", "Answer the question in one word: Hello\nResponse:"),
        ("Chat", "User: What is the sun?\nAssistant:"),
    ];

    for &(name, prompt) in TESTS {
        println!("Testing: {name}");
        match model::run_model(backend.as_ref(), prompt) {
            Ok(response) => {
                let clean = response.trim();
                println!("  Response: '{clean}'");
                if clean.len() > 50 {
                    println!("  Note: response is verbose for this prompt style.");
                }
            }
            Err(err) => println!("  Failed: {err}"),
        }
    }
}
