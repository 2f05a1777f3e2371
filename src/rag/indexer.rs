//! Manual-page discovery and parsing.
//!
//! Discovery runs two methods in sequence into a deduplicating filter: the
//! host's keyword lookup (`man -k .`) and a direct scan of the manual
//! directories. Pages for useful commands are then fetched and parsed by a
//! fixed worker pool. Pages that fail to fetch or parse are silently
//! skipped; a partial index is always better than none here.

use anyhow::{bail, Result};
use crossbeam_channel::bounded;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::domain::ManPage;

pub const WORKER_COUNT: usize = 6;
pub const CHANNEL_CAPACITY: usize = 100;

const MAX_OPTIONS: usize = 10;
const MAX_EXAMPLES: usize = 5;
const SYNOPSIS_MAX_LEN: usize = 150;
const DESCRIPTION_MAX_LEN: usize = 200;

/// Scans the host's manual pages and keeps the parsed results.
#[derive(Default)]
pub struct ManIndexer {
    pages: RwLock<HashMap<String, ManPage>>,
}

impl ManIndexer {
    pub fn new() -> Self {
        ManIndexer::default()
    }

    /// Number of pages indexed so far; readable while indexing runs.
    pub fn indexed_count(&self) -> usize {
        self.pages.read().expect("indexer lock poisoned").len()
    }

    pub fn pages(&self) -> Vec<ManPage> {
        self.pages.read().expect("indexer lock poisoned").values().cloned().collect()
    }

    pub fn page(&self, name: &str) -> Option<ManPage> {
        self.pages.read().expect("indexer lock poisoned").get(name).cloned()
    }

    /// Discover useful commands and index their manual pages on a worker
    /// pool. Honours `cancel` between pages, leaving whatever was indexed
    /// so far in place.
    pub fn index_available_pages(&self, cancel: &AtomicBool) -> Result<usize> {
        let names = discover_useful_commands();
        if names.is_empty() {
            bail!("no manual pages found on this host");
        }
        tracing::info!(candidates = names.len(), "discovered manual page candidates");

        let (name_tx, name_rx) = bounded::<String>(CHANNEL_CAPACITY);
        let (page_tx, page_rx) = bounded::<ManPage>(CHANNEL_CAPACITY);

        std::thread::scope(|scope| {
            for _ in 0..WORKER_COUNT {
                let name_rx = name_rx.clone();
                let page_tx = page_tx.clone();
                scope.spawn(move || {
                    for name in name_rx.iter() {
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Ok(page) = fetch_page(&name) {
                            if page_tx.send(page).is_err() {
                                break;
                            }
                        }
                    }
                });
            }
            drop(name_rx);
            drop(page_tx);

            scope.spawn(move || {
                for name in names {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    if name_tx.send(name).is_err() {
                        break;
                    }
                }
                // name_tx drops here, closing the channel so workers drain
                // their remaining input and exit.
            });

            let mut processed = 0usize;
            for page in page_rx.iter() {
                self.pages.write().expect("indexer lock poisoned").insert(page.name.clone(), page);
                processed += 1;
                if processed % 50 == 0 {
                    tracing::debug!(pages = processed, "indexing manual pages");
                }
            }
        });

        Ok(self.indexed_count())
    }
}

/// Run both discovery methods in sequence, deduplicating and keeping only
/// useful commands.
fn discover_useful_commands() -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for name in discover_via_apropos().into_iter().chain(discover_via_man_dirs()) {
        if is_useful_command(&name) && seen.insert(name.clone()) {
            out.push(name);
        }
    }
    out
}

/// Method A: keyword lookup over all pages. Lines look like
/// `ls(1) - list directory contents`; the first token carries the name.
fn discover_via_apropos() -> Vec<String> {
    let Ok(output) = Command::new("man").args(["-k", "."]).output() else {
        return Vec::new();
    };
    if !output.status.success() {
        return Vec::new();
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut names = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        let name = first.split('(').next().unwrap_or(first);
        let name = name.strip_prefix("git-").unwrap_or(name);
        if name.len() > 1 {
            names.push(name.to_string());
        }
    }
    names
}

/// Method B: enumerate `man1..man8` under every manual search path and take
/// each entry's basename up to the first dot (`ls.1.gz` -> `ls`).
fn discover_via_man_dirs() -> Vec<String> {
    let mut names = Vec::new();
    for base in man_search_paths() {
        for category in 1..=8u32 {
            let dir = base.join(format!("man{category}"));
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.path().is_dir() {
                    continue;
                }
                let file_name = entry.file_name();
                let Some(file_name) = file_name.to_str() else {
                    continue;
                };
                if !file_name.contains('.') {
                    continue;
                }
                let command = file_name.split('.').next().unwrap_or_default();
                if command.len() > 1 {
                    names.push(command.to_string());
                }
            }
        }
    }
    names
}

/// Manual search path from `MANPATH`, with platform defaults and extra
/// developer-toolchain locations probed on macOS.
fn man_search_paths() -> Vec<PathBuf> {
    if let Ok(manpath) = std::env::var("MANPATH") {
        if !manpath.is_empty() {
            return std::env::split_paths(&manpath).collect();
        }
    }

    if cfg!(target_os = "macos") {
        const MACOS_CANDIDATES: &[&str] = &[
            "/usr/share/man",
            "/usr/local/share/man",
            "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk/usr/share/man",
            "/Library/Developer/CommandLineTools/Toolchains/XcodeDefault.xctoolchain/usr/share/man",
            "/Library/Developer/CommandLineTools/usr/share/man",
            "/Applications/Xcode.app/Contents/Developer/usr/share/man",
        ];
        let existing: Vec<PathBuf> = MACOS_CANDIDATES
            .iter()
            .map(|p| PathBuf::from(*p))
            .filter(|p| p.exists())
            .collect();
        if !existing.is_empty() {
            return existing;
        }
    }

    vec![PathBuf::from("/usr/share/man"), PathBuf::from("/usr/local/share/man")]
}

/// Fetch and parse one page. Any failure bubbles up and the caller skips
/// the page.
fn fetch_page(command: &str) -> Result<ManPage> {
    let output = Command::new("man").arg(command).output()?;
    if !output.status.success() {
        bail!("no manual page for {command}");
    }

    let content = String::from_utf8_lossy(&output.stdout);
    let mut page = parse_man_content(command, &content);

    // Best effort: record where the page source lives.
    if let Ok(path_out) = Command::new("man").args(["-w", command]).output() {
        if path_out.status.success() {
            page.source_path = String::from_utf8_lossy(&path_out.stdout).trim().to_string();
        }
    }

    Ok(page)
}

static SECTION_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([1-8])\)").expect("valid regex"));
static OPTION_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*-{1,2}[A-Za-z0-9]").expect("valid regex"));
static EXAMPLE_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[$#>]").expect("valid regex"));

/// Split rendered manual text into sections and extract the structured
/// fields. Section headers are lines that equal their own uppercase form
/// and contain no whitespace (NAME, SYNOPSIS, ...).
pub fn parse_man_content(command: &str, content: &str) -> ManPage {
    let mut page = ManPage {
        name: command.to_string(),
        full_text: content.to_string(),
        ..ManPage::default()
    };

    // The title line carries the section digit: "LS(1)".
    if let Some(first) = content.lines().find(|l| !l.trim().is_empty()) {
        if let Some(caps) = SECTION_DIGIT_RE.captures(first) {
            page.category = caps[1].to_string();
        }
    }

    let mut current_section = String::new();
    let mut section_body = String::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        let is_header =
            !line.is_empty() && !line.contains(' ') && line.to_uppercase() == line;
        if is_header {
            apply_section(&current_section, &section_body, &mut page);
            current_section = line.to_string();
            section_body.clear();
            continue;
        }
        section_body.push_str(line);
        section_body.push('\n');
    }
    apply_section(&current_section, &section_body, &mut page);

    if page.description.is_empty() {
        page.description = fallback_description(content);
    }

    page
}

fn apply_section(section: &str, body: &str, page: &mut ManPage) {
    match section.to_uppercase().as_str() {
        "NAME" => page.description = extract_name_description(body),
        "SYNOPSIS" => page.synopsis = clean_synopsis(body),
        "DESCRIPTION" => {
            if page.description.is_empty() {
                page.description = first_paragraph(body);
            }
        }
        "OPTIONS" => page.options = extract_options(body),
        "EXAMPLES" => page.examples = extract_examples(body),
        _ => {}
    }
}

/// NAME sections read `command - description`.
fn extract_name_description(body: &str) -> String {
    for line in body.lines() {
        if let Some((_, description)) = line.split_once(" - ") {
            return description.trim().to_string();
        }
    }
    first_paragraph(body)
}

fn first_paragraph(body: &str) -> String {
    let mut paragraph = String::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !paragraph.is_empty() {
                break;
            }
            continue;
        }
        if !paragraph.is_empty() {
            paragraph.push(' ');
        }
        paragraph.push_str(line);
    }

    if paragraph.chars().count() > DESCRIPTION_MAX_LEN {
        let cut: String = paragraph.chars().take(DESCRIPTION_MAX_LEN).collect();
        return format!("{cut}...");
    }
    paragraph
}

fn clean_synopsis(body: &str) -> String {
    let collapsed = crate::utils::text::collapse_whitespace(body);
    let synopsis = collapsed.trim();
    if synopsis.chars().count() > SYNOPSIS_MAX_LEN {
        let cut: String = synopsis.chars().take(SYNOPSIS_MAX_LEN).collect();
        return format!("{cut}...");
    }
    synopsis.to_string()
}

fn extract_options(body: &str) -> Vec<String> {
    let mut options = Vec::new();
    for line in body.lines() {
        if OPTION_LINE_RE.is_match(line) {
            let option = line.trim();
            if !option.is_empty() && option.len() < 100 {
                options.push(option.to_string());
            }
        }
        if options.len() == MAX_OPTIONS {
            break;
        }
    }
    options
}

/// Examples are groups started by a `$`, `#` or `>` line; following
/// non-empty lines fold into the same group.
fn extract_examples(body: &str) -> Vec<String> {
    let mut examples = Vec::new();
    let mut current = String::new();

    for line in body.lines() {
        if EXAMPLE_LINE_RE.is_match(line) {
            if !current.is_empty() {
                examples.push(std::mem::take(&mut current));
            }
            current.push_str(line.trim());
        } else if !current.is_empty() && !line.trim().is_empty() {
            current.push(' ');
            current.push_str(line.trim());
        }
    }
    if !current.is_empty() {
        examples.push(current);
    }

    examples.truncate(MAX_EXAMPLES);
    examples
}

fn fallback_description(content: &str) -> String {
    for line in content.lines() {
        let line = line.trim();
        if line.len() > 20 && line.len() < 200 && !line.starts_with('.') {
            return line.to_string();
        }
    }
    "No description available".to_string()
}

/// The two usefulness filters in conjunction: a sane command-name shape and
/// membership in the common-command allow list (or a tooling prefix).
pub fn is_useful_command(command: &str) -> bool {
    if command.len() < 2 {
        return false;
    }
    if !command.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return false;
    }

    if COMMON_COMMANDS.contains(command.to_lowercase().as_str()) {
        return true;
    }

    const USEFUL_PREFIXES: &[&str] = &["git-", "docker-", "kubectl-", "aws-", "gcloud-"];
    const USEFUL_EXACT: &[&str] = &["systemctl", "journalctl", "logrotate", "crontab"];

    USEFUL_PREFIXES.iter().any(|p| command.starts_with(p))
        || USEFUL_EXACT.contains(&command)
}

/// Commands users actually reach for: file ops, text processing,
/// monitoring, networking, packaging, development, archives, user
/// management, editors.
static COMMON_COMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // File operations
        "ls", "cd", "pwd", "cp", "mv", "rm", "mkdir", "rmdir", "touch", "cat", "more", "less",
        "head", "tail", "find", "locate", "which", "whereis", "file", "stat", "du", "df", "mount",
        "umount", "chmod", "chown", "chgrp", "ln", "readlink", "realpath", "basename", "dirname",
        "pathchk", "mktemp",
        // Text processing
        "grep", "egrep", "fgrep", "awk", "sed", "cut", "paste", "sort", "uniq", "wc", "tr", "tee",
        "column", "expand", "unexpand", "fmt", "pr", "nl", "fold", "join", "split", "csplit",
        "tac", "rev", "comm", "diff", "patch",
        // System monitoring
        "ps", "top", "htop", "kill", "pkill", "killall", "jobs", "bg", "fg", "nice", "renice",
        "free", "vmstat", "iostat", "mpstat", "sar", "lsof", "netstat", "ss", "uptime", "w",
        "who", "last", "dmesg", "journalctl", "sysctl", "uname", "hostname", "domainname",
        "dnsdomainname", "nisdomainname", "ypdomainname",
        // Networking
        "ping", "traceroute", "tracepath", "curl", "wget", "ssh", "scp", "rsync", "ftp", "sftp",
        "ifconfig", "ip", "route", "arp", "dig", "nslookup", "whois", "host", "nmap", "nc",
        "netcat", "telnet", "openssl", "ssh-keygen", "ssh-copy-id", "ssh-add", "ssh-agent",
        // Package management
        "apt", "apt-get", "apt-cache", "dpkg", "yum", "dnf", "rpm", "brew", "pip", "npm", "gem",
        "cargo", "go", "composer", "apk", "zypper", "pacman", "snap", "flatpak", "conda", "port",
        // Development
        "git", "svn", "make", "gcc", "g++", "clang", "gdb", "valgrind", "strace", "ltrace",
        "docker", "kubectl", "terraform", "ansible", "puppet", "chef", "node", "python",
        "python3", "ruby", "perl", "php", "java", "javac", "mvn", "gradle", "cmake", "autoconf",
        "automake", "libtool", "pkg-config",
        // Archives
        "tar", "gzip", "gunzip", "bzip2", "bunzip2", "zip", "unzip", "7z", "rar", "unrar", "xz",
        "unxz", "zcat", "bzcat", "xzcat", "ar", "cpio", "dump", "restore",
        // User management
        "whoami", "id", "groups", "passwd", "su", "sudo", "useradd", "userdel", "usermod",
        "groupadd", "groupdel", "groupmod", "chage", "chsh", "chfn", "newusers", "pwck", "grpck",
        "lastlog", "faillog",
        // Process and system
        "shutdown", "reboot", "halt", "poweroff", "date", "time", "cal", "bc", "echo", "printf",
        "test", "expr", "sleep", "wait", "timeout", "watch", "crontab", "at", "batch", "nohup",
        "setsid", "screen", "tmux", "script", "logger", "wall", "write", "mesg",
        // Shell builtins and core utilities
        "alias", "unalias", "export", "unset", "source", "history", "type", "help", "man",
        "info", "whatis", "apropos", "clear", "reset", "tput", "stty", "set", "shopt", "ulimit",
        "umask", "fc", "bind", "complete", "compgen", "dirs", "pushd", "popd", "times", "disown",
        "suspend",
        // Checksums and encryption
        "gpg", "md5sum", "sha1sum", "sha256sum", "sha512sum", "base64", "base32", "uuencode",
        "uudecode",
        // System info and hardware
        "lscpu", "lsblk", "lsusb", "lspci", "lsmod", "modinfo", "modprobe", "dmidecode",
        "hdparm", "smartctl", "fdisk", "parted", "mkfs", "fsck", "blkid", "swapon", "swapoff",
        // Editors and viewers
        "vi", "vim", "nano", "emacs", "ed", "ex", "view", "vimdiff", "sdiff", "colordiff",
        // Terminal and session management
        "tty", "pts", "byobu", "expect", "dialog", "whiptail",
    ]
    .into_iter()
    .collect()
});
