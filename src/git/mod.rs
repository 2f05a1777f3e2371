//! Git helper workflows.
//!
//! Frequent multi-step operations (squash merges, undoing commits,
//! cleaning untracked files) come from a rule table with explicit risk
//! notes; anything else falls back to the model. Repository inspection
//! goes through libgit2 rather than shelling out.

use anyhow::{Context, Result};
use git2::{BranchType, Repository};
use std::path::{Path, PathBuf};

/// A recognised git workflow with its confirmation text and risks.
#[derive(Debug, Clone)]
pub struct GitOperation {
    pub description: &'static str,
    /// `;`-separated steps; `${BRANCH}` and `${COMMIT_CMD}` are filled in
    /// by the caller.
    pub command: &'static str,
    pub confirmation: &'static str,
    pub risks: &'static [&'static str],
}

impl GitOperation {
    pub fn steps(&self) -> Vec<&'static str> {
        self.command.split(';').map(str::trim).filter(|s| !s.is_empty()).collect()
    }

    pub fn needs_branch(&self) -> bool {
        self.command.contains("${BRANCH}")
    }

    pub fn is_destructive(&self) -> bool {
        const DESTRUCTIVE: &[&str] = &[
            "checkout --theirs",
            "reset --hard",
            "clean -fd",
            "push --force",
            "branch -D",
            "reset --soft",
        ];
        DESTRUCTIVE.iter().any(|p| self.command.contains(p))
    }
}

pub struct GitManager {
    workdir: PathBuf,
}

impl GitManager {
    pub fn new(workdir: PathBuf) -> Self {
        GitManager { workdir }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_repository(&self) -> bool {
        Repository::discover(&self.workdir).is_ok()
    }

    pub fn current_branch(&self) -> Result<String> {
        let repo = Repository::discover(&self.workdir).context("not a git repository")?;
        let head = repo.head().context("repository has no HEAD")?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    /// Local and remote branch names, current first, `HEAD` refs dropped.
    pub fn branches(&self) -> Result<Vec<String>> {
        let repo = Repository::discover(&self.workdir).context("not a git repository")?;
        let mut names = Vec::new();
        for branch in repo.branches(Some(BranchType::Local))?.flatten() {
            if let Some(name) = branch.0.name()? {
                names.push(name.to_string());
            }
        }
        for branch in repo.branches(Some(BranchType::Remote))?.flatten() {
            if let Some(name) = branch.0.name()? {
                if !name.ends_with("HEAD") {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Match a natural-language request against the rule table.
    pub fn detect_operation(&self, request: &str) -> Option<&'static GitOperation> {
        detect_operation(request)
    }
}

const MERGE_SQUASH_THEIRS: GitOperation = GitOperation {
    description: "Merge branch with squash and accept all incoming changes",
    command: "git merge --squash ${BRANCH}; git checkout --theirs .; git add .; ${COMMIT_CMD}",
    confirmation: "This will squash all commits from the branch into one, accept ALL incoming \
                   changes (overwriting local conflicts) and create a new commit.",
    risks: &[
        "Permanently overwrites local changes in case of conflicts",
        "Loses individual commit history from the merged branch",
        "Uses default commit message - edit if needed",
    ],
};

const MERGE_SQUASH: GitOperation = GitOperation {
    description: "Merge branch with squash",
    command: "git merge --squash ${BRANCH}",
    confirmation: "This will squash all commits from the branch into staged changes. You'll \
                   need to commit manually.",
    risks: &["Loses individual commit history from the merged branch", "Requires manual commit"],
};

const UNDO_LAST_COMMIT: GitOperation = GitOperation {
    description: "Undo last commit but keep changes",
    command: "git reset --soft HEAD~1",
    confirmation: "This will undo the last commit but keep all changes staged.",
    risks: &["Removes the last commit from history", "Changes remain staged for recommit"],
};

const CLEAN_UNTRACKED: GitOperation = GitOperation {
    description: "Clean untracked files and directories",
    command: "git clean -fd",
    confirmation: "This will permanently delete all untracked files and directories.",
    risks: &["Permanently deletes untracked files", "Cannot be undone"],
};

const STASH_ALL: GitOperation = GitOperation {
    description: "Stash all changes including untracked files",
    command: "git stash --include-untracked",
    confirmation: "This will stash all changes including untracked files.",
    risks: &[
        "Temporarily removes all uncommitted changes",
        "Use 'git stash pop' to restore later",
    ],
};

const AMEND_COMMIT: GitOperation = GitOperation {
    description: "Amend the most recent commit",
    command: "git commit --amend",
    confirmation: "This will modify the most recent commit. If already pushed, force push will \
                   be needed.",
    risks: &["Changes commit history", "May require force push if already pushed"],
};

fn detect_operation(request: &str) -> Option<&'static GitOperation> {
    let request = request.to_lowercase();
    let has = |needle: &str| request.contains(needle);

    if has("merge") && has("squash") && (has("accept all") || has("incoming")) {
        return Some(&MERGE_SQUASH_THEIRS);
    }
    if has("merge") && has("squash") {
        return Some(&MERGE_SQUASH);
    }
    if (has("undo") || has("remove")) && has("commit") {
        return Some(&UNDO_LAST_COMMIT);
    }
    if has("clean") && has("untracked") {
        return Some(&CLEAN_UNTRACKED);
    }
    if has("stash") && (has("all") || has("everything")) {
        return Some(&STASH_ALL);
    }
    if (has("change") || has("amend")) && has("commit") {
        return Some(&AMEND_COMMIT);
    }
    None
}

/// Prompt template for git requests the rule table does not cover.
pub fn ai_git_prompt(request: &str, workdir: &Path, current_branch: &str) -> String {
    format!(
        "You are a git expert. Provide a single git command for: \"{request}\"\n\n\
         Current context:\n\
         - Working directory: {workdir}\n\
         - Current branch: {current_branch}\n\n\
         Rules:\n\
         - Output ONLY the git command\n\
         - No explanations, no markdown, no backticks\n\
         - Make it safe and appropriate\n\
         - Include necessary flags but avoid destructive options unless clearly requested\n\n\
         Command:",
        workdir = workdir.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_squash_merge_variants() {
        let op = detect_operation("merge feature-x with squash and accept all changes")
            .expect("operation");
        assert!(op.command.contains("checkout --theirs"));
        assert!(op.needs_branch());
        assert!(op.is_destructive());

        let plain = detect_operation("merge the branch with squash").expect("operation");
        assert_eq!(plain.command, "git merge --squash ${BRANCH}");
        assert!(!plain.command.contains("checkout"));
    }

    #[test]
    fn detects_undo_clean_stash_amend() {
        assert_eq!(
            detect_operation("undo the last commit").expect("op").command,
            "git reset --soft HEAD~1"
        );
        assert_eq!(
            detect_operation("clean all untracked files").expect("op").command,
            "git clean -fd"
        );
        assert_eq!(
            detect_operation("stash everything please").expect("op").command,
            "git stash --include-untracked"
        );
        assert_eq!(
            detect_operation("amend my last commit").expect("op").command,
            "git commit --amend"
        );
    }

    #[test]
    fn unknown_requests_fall_through_to_the_model() {
        assert!(detect_operation("show me a pretty log graph").is_none());
    }

    #[test]
    fn multi_step_operations_split_into_steps() {
        let op = detect_operation("merge b with squash accept all incoming").expect("op");
        let steps = op.steps();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], "git merge --squash ${BRANCH}");
        assert_eq!(steps[3], "${COMMIT_CMD}");
    }

    #[test]
    fn repository_detection_on_a_plain_directory() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let manager = GitManager::new(tmp.path().to_path_buf());
        assert!(!manager.is_repository());
        assert!(manager.current_branch().is_err());
    }

    #[test]
    fn repository_detection_and_branch_on_a_real_repo() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let repo = Repository::init(tmp.path()).expect("init");
        {
            let mut config = repo.config().expect("config");
            config.set_str("user.name", "test").expect("name");
            config.set_str("user.email", "test@example.com").expect("email");

            let sig = repo.signature().expect("signature");
            let tree_id = {
                let mut index = repo.index().expect("index");
                index.write_tree().expect("tree")
            };
            let tree = repo.find_tree(tree_id).expect("find tree");
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).expect("commit");
        }

        let manager = GitManager::new(tmp.path().to_path_buf());
        assert!(manager.is_repository());
        let branch = manager.current_branch().expect("branch");
        assert!(branch == "main" || branch == "master", "unexpected branch {branch}");
        assert!(manager.branches().expect("branches").contains(&branch));
    }

    #[test]
    fn ai_prompt_includes_context() {
        let prompt = ai_git_prompt("rebase onto main", Path::new("/repo"), "feature/x");
        assert!(prompt.contains("rebase onto main"));
        assert!(prompt.contains("/repo"));
        assert!(prompt.contains("feature/x"));
    }
}
