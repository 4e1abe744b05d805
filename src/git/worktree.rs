//! Git worktree provisioning for shortcut sessions
//!
//! A shortcut with `use_worktree` set gets a dedicated worktree under the
//! managed directory, on a branch derived from the shortcut. Provisioning is
//! idempotent: an existing worktree for the branch is reused, never
//! recreated.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::data::Shortcut;

#[derive(Error, Debug)]
pub enum WorktreeError {
    #[error("Git command failed: {0}")]
    CommandFailed(String),
    #[error("Not a git repository: {0}")]
    NotAGitRepo(PathBuf),
    #[error("Branch {branch} is already checked out at {path}")]
    BranchInUse { branch: String, path: PathBuf },
    #[error("Failed to parse git output: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Information about a git worktree
#[derive(Debug, Clone)]
pub struct WorktreeInfo {
    /// Path to the worktree
    pub path: PathBuf,
    /// Current HEAD commit
    pub head: String,
    /// Branch name (if on a branch)
    pub branch: Option<String>,
    /// Whether this is the main worktree
    pub is_main: bool,
}

/// The resolved working directory for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// Directory the session starts in
    pub path: PathBuf,
    /// Worktree branch, when one was provisioned
    pub branch: Option<String>,
}

/// Manager for git worktree operations
#[derive(Debug, Clone)]
pub struct WorktreeManager {
    /// Base directory for managed worktrees
    managed_dir: PathBuf,
    /// Base branch preferred when a shortcut asks for it
    develop_branch: String,
}

impl WorktreeManager {
    /// Create a manager rooting worktrees under `managed_dir`
    pub fn new(managed_dir: PathBuf) -> Self {
        Self {
            managed_dir,
            develop_branch: "develop".to_string(),
        }
    }

    /// Override the name of the integration branch (default "develop")
    pub fn with_develop_branch(mut self, branch: impl Into<String>) -> Self {
        self.develop_branch = branch.into();
        self
    }

    /// Resolve the working directory for a shortcut.
    ///
    /// Passthrough when the shortcut doesn't ask for a worktree. Otherwise
    /// the worktree for the derived branch is located or created; failures
    /// surface before any session exists.
    pub fn provision(&self, shortcut: &Shortcut) -> Result<Provisioned, WorktreeError> {
        if !shortcut.use_worktree {
            return Ok(Provisioned {
                path: shortcut.project_path.clone(),
                branch: None,
            });
        }

        let repo = shortcut.project_path.as_path();
        self.validate_git_repo(repo)?;

        let branch = derive_branch(shortcut);

        // Reuse an existing worktree for this branch wherever it lives
        if let Some(existing) = self
            .list_worktrees(repo)?
            .into_iter()
            .find(|w| w.branch.as_deref() == Some(branch.as_str()))
        {
            tracing::debug!(
                branch = %branch,
                path = %existing.path.display(),
                "Reusing existing worktree"
            );
            return Ok(Provisioned {
                path: existing.path,
                branch: Some(branch),
            });
        }

        let worktree_path = self.worktree_path(repo, &branch);
        if worktree_path.exists() {
            // The directory is there but git doesn't know it as this
            // branch's worktree; creating over it would corrupt state
            return Err(WorktreeError::BranchInUse {
                branch,
                path: worktree_path,
            });
        }

        if let Some(parent) = worktree_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = worktree_path.to_string_lossy();
        let output = if self.branch_exists(repo, &branch)? {
            // Existing branch: check it out in the new worktree
            git(repo, &["worktree", "add", path_str.as_ref(), &branch])?
        } else {
            let base = self.resolve_base_branch(repo, shortcut)?;
            git(
                repo,
                &["worktree", "add", "-b", &branch, path_str.as_ref(), &base],
            )?
        };

        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        tracing::info!(
            branch = %branch,
            path = %worktree_path.display(),
            "Created worktree"
        );

        Ok(Provisioned {
            path: worktree_path,
            branch: Some(branch),
        })
    }

    /// Base branch for a fresh worktree branch: the integration branch when
    /// requested and present, otherwise whatever the repository is on now
    fn resolve_base_branch(
        &self,
        repo: &Path,
        shortcut: &Shortcut,
    ) -> Result<String, WorktreeError> {
        if shortcut.use_base_develop {
            if self.branch_exists(repo, &self.develop_branch)? {
                return Ok(self.develop_branch.clone());
            }
            tracing::warn!(
                repo = %repo.display(),
                branch = %self.develop_branch,
                "Requested base branch does not exist, using current branch"
            );
        }
        self.current_branch(repo)
    }

    /// Check whether a local branch exists
    fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool, WorktreeError> {
        let refname = format!("refs/heads/{}", branch);
        let output = git(repo, &["rev-parse", "--verify", "--quiet", &refname])?;
        Ok(output.status.success())
    }

    /// Get the current branch name for a path
    pub fn current_branch(&self, path: &Path) -> Result<String, WorktreeError> {
        let output = git(path, &["branch", "--show-current"])?;
        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if branch.is_empty() {
            // Detached HEAD
            let output = git(path, &["rev-parse", "--short", "HEAD"])?;
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        Ok(branch)
    }

    /// List all worktrees for a repository
    pub fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeInfo>, WorktreeError> {
        self.validate_git_repo(repo)?;

        let output = git(repo, &["worktree", "list", "--porcelain"])?;
        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        parse_worktree_list(&String::from_utf8_lossy(&output.stdout))
    }

    /// Check if a path is a git repository
    pub fn is_git_repo(&self, path: &Path) -> bool {
        path.join(".git").exists()
            || git(path, &["rev-parse", "--git-dir"])
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    fn validate_git_repo(&self, path: &Path) -> Result<(), WorktreeError> {
        if !self.is_git_repo(path) {
            return Err(WorktreeError::NotAGitRepo(path.to_path_buf()));
        }
        Ok(())
    }

    /// Deterministic worktree location: <managed>/<repo-name>/<branch-slug>
    fn worktree_path(&self, repo: &Path, branch: &str) -> PathBuf {
        let repo_name = repo
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("repo");
        self.managed_dir
            .join(repo_name)
            .join(sanitize_ref(branch).replace('/', "-"))
    }
}

/// Branch for a shortcut's worktree: the configured name, or a slug derived
/// from the immutable parts of the shortcut
fn derive_branch(shortcut: &Shortcut) -> String {
    let configured = shortcut.worktree_branch.trim();
    if !configured.is_empty() {
        return sanitize_ref(configured);
    }
    format!("keymux/{}", sanitize_ref(&shortcut.name))
}

/// Sanitize a string for use in git refs
fn sanitize_ref(input: &str) -> String {
    input
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            c if c.is_alphanumeric() || c == '-' || c == '.' || c == '/' => c,
            _ => '-',
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

fn git(cwd: &Path, args: &[&str]) -> Result<std::process::Output, WorktreeError> {
    Ok(Command::new("git").args(args).current_dir(cwd).output()?)
}

/// Parse the porcelain output of `git worktree list`
fn parse_worktree_list(output: &str) -> Result<Vec<WorktreeInfo>, WorktreeError> {
    let mut worktrees = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_head = String::new();
    let mut current_branch: Option<String> = None;
    let mut is_first = true;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(prev) = current_path.take() {
                worktrees.push(WorktreeInfo {
                    path: prev,
                    head: std::mem::take(&mut current_head),
                    branch: current_branch.take(),
                    is_main: is_first,
                });
                is_first = false;
            }
            current_path = Some(PathBuf::from(path));
        } else if let Some(head) = line.strip_prefix("HEAD ") {
            current_head = head.to_string();
        } else if let Some(branch) = line.strip_prefix("branch ") {
            current_branch = Some(
                branch
                    .strip_prefix("refs/heads/")
                    .unwrap_or(branch)
                    .to_string(),
            );
        }
    }

    if let Some(path) = current_path {
        worktrees.push(WorktreeInfo {
            path,
            head: current_head,
            branch: current_branch,
            is_main: is_first,
        });
    }

    Ok(worktrees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use tempfile::tempdir;

    fn init_git_repo(path: &Path) {
        let run = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(path)
                .output()
                .unwrap()
        };
        run(&["init"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test User"]);
        run(&["config", "commit.gpgsign", "false"]);
        std::fs::write(path.join("README.md"), "# Test\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-m", "Initial commit"]);
    }

    fn worktree_shortcut(project: &Path) -> Shortcut {
        let mut s = Shortcut::new("x", "Api Server", project.to_path_buf(), Tool::Claude);
        s.use_worktree = true;
        s
    }

    #[test]
    fn test_passthrough_without_worktree() {
        let manager = WorktreeManager::new(PathBuf::from("/unused"));
        let shortcut = Shortcut::new("x", "T", PathBuf::from("/some/project"), Tool::Shell);

        let provisioned = manager.provision(&shortcut).unwrap();
        assert_eq!(provisioned.path, PathBuf::from("/some/project"));
        assert_eq!(provisioned.branch, None);
    }

    #[test]
    fn test_not_a_git_repo() {
        let dir = tempdir().unwrap();
        let managed = tempdir().unwrap();
        let manager = WorktreeManager::new(managed.path().to_path_buf());

        let err = manager.provision(&worktree_shortcut(dir.path())).unwrap_err();
        assert!(matches!(err, WorktreeError::NotAGitRepo(_)));
    }

    #[test]
    fn test_provision_creates_and_reuses() {
        let repo = tempdir().unwrap();
        init_git_repo(repo.path());
        let managed = tempdir().unwrap();
        let manager = WorktreeManager::new(managed.path().to_path_buf());

        let shortcut = worktree_shortcut(repo.path());
        let first = manager.provision(&shortcut).unwrap();
        assert!(first.path.exists());
        assert_eq!(first.branch.as_deref(), Some("keymux/api-server"));

        // Second provision finds the same worktree instead of failing
        let second = manager.provision(&shortcut).unwrap();
        assert_eq!(first.path, second.path);

        let worktrees = manager.list_worktrees(repo.path()).unwrap();
        assert_eq!(worktrees.len(), 2);
    }

    #[test]
    fn test_provision_uses_configured_branch() {
        let repo = tempdir().unwrap();
        init_git_repo(repo.path());
        let managed = tempdir().unwrap();
        let manager = WorktreeManager::new(managed.path().to_path_buf());

        let mut shortcut = worktree_shortcut(repo.path());
        shortcut.worktree_branch = "feature/api".to_string();

        let provisioned = manager.provision(&shortcut).unwrap();
        assert_eq!(provisioned.branch.as_deref(), Some("feature/api"));
    }

    #[test]
    fn test_develop_fallback_to_current_branch() {
        let repo = tempdir().unwrap();
        init_git_repo(repo.path());
        let managed = tempdir().unwrap();
        let manager = WorktreeManager::new(managed.path().to_path_buf());

        // No develop branch exists; provisioning still succeeds
        let mut shortcut = worktree_shortcut(repo.path());
        shortcut.use_base_develop = true;

        let provisioned = manager.provision(&shortcut).unwrap();
        assert!(provisioned.path.exists());
    }

    #[test]
    fn test_derive_branch_sanitizes_name() {
        let mut s = Shortcut::new("x", "My API (v2)", PathBuf::from("/p"), Tool::Claude);
        s.use_worktree = true;
        assert_eq!(derive_branch(&s), "keymux/my-api--v2");

        s.worktree_branch = "Feature Branch".to_string();
        assert_eq!(derive_branch(&s), "feature-branch");
    }

    #[test]
    fn test_parse_worktree_list() {
        let output = "worktree /repo\nHEAD abc123\nbranch refs/heads/main\n\n\
                      worktree /wt/feature\nHEAD def456\nbranch refs/heads/feature\n";
        let parsed = parse_worktree_list(output).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].is_main);
        assert_eq!(parsed[1].branch.as_deref(), Some("feature"));
    }

    #[test]
    fn test_current_branch() {
        let repo = tempdir().unwrap();
        init_git_repo(repo.path());
        let manager = WorktreeManager::new(PathBuf::from("/unused"));

        let branch = manager.current_branch(repo.path()).unwrap();
        assert!(branch == "main" || branch == "master");
    }
}
