//! Git repository test fixtures
//!
//! Provides utilities for creating temporary git repositories
//! in various states for testing worktree provisioning.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository for testing
///
/// The repository is automatically cleaned up when the `TestRepo`
/// is dropped. Use the constructors to create repos in different
/// initial states.
pub struct TestRepo {
    /// TempDir handle (keeps directory alive until dropped)
    _dir: TempDir,
    /// Path to the repository root
    pub path: PathBuf,
}

impl TestRepo {
    /// Create a new test repository with an initial commit
    ///
    /// The repository will have:
    /// - Git initialized
    /// - User configured (test@example.com)
    /// - GPG signing disabled (for CI compatibility)
    /// - A README.md file and one initial commit
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();

        Self::git(&path, &["init"]);
        Self::git(&path, &["config", "user.email", "test@example.com"]);
        Self::git(&path, &["config", "user.name", "Test User"]);
        // Disable GPG signing to ensure tests work on machines with global signing enabled
        Self::git(&path, &["config", "commit.gpgsign", "false"]);

        std::fs::write(path.join("README.md"), "# Test Repository\n").unwrap();
        Self::git(&path, &["add", "."]);
        Self::git(&path, &["commit", "-m", "Initial commit"]);

        Self { _dir: dir, path }
    }

    /// Create a repository with extra branches pointing at the initial commit
    pub fn with_branches(branch_names: &[&str]) -> Self {
        let repo = Self::new();
        for branch in branch_names {
            Self::git(&repo.path, &["branch", branch]);
        }
        repo
    }

    /// The branch checked out at an arbitrary path (e.g. a worktree)
    pub fn branch_at(path: &Path) -> String {
        let output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(path)
            .output()
            .expect("git branch failed");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Run a git command in the repository, panicking on failure
    fn git(path: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}
