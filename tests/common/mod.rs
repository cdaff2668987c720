//! Shared fixtures for the integration tests.
//!
//! Repositories are built with the `git` executable so that fixtures never
//! depend on the code under test.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use gitpane::core::config::Config;
use gitpane::engine::Engine;

/// A real repository in a temp dir, on branch `main`.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Repository with no commits.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        Self { dir }
    }

    /// Repository with one commit adding `README.md`.
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.commit_file("README.md", "# Test Repo\n", "Initial commit");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    pub fn write_bytes(&self, path: &str, content: &[u8]) {
        std::fs::write(self.path().join(path), content).unwrap();
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).unwrap()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }

    pub fn remove(&self, path: &str) {
        std::fs::remove_file(self.path().join(path)).unwrap();
    }

    /// Run git in the repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        run_git(self.path(), args)
    }

    /// Write, stage and commit one file; returns the new HEAD id.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        self.write(path, content);
        self.git(&["add", "--", path]);
        self.git(&["commit", "-q", "-m", message]);
        self.head_id()
    }

    pub fn head_id(&self) -> String {
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn current_branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    /// `git status --porcelain` output, empty when clean.
    pub fn porcelain(&self) -> String {
        self.git(&["status", "--porcelain"])
    }

    /// Add a bare repository as remote `name` and return its path.
    pub fn add_bare_remote(&self, name: &str) -> TempDir {
        let remote = TempDir::new().expect("failed to create temp dir");
        run_git(remote.path(), &["init", "-q", "--bare"]);
        run_git(remote.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        let url = remote.path().to_string_lossy().into_owned();
        self.git(&["remote", "add", name, &url]);
        remote
    }
}

/// Clone `remote` into a fresh temp dir with a test identity.
pub fn clone_of(remote: &Path) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    let target: PathBuf = dir.path().join("clone");
    run_git(
        dir.path(),
        &["clone", "-q", &remote.to_string_lossy(), &target.to_string_lossy()],
    );
    run_git(&target, &["config", "user.email", "other@example.com"]);
    run_git(&target, &["config", "user.name", "Other User"]);
    dir
}

/// Run git in `dir`; panics with stderr on failure.
pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// Engine with default settings and the real `git` transport.
pub fn engine() -> Engine {
    Engine::from_config(Config::default())
}

pub fn files(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}
