//! Read-only commands: branches, log, status, diff.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use crate::core::model::{FileChange, FileStatus, HeadRef};
use crate::engine::Engine;

/// Which two states `diff` compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffTarget {
    /// HEAD against the working tree
    WorkingTree,
    Staged,
    Unstaged,
    /// The change a commit made
    Commit(String),
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status_letter(status: FileStatus) -> char {
    match status {
        FileStatus::Added => 'A',
        FileStatus::Modified => 'M',
        FileStatus::Deleted => 'D',
        FileStatus::Renamed => 'R',
    }
}

fn change_line(change: &FileChange) -> String {
    match &change.old_path {
        Some(old) => format!("{}  {} -> {}", status_letter(change.status), old, change.path),
        None => format!("{}  {}", status_letter(change.status), change.path),
    }
}

pub async fn branches(engine: &Engine, dir: &Path, json: bool) -> Result<ExitCode> {
    let branches = engine.list_branches(dir).await?;
    if json {
        print_json(&branches)?;
    } else {
        for branch in &branches {
            let marker = if branch.is_head { '*' } else { ' ' };
            let prefix = if branch.is_remote { "remotes/" } else { "" };
            println!("{marker} {prefix}{}", branch.name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn log(
    engine: &Engine,
    dir: &Path,
    branch: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<ExitCode> {
    let branch = match branch {
        Some(b) => b.to_string(),
        None => match engine.head(dir).await? {
            HeadRef::Branch { name } | HeadRef::Unborn { name } => name,
            HeadRef::Detached { .. } => "HEAD".to_string(),
        },
    };

    let commits = engine.list_commits(dir, &branch, limit).await?;
    if json {
        print_json(&commits)?;
    } else {
        for commit in &commits {
            println!(
                "{} {} {:<20} {}",
                &commit.id[..commit.id.len().min(7)],
                commit.committed_at().format("%Y-%m-%d"),
                commit.author,
                commit.summary()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn status(engine: &Engine, dir: &Path, json: bool) -> Result<ExitCode> {
    let changes = engine.status(dir).await?;
    if json {
        print_json(&changes)?;
    } else {
        for change in &changes {
            println!("{}", change_line(change));
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn diff(engine: &Engine, dir: &Path, path: &str, target: DiffTarget) -> Result<ExitCode> {
    let diff = match target {
        DiffTarget::WorkingTree => engine.diff_working_tree_file(dir, path).await?,
        DiffTarget::Staged => engine.diff_staged_file(dir, path).await?,
        DiffTarget::Unstaged => engine.diff_unstaged_file(dir, path).await?,
        DiffTarget::Commit(commit) => engine.diff_file_in_commit(dir, &commit, path).await?,
    };
    print!("{}", diff.text);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_lines() {
        assert_eq!(change_line(&FileChange::new("a.txt", FileStatus::Modified)), "M  a.txt");
        assert_eq!(change_line(&FileChange::renamed("old.rs", "new.rs")), "R  old.rs -> new.rs");
    }
}
