//! ops::diff
//!
//! Single-file diffs rendered as unified diff text.
//!
//! # Format
//!
//! Output follows `git diff` closely enough that standard patch viewers
//! accept it:
//!
//! ```text
//! diff --git a/src/lib.rs b/src/lib.rs
//! --- a/src/lib.rs
//! +++ b/src/lib.rs
//! @@ -1,3 +1,4 @@
//!  use std::io;
//! +use std::fs;
//! ```
//!
//! Added and deleted files use `/dev/null` for the missing side. Binary
//! content is never rendered; the body is the single line
//! `Binary files a/<path> and b/<path> differ`.

use std::fmt::Write as _;

use crate::core::error::CoreError;
use crate::core::model::{FileDiff, FileStatus};
use crate::git::{DiffSettings, FilePatch, Git, WorktreeSide};

use super::history::unknown_commit;

const NO_NEWLINE: &str = "\\ No newline at end of file\n";

/// Render `patch` as unified diff text.
pub fn render_unified(patch: &FilePatch) -> String {
    let old = patch.old_path.as_deref().or(patch.new_path.as_deref()).unwrap_or("");
    let new = patch.new_path.as_deref().or(patch.old_path.as_deref()).unwrap_or("");
    let minus = patch
        .old_path
        .as_deref()
        .map_or_else(|| "/dev/null".to_string(), |p| format!("a/{p}"));
    let plus = patch
        .new_path
        .as_deref()
        .map_or_else(|| "/dev/null".to_string(), |p| format!("b/{p}"));

    let mut out = String::new();
    let _ = writeln!(out, "diff --git a/{old} b/{new}");

    match (patch.status, patch.old_mode, patch.new_mode) {
        (FileStatus::Added, _, Some(mode)) => {
            let _ = writeln!(out, "new file mode {mode:06o}");
        }
        (FileStatus::Deleted, Some(mode), _) => {
            let _ = writeln!(out, "deleted file mode {mode:06o}");
        }
        (_, Some(old_mode), Some(new_mode)) if old_mode != new_mode => {
            let _ = writeln!(out, "old mode {old_mode:06o}");
            let _ = writeln!(out, "new mode {new_mode:06o}");
        }
        _ => {}
    }
    if patch.status == FileStatus::Renamed {
        let _ = writeln!(out, "rename from {old}");
        let _ = writeln!(out, "rename to {new}");
    }

    if patch.binary {
        let _ = writeln!(out, "Binary files {minus} and {plus} differ");
        return out;
    }
    if patch.hunks.is_empty() {
        return out;
    }

    let _ = writeln!(out, "--- {minus}");
    let _ = writeln!(out, "+++ {plus}");
    for hunk in &patch.hunks {
        out.push_str(&hunk.header);
        if !hunk.header.ends_with('\n') {
            out.push('\n');
        }
        for line in &hunk.lines {
            out.push(line.origin);
            out.push_str(&line.content);
            if !line.content.ends_with('\n') {
                out.push('\n');
                out.push_str(NO_NEWLINE);
            }
        }
    }
    out
}

fn file_diff(patch: FilePatch) -> FileDiff {
    let text = render_unified(&patch);
    let path = patch
        .new_path
        .clone()
        .or_else(|| patch.old_path.clone())
        .unwrap_or_default();
    FileDiff {
        old_path: (patch.status == FileStatus::Renamed)
            .then(|| patch.old_path.clone())
            .flatten(),
        path,
        status: patch.status,
        binary: patch.binary,
        text,
    }
}

#[derive(Debug)]
pub struct DiffEngine<'g> {
    git: &'g Git,
    settings: DiffSettings,
}

impl<'g> DiffEngine<'g> {
    pub fn new(git: &'g Git, settings: DiffSettings) -> Self {
        Self { git, settings }
    }

    /// The change `commit` made to `path`, against its first parent.
    pub fn file_in_commit(&self, commit: &str, path: &str) -> Result<FileDiff, CoreError> {
        self.git
            .commit_file_patch(commit, path, &self.settings)
            .map_err(|err| unknown_commit(err, commit))?
            .map(file_diff)
            .ok_or_else(|| CoreError::FileNotInCommit {
                commit: commit.to_string(),
                path: path.to_string(),
            })
    }

    /// `path` as it changed from commit `from` to commit `to`.
    pub fn file_between(&self, from: &str, to: &str, path: &str) -> Result<FileDiff, CoreError> {
        self.git
            .commits_file_patch(from, to, path, &self.settings)?
            .map(file_diff)
            .ok_or_else(|| CoreError::FileNotChanged {
                path: path.to_string(),
            })
    }

    /// Working tree against HEAD, staged and unstaged changes combined.
    pub fn working_tree_file(&self, path: &str) -> Result<FileDiff, CoreError> {
        self.worktree(WorktreeSide::HeadToWorkdir, path)
    }

    /// Index against HEAD.
    pub fn staged_file(&self, path: &str) -> Result<FileDiff, CoreError> {
        self.worktree(WorktreeSide::HeadToIndex, path)
    }

    /// Working tree against the index.
    pub fn unstaged_file(&self, path: &str) -> Result<FileDiff, CoreError> {
        self.worktree(WorktreeSide::IndexToWorkdir, path)
    }

    fn worktree(&self, side: WorktreeSide, path: &str) -> Result<FileDiff, CoreError> {
        self.git
            .worktree_file_patch(side, path, &self.settings)?
            .map(file_diff)
            .ok_or_else(|| CoreError::FileNotChanged {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{Hunk, PatchLine};

    fn line(origin: char, content: &str) -> PatchLine {
        PatchLine {
            origin,
            content: content.to_string(),
        }
    }

    fn modified(hunks: Vec<Hunk>) -> FilePatch {
        FilePatch {
            old_path: Some("src/lib.rs".into()),
            new_path: Some("src/lib.rs".into()),
            status: FileStatus::Modified,
            old_mode: Some(0o100644),
            new_mode: Some(0o100644),
            binary: false,
            hunks,
        }
    }

    #[test]
    fn renders_modified_file() {
        let patch = modified(vec![Hunk {
            header: "@@ -1,2 +1,2 @@\n".into(),
            lines: vec![line(' ', "keep\n"), line('-', "old\n"), line('+', "new\n")],
        }]);
        assert_eq!(
            render_unified(&patch),
            "diff --git a/src/lib.rs b/src/lib.rs\n\
             --- a/src/lib.rs\n\
             +++ b/src/lib.rs\n\
             @@ -1,2 +1,2 @@\n \
             keep\n\
             -old\n\
             +new\n"
        );
    }

    #[test]
    fn added_file_uses_dev_null() {
        let patch = FilePatch {
            old_path: None,
            new_path: Some("new.txt".into()),
            status: FileStatus::Added,
            old_mode: None,
            new_mode: Some(0o100644),
            binary: false,
            hunks: vec![Hunk {
                header: "@@ -0,0 +1 @@\n".into(),
                lines: vec![line('+', "hello\n")],
            }],
        };
        let text = render_unified(&patch);
        assert!(text.starts_with("diff --git a/new.txt b/new.txt\nnew file mode 100644\n"));
        assert!(text.contains("--- /dev/null\n+++ b/new.txt\n"));
    }

    #[test]
    fn deleted_file_uses_dev_null() {
        let patch = FilePatch {
            old_path: Some("gone.txt".into()),
            new_path: None,
            status: FileStatus::Deleted,
            old_mode: Some(0o100644),
            new_mode: None,
            binary: false,
            hunks: vec![Hunk {
                header: "@@ -1 +0,0 @@\n".into(),
                lines: vec![line('-', "bye\n")],
            }],
        };
        let text = render_unified(&patch);
        assert!(text.contains("deleted file mode 100644\n"));
        assert!(text.contains("--- a/gone.txt\n+++ /dev/null\n"));
    }

    #[test]
    fn missing_final_newline_is_marked() {
        let patch = modified(vec![Hunk {
            header: "@@ -1 +1 @@\n".into(),
            lines: vec![line('-', "a\n"), line('+', "a")],
        }]);
        assert!(render_unified(&patch).ends_with("+a\n\\ No newline at end of file\n"));
    }

    #[test]
    fn binary_uses_sentinel() {
        let mut patch = modified(Vec::new());
        patch.old_path = Some("img.png".into());
        patch.new_path = Some("img.png".into());
        patch.binary = true;
        let text = render_unified(&patch);
        assert!(text.ends_with("Binary files a/img.png and b/img.png differ\n"));
        assert!(!text.contains("@@"));
    }

    #[test]
    fn rename_headers() {
        let patch = FilePatch {
            old_path: Some("old.rs".into()),
            new_path: Some("new.rs".into()),
            status: FileStatus::Renamed,
            old_mode: Some(0o100644),
            new_mode: Some(0o100644),
            binary: false,
            hunks: Vec::new(),
        };
        let diff = file_diff(patch);
        assert_eq!(diff.path, "new.rs");
        assert_eq!(diff.old_path.as_deref(), Some("old.rs"));
        assert!(diff.text.contains("rename from old.rs\nrename to new.rs\n"));
    }

    #[test]
    fn mode_change_is_reported() {
        let mut patch = modified(Vec::new());
        patch.new_mode = Some(0o100755);
        let text = render_unified(&patch);
        assert!(text.contains("old mode 100644\nnew mode 100755\n"));
    }
}
