//! git::diff
//!
//! Change-sets and per-file patches extracted from git2 diffs.
//!
//! The output here is plain data ([`FilePatch`], [`Hunk`], [`PatchLine`]);
//! turning it into unified diff text is the diff engine's job.

use crate::core::model::{ChangeSet, FileChange, FileStatus};

use super::interface::{Git, GitError};

/// Knobs applied to every diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSettings {
    pub context_lines: u32,
    /// Similarity percentage for rename detection
    pub rename_threshold: u16,
    /// Blobs larger than this are treated as binary
    pub max_inline_bytes: u64,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            context_lines: 3,
            rename_threshold: 50,
            max_inline_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Which two states of an uncommitted file to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeSide {
    /// HEAD against the working tree, index changes included
    HeadToWorkdir,
    /// HEAD against the index (staged)
    HeadToIndex,
    /// Index against the working tree (unstaged), untracked files included
    IndexToWorkdir,
}

/// One line of a hunk. `origin` is `' '`, `'+'` or `'-'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchLine {
    pub origin: char,
    /// Line text; lacks a trailing `\n` when the file has no final newline
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// The `@@ -a,b +c,d @@ ...` line, newline included
    pub header: String,
    pub lines: Vec<PatchLine>,
}

/// Everything needed to render one file's diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Absent for added files
    pub old_path: Option<String>,
    /// Absent for deleted files
    pub new_path: Option<String>,
    pub status: FileStatus,
    pub old_mode: Option<u32>,
    pub new_mode: Option<u32>,
    pub binary: bool,
    pub hunks: Vec<Hunk>,
}

fn mode_bits(mode: git2::FileMode) -> u32 {
    match mode {
        git2::FileMode::Blob => 0o100644,
        git2::FileMode::BlobGroupWritable => 0o100664,
        git2::FileMode::BlobExecutable => 0o100755,
        git2::FileMode::Link => 0o120000,
        git2::FileMode::Commit => 0o160000,
        git2::FileMode::Tree => 0o040000,
        _ => 0,
    }
}

fn path_of(file: &git2::DiffFile<'_>) -> Option<String> {
    file.path().map(|p| p.to_string_lossy().into_owned())
}

/// The file-level change a delta represents, if any.
fn delta_change(delta: &git2::DiffDelta<'_>) -> Option<FileChange> {
    let old = path_of(&delta.old_file());
    let new = path_of(&delta.new_file());
    match delta.status() {
        git2::Delta::Added | git2::Delta::Untracked | git2::Delta::Copied => {
            Some(FileChange::new(new?, FileStatus::Added))
        }
        git2::Delta::Deleted => Some(FileChange::new(old?, FileStatus::Deleted)),
        git2::Delta::Modified | git2::Delta::Typechange | git2::Delta::Conflicted => {
            Some(FileChange::new(new.or(old)?, FileStatus::Modified))
        }
        git2::Delta::Renamed => Some(FileChange::renamed(old?, new?)),
        git2::Delta::Unmodified | git2::Delta::Ignored | git2::Delta::Unreadable => None,
    }
}

fn diff_options(settings: &DiffSettings) -> git2::DiffOptions {
    let mut opts = git2::DiffOptions::new();
    opts.context_lines(settings.context_lines)
        .max_size(i64::try_from(settings.max_inline_bytes).unwrap_or(i64::MAX));
    opts
}

/// Locate the delta touching `path` and build its patch.
fn patch_for_path(
    diff: &git2::Diff<'_>,
    path: &str,
) -> Result<Option<FilePatch>, GitError> {
    let found = diff
        .deltas()
        .enumerate()
        .find_map(|(idx, delta)| {
            delta_change(&delta)
                .filter(|c| c.touches(path))
                .map(|c| (idx, c))
        });

    match found {
        Some((idx, change)) => Ok(Some(build_patch(diff, idx, change)?)),
        None => Ok(None),
    }
}

fn build_patch(
    diff: &git2::Diff<'_>,
    idx: usize,
    change: FileChange,
) -> Result<FilePatch, GitError> {
    let delta = diff.get_delta(idx).ok_or_else(|| GitError::Internal {
        message: format!("diff delta {idx} disappeared"),
    })?;

    let has_old = change.status != FileStatus::Added;
    let has_new = change.status != FileStatus::Deleted;
    let old_path = has_old.then(|| change.old_path.clone().unwrap_or_else(|| change.path.clone()));
    let new_path = has_new.then(|| change.path.clone());
    let old_mode = has_old.then(|| mode_bits(delta.old_file().mode()));
    let new_mode = has_new.then(|| mode_bits(delta.new_file().mode()));

    let mut out = FilePatch {
        old_path,
        new_path,
        status: change.status,
        old_mode,
        new_mode,
        binary: false,
        hunks: Vec::new(),
    };

    let patch = match git2::Patch::from_diff(diff, idx)? {
        Some(patch) if !patch.delta().flags().is_binary() => patch,
        _ => {
            out.binary = true;
            return Ok(out);
        }
    };

    for h in 0..patch.num_hunks() {
        let (hunk, line_count) = patch.hunk(h)?;
        let mut lines = Vec::with_capacity(line_count);
        for l in 0..line_count {
            let line = patch.line_in_hunk(h, l)?;
            let origin = line.origin();
            // end-of-file newline markers are derived from content instead
            if matches!(origin, ' ' | '+' | '-') {
                lines.push(PatchLine {
                    origin,
                    content: String::from_utf8_lossy(line.content()).into_owned(),
                });
            }
        }
        out.hunks.push(Hunk {
            header: String::from_utf8_lossy(hunk.header()).into_owned(),
            lines,
        });
    }
    Ok(out)
}

impl Git {
    /// Diff of a commit against its first parent, renames detected.
    fn commit_diff(&self, id: &str, settings: &DiffSettings) -> Result<git2::Diff<'_>, GitError> {
        let commit = self.find_commit(id)?;
        let new_tree = commit.tree()?;
        let old_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };
        self.tree_diff(old_tree.as_ref(), &new_tree, settings)
    }

    fn tree_diff(
        &self,
        old_tree: Option<&git2::Tree<'_>>,
        new_tree: &git2::Tree<'_>,
        settings: &DiffSettings,
    ) -> Result<git2::Diff<'_>, GitError> {
        let mut opts = diff_options(settings);
        let mut diff = self
            .repo
            .diff_tree_to_tree(old_tree, Some(new_tree), Some(&mut opts))?;

        let mut find = git2::DiffFindOptions::new();
        find.renames(true)
            .rename_threshold(settings.rename_threshold);
        diff.find_similar(Some(&mut find))?;
        Ok(diff)
    }

    /// Files a commit changed relative to its first parent (root commits
    /// against the empty tree), in engine order.
    pub fn commit_changes(&self, id: &str, settings: &DiffSettings) -> Result<ChangeSet, GitError> {
        let diff = self.commit_diff(id, settings)?;
        Ok(diff.deltas().filter_map(|d| delta_change(&d)).collect())
    }

    /// Patch for `path` in a commit, `None` if the commit did not touch it.
    pub fn commit_file_patch(
        &self,
        id: &str,
        path: &str,
        settings: &DiffSettings,
    ) -> Result<Option<FilePatch>, GitError> {
        let diff = self.commit_diff(id, settings)?;
        patch_for_path(&diff, path)
    }

    /// Patch for `path` between two commits, `None` if it is the same in both.
    pub fn commits_file_patch(
        &self,
        from: &str,
        to: &str,
        path: &str,
        settings: &DiffSettings,
    ) -> Result<Option<FilePatch>, GitError> {
        let old_tree = self.find_commit(from)?.tree()?;
        let new_tree = self.find_commit(to)?.tree()?;
        let diff = self.tree_diff(Some(&old_tree), &new_tree, settings)?;
        patch_for_path(&diff, path)
    }

    /// Patch for an uncommitted `path`, `None` if it is clean on that side.
    pub fn worktree_file_patch(
        &self,
        side: WorktreeSide,
        path: &str,
        settings: &DiffSettings,
    ) -> Result<Option<FilePatch>, GitError> {
        let mut opts = diff_options(settings);
        opts.pathspec(path).disable_pathspec_match(true);
        if side != WorktreeSide::HeadToIndex {
            opts.include_untracked(true)
                .recurse_untracked_dirs(true)
                .show_untracked_content(true);
        }

        let head_tree = match self.repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                None
            }
            Err(e) => return Err(e.into()),
        };

        let diff = match side {
            WorktreeSide::HeadToWorkdir => self
                .repo
                .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?,
            WorktreeSide::HeadToIndex => {
                self.repo
                    .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))?
            }
            WorktreeSide::IndexToWorkdir => self.repo.diff_index_to_workdir(None, Some(&mut opts))?,
        };
        patch_for_path(&diff, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = DiffSettings::default();
        assert_eq!(settings.context_lines, 3);
        assert_eq!(settings.rename_threshold, 50);
    }

    #[test]
    fn regular_file_mode() {
        assert_eq!(format!("{:06o}", mode_bits(git2::FileMode::Blob)), "100644");
        assert_eq!(format!("{:06o}", mode_bits(git2::FileMode::BlobExecutable)), "100755");
    }
}
