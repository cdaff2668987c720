//! core::model
//!
//! The shapes that cross the command boundary: branches, commits,
//! file-level changes and rendered diffs.
//!
//! There is exactly one [`FileStatus`] type. Every component reports file
//! changes with it; conversion to strings happens only in serde at the
//! wire boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Fingerprint;

/// A local or remote-tracking branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Short name (`main`, `origin/main`)
    pub name: String,
    /// True for remote-tracking branches
    pub is_remote: bool,
    /// True for the checked-out local branch
    pub is_head: bool,
}

/// A commit's identity and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full hex hash
    pub id: String,
    /// Author name
    pub author: String,
    /// Author email
    pub email: String,
    /// Full commit message
    pub message: String,
    /// Commit time, unix seconds
    pub timestamp: i64,
}

impl Commit {
    /// First line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Commit time as a UTC datetime.
    pub fn committed_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// A commit's position in the history graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitNode {
    pub id: String,
    /// Commit time, unix seconds
    pub timestamp: i64,
    pub parents: Vec<String>,
}

/// How a file differs from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }

    /// Collapse a staged and an unstaged status into the single status a
    /// file has relative to HEAD.
    ///
    /// An added file stays added while it exists on disk; added then
    /// removed from disk it matches HEAD again and has no status. A
    /// deletion wins over a modification. A file deleted from the index but
    /// present on disk again reads as modified.
    ///
    /// # Example
    ///
    /// ```
    /// use gitpane::core::model::FileStatus::*;
    /// use gitpane::core::model::FileStatus;
    ///
    /// assert_eq!(FileStatus::flatten(Some(Added), Some(Modified)), Some(Added));
    /// assert_eq!(FileStatus::flatten(Some(Added), Some(Deleted)), None);
    /// assert_eq!(FileStatus::flatten(Some(Modified), Some(Deleted)), Some(Deleted));
    /// assert_eq!(FileStatus::flatten(Some(Deleted), Some(Added)), Some(Modified));
    /// assert_eq!(FileStatus::flatten(None, None), None);
    /// ```
    pub fn flatten(staged: Option<FileStatus>, unstaged: Option<FileStatus>) -> Option<FileStatus> {
        use FileStatus::*;
        match (staged, unstaged) {
            (None, None) | (Some(Added), Some(Deleted)) => None,
            (Some(Added), _) => Some(Added),
            (Some(Deleted), Some(Added)) => Some(Modified),
            (Some(Deleted), _) => Some(Deleted),
            (_, Some(Deleted)) => Some(Deleted),
            (None, Some(Added)) => Some(Added),
            _ => Some(Modified),
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file's change within a commit or the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChange {
    /// Repo-relative path (the new path for renames)
    pub path: String,
    pub status: FileStatus,
    /// Previous path, present only for renames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            old_path: None,
        }
    }

    pub fn renamed(old_path: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Renamed,
            old_path: Some(old_path.into()),
        }
    }

    /// True if `path` names either side of this change.
    pub fn touches(&self, path: &str) -> bool {
        self.path == path || self.old_path.as_deref() == Some(path)
    }
}

/// An ordered sequence of file changes.
///
/// Historical change-sets come straight from the engine's path-sorted diff.
/// Working-tree change-sets are sorted by path on construction so two reads
/// of the same state compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(Vec<FileChange>);

impl ChangeSet {
    /// Wrap entries in the order given.
    pub fn new(entries: Vec<FileChange>) -> Self {
        Self(entries)
    }

    /// Wrap entries after sorting by path.
    pub fn sorted(mut entries: Vec<FileChange>) -> Self {
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self(entries)
    }

    pub fn entries(&self) -> &[FileChange] {
        &self.0
    }

    pub fn into_entries(self) -> Vec<FileChange> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileChange> {
        self.0.iter()
    }

    /// Find the entry touching `path` (either side of a rename).
    pub fn find(&self, path: &str) -> Option<&FileChange> {
        self.0.iter().find(|c| c.touches(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Every path named by the set, both sides of renames included.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flat_map(|c| {
            std::iter::once(c.path.as_str()).chain(c.old_path.as_deref())
        })
    }

    /// Stable hash of the set for cheap comparison between polls.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(self.0.iter().map(|c| (c.path.as_str(), c.status.as_str())))
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FileChange;
    type IntoIter = std::slice::Iter<'a, FileChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<FileChange> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = FileChange>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Did anything change between two polls?
///
/// Structural comparison of the two sequences: same entries, same order.
pub fn changes_differ(previous: &ChangeSet, current: &ChangeSet) -> bool {
    previous != current
}

/// What HEAD points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeadRef {
    /// Attached to a branch that has commits
    Branch { name: String },
    /// Pointing straight at a commit
    Detached { commit: String },
    /// Attached to a branch with no commits yet
    Unborn { name: String },
}

impl HeadRef {
    /// The branch HEAD is attached to, born or not.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            HeadRef::Branch { name } | HeadRef::Unborn { name } => Some(name),
            HeadRef::Detached { .. } => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, HeadRef::Detached { .. })
    }
}

impl std::fmt::Display for HeadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadRef::Branch { name } => f.write_str(name),
            HeadRef::Unborn { name } => write!(f, "{name} (no commits)"),
            HeadRef::Detached { commit } => {
                write!(f, "HEAD detached at {}", &commit[..commit.len().min(7)])
            }
        }
    }
}

/// A rendered single-file diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub status: FileStatus,
    /// True when the body is the binary sentinel instead of hunks
    pub binary: bool,
    /// Unified diff text
    pub text: String,
}

/// A commit together with its change-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetails {
    #[serde(flatten)]
    pub commit: Commit,
    pub changes: ChangeSet,
}

/// Snapshot of the per-repository state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoState {
    /// No uncommitted changes (untracked files count as changes)
    pub clean: bool,
    pub head: HeadRef,
    /// A paused merge, rebase or similar, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&FileChange::new("a.txt", FileStatus::Modified)).unwrap();
        assert_eq!(json, r#"{"path":"a.txt","status":"modified"}"#);
    }

    #[test]
    fn rename_carries_old_path() {
        let json = serde_json::to_value(FileChange::renamed("old.rs", "new.rs")).unwrap();
        assert_eq!(json["status"], "renamed");
        assert_eq!(json["old_path"], "old.rs");
    }

    #[test]
    fn sorted_change_set_orders_by_path() {
        let set = ChangeSet::sorted(vec![
            FileChange::new("z", FileStatus::Added),
            FileChange::new("a", FileStatus::Deleted),
        ]);
        let paths: Vec<_> = set.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["a", "z"]);
    }

    #[test]
    fn find_matches_either_side_of_rename() {
        let set = ChangeSet::new(vec![FileChange::renamed("old", "new")]);
        assert!(set.contains("old"));
        assert!(set.contains("new"));
        assert!(!set.contains("other"));
        assert_eq!(set.paths().collect::<Vec<_>>(), ["new", "old"]);
    }

    #[test]
    fn changes_differ_is_structural() {
        let a = ChangeSet::new(vec![FileChange::new("a", FileStatus::Added)]);
        let b = ChangeSet::new(vec![FileChange::new("a", FileStatus::Added)]);
        let c = ChangeSet::new(vec![FileChange::new("a", FileStatus::Modified)]);
        assert!(!changes_differ(&a, &b));
        assert!(changes_differ(&a, &c));
        assert!(changes_differ(&a, &ChangeSet::default()));
    }

    #[test]
    fn fingerprint_tracks_equality() {
        let a = ChangeSet::new(vec![FileChange::new("a", FileStatus::Added)]);
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), ChangeSet::default().fingerprint());
    }

    #[test]
    fn flatten_precedence() {
        use FileStatus::*;
        assert_eq!(FileStatus::flatten(None, Some(Added)), Some(Added));
        assert_eq!(FileStatus::flatten(Some(Added), Some(Deleted)), None);
        assert_eq!(FileStatus::flatten(Some(Added), Some(Modified)), Some(Added));
        assert_eq!(FileStatus::flatten(Some(Deleted), None), Some(Deleted));
        assert_eq!(FileStatus::flatten(None, Some(Deleted)), Some(Deleted));
        assert_eq!(FileStatus::flatten(Some(Modified), Some(Modified)), Some(Modified));
        assert_eq!(FileStatus::flatten(None, Some(Modified)), Some(Modified));
    }

    #[test]
    fn head_ref_wire_shape() {
        let json = serde_json::to_value(HeadRef::Branch { name: "main".into() }).unwrap();
        assert_eq!(json["kind"], "branch");
        assert_eq!(json["name"], "main");

        let detached = HeadRef::Detached {
            commit: "0123456789abcdef0123456789abcdef01234567".into(),
        };
        assert!(detached.is_detached());
        assert_eq!(detached.branch_name(), None);
        assert_eq!(detached.to_string(), "HEAD detached at 0123456");
    }

    #[test]
    fn commit_summary_and_time() {
        let commit = Commit {
            id: "x".into(),
            author: "A".into(),
            email: "a@example.com".into(),
            message: "subject\n\nbody".into(),
            timestamp: 86_400,
        };
        assert_eq!(commit.summary(), "subject");
        assert_eq!(commit.committed_at().to_rfc3339(), "1970-01-02T00:00:00+00:00");
    }
}
