//! ops::history
//!
//! Commit history walking.
//!
//! # Ordering
//!
//! [`date_order`] sorts a commit graph newest first while guaranteeing that
//! no commit appears before any of its descendants. It is Kahn's
//! topological sort where the ready set is a max-heap keyed by commit
//! timestamp. A commit becomes ready once every child listed in the input
//! has been emitted, and among ready commits the most recent goes next.
//! Ties on timestamp break on commit id, so the order is deterministic.
//!
//! Sorting by timestamp alone would break ancestry whenever clocks were
//! skewed; sorting topologically alone would interleave unrelated lines of
//! work arbitrarily.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::core::error::CoreError;
use crate::core::model::{ChangeSet, Commit, CommitDetails, CommitNode, HeadRef};
use crate::git::{DiffSettings, Git, GitError};

/// Order `nodes` newest first, children before parents.
///
/// Parents not present in `nodes` are ignored.
pub fn date_order(nodes: Vec<CommitNode>) -> Vec<CommitNode> {
    date_order_limited(nodes, usize::MAX)
}

/// [`date_order`] stopped after the first `limit` commits.
pub fn date_order_limited(nodes: Vec<CommitNode>, limit: usize) -> Vec<CommitNode> {
    let order = emit_order(&nodes, limit);
    let mut slots: Vec<Option<CommitNode>> = nodes.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

fn emit_order(nodes: &[CommitNode], limit: usize) -> Vec<usize> {
    let position: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut pending_children = vec![0usize; nodes.len()];
    for node in nodes {
        for parent in &node.parents {
            if let Some(&i) = position.get(parent.as_str()) {
                pending_children[i] += 1;
            }
        }
    }

    let mut ready = BinaryHeap::new();
    for (i, node) in nodes.iter().enumerate() {
        if pending_children[i] == 0 {
            ready.push((node.timestamp, Reverse(node.id.as_str()), i));
        }
    }

    let mut order = Vec::with_capacity(nodes.len().min(limit));
    while order.len() < limit {
        let Some((_, _, i)) = ready.pop() else {
            break;
        };
        order.push(i);
        for parent in &nodes[i].parents {
            if let Some(&p) = position.get(parent.as_str()) {
                pending_children[p] -= 1;
                if pending_children[p] == 0 {
                    ready.push((nodes[p].timestamp, Reverse(nodes[p].id.as_str()), p));
                }
            }
        }
    }
    order
}

#[derive(Debug)]
pub struct HistoryWalker<'g> {
    git: &'g Git,
    settings: DiffSettings,
}

impl<'g> HistoryWalker<'g> {
    pub fn new(git: &'g Git, settings: DiffSettings) -> Self {
        Self { git, settings }
    }

    /// Commits reachable from `branch`, newest first, at most `limit`.
    ///
    /// The whole reachable graph (ids, times and parents only) is read even
    /// for a small `limit`: a commit is only ready once every descendant has
    /// been emitted, and a descendant can sit behind an arbitrarily long
    /// path. Sorting stops after `limit` commits and only those are loaded
    /// in full.
    ///
    /// The checked-out branch before its first commit has an empty history.
    pub fn list_commits(
        &self,
        branch: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>, CoreError> {
        let tip = match self.git.resolve_ref(branch) {
            Ok(tip) => tip,
            Err(GitError::RefNotFound { .. }) => {
                if matches!(self.git.head()?, HeadRef::Unborn { name } if name == branch) {
                    return Ok(Vec::new());
                }
                return Err(CoreError::UnknownBranch {
                    name: branch.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let graph = self.git.commit_graph(&tip)?;
        date_order_limited(graph, limit.unwrap_or(usize::MAX))
            .into_iter()
            .map(|node| self.git.commit(&node.id).map_err(Into::into))
            .collect()
    }

    pub fn get_commit(&self, id: &str) -> Result<Commit, CoreError> {
        self.git.commit(id).map_err(|err| unknown_commit(err, id))
    }

    /// Files the commit changed relative to its first parent.
    pub fn list_changed_files(&self, id: &str) -> Result<ChangeSet, CoreError> {
        self.git
            .commit_changes(id, &self.settings)
            .map_err(|err| unknown_commit(err, id))
    }

    pub fn commit_details(&self, id: &str) -> Result<CommitDetails, CoreError> {
        Ok(CommitDetails {
            commit: self.get_commit(id)?,
            changes: self.list_changed_files(id)?,
        })
    }
}

pub(crate) fn unknown_commit(err: GitError, id: &str) -> CoreError {
    match err {
        GitError::ObjectNotFound { .. } | GitError::RefNotFound { .. } => CoreError::UnknownCommit {
            id: id.to_string(),
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, timestamp: i64, parents: &[&str]) -> CommitNode {
        CommitNode {
            id: id.to_string(),
            timestamp,
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn ids(nodes: &[CommitNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn linear_history_is_newest_first() {
        let nodes = vec![node("a", 1, &[]), node("b", 2, &["a"]), node("c", 3, &["b"])];
        assert_eq!(ids(&date_order(nodes)), ["c", "b", "a"]);
    }

    #[test]
    fn skewed_clock_never_puts_parent_first() {
        // child committed with a clock behind its parent
        let nodes = vec![node("parent", 100, &[]), node("child", 50, &["parent"])];
        assert_eq!(ids(&date_order(nodes)), ["child", "parent"]);
    }

    #[test]
    fn merge_interleaves_by_date() {
        //   m
        //  / \
        // b1  f1
        //  \ /
        //   root
        let nodes = vec![
            node("m", 10, &["b1", "f1"]),
            node("f1", 7, &["root"]),
            node("b1", 5, &["root"]),
            node("root", 1, &[]),
        ];
        assert_eq!(ids(&date_order(nodes)), ["m", "f1", "b1", "root"]);
    }

    #[test]
    fn equal_timestamps_break_on_id() {
        let nodes = vec![node("y", 5, &[]), node("x", 5, &[])];
        assert_eq!(ids(&date_order(nodes)), ["x", "y"]);
    }

    #[test]
    fn parents_outside_the_set_are_ignored() {
        let nodes = vec![node("b", 2, &["outside"]), node("a", 3, &[])];
        assert_eq!(ids(&date_order(nodes)), ["a", "b"]);
    }

    #[test]
    fn limited_order_is_a_prefix_of_the_full_order() {
        let nodes = vec![
            node("m", 10, &["b1", "f1"]),
            node("f1", 7, &["root"]),
            node("b1", 5, &["root"]),
            node("root", 1, &[]),
        ];
        assert_eq!(ids(&date_order_limited(nodes.clone(), 2)), ["m", "f1"]);
        assert_eq!(ids(&date_order_limited(nodes.clone(), 0)), Vec::<&str>::new());
        assert_eq!(ids(&date_order_limited(nodes, 9)), ["m", "f1", "b1", "root"]);
    }

    #[test]
    fn unknown_commit_mapping() {
        let err = unknown_commit(GitError::ObjectNotFound { oid: "zz".into() }, "zz");
        assert_eq!(err, CoreError::UnknownCommit { id: "zz".into() });
    }
}
