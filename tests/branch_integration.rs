//! Branch create, switch, merge and delete against real repositories.

mod common;

use common::{engine, TestRepo};
use gitpane::core::error::{CoreError, ErrorKind};
use gitpane::core::model::HeadRef;

// =============================================================================
// create
// =============================================================================

#[tokio::test]
async fn create_rejects_duplicates_and_bad_names() {
    let repo = TestRepo::new();
    let engine = engine();
    engine.create_branch(repo.path(), "topic").await.unwrap();

    let dup = engine.create_branch(repo.path(), "topic").await.unwrap_err();
    assert_eq!(dup.kind(), ErrorKind::BranchAlreadyExists);

    for bad in ["", "has space", "a..b", "ends.lock", "-dash", "x~1", "trailing/"] {
        let err = engine.create_branch(repo.path(), bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBranchName, "accepted {bad:?}");
    }
}

#[tokio::test]
async fn create_points_at_head_without_switching() {
    let repo = TestRepo::new();
    let engine = engine();
    engine.create_branch(repo.path(), "feature/nested").await.unwrap();

    assert_eq!(repo.git(&["rev-parse", "feature/nested"]), repo.head_id());
    assert_eq!(repo.current_branch(), "main");
}

#[tokio::test]
async fn create_on_unborn_head_fails() {
    let repo = TestRepo::empty();
    let err = engine().create_branch(repo.path(), "topic").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownRef);
}

// =============================================================================
// switch
// =============================================================================

#[tokio::test]
async fn switch_to_current_branch_is_noop() {
    let repo = TestRepo::new();
    repo.write("README.md", "dirty\n");
    engine().switch_branch(repo.path(), "main").await.unwrap();
    assert_eq!(repo.read("README.md"), "dirty\n");
}

#[tokio::test]
async fn switch_updates_working_tree() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit_file("feature.txt", "feature\n", "feature work");
    repo.git(&["checkout", "-q", "main"]);
    let engine = engine();

    engine.switch_branch(repo.path(), "feature").await.unwrap();
    assert!(repo.exists("feature.txt"));

    engine.switch_branch(repo.path(), "main").await.unwrap();
    assert!(!repo.exists("feature.txt"));
    assert!(repo.porcelain().is_empty());
}

#[tokio::test]
async fn switch_blocked_by_overlapping_local_changes() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit_file("README.md", "feature readme\n", "feature readme");
    repo.git(&["checkout", "-q", "main"]);
    repo.write("README.md", "local edit\n");

    let err = engine().switch_branch(repo.path(), "feature").await.unwrap_err();
    assert_eq!(
        err,
        CoreError::UncommittedChangesBlocking {
            paths: vec!["README.md".into()]
        }
    );
    assert_eq!(repo.current_branch(), "main");
    assert_eq!(repo.read("README.md"), "local edit\n");
}

#[tokio::test]
async fn switch_carries_non_overlapping_changes() {
    let repo = TestRepo::new();
    repo.commit_file("notes.txt", "notes\n", "notes");
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit_file("feature.txt", "feature\n", "feature work");
    repo.git(&["checkout", "-q", "main"]);
    repo.write("notes.txt", "edited\n");

    engine().switch_branch(repo.path(), "feature").await.unwrap();
    assert_eq!(repo.current_branch(), "feature");
    assert_eq!(repo.read("notes.txt"), "edited\n");
}

#[tokio::test]
async fn switch_unknown_branch_fails() {
    let repo = TestRepo::new();
    let err = engine().switch_branch(repo.path(), "nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownBranch);
}

#[tokio::test]
async fn switch_to_remote_only_branch_creates_tracking_branch() {
    let repo = TestRepo::new();
    let _remote = repo.add_bare_remote("origin");
    repo.git(&["checkout", "-q", "-b", "shared"]);
    repo.commit_file("shared.txt", "shared\n", "shared work");
    repo.git(&["push", "-q", "origin", "main", "shared"]);
    repo.git(&["checkout", "-q", "main"]);
    repo.git(&["branch", "-D", "shared"]);
    repo.git(&["fetch", "-q", "origin"]);

    engine().switch_branch(repo.path(), "shared").await.unwrap();

    assert_eq!(repo.current_branch(), "shared");
    assert!(repo.exists("shared.txt"));
    assert_eq!(
        repo.git(&["rev-parse", "--abbrev-ref", "shared@{upstream}"]),
        "origin/shared"
    );
}

// =============================================================================
// merge
// =============================================================================

#[tokio::test]
async fn merge_fast_forwards() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "-q", "-b", "feature"]);
    let tip = repo.commit_file("feature.txt", "feature\n", "feature work");
    repo.git(&["checkout", "-q", "main"]);

    engine().merge_branch(repo.path(), "feature").await.unwrap();

    assert_eq!(repo.head_id(), tip);
    assert!(repo.exists("feature.txt"));
    assert!(repo.porcelain().is_empty());
}

#[tokio::test]
async fn merge_diverged_branches_creates_merge_commit() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit_file("feature.txt", "feature\n", "feature work");
    repo.git(&["checkout", "-q", "main"]);
    repo.commit_file("main.txt", "main\n", "main work");
    let engine = engine();

    engine.merge_branch(repo.path(), "feature").await.unwrap();

    let parents = repo.git(&["rev-list", "--parents", "-n", "1", "HEAD"]);
    assert_eq!(parents.split_whitespace().count(), 3);
    assert_eq!(
        repo.git(&["log", "-1", "--format=%s"]),
        "Merge branch 'feature' into main"
    );
    assert!(repo.exists("feature.txt") && repo.exists("main.txt"));

    let commits = engine.list_commits(repo.path(), "main", None).await.unwrap();
    assert_eq!(commits.len(), 4);
}

#[tokio::test]
async fn merge_conflict_is_reported_and_left_in_tree() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit_file("README.md", "feature\n", "feature readme");
    repo.git(&["checkout", "-q", "main"]);
    repo.commit_file("README.md", "main\n", "main readme");
    let engine = engine();

    let err = engine.merge_branch(repo.path(), "feature").await.unwrap_err();
    assert_eq!(
        err,
        CoreError::MergeConflict {
            paths: vec!["README.md".into()]
        }
    );
    assert!(repo.read("README.md").contains("<<<<<<<"));

    let state = engine.repo_state(repo.path()).await.unwrap();
    assert_eq!(state.in_progress.as_deref(), Some("merge"));
    assert!(!state.clean);

    let blocked = engine.switch_branch(repo.path(), "feature").await.unwrap_err();
    assert_eq!(blocked.kind(), ErrorKind::OperationInProgress);

    engine.discard_changes(repo.path()).await.unwrap();
    let state = engine.repo_state(repo.path()).await.unwrap();
    assert!(state.clean);
    assert_eq!(state.in_progress, None);
}

#[tokio::test]
async fn merge_blocked_by_dirty_incoming_path() {
    let repo = TestRepo::new();
    repo.git(&["checkout", "-q", "-b", "feature"]);
    repo.commit_file("README.md", "feature\n", "feature readme");
    repo.git(&["checkout", "-q", "main"]);
    repo.write("README.md", "local\n");

    let err = engine().merge_branch(repo.path(), "feature").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UncommittedChangesBlocking);
    assert_eq!(repo.read("README.md"), "local\n");
}

#[tokio::test]
async fn merge_requires_attached_head_and_known_source() {
    let repo = TestRepo::new();
    let engine = engine();

    let err = engine.merge_branch(repo.path(), "ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownBranch);

    repo.git(&["branch", "feature"]);
    repo.git(&["checkout", "-q", "--detach"]);
    let err = engine.merge_branch(repo.path(), "feature").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DetachedHead);
}

// =============================================================================
// delete
// =============================================================================

#[tokio::test]
async fn delete_branch_rules() {
    let repo = TestRepo::new();
    repo.git(&["branch", "old"]);
    let engine = engine();

    let err = engine.delete_branch(repo.path(), "main").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotDeleteHead);

    let err = engine.delete_branch(repo.path(), "ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownBranch);

    engine.delete_branch(repo.path(), "old").await.unwrap();
    let branches = engine.list_branches(repo.path()).await.unwrap();
    assert!(branches.iter().all(|b| b.name != "old"));
    assert_eq!(
        engine.head(repo.path()).await.unwrap(),
        HeadRef::Branch {
            name: "main".into()
        }
    );
}
