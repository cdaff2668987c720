//! JSON requests through the dispatcher against real repositories.

mod common;

use serde_json::{json, Value};

use common::{engine, TestRepo};
use gitpane::core::error::ErrorKind;
use gitpane::dispatch::{Dispatcher, Response};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(engine())
}

async fn call(dispatcher: &Dispatcher, request: Value) -> Response {
    dispatcher.dispatch_json(&request.to_string()).await
}

fn data(response: Response) -> Value {
    assert!(response.ok, "request failed: {:?}", response.error);
    response.data.unwrap()
}

#[tokio::test]
async fn branch_list_over_the_wire() {
    let repo = TestRepo::new();
    repo.git(&["branch", "topic"]);
    let d = dispatcher();

    let response = call(
        &d,
        json!({"command": "get_branch_list", "directory": repo.path(), "request_id": "1"}),
    )
    .await;
    assert_eq!(response.request_id.as_deref(), Some("1"));
    assert_eq!(
        data(response),
        json!([
            {"name": "main", "is_remote": false, "is_head": true},
            {"name": "topic", "is_remote": false, "is_head": false},
        ])
    );
}

#[tokio::test]
async fn commit_flow_over_the_wire() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a\n");
    let d = dispatcher();

    let status = data(
        call(
            &d,
            json!({"command": "get_current_changes_status", "directory": repo.path()}),
        )
        .await,
    );
    assert_eq!(status, json!([{"path": "a.txt", "status": "added"}]));

    let id = data(
        call(
            &d,
            json!({
                "command": "git_add_and_commit",
                "directory": repo.path(),
                "commitMessage": "add a",
                "files": ["a.txt"],
            }),
        )
        .await,
    );
    assert_eq!(id, json!(repo.head_id()));

    let commits = data(
        call(
            &d,
            json!({
                "command": "get_all_commits_from_branch",
                "directory": repo.path(),
                "branch": "main",
            }),
        )
        .await,
    );
    let commits = commits.as_array().unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0]["id"], id);
    assert_eq!(commits[0]["author"], "Test User");
    assert!(commits[0]["timestamp"].is_i64());

    let changed = data(
        call(
            &d,
            json!({
                "command": "get_changed_files_in_commit",
                "directory": repo.path(),
                "commitHash": id,
            }),
        )
        .await,
    );
    assert_eq!(changed, json!([{"path": "a.txt", "status": "added"}]));

    let diff = data(
        call(
            &d,
            json!({
                "command": "get_diff_of_file_in_commit",
                "directory": repo.path(),
                "commit_hash": id,
                "filename": "a.txt",
            }),
        )
        .await,
    );
    assert!(diff.as_str().unwrap().contains("+a\n"));

    let status = data(
        call(
            &d,
            json!({"command": "get_all_changed_files", "directory": repo.path()}),
        )
        .await,
    );
    assert_eq!(status, json!([]));
}

#[tokio::test]
async fn errors_carry_kind_and_request_id() {
    let repo = TestRepo::new();
    let d = dispatcher();

    let response = call(
        &d,
        json!({
            "command": "switch_branch",
            "directory": repo.path(),
            "branch_name": "ghost",
            "request_id": "9",
        }),
    )
    .await;
    assert!(!response.ok);
    assert_eq!(response.request_id.as_deref(), Some("9"));
    assert_eq!(response.error_kind(), Some(ErrorKind::UnknownBranch));

    let follow_up = call(&d, json!({"command": "get_head", "directory": repo.path()})).await;
    assert_eq!(data(follow_up), json!({"kind": "branch", "name": "main"}));
}

#[tokio::test]
async fn malformed_requests_are_invalid() {
    let d = dispatcher();

    let response = d.dispatch_json("not json").await;
    assert_eq!(response.error_kind(), Some(ErrorKind::InvalidRequest));
    assert_eq!(response.request_id, None);

    let response = d
        .dispatch_json(r#"{"command":"explode","request_id":"4"}"#)
        .await;
    assert_eq!(response.error_kind(), Some(ErrorKind::InvalidRequest));
    assert_eq!(response.request_id.as_deref(), Some("4"));

    let response = d
        .dispatch_json(r#"{"command":"create_new_branch","directory":"/tmp"}"#)
        .await;
    assert_eq!(response.error_kind(), Some(ErrorKind::InvalidRequest));
}

#[tokio::test]
async fn vanished_repository_evicts_handle() {
    let repo = TestRepo::new();
    let d = dispatcher();
    let dir = repo.path().to_path_buf();

    data(call(&d, json!({"command": "open_repository", "directory": dir})).await);
    assert_eq!(d.engine().registry().len(), 1);

    drop(repo);
    let response = call(&d, json!({"command": "get_branch_list", "directory": dir})).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::PathNotFound));
    assert!(d.engine().registry().is_empty());
}

#[tokio::test]
async fn void_commands_return_null() {
    let repo = TestRepo::new();
    let d = dispatcher();

    let response = call(
        &d,
        json!({"command": "create_new_branch", "directory": repo.path(), "branchName": "topic"}),
    )
    .await;
    assert_eq!(data(response), Value::Null);

    let state = data(
        call(&d, json!({"command": "get_repo_state", "directory": repo.path()})).await,
    );
    assert_eq!(
        state,
        json!({"clean": true, "head": {"kind": "branch", "name": "main"}})
    );
}

#[tokio::test]
async fn cancel_of_unknown_request_is_false() {
    let d = dispatcher();
    let response = call(&d, json!({"command": "cancel", "target": "nothing"})).await;
    assert_eq!(data(response), json!(false));
}

#[tokio::test]
async fn refs_resolve_and_commits_compare() {
    let repo = TestRepo::new();
    let base = repo.head_id();
    let tip = repo.commit_file("README.md", "# Test Repo\nmore\n", "More readme");
    let d = dispatcher();

    let resolved = data(
        call(
            &d,
            json!({"command": "resolve_ref", "directory": repo.path(), "refName": "main"}),
        )
        .await,
    );
    assert_eq!(resolved, json!(tip));

    let response = call(
        &d,
        json!({"command": "resolve_ref", "directory": repo.path(), "ref_name": "nope"}),
    )
    .await;
    assert_eq!(response.error.unwrap().kind, ErrorKind::UnknownRef);

    let text = data(
        call(
            &d,
            json!({
                "command": "get_diff_of_file_between_commits",
                "directory": repo.path(),
                "from_commit": base,
                "to_commit": tip,
                "filename": "README.md",
            }),
        )
        .await,
    );
    assert!(text.as_str().unwrap().contains("+more\n"));
}
