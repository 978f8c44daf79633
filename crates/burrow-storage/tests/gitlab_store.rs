use burrow_storage::{Commit, CommitAction, GitLabStore, ObjectStore, StorageError, StoreTarget};
use http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn target(server: &MockServer) -> StoreTarget {
    StoreTarget {
        store_url: format!("{}/api/v4", server.uri()),
        project: "group/pastes".to_string(),
        branch: "main".to_string(),
        token: "glpat-test".to_string(),
    }
}

#[tokio::test]
async fn read_raw_returns_file_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/api/v4/projects/group%2Fpastes/repository/files/a%2FB%2Fcdefgh/raw",
        ))
        .and(query_param("ref", "main"))
        .and(header("PRIVATE-TOKEN", "glpat-test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 255]))
        .expect(1)
        .mount(&server)
        .await;

    let store = GitLabStore::new().unwrap();
    let bytes = store.read_raw(&target(&server), "a/B/cdefgh").await.unwrap();

    assert_eq!(bytes.as_ref(), &[0u8, 1, 2, 255]);
}

#[tokio::test]
async fn read_raw_surfaces_store_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"message\":\"404 File Not Found\"}"))
        .mount(&server)
        .await;

    let store = GitLabStore::new().unwrap();
    let err = store
        .read_raw(&target(&server), "a/B/missing")
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Status(StatusCode::NOT_FOUND)));
}

#[tokio::test]
async fn commit_posts_all_actions_in_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/group%2Fpastes/repository/commits"))
        .and(header("PRIVATE-TOKEN", "glpat-test"))
        .and(body_json(json!({
            "branch": "main",
            "commit_message": "Created by 203.0.113.7",
            "actions": [
                {"action": "create", "file_path": "a/B/one", "content": "hello"},
                {"action": "create", "file_path": "a/C/two", "content": "aGk=", "encoding": "base64"}
            ]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = GitLabStore::new().unwrap();
    let commit = Commit::new(
        "Created by 203.0.113.7",
        vec![
            CommitAction::text("a/B/one", "hello"),
            CommitAction::base64("a/C/two", "aGk="),
        ],
    );

    let status = store.commit(&target(&server), &commit).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn rejected_commit_returns_store_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "A file with this name already exists"})),
        )
        .mount(&server)
        .await;

    let store = GitLabStore::new().unwrap();
    let commit = Commit::new("Uploaded by 203.0.113.7", vec![CommitAction::text("p", "c")]);
    let err = store.commit(&target(&server), &commit).await.unwrap_err();

    assert_eq!(err.upstream_status(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() {
    let target = StoreTarget {
        store_url: "http://127.0.0.1:1/api/v4".to_string(),
        project: "1".to_string(),
        branch: "main".to_string(),
        token: String::new(),
    };

    let store = GitLabStore::new().unwrap();
    let err = store.read_raw(&target, "a/B/c").await.unwrap_err();

    assert_eq!(err.upstream_status(), None);
}
