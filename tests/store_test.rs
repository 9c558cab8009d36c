//! `ChatStore` flows against a wiremock backend.

mod common;

use common::{api_for, sse_body};
use ragchat::error::RagError;
use ragchat::models::MessageRole;
use ragchat::sse::SessionOutcome;
use ragchat::state::{BuildPhase, SessionStatus};
use ragchat::store::ChatStore;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_ready_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/rag/build"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s-1",
            "status": "processing"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rag/s-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ready",
            "chunk_count": 12
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_build_wait_and_stream() {
    let server = MockServer::start().await;
    mount_ready_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"text":"Graydon "}"#, r#"{"text":"Hoare."}"#, "[DONE]"]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let store = ChatStore::new(api_for(&server));

    store
        .build_rag("https://en.wikipedia.org/wiki/Rust_(programming_language)")
        .await
        .unwrap();
    assert_eq!(store.snapshot().session_id.as_deref(), Some("s-1"));
    assert_eq!(store.session().status, SessionStatus::Loading);

    store.wait_until_ready().await.unwrap();
    assert!(store.snapshot().rag_status.is_ready());
    assert!(store.session().is_ready());

    let mut tokens = Vec::new();
    let outcome = store
        .stream_query_with("Who designed Rust?", |t| tokens.push(t.to_string()))
        .await;

    assert_eq!(outcome, SessionOutcome::Completed);
    assert_eq!(tokens, vec!["Graydon ", "Hoare."]);

    let state = store.snapshot();
    assert!(!state.is_loading);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[0].role, MessageRole::User);
    assert_eq!(state.last_answer(), Some("Graydon Hoare."));
}

#[tokio::test]
async fn test_failed_build_is_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rag/build"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s-2",
            "status": "processing"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rag/s-2/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "failed",
            "metadata": {"error": "could not fetch article"}
        })))
        .mount(&server)
        .await;

    let store = ChatStore::new(api_for(&server));
    store.build_rag("https://en.wikipedia.org/wiki/Rust").await.unwrap();

    let err = store.wait_until_ready().await.unwrap_err();
    assert!(matches!(err, RagError::BuildFailed { .. }));

    let state = store.snapshot();
    assert_eq!(state.rag_status, BuildPhase::Error);
    assert!(state.error.is_some());
    assert_eq!(store.session().status, SessionStatus::Error);
}

#[tokio::test]
async fn test_stream_error_lands_in_transcript() {
    let server = MockServer::start().await;
    mount_ready_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = ChatStore::new(api_for(&server));
    store.build_rag("https://en.wikipedia.org/wiki/Rust").await.unwrap();

    let outcome = store.stream_query("hi").await;
    assert_eq!(outcome, SessionOutcome::Errored);

    let state = store.snapshot();
    assert!(!state.is_loading);
    let last = state.messages.last().unwrap();
    assert!(last.is_error);
    assert!(last.content.starts_with("Error: "));
    assert!(last.content.contains("500"));
}

#[tokio::test]
async fn test_send_query_and_history() {
    let server = MockServer::start().await;
    mount_ready_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/chat/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s-1",
            "response": "A systems language."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chat/s-1/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"role": "user", "content": "What is Rust?"},
            {"role": "assistant", "content": "A systems language."}
        ])))
        .mount(&server)
        .await;

    let store = ChatStore::new(api_for(&server));
    store.build_rag("https://en.wikipedia.org/wiki/Rust").await.unwrap();

    store.send_query("What is Rust?").await;
    assert_eq!(store.snapshot().last_answer(), Some("A systems language."));

    store.clear_transcript();
    assert!(store.snapshot().messages.is_empty());

    store.load_history().await;
    let state = store.snapshot();
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].role, MessageRole::Assistant);
    assert_eq!(state.session_id.as_deref(), Some("s-1"));
}

#[tokio::test]
async fn test_wait_until_ready_tracks_processing_polls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rag/s-3/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rag/s-3/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ready"})))
        .mount(&server)
        .await;

    let store = ChatStore::new(api_for(&server));
    store.set_session_id("s-3");

    let mut session_rx = store.subscribe_session();
    let (result, seen) = tokio::join!(store.wait_until_ready(), async {
        let mut seen = Vec::new();
        while session_rx.changed().await.is_ok() {
            let session = session_rx.borrow_and_update().clone();
            seen.push((session.status, session.progress));
            if session.status == SessionStatus::Ready {
                break;
            }
        }
        seen
    });

    result.unwrap();
    assert!(seen.contains(&(SessionStatus::Loading, 20)));
    assert_eq!(seen.last(), Some(&(SessionStatus::Ready, 100)));
    assert_eq!(store.session().progress, 100);
}
