//! REST history client against an in-process mock backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use enterprisegpt_client::chat::{
    ApiConfig, AuthToken, ChatError, ChatHistory, ChatId, Feedback, HttpChatHistory, LocalIds,
    MessageId,
};

const TOKEN: &str = "test-token";

#[derive(Clone, Default)]
struct Backend {
    feedback: Arc<Mutex<Vec<Value>>>,
    created: Arc<Mutex<Vec<Value>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

async fn list_chats(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "chats": [
            {"id": 1, "title": "first", "updated_at": "2026-10-18T09:00:00Z"},
            {"id": "two", "title": "second", "updatedAt": "2026-10-10T09:00:00Z"}
        ],
        "total": 2,
        "page": params.get("page").and_then(|p| p.parse::<u32>().ok()),
        "limit": params.get("limit").and_then(|l| l.parse::<u32>().ok()),
    }))
    .into_response()
}

async fn fetch_chat(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({
        "id": id,
        "title": "loaded",
        "messages": [
            {"role": "user", "content": "hi"},
            {"id": "m2", "role": "assistant", "content": "hello", "feedback": "POSITIVE"}
        ]
    }))
    .into_response()
}

async fn create_chat(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let title = body["title"].clone();
    backend
        .created
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(body);
    Json(json!({"id": "c9", "title": title})).into_response()
}

async fn submit_feedback(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    backend
        .feedback
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(body);
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/chat/", get(list_chats))
        .route("/api/chat", post(create_chat))
        .route("/api/chat/feedback", post(submit_feedback))
        .route("/api/chat/{id}", get(fetch_chat))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|err| panic!("bind failed: {err}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|err| panic!("no local addr: {err}"));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{addr}")
}

fn client(base_url: &str, token: &str) -> HttpChatHistory {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    };
    let token = AuthToken::new(token).unwrap_or_else(|err| panic!("token: {err}"));
    HttpChatHistory::new(&config, token).unwrap_or_else(|err| panic!("client: {err}"))
}

#[tokio::test]
async fn test_list_sessions() {
    let base = spawn_backend(Backend::default()).await;
    let history = client(&base, TOKEN);

    let sessions = history
        .list_sessions()
        .await
        .unwrap_or_else(|err| panic!("list failed: {err}"));

    let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "two"]);
    assert_eq!(sessions[1].title, "second");
}

#[tokio::test]
async fn test_fetch_session_assigns_missing_ids() {
    let base = spawn_backend(Backend::default()).await;
    let history = client(&base, TOKEN);

    let detail = history
        .fetch_session(&ChatId::new("c1"))
        .await
        .unwrap_or_else(|err| panic!("fetch failed: {err}"));
    assert_eq!(detail.id.as_str(), "c1");

    let mut ids = LocalIds::new();
    let messages = detail.into_messages(|| ids.next_id());
    assert_eq!(messages.len(), 2);
    assert!(!messages[0].id.is_confirmed());
    assert_eq!(messages[1].id, MessageId::remote("m2"));
    assert!(messages[1].is_bot);
    assert_eq!(messages[1].feedback, Some(Feedback::Positive));
}

#[tokio::test]
async fn test_fetch_missing_session_maps_status() {
    let base = spawn_backend(Backend::default()).await;
    let history = client(&base, TOKEN);

    let result = history.fetch_session(&ChatId::new("missing")).await;

    assert!(matches!(result, Err(ChatError::Api { status: 404, .. })));
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let base = spawn_backend(Backend::default()).await;
    let history = client(&base, "someone-else");

    let result = history.list_sessions().await;

    assert!(matches!(result, Err(ChatError::Api { status: 401, .. })));
}

#[tokio::test]
async fn test_create_session_posts_title() {
    let backend = Backend::default();
    let base = spawn_backend(backend.clone()).await;
    let history = client(&base, TOKEN);

    let summary = history
        .create_session("hello world")
        .await
        .unwrap_or_else(|err| panic!("create failed: {err}"));

    assert_eq!(summary.id.as_str(), "c9");
    assert_eq!(summary.title, "hello world");
    let created = backend
        .created
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    assert_eq!(created, vec![json!({"title": "hello world"})]);
}

#[tokio::test]
async fn test_submit_feedback_sends_score() {
    let backend = Backend::default();
    let base = spawn_backend(backend.clone()).await;
    let history = client(&base, TOKEN);

    let result = history
        .submit_feedback(&MessageId::remote("m2"), Feedback::Negative)
        .await;
    assert!(result.is_ok());

    let local = history
        .submit_feedback(&MessageId::Local(5), Feedback::Positive)
        .await;
    assert!(matches!(local, Err(ChatError::UnconfirmedMessage(_))));

    let submitted = backend
        .feedback
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    assert_eq!(submitted, vec![json!({"message_id": "m2", "feedback": -1})]);
}
