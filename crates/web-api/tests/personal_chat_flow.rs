use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use config::AppConfig;
use infrastructure::Infrastructure;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use web_api::{router, AppState, PROFILE_HEADER};

fn build_app() -> Router {
    let config = AppConfig::default();
    let infra = Infrastructure::in_memory(&config);
    router(AppState::new(&infra, config, CancellationToken::new()))
}

async fn send(app: &Router, method: &str, uri: &str, profile: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(profile) = profile {
        request = request.header(PROFILE_HEADER, profile);
    }
    let request = request
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));
    (status, body)
}

async fn create_profile(app: &Router, name: &str) -> String {
    let (status, body) = send(app, "POST", "/api/v1/profiles", None, json!({ "name": name })).await;
    assert_eq!(status, StatusCode::CREATED);
    body["profileId"].as_str().expect("profileId").to_string()
}

#[tokio::test]
async fn personal_chat_flow() {
    let app = build_app();
    let owner = create_profile(&app, "owner").await;
    let friend = create_profile(&app, "friend").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/chats/personal",
        Some(&owner),
        json!({ "profileId": friend }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let chat_id = body["chatId"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/chats/send-message",
        Some(&owner),
        json!({ "chatId": chat_id, "text": "hi there" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, chats) = send(
        &app,
        "POST",
        "/api/v1/chats/load-chats",
        Some(&friend),
        json!({ "count": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chats["count"], 1);
    assert_eq!(chats["chats"][0]["name"], "friend");
    assert_eq!(chats["chats"][0]["kind"], "personal");
    assert_eq!(chats["chats"][0]["preview"], "hi there");

    let (_, messages) = send(
        &app,
        "POST",
        "/api/v1/chats/load-messages",
        Some(&friend),
        json!({ "chatId": chat_id, "count": 10 }),
    )
    .await;
    assert_eq!(messages["messages"][0]["senderId"], owner.as_str());

    let (status, body) = send(
        &app,
        "DELETE",
        "/api/v1/chats/personal",
        Some(&owner),
        json!({ "chatId": chat_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/chats/load-messages",
        Some(&friend),
        json!({ "chatId": chat_id, "count": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CHAT_NOT_FOUND");
}

#[tokio::test]
async fn chatting_with_yourself_is_rejected() {
    let app = build_app();
    let owner = create_profile(&app, "owner").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/chats/personal",
        Some(&owner),
        json!({ "profileId": owner }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SELF_MATCH");
}

#[tokio::test]
async fn comments_must_reply_within_the_same_post() {
    let app = build_app();
    let author = create_profile(&app, "author").await;

    let (_, first) = send(&app, "POST", "/api/v1/posts", Some(&author), json!({ "header": "first" })).await;
    let (_, second) = send(&app, "POST", "/api/v1/posts", Some(&author), json!({ "header": "second" })).await;

    let (status, comment) = send(
        &app,
        "POST",
        "/api/v1/comments",
        Some(&author),
        json!({ "postId": first["postId"], "text": "nice" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/comments",
        Some(&author),
        json!({ "postId": second["postId"], "replyTo": comment["commentId"], "text": "wrong post" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "COMMENT_NOT_FOUND");
}
