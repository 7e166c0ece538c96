use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use validator::Validate;

use application::{
    ChatPage, CommentPage, EnterQueueRequest, MessagePage, PostPage, QueueOutcome, RateOutcome,
};
use domain::{
    rating::{RATING_MAX, RATING_MIN},
    ChatId, Comment, CommentId, CommentQuery, Conversation, Filter, Gender, Message, MessageId,
    Post, PostId, PostQuery, Profile, ProfileId, RatingRange, Timestamp, Vote,
};

use crate::{events, error::ApiError, identity::CurrentProfile, state::AppState};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateProfilePayload {
    #[validate(length(min = 1, max = 64))]
    name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PublishPostPayload {
    #[validate(length(min = 1, max = 256))]
    header: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PublishCommentPayload {
    post_id: PostId,
    reply_to: Option<CommentId>,
    #[validate(length(min = 1, max = 4096))]
    text: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct EnterQueuePayload {
    gender: Option<Gender>,
    #[validate(range(max = 100))]
    age: Option<u8>,
    #[serde(default)]
    filter: Filter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatActionPayload {
    chat_id: ChatId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateChatPayload {
    chat_id: ChatId,
    rate: Vote,
}

#[derive(Debug, Deserialize)]
struct RateContentPayload {
    rating: Vote,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct SendMessagePayload {
    chat_id: ChatId,
    #[validate(length(min = 1, max = 4096))]
    text: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoadChatsPayload {
    #[validate(range(min = 1, max = 100))]
    count: u64,
    #[serde(default)]
    offset: u64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoadMessagesPayload {
    chat_id: ChatId,
    #[validate(range(min = 1, max = 100))]
    count: u64,
    #[serde(default)]
    offset: u64,
}

/// 不带 `authorId` 时是全站帖子流，带上则只列出该作者的帖子
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoadPostsPayload {
    #[validate(range(min = 1, max = 100))]
    count: u64,
    #[serde(default)]
    offset: u64,
    author_id: Option<ProfileId>,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct LoadCommentsPayload {
    post_id: PostId,
    #[validate(range(min = 1, max = 100))]
    count: u64,
    #[serde(default)]
    offset: u64,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
}

fn rating_range(min: Option<f64>, max: Option<f64>) -> Result<RatingRange, ApiError> {
    Ok(RatingRange::new(
        min.unwrap_or(RATING_MIN),
        max.unwrap_or(RATING_MAX),
    )?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePersonalChatPayload {
    profile_id: ProfileId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Success {
    success: bool,
}

pub(crate) const SUCCESS: Json<Success> = Json(Success { success: true });

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum QueueResponse {
    Queued,
    #[serde(rename_all = "camelCase")]
    Matched { chat_id: ChatId },
}

impl From<QueueOutcome> for QueueResponse {
    fn from(outcome: QueueOutcome) -> Self {
        match outcome {
            QueueOutcome::Queued => QueueResponse::Queued,
            QueueOutcome::Matched(chat_id) => QueueResponse::Matched { chat_id },
        }
    }
}

#[derive(Debug, Serialize)]
struct RateResponse {
    applied: bool,
}

impl From<RateOutcome> for RateResponse {
    fn from(outcome: RateOutcome) -> Self {
        Self {
            applied: outcome == RateOutcome::Applied,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    profile_id: ProfileId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    chat_id: ChatId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostResponse {
    post_id: PostId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentResponse {
    comment_id: CommentId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SentMessageResponse {
    message_id: MessageId,
}

#[derive(Debug, Serialize)]
struct ChatListResponse {
    count: u64,
    chats: Vec<Conversation>,
}

impl From<ChatPage> for ChatListResponse {
    fn from(page: ChatPage) -> Self {
        Self {
            count: page.count,
            chats: page.chats,
        }
    }
}

#[derive(Debug, Serialize)]
struct PostListResponse {
    count: u64,
    posts: Vec<Post>,
}

impl From<PostPage> for PostListResponse {
    fn from(page: PostPage) -> Self {
        Self {
            count: page.count,
            posts: page.posts,
        }
    }
}

#[derive(Debug, Serialize)]
struct CommentListResponse {
    count: u64,
    comments: Vec<Comment>,
}

impl From<CommentPage> for CommentListResponse {
    fn from(page: CommentPage) -> Self {
        Self {
            count: page.count,
            comments: page.comments,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageView {
    id: MessageId,
    sender_id: Option<ProfileId>,
    text: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: Timestamp,
}

impl MessageView {
    fn new(message: Message, viewer: ProfileId, anonymous: bool) -> Self {
        let sender_id = (!anonymous || message.sender_id == viewer).then_some(message.sender_id);
        Self {
            id: message.id,
            sender_id,
            text: message.text.into(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageListResponse {
    count: u64,
    messages: Vec<MessageView>,
}

impl MessageListResponse {
    fn new(page: MessagePage, viewer: ProfileId) -> Self {
        let anonymous = page.anonymous;
        Self {
            count: page.count,
            messages: page
                .messages
                .into_iter()
                .map(|message| MessageView::new(message, viewer, anonymous))
                .collect(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/me", get(current_profile))
        .route("/posts", post(publish_post))
        .route("/posts/load-list", post(load_posts))
        .route("/posts/{post_id}", get(get_post).delete(delete_post))
        .route("/posts/{post_id}/rate", post(rate_post))
        .route("/comments", post(publish_comment))
        .route("/comments/load-list", post(load_comments))
        .route("/comments/{comment_id}", delete(delete_comment))
        .route("/comments/{comment_id}/rate", post(rate_comment))
        .route("/chats/send-message", post(send_message))
        .route("/chats/load-chats", post(load_chats))
        .route("/chats/load-messages", post(load_messages))
        .route(
            "/chats/personal",
            post(create_personal_chat).delete(delete_personal_chat),
        )
        .route("/chats/anonymous/enter-queue", post(enter_queue))
        .route("/chats/anonymous/leave-queue", post(leave_queue))
        .route("/chats/anonymous/leave-chat", post(leave_chat))
        .route("/chats/anonymous/rate", post(rate_user))
        .route("/chats/anonymous/block", post(block_user))
        .merge(events::routes())
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<CreateProfilePayload>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    payload.validate()?;
    let profile = state.content_service.create_profile(payload.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            profile_id: profile.id,
        }),
    ))
}

async fn current_profile(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.content_service.get_profile(profile_id).await?))
}

async fn publish_post(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<PublishPostPayload>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    payload.validate()?;
    let post_id = state
        .content_service
        .publish_post(profile_id, payload.header)
        .await?;
    Ok((StatusCode::CREATED, Json(PostResponse { post_id })))
}

async fn publish_comment(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<PublishCommentPayload>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    payload.validate()?;
    let comment_id = state
        .content_service
        .publish_comment(profile_id, payload.post_id, payload.reply_to, payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment_id })))
}

async fn get_post(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Path(post_id): Path<PostId>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.content_service.get_post(profile_id, post_id).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Path(post_id): Path<PostId>,
) -> Result<Json<Success>, ApiError> {
    state.content_service.delete_post(profile_id, post_id).await?;
    Ok(SUCCESS)
}

async fn load_posts(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<LoadPostsPayload>,
) -> Result<Json<PostListResponse>, ApiError> {
    payload.validate()?;
    let query = PostQuery {
        author: payload.author_id,
        rating: rating_range(payload.min_rating, payload.max_rating)?,
    };
    let page = state
        .content_service
        .load_posts(profile_id, query, payload.count, payload.offset)
        .await?;
    Ok(Json(page.into()))
}

async fn load_comments(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<LoadCommentsPayload>,
) -> Result<Json<CommentListResponse>, ApiError> {
    payload.validate()?;
    let query = CommentQuery {
        post_id: payload.post_id,
        rating: rating_range(payload.min_rating, payload.max_rating)?,
    };
    let page = state
        .content_service
        .load_comments(profile_id, query, payload.count, payload.offset)
        .await?;
    Ok(Json(page.into()))
}

async fn delete_comment(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Path(comment_id): Path<CommentId>,
) -> Result<Json<Success>, ApiError> {
    state
        .content_service
        .delete_comment(profile_id, comment_id)
        .await?;
    Ok(SUCCESS)
}

async fn rate_post(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Path(post_id): Path<PostId>,
    Json(payload): Json<RateContentPayload>,
) -> Result<Json<RateResponse>, ApiError> {
    let outcome = state
        .rating_service
        .rate_post(profile_id, post_id, payload.rating)
        .await?;
    Ok(Json(outcome.into()))
}

async fn rate_comment(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Path(comment_id): Path<CommentId>,
    Json(payload): Json<RateContentPayload>,
) -> Result<Json<RateResponse>, ApiError> {
    let outcome = state
        .rating_service
        .rate_comment(profile_id, comment_id, payload.rating)
        .await?;
    Ok(Json(outcome.into()))
}

async fn send_message(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<SentMessageResponse>, ApiError> {
    payload.validate()?;
    let message = state
        .chat_service
        .send_message(profile_id, payload.chat_id, payload.text)
        .await?;
    Ok(Json(SentMessageResponse {
        message_id: message.id,
    }))
}

async fn load_chats(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<LoadChatsPayload>,
) -> Result<Json<ChatListResponse>, ApiError> {
    payload.validate()?;
    let page = state
        .chat_service
        .load_chats(profile_id, payload.count, payload.offset)
        .await?;
    Ok(Json(page.into()))
}

async fn load_messages(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<LoadMessagesPayload>,
) -> Result<Json<MessageListResponse>, ApiError> {
    payload.validate()?;
    let page = state
        .chat_service
        .load_messages(profile_id, payload.chat_id, payload.count, payload.offset)
        .await?;
    Ok(Json(MessageListResponse::new(page, profile_id)))
}

async fn create_personal_chat(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<CreatePersonalChatPayload>,
) -> Result<(StatusCode, Json<ChatResponse>), ApiError> {
    let chat_id = state
        .chat_service
        .create_personal_chat(profile_id, payload.profile_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ChatResponse { chat_id })))
}

async fn delete_personal_chat(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<ChatActionPayload>,
) -> Result<Json<Success>, ApiError> {
    state
        .chat_service
        .delete_personal_chat(profile_id, payload.chat_id)
        .await?;
    Ok(SUCCESS)
}

async fn enter_queue(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<EnterQueuePayload>,
) -> Result<Json<QueueResponse>, ApiError> {
    payload.validate()?;
    let outcome = state
        .anon_chat_service
        .enter_queue(
            profile_id,
            EnterQueueRequest {
                gender: payload.gender.unwrap_or_default(),
                age: payload.age,
                filter: payload.filter,
            },
        )
        .await?;
    Ok(Json(outcome.into()))
}

async fn leave_queue(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> Result<Json<Success>, ApiError> {
    state.anon_chat_service.leave_queue(profile_id).await?;
    Ok(SUCCESS)
}

async fn leave_chat(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<ChatActionPayload>,
) -> Result<Json<Success>, ApiError> {
    state
        .anon_chat_service
        .leave_chat(profile_id, payload.chat_id)
        .await?;
    Ok(SUCCESS)
}

async fn rate_user(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<RateChatPayload>,
) -> Result<Json<RateResponse>, ApiError> {
    let outcome = state
        .anon_chat_service
        .rate_user(profile_id, payload.chat_id, payload.rate)
        .await?;
    Ok(Json(outcome.into()))
}

async fn block_user(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
    Json(payload): Json<ChatActionPayload>,
) -> Result<Json<Success>, ApiError> {
    state
        .anon_chat_service
        .block_user(profile_id, payload.chat_id)
        .await?;
    Ok(SUCCESS)
}
