//! 事件的两种传输方式：
//! - 长轮询：`POST /events/subscribe` 之后反复 `GET /events`；
//! - 推送：`GET /events/stream`，每个事件是一帧 SSE `data: <json>`。

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use domain::Event;

use crate::{
    error::ApiError,
    identity::CurrentProfile,
    routes::{Success, SUCCESS},
    state::AppState,
};

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/subscribe", post(subscribe))
        .route("/events", get(drain))
        .route("/events/stream", get(stream))
}

#[derive(Debug, Serialize)]
struct EventsResponse {
    events: Vec<Event>,
}

async fn subscribe(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> Result<Json<Success>, ApiError> {
    state.event_service.subscribe(profile_id).await?;
    Ok(SUCCESS)
}

/// 客户端断开时 axum 会丢弃这个 future，等待随之结束；服务关闭时通过 `shutdown` 提前返回
async fn drain(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> Result<Json<EventsResponse>, ApiError> {
    let cancel = state.shutdown.child_token();
    let events = state.event_service.drain(profile_id, &cancel).await?;
    debug!(profile_id = %profile_id, count = events.len(), "events drained");
    Ok(Json(EventsResponse { events }))
}

async fn stream(
    State(state): State<AppState>,
    CurrentProfile(profile_id): CurrentProfile,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let events = state.event_service.stream(profile_id).await?;
    let frames = events
        .filter_map(move |event| async move {
            match SseEvent::default().json_data(&event) {
                Ok(frame) => Some(Ok(frame)),
                Err(err) => {
                    warn!(profile_id = %profile_id, error = %err, "failed to encode event");
                    None
                }
            }
        })
        .take_until(state.shutdown.clone().cancelled_owned());

    Ok(Sse::new(frames).keep_alive(KeepAlive::new().interval(state.config.events.sse_keep_alive())))
}
