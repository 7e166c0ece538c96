mod support;

use std::time::Duration;

use serde_json::{json, Value};
use support::TestServer;

/// 从响应体中读出下一帧 `data:`，跳过保活注释
async fn next_data_frame(response: &mut reqwest::Response, buffer: &mut String) -> Value {
    loop {
        if let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            if let Some(data) = frame.lines().find_map(|line| line.strip_prefix("data:")) {
                return serde_json::from_str(data.trim()).expect("event json");
            }
            continue;
        }
        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .expect("frame in time")
            .expect("chunk")
            .expect("stream open");
        buffer.push_str(std::str::from_utf8(&chunk).expect("utf8"));
    }
}

#[tokio::test]
async fn stream_delivers_events_as_sse_frames() {
    let server = TestServer::start().await;
    let a = server.create_profile("alice").await;
    let b = server.create_profile("bob").await;

    let mut response = server
        .get("/api/v1/events/stream", Some(&a))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    server
        .post("/api/v1/chats/anonymous/enter-queue", Some(&a))
        .json(&json!({ "gender": "f" }))
        .send()
        .await
        .unwrap();
    let matched: Value = server
        .post("/api/v1/chats/anonymous/enter-queue", Some(&b))
        .json(&json!({ "gender": "m" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let mut buffer = String::new();
    let frame = next_data_frame(&mut response, &mut buffer).await;
    assert_eq!(
        frame,
        json!({ "type": "anon-chat-enter", "chatId": matched["chatId"] })
    );

    drop(response);
    server.stop().await;
}
