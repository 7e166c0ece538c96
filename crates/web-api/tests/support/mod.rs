use std::time::Duration;

use config::AppConfig;
use infrastructure::Infrastructure;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use web_api::{router, AppState, PROFILE_HEADER};

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.events.coalesce_delay_ms = 0;
    config.events.drain_timeout_ms = 300;
    config.events.sse_keep_alive_secs = 1;
    config
}

pub struct TestServer {
    pub base: String,
    pub client: Client,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = test_config();
        let infra = Infrastructure::in_memory(&config);
        let shutdown = CancellationToken::new();
        let app = router(AppState::new(&infra, config, shutdown.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal.cancelled_owned())
                .await
                .expect("serve");
        });

        Self {
            base: format!("http://{addr}"),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("client"),
            shutdown,
            handle,
        }
    }

    pub fn post(&self, path: &str, profile: Option<&str>) -> RequestBuilder {
        self.with_profile(self.client.post(format!("{}{}", self.base, path)), profile)
    }

    pub fn get(&self, path: &str, profile: Option<&str>) -> RequestBuilder {
        self.with_profile(self.client.get(format!("{}{}", self.base, path)), profile)
    }

    pub fn delete(&self, path: &str, profile: Option<&str>) -> RequestBuilder {
        self.with_profile(self.client.delete(format!("{}{}", self.base, path)), profile)
    }

    fn with_profile(&self, request: RequestBuilder, profile: Option<&str>) -> RequestBuilder {
        match profile {
            Some(profile) => request.header(PROFILE_HEADER, profile),
            None => request,
        }
    }

    pub async fn create_profile(&self, name: &str) -> String {
        let body: Value = self
            .post("/api/v1/profiles", None)
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("create profile")
            .json()
            .await
            .expect("profile body");
        body["profileId"].as_str().expect("profileId").to_string()
    }

    pub async fn subscribe(&self, profile: &str) {
        let response = self
            .post("/api/v1/events/subscribe", Some(profile))
            .send()
            .await
            .expect("subscribe");
        assert!(response.status().is_success());
    }

    pub async fn drain(&self, profile: &str) -> Vec<Value> {
        let body: Value = self
            .get("/api/v1/events", Some(profile))
            .send()
            .await
            .expect("drain")
            .json()
            .await
            .expect("events body");
        body["events"].as_array().cloned().unwrap_or_default()
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.handle.await;
    }
}

pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("json body")
}
