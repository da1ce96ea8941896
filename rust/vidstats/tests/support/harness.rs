use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use vidstats::{
    config::AppConfig,
    error::{Result, ServiceError},
    query::{ScalarExecutor, SqlQuery},
    server::Server,
};

pub const API_KEY: &str = "test-api-key";

/// Answers every query with a fixed value and remembers what it was asked.
pub struct RecordingExecutor {
    answer: std::result::Result<i64, String>,
    seen: Mutex<Vec<SqlQuery>>,
}

impl RecordingExecutor {
    pub fn answering(value: i64) -> Self {
        Self {
            answer: Ok(value),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<SqlQuery> {
        self.seen.lock().expect("executor lock poisoned").clone()
    }
}

#[async_trait]
impl ScalarExecutor for RecordingExecutor {
    async fn fetch_scalar(&self, query: &SqlQuery) -> Result<i64> {
        self.seen
            .lock()
            .expect("executor lock poisoned")
            .push(query.clone());
        self.answer
            .clone()
            .map_err(|message| ServiceError::Execution(anyhow::anyhow!(message)))
    }
}

pub struct VidstatsTestHarness {
    router: Router,
    pub executor: Arc<RecordingExecutor>,
}

impl VidstatsTestHarness {
    pub fn new(executor: RecordingExecutor) -> Self {
        Self::build(executor, None)
    }

    pub fn with_api_key(executor: RecordingExecutor) -> Self {
        Self::build(executor, Some(API_KEY.to_string()))
    }

    fn build(executor: RecordingExecutor, api_key: Option<String>) -> Self {
        let mut config = AppConfig::embedded("postgres://unused/videos".to_string());
        config.api_key = api_key;

        let executor = Arc::new(executor);
        let server = Server::with_executor(config, executor.clone());
        Self {
            router: server.router(),
            executor,
        }
    }

    pub async fn get(&self, path: &str) -> http::Response<Body> {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("failed to build harness request");
        self.send(request).await
    }

    pub async fn post(&self, path: &str, payload: &Value) -> http::Response<Body> {
        self.post_with_key(path, payload, None).await
    }

    pub async fn post_with_key(
        &self,
        path: &str,
        payload: &Value,
        api_key: Option<&str>,
    ) -> http::Response<Body> {
        self.send(json_request(path, payload, api_key)).await
    }

    /// Posts `body` verbatim, for payloads that are not valid JSON requests.
    pub async fn post_raw(
        &self,
        path: &str,
        body: &str,
        content_type: Option<&str>,
    ) -> http::Response<Body> {
        let mut builder = Request::builder().method("POST").uri(path);
        if let Some(content_type) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("failed to build harness request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> http::Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub fn json_request(path: &str, payload: &Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("failed to build harness request")
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}
