use crate::{
    config::AppConfig,
    db,
    error::{Result, ServiceError},
    query::{AnswerResponse, PgExecutor, QueryEngine, ScalarExecutor, TranslateResponse},
    request::ParsedQuery,
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

type JsonPayload = std::result::Result<Json<Value>, JsonRejection>;

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect_pool(&config).await?;
        let executor = PgExecutor::new(pool, config.request_timeout);
        Ok(Self::with_executor(config, Arc::new(executor)))
    }

    /// Builds a server around any executor; used to run without PostgreSQL.
    pub fn with_executor(config: AppConfig, executor: Arc<dyn ScalarExecutor>) -> Self {
        let config = Arc::new(config);
        let engine = QueryEngine::new(executor);
        let state = AppState::new(Arc::clone(&config), engine);
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route("/api/query", post(Self::query))
            .route("/api/translate", post(Self::translate))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "vidstats listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn query(
        State(state): State<AppState>,
        headers: HeaderMap,
        payload: JsonPayload,
    ) -> Result<Json<AnswerResponse>> {
        enforce_api_key(&headers, &state.config)?;
        let parsed = parse_payload(payload)?;
        let response = state.engine.execute(parsed).await?;
        Ok(Json(response))
    }

    async fn translate(
        State(state): State<AppState>,
        headers: HeaderMap,
        payload: JsonPayload,
    ) -> Result<Json<TranslateResponse>> {
        enforce_api_key(&headers, &state.config)?;
        let parsed = parse_payload(payload)?;
        let response = state.engine.translate(parsed)?;
        Ok(Json(response))
    }
}

/// Body rejections (bad JSON, missing content type) become 400s with the
/// usual error body instead of axum's plain-text responses.
fn parse_payload(payload: JsonPayload) -> Result<ParsedQuery> {
    let Json(value) =
        payload.map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))?;
    ParsedQuery::from_json(value)
}

fn enforce_api_key(headers: &HeaderMap, config: &AppConfig) -> Result<()> {
    if let Some(expected) = &config.api_key {
        let provided = headers
            .get("x-api-key")
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_str()) {
            return Err(ServiceError::Auth);
        }
    }

    Ok(())
}
