use crate::app::render::{render_html, render_json};
use crate::config::Config;
use crate::core::build_binance_report;
use crate::models::Report;
use crate::{Error, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[derive(Clone)]
struct ServerState {
    config: Arc<Config>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    accounts: usize,
    timestamp: i64,
}

pub fn router(config: Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = ServerState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(index))
        .route("/api/report", get(report_json))
        .route("/api/health", get(health))
        .with_state(state)
        .layer(cors)
}

pub async fn run(config: Config) -> Result<()> {
    let addr = config.server.addr.clone();
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| Error::new(format!("bind failed: {err}")))?;
    info!(addr = %addr, "listening");
    axum::serve(listener, app)
        .await
        .map_err(|err| Error::new(format!("server error: {err}")))?;
    Ok(())
}

async fn index(State(state): State<ServerState>) -> Response {
    match build(state).await {
        Ok(report) => Html(render_html(&report)).into_response(),
        Err(err) => failure(err),
    }
}

async fn report_json(State(state): State<ServerState>) -> Response {
    let rendered = match build(state).await {
        Ok(report) => render_json(&report),
        Err(err) => Err(err),
    };
    match rendered {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => failure(err),
    }
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(Health {
        status: "ok",
        accounts: state.config.accounts.len(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn build(state: ServerState) -> Result<Report> {
    let config = state.config.clone();
    spawn_blocking(move || build_binance_report(&config))
        .await
        .map_err(|err| Error::new(format!("join failed: {err}")))?
}

fn failure(err: Error) -> Response {
    warn!(error = %err.message, "report request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.message).into_response()
}
