// SPDX-License-Identifier: MIT

//! HTTP review surface over saved matches

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::pastego::error::{PastegoError, Result};
use crate::pastego::store::ResultStore;
use crate::pastego::watcher::MatchEvent;
use crate::query::{compile, evaluate, first_matching_literal};

#[derive(Clone)]
pub struct AppState {
    store: ResultStore,
    events: broadcast::Sender<MatchEvent>,
}

impl AppState {
    pub fn new(store: ResultStore, events: broadcast::Sender<MatchEvent>) -> Self {
        Self { store, events }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/matches", get(list_matches))
        .route("/api/matches/{name}", get(get_match).delete(delete_match))
        .route("/api/check", post(check_expression))
        .route("/api/events", get(stream_events))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the review API on localhost until `shutdown` resolves
pub async fn serve<F>(port: u16, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

type ApiResponse = (StatusCode, Json<Value>);

fn error_response(err: PastegoError) -> ApiResponse {
    let status = match &err {
        PastegoError::NotFound(_) => StatusCode::NOT_FOUND,
        PastegoError::InvalidName(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    }
    (status, Json(json!({ "error": err.to_string() })))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_matches(State(state): State<AppState>) -> ApiResponse {
    match state.store.list().await {
        Ok(matches) => (StatusCode::OK, Json(json!(matches))),
        Err(e) => error_response(e),
    }
}

async fn get_match(State(state): State<AppState>, Path(name): Path<String>) -> ApiResponse {
    match state.store.read(&name).await {
        Ok(content) => (
            StatusCode::OK,
            Json(json!({ "name": name, "content": content })),
        ),
        Err(e) => error_response(e),
    }
}

async fn delete_match(State(state): State<AppState>, Path(name): Path<String>) -> ApiResponse {
    match state.store.delete(&name).await {
        Ok(true) => {
            log::info!("Deleted {}", name);
            (StatusCode::OK, Json(json!({ "deleted": name })))
        }
        Ok(false) => error_response(PastegoError::NotFound(name)),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct CheckRequest {
    expression: String,
    body: String,
    #[serde(default)]
    case_insensitive: bool,
}

async fn check_expression(Json(payload): Json<CheckRequest>) -> ApiResponse {
    let expr = match compile(&payload.expression) {
        Ok(expr) => expr,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": e.to_string(),
                    "kind": e.kind.to_string(),
                    "offset": e.offset,
                })),
            );
        }
    };

    let (expr, body) = if payload.case_insensitive {
        (
            expr.map_literals(|s| s.to_lowercase()),
            payload.body.to_lowercase(),
        )
    } else {
        (expr, payload.body)
    };

    (
        StatusCode::OK,
        Json(json!({
            "expression": expr.to_string(),
            "matched": evaluate(&expr, &body),
            "literal": first_matching_literal(&expr, &body),
        })),
    )
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);
    let mut events = state.events.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Event stream lagged, {} matches skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Ok(Event::default()
            .event("match")
            .json_data(event)
            .unwrap_or_else(|_| Event::default().comment("unserializable match")))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
