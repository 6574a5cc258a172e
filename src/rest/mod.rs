// rest/mod.rs — Public REST API server.
//
// Axum HTTP server bridging the control panel and the polling tab agents.
// The panel and agents live on arbitrary origins, so CORS is wide open and
// pre-flight requests succeed trivially.
//
// Endpoints:
//   POST /api/setAction   — publish a command into the mailbox
//   GET  /api/getAction   — poll the mailbox for work
//   GET  /api/status      — server + agent liveness summary
//   POST /api/status      — agent heartbeat

pub mod routes;

use anyhow::Result;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("relay listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/setAction",
            post(routes::command::set_action)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/getAction",
            get(routes::command::get_action)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/status",
            get(routes::status::get_status)
                .post(routes::status::heartbeat)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(ctx)
}

/// Non-CORS OPTIONS requests get the same trivial 200 the CORS layer gives
/// pre-flights.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> (StatusCode, Json<Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// A panicking handler must not take the process down or leak a half-written
/// response; the mailbox mutex releases on unwind and state mutations are
/// single assignments, so the slot stays last-known-good.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(err = %detail, "request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error" })),
    )
        .into_response()
}
