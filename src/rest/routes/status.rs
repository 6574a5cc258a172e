// rest/routes/status.rs — liveness query + agent heartbeat.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::{now_ms, AppContext};

/// GET /api/status — server + agent liveness summary.
///
/// `clients` is 1 iff any agent heartbeat arrived within the last 30 seconds;
/// agents are not individually identified. `inputLocked` reads the latched
/// overlay, so it survives commands published since the lock.
pub async fn get_status(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let now = now_ms();
    let mailbox = ctx.mailbox.status().await;
    let clients = if ctx.presence.active(now) { 1 } else { 0 };

    Json(json!({
        "server": "online",
        "clients": clients,
        "lastAction": mailbox.last_kind,
        "lastActionTime": mailbox.last_time,
        "inputLocked": mailbox.input_locked,
        "uptime": ctx.started_at.elapsed().as_secs(),
    }))
}

/// POST /api/status — agent heartbeat. Empty body, always succeeds.
pub async fn heartbeat(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let now = now_ms();
    ctx.presence.heartbeat(now);
    debug!(timestamp = now, "agent heartbeat");
    Json(json!({ "success": true, "timestamp": now }))
}
