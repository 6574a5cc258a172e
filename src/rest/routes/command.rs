// rest/routes/command.rs — mailbox publish + poll routes.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::mailbox::{CommandParams, ConsumeOutcome, MailboxError};
use crate::{now_ms, AppContext};

/// POST /api/setAction — publish a command.
///
/// The kind comes from the `action` request header when present, else from
/// the body's `action` field; the header wins when both are set. The body is
/// optional and tolerated when it isn't valid JSON — agents only need the
/// header channel.
pub async fn set_action(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };

    let kind = headers
        .get("action")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            body.get("action")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

    let Some(kind) = kind else {
        return missing_action(&body);
    };

    let params = CommandParams::from_body(&body);
    match ctx.mailbox.publish(&kind, params, now_ms()).await {
        Ok(receipt) => {
            info!(
                kind = %receipt.kind,
                timestamp = receipt.issued_at,
                "command stored"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!("Action \"{}\" received", receipt.kind),
                    "action": receipt.kind,
                    "timestamp": receipt.issued_at,
                    "metadata": receipt.annotations,
                })),
            )
        }
        Err(MailboxError::InvalidCommand) => missing_action(&body),
    }
}

/// GET /api/getAction — one poll cycle against the mailbox.
///
/// Always 200: an empty mailbox is a normal result, not an error. The idle
/// branch still carries the latched annotations so agents always see the
/// current input-lock state.
pub async fn get_action(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    match ctx.mailbox.consume(now_ms()).await {
        ConsumeOutcome::Delivered {
            command,
            annotations,
        } => Json(json!({
            "success": true,
            "action": command.kind,
            "url": command.params.url,
            "count": command.params.count,
            "value": command.params.value,
            "timestamp": command.issued_at,
            "metadata": annotations,
            "message": "New action available",
        })),
        ConsumeOutcome::Idle { annotations, now } => Json(json!({
            "success": true,
            "action": Value::Null,
            "message": "No pending action",
            "timestamp": now,
            "metadata": annotations,
        })),
    }
}

fn missing_action(body: &Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": "Missing action parameter",
            "received": body,
        })),
    )
}
