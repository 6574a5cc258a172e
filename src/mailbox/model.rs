// SPDX-License-Identifier: MIT
// Mailbox data model — commands, sparse parameters, delivery semantics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Command ──────────────────────────────────────────────────────────────────

/// The command occupying the mailbox slot.
///
/// Published by the control panel, retrieved by tab agents polling the relay.
/// Only the latest publish survives; there is no queue and no delivery
/// guarantee beyond "latest wins".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Free-form token naming the operation ("play", "open", "lockInputs", …).
    pub kind: String,
    /// Sparse per-kind payload. Fields irrelevant to `kind` stay `None`.
    #[serde(flatten)]
    pub params: CommandParams,
    /// Publication time, milliseconds since the Unix epoch.
    pub issued_at: u64,
    /// True once a one-shot delivery has been acknowledged by a poll.
    pub consumed: bool,
}

/// Optional payload fields carried alongside a command kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandParams {
    /// Target URL for tab-opening kinds.
    pub url: Option<String>,
    /// Number of tabs to act on.
    pub count: Option<i64>,
    /// Passthrough scalar for continuously adjustable kinds (volume level).
    pub value: Option<Value>,
}

impl CommandParams {
    /// Extract the sparse params from a publish request body.
    ///
    /// `count` may arrive as a JSON number or an integer-parsable string —
    /// panel sliders send strings. Anything else stays `None`.
    pub fn from_body(body: &Value) -> CommandParams {
        CommandParams {
            url: body.get("url").and_then(Value::as_str).map(str::to_string),
            count: body.get("count").and_then(coerce_count),
            value: body.get("value").filter(|v| !v.is_null()).cloned(),
        }
    }
}

fn coerce_count(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ─── Kind classification ──────────────────────────────────────────────────────

/// How a command kind behaves once delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Fires a discrete action exactly once per publish.
    OneShot,
    /// Represents a live value; re-delivered on every poll until superseded
    /// or expired.
    Sticky,
}

/// Command kinds the relay knows about.
///
/// The wire keeps `kind` as a free-form token so a new panel button doesn't
/// need a relay release; unknown tokens behave as one-shot commands with no
/// derived annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownKind {
    Play,
    Pause,
    Mute,
    Unmute,
    Open,
    Close,
    LockInputs,
    UnlockInputs,
    LockScreen,
    Volume,
    SysVolume,
}

impl KnownKind {
    pub fn parse(token: &str) -> Option<KnownKind> {
        match token {
            "play" => Some(KnownKind::Play),
            "pause" => Some(KnownKind::Pause),
            "mute" => Some(KnownKind::Mute),
            "unmute" => Some(KnownKind::Unmute),
            "open" => Some(KnownKind::Open),
            "close" => Some(KnownKind::Close),
            "lockInputs" => Some(KnownKind::LockInputs),
            "unlockInputs" => Some(KnownKind::UnlockInputs),
            "lockScreen" => Some(KnownKind::LockScreen),
            "volume" => Some(KnownKind::Volume),
            "sysvolume" => Some(KnownKind::SysVolume),
            _ => None,
        }
    }

    pub fn delivery(self) -> Delivery {
        match self {
            KnownKind::Volume | KnownKind::SysVolume => Delivery::Sticky,
            _ => Delivery::OneShot,
        }
    }

    /// Overlay entries latched when a command of this kind is published.
    ///
    /// Lock state must stay visible to agents across unrelated commands, so
    /// these land in the annotation overlay rather than on the command.
    pub fn annotations(self, issued_at: u64) -> Vec<(String, Value)> {
        match self {
            KnownKind::LockInputs => vec![
                ("inputLocked".to_string(), Value::Bool(true)),
                ("lockTime".to_string(), Value::from(issued_at)),
            ],
            KnownKind::UnlockInputs => vec![("inputLocked".to_string(), Value::Bool(false))],
            _ => Vec::new(),
        }
    }
}

/// Delivery semantics for an arbitrary wire token.
pub fn delivery_of(kind: &str) -> Delivery {
    KnownKind::parse(kind).map_or(Delivery::OneShot, KnownKind::delivery)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn volume_kinds_are_sticky() {
        assert_eq!(delivery_of("volume"), Delivery::Sticky);
        assert_eq!(delivery_of("sysvolume"), Delivery::Sticky);
    }

    #[test]
    fn discrete_kinds_are_one_shot() {
        for kind in ["play", "pause", "open", "close", "lockScreen"] {
            assert_eq!(delivery_of(kind), Delivery::OneShot, "{kind}");
        }
    }

    #[test]
    fn unknown_kinds_default_to_one_shot() {
        assert_eq!(delivery_of("reboot"), Delivery::OneShot);
        assert!(KnownKind::parse("reboot").is_none());
    }

    #[test]
    fn lock_inputs_latches_lock_state_and_time() {
        let entries = KnownKind::LockInputs.annotations(1234);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ("inputLocked".to_string(), json!(true)));
        assert_eq!(entries[1], ("lockTime".to_string(), json!(1234)));
    }

    #[test]
    fn unlock_inputs_latches_only_the_flag() {
        let entries = KnownKind::UnlockInputs.annotations(99);
        assert_eq!(entries, vec![("inputLocked".to_string(), json!(false))]);
    }

    #[test]
    fn plain_kinds_derive_no_annotations() {
        assert!(KnownKind::Play.annotations(0).is_empty());
        assert!(KnownKind::Volume.annotations(0).is_empty());
    }

    #[test]
    fn params_from_body_extracts_sparse_fields() {
        let body = json!({ "action": "open", "url": "https://example.com/w", "count": 10 });
        let params = CommandParams::from_body(&body);
        assert_eq!(params.url.as_deref(), Some("https://example.com/w"));
        assert_eq!(params.count, Some(10));
        assert_eq!(params.value, None);
    }

    #[test]
    fn count_coerces_from_numeric_string() {
        let params = CommandParams::from_body(&json!({ "count": "25" }));
        assert_eq!(params.count, Some(25));
    }

    #[test]
    fn unparsable_count_stays_absent() {
        let params = CommandParams::from_body(&json!({ "count": "lots" }));
        assert_eq!(params.count, None);
    }

    #[test]
    fn value_passes_through_untouched() {
        let params = CommandParams::from_body(&json!({ "value": "0.5" }));
        assert_eq!(params.value, Some(json!("0.5")));
        let params = CommandParams::from_body(&json!({ "value": 0.5 }));
        assert_eq!(params.value, Some(json!(0.5)));
    }
}
