// SPDX-License-Identifier: MIT
//! The single-slot mailbox — core state and transition rules.
//!
//! One command slot plus the annotation overlay, behind one mutex. A publish
//! replaces the slot indivisibly; a consume runs its read-decide-mark step
//! under the same lock acquisition, so two polls racing on a fresh one-shot
//! command serialize and exactly one wins. Everything under the lock is O(1)
//! and never performs I/O.
//!
//! State lives for the process lifetime and is silently reset by a restart —
//! accepted limitation, there is no durable storage.

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;

use super::model::{delivery_of, Command, CommandParams, Delivery, KnownKind};
use super::overlay::AnnotationOverlay;

/// How long a published command stays eligible for delivery. Bounds how stale
/// a command an agent connecting late can receive.
pub const VALIDITY_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum MailboxError {
    /// Publish with a missing or empty kind. The slot is left untouched.
    #[error("missing action parameter")]
    InvalidCommand,
}

/// What a successful publish echoes back to the panel.
#[derive(Debug, Clone)]
pub struct PublishReceipt {
    pub kind: String,
    pub issued_at: u64,
    pub annotations: Map<String, Value>,
}

/// Result of one poll cycle against the mailbox.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// A not-yet-delivered command inside the validity window.
    Delivered {
        command: Command,
        annotations: Map<String, Value>,
    },
    /// Nothing actionable — empty slot, expired, or already consumed. Still
    /// carries the latched annotations so a poller always learns the current
    /// lock state.
    Idle {
        annotations: Map<String, Value>,
        now: u64,
    },
}

impl ConsumeOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ConsumeOutcome::Delivered { .. })
    }
}

/// Mailbox fields the status endpoint reports.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub last_kind: Option<String>,
    /// Publication time of the current command, 0 when the slot is empty.
    pub last_time: u64,
    pub input_locked: bool,
}

#[derive(Default)]
struct MailboxInner {
    slot: Option<Command>,
    overlay: AnnotationOverlay,
}

/// Single-slot command mailbox shared by every HTTP handler.
pub struct Mailbox {
    inner: Mutex<MailboxInner>,
}

impl Mailbox {
    pub fn new() -> Self {
        Mailbox {
            inner: Mutex::new(MailboxInner::default()),
        }
    }

    /// Store a new command, unconditionally replacing the previous one.
    ///
    /// An unconsumed predecessor is dropped — last write wins. Annotations
    /// derived from `kind` are merged into the overlay before the slot is
    /// replaced; both happen under one lock acquisition so no reader observes
    /// the new overlay with the old command or vice versa.
    pub async fn publish(
        &self,
        kind: &str,
        params: CommandParams,
        now: u64,
    ) -> Result<PublishReceipt, MailboxError> {
        if kind.is_empty() {
            return Err(MailboxError::InvalidCommand);
        }

        let mut inner = self.inner.lock().await;
        if let Some(known) = KnownKind::parse(kind) {
            inner.overlay.merge(known.annotations(now));
        }
        inner.slot = Some(Command {
            kind: kind.to_string(),
            params,
            issued_at: now,
            consumed: false,
        });
        Ok(PublishReceipt {
            kind: kind.to_string(),
            issued_at: now,
            annotations: inner.overlay.snapshot(),
        })
    }

    /// One poll cycle: deliver the slot if it is fresh and actionable,
    /// otherwise report idle with the current annotations.
    ///
    /// Fresh means: slot occupied, `now - issued_at` inside the validity
    /// window, not yet consumed. One-shot kinds are marked consumed in the
    /// same critical section as the freshness check; sticky kinds stay
    /// unconsumed and re-deliver on every poll until superseded or expired.
    pub async fn consume(&self, now: u64) -> ConsumeOutcome {
        let mut inner = self.inner.lock().await;
        let MailboxInner { slot, overlay } = &mut *inner;

        if let Some(command) = slot {
            let age = now.saturating_sub(command.issued_at);
            if !command.consumed && age < VALIDITY_WINDOW_MS {
                if delivery_of(&command.kind) == Delivery::OneShot {
                    command.consumed = true;
                }
                return ConsumeOutcome::Delivered {
                    command: command.clone(),
                    annotations: overlay.snapshot(),
                };
            }
        }
        ConsumeOutcome::Idle {
            annotations: overlay.snapshot(),
            now,
        }
    }

    /// Mailbox summary for the status endpoint. `input_locked` is read from
    /// the overlay, not the slot, so it survives unrelated commands.
    pub async fn status(&self) -> StatusSnapshot {
        let inner = self.inner.lock().await;
        StatusSnapshot {
            last_kind: inner.slot.as_ref().map(|c| c.kind.clone()),
            last_time: inner.slot.as_ref().map_or(0, |c| c.issued_at),
            input_locked: inner.overlay.input_locked(),
        }
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Mailbox::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const T0: u64 = 1_700_000_000_000;

    fn params() -> CommandParams {
        CommandParams::default()
    }

    #[tokio::test]
    async fn one_shot_delivers_exactly_once() {
        let mailbox = Mailbox::new();
        mailbox.publish("play", params(), T0).await.unwrap();

        let first = mailbox.consume(T0 + 10).await;
        assert!(first.is_delivered());
        let second = mailbox.consume(T0 + 20).await;
        assert!(!second.is_delivered());
    }

    #[tokio::test]
    async fn republish_rearms_a_consumed_slot() {
        let mailbox = Mailbox::new();
        mailbox.publish("play", params(), T0).await.unwrap();
        mailbox.consume(T0).await;

        mailbox.publish("pause", params(), T0 + 100).await.unwrap();
        match mailbox.consume(T0 + 200).await {
            ConsumeOutcome::Delivered { command, .. } => assert_eq!(command.kind, "pause"),
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sticky_kind_redelivers_until_superseded() {
        let mailbox = Mailbox::new();
        let p = CommandParams {
            value: Some(json!("0.5")),
            ..CommandParams::default()
        };
        mailbox.publish("volume", p, T0).await.unwrap();

        for i in 0..5 {
            match mailbox.consume(T0 + i * 1_000).await {
                ConsumeOutcome::Delivered { command, .. } => {
                    assert_eq!(command.kind, "volume");
                    assert_eq!(command.params.value, Some(json!("0.5")));
                }
                other => panic!("poll {i}: expected delivery, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn command_expires_at_the_validity_window() {
        let mailbox = Mailbox::new();
        mailbox.publish("play", params(), T0).await.unwrap();
        // age == window is already stale
        assert!(!mailbox.consume(T0 + VALIDITY_WINDOW_MS).await.is_delivered());

        let mailbox = Mailbox::new();
        mailbox.publish("play", params(), T0).await.unwrap();
        assert!(mailbox.consume(T0 + VALIDITY_WINDOW_MS - 1).await.is_delivered());
    }

    #[tokio::test]
    async fn sticky_command_also_ages_out() {
        let mailbox = Mailbox::new();
        mailbox.publish("volume", params(), T0).await.unwrap();
        assert!(mailbox.consume(T0 + VALIDITY_WINDOW_MS - 1).await.is_delivered());
        assert!(!mailbox.consume(T0 + VALIDITY_WINDOW_MS + 1).await.is_delivered());
    }

    #[tokio::test]
    async fn last_write_wins_before_consumption() {
        let mailbox = Mailbox::new();
        mailbox.publish("play", params(), T0).await.unwrap();
        mailbox.publish("pause", params(), T0 + 1).await.unwrap();

        match mailbox.consume(T0 + 2).await {
            ConsumeOutcome::Delivered { command, .. } => assert_eq!(command.kind, "pause"),
            other => panic!("expected delivery, got {other:?}"),
        }
        // "play" is unrecoverable.
        assert!(!mailbox.consume(T0 + 3).await.is_delivered());
    }

    #[tokio::test]
    async fn lock_annotation_survives_unrelated_commands() {
        let mailbox = Mailbox::new();
        mailbox.publish("lockInputs", params(), T0).await.unwrap();
        mailbox.publish("play", params(), T0 + 10).await.unwrap();

        match mailbox.consume(T0 + 20).await {
            ConsumeOutcome::Delivered { annotations, .. } => {
                assert_eq!(annotations.get("inputLocked"), Some(&json!(true)));
                assert_eq!(annotations.get("lockTime"), Some(&json!(T0)));
            }
            other => panic!("expected delivery, got {other:?}"),
        }

        // The idle branch still reports the latched state.
        match mailbox.consume(T0 + 30).await {
            ConsumeOutcome::Idle { annotations, .. } => {
                assert_eq!(annotations.get("inputLocked"), Some(&json!(true)));
            }
            other => panic!("expected idle, got {other:?}"),
        }
        assert!(mailbox.status().await.input_locked);

        mailbox.publish("unlockInputs", params(), T0 + 40).await.unwrap();
        assert!(!mailbox.status().await.input_locked);
    }

    #[tokio::test]
    async fn invalid_publish_leaves_the_slot_untouched() {
        let mailbox = Mailbox::new();
        mailbox.publish("play", params(), T0).await.unwrap();

        let err = mailbox.publish("", params(), T0 + 1).await.unwrap_err();
        assert!(matches!(err, MailboxError::InvalidCommand));

        match mailbox.consume(T0 + 2).await {
            ConsumeOutcome::Delivered { command, .. } => assert_eq!(command.kind, "play"),
            other => panic!("prior command should still deliver, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_mailbox_reports_idle_with_zero_timestamp_status() {
        let mailbox = Mailbox::new();
        assert!(!mailbox.consume(T0).await.is_delivered());

        let status = mailbox.status().await;
        assert_eq!(status.last_kind, None);
        assert_eq!(status.last_time, 0);
        assert!(!status.input_locked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn racing_polls_deliver_a_one_shot_exactly_once() {
        use std::sync::Arc;

        let mailbox = Arc::new(Mailbox::new());
        mailbox.publish("close", params(), T0).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let mailbox = Arc::clone(&mailbox);
            handles.push(tokio::spawn(
                async move { mailbox.consume(T0 + 5).await },
            ));
        }

        let mut delivered = 0;
        for handle in handles {
            if handle.await.unwrap().is_delivered() {
                delivered += 1;
            }
        }
        assert_eq!(delivered, 1, "exactly one racing poll must win");
    }
}
