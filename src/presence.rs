// SPDX-License-Identifier: MIT
//! Agent liveness — one process-wide heartbeat timestamp.
//!
//! Agents POST a heartbeat on their own poll cadence; the status endpoint
//! derives a single active/inactive bit from its recency. There is no
//! per-agent identity — simultaneous agents collapse into one liveness bit.

use std::sync::atomic::{AtomicU64, Ordering};

/// A heartbeat older than this marks the agent side inactive.
pub const HEARTBEAT_WINDOW_MS: u64 = 30_000;

/// Most recent heartbeat from any polling agent.
#[derive(Debug, Default)]
pub struct Presence {
    last_heartbeat: AtomicU64,
}

impl Presence {
    pub fn new() -> Self {
        Presence {
            last_heartbeat: AtomicU64::new(0),
        }
    }

    /// Record a heartbeat. Idempotent; always succeeds.
    pub fn heartbeat(&self, now: u64) {
        self.last_heartbeat.store(now, Ordering::Relaxed);
    }

    /// True when a heartbeat arrived within the last 30 seconds.
    pub fn active(&self, now: u64) -> bool {
        let last = self.last_heartbeat.load(Ordering::Relaxed);
        now.saturating_sub(last) < HEARTBEAT_WINDOW_MS
    }
}
