// SPDX-License-Identifier: MIT

pub mod config;
pub mod mailbox;
pub mod presence;
pub mod rest;

use std::sync::Arc;
use std::time::Instant;

use config::RelayConfig;
use mailbox::Mailbox;
use presence::Presence;

/// Shared application state passed to every REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<RelayConfig>,
    /// The single-slot command mailbox.
    pub mailbox: Arc<Mailbox>,
    /// Agent heartbeat tracker.
    pub presence: Arc<Presence>,
    /// Process start — used for the uptime field in status responses.
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(config: RelayConfig) -> Arc<Self> {
        Arc::new(AppContext {
            config: Arc::new(config),
            mailbox: Arc::new(Mailbox::new()),
            presence: Arc::new(Presence::new()),
            started_at: Instant::now(),
        })
    }
}

/// Current wall-clock time, milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
