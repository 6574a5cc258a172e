// SPDX-License-Identifier: MIT
//! Relay configuration — CLI flags and env vars layered over an optional TOML
//! file. Flags win over file values; file values win over defaults.

use serde::Deserialize;
use std::path::Path;

const DEFAULT_PORT: u16 = 4310;
// Agents poll from other machines, so the relay binds all interfaces by default.
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "pretty";

// ─── RelayConfigFile ──────────────────────────────────────────────────────────

/// Values accepted from a TOML config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfigFile {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub log: Option<String>,
    pub log_format: Option<String>,
}

// ─── RelayConfig ──────────────────────────────────────────────────────────────

/// Effective relay configuration after merging flags, file, and defaults.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub bind_address: String,
    /// Log level filter (trace, debug, info, warn, error).
    pub log: String,
    /// "pretty" or "json".
    pub log_format: String,
}

impl RelayConfig {
    pub fn new(
        port: Option<u16>,
        bind_address: Option<String>,
        log: Option<String>,
        log_format: Option<String>,
        file: RelayConfigFile,
    ) -> Self {
        RelayConfig {
            port: port.or(file.port).unwrap_or(DEFAULT_PORT),
            bind_address: bind_address
                .or(file.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            log: log.or(file.log).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: log_format
                .or(file.log_format)
                .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string()),
        }
    }

    /// Parse a TOML config file. An unreadable or malformed file falls back
    /// to defaults with a warning on stderr rather than refusing to start —
    /// this runs before logging is initialized.
    pub fn load_file(path: &Path) -> RelayConfigFile {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!(
                    "warning: could not read config file '{}': {e} — using defaults",
                    path.display()
                );
                return RelayConfigFile::default();
            }
        };
        match toml::from_str(&text) {
            Ok(file) => file,
            Err(e) => {
                eprintln!(
                    "warning: malformed config file '{}': {e} — using defaults",
                    path.display()
                );
                RelayConfigFile::default()
            }
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig::new(None, None, None, None, RelayConfigFile::default())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
