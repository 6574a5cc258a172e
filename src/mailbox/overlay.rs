// SPDX-License-Identifier: MIT
//! Annotation overlay — latched key→value facts with per-key last-writer-wins.
//!
//! Entries are merged in at publish time and surfaced on every read, even when
//! there is no new command to deliver. A publish that derives no entries
//! leaves prior entries untouched, so the lock state set by `lockInputs`
//! survives any number of unrelated commands until `unlockInputs` overwrites
//! that key.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct AnnotationOverlay {
    entries: Map<String, Value>,
}

impl AnnotationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge entries into the overlay. Existing keys are overwritten; keys
    /// not named are untouched.
    pub fn merge(&mut self, entries: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in entries {
            self.entries.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Current overlay contents, as returned in the `metadata` wire field.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.entries.clone()
    }

    /// The latched input-lock flag; false until a lock command sets it.
    pub fn input_locked(&self) -> bool {
        self.entries
            .get("inputLocked")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn empty_overlay_reports_unlocked() {
        assert!(!AnnotationOverlay::new().input_locked());
        assert!(AnnotationOverlay::new().snapshot().is_empty());
    }

    #[test]
    fn merge_with_no_entries_changes_nothing() {
        let mut overlay = AnnotationOverlay::new();
        overlay.merge([("inputLocked".to_string(), json!(true))]);
        overlay.merge([]);
        assert!(overlay.input_locked());
    }

    #[test]
    fn later_write_overwrites_only_its_key() {
        let mut overlay = AnnotationOverlay::new();
        overlay.merge([
            ("inputLocked".to_string(), json!(true)),
            ("lockTime".to_string(), json!(100)),
        ]);
        overlay.merge([("inputLocked".to_string(), json!(false))]);
        assert!(!overlay.input_locked());
        assert_eq!(overlay.get("lockTime"), Some(&json!(100)));
    }

    #[test]
    fn non_boolean_lock_value_reads_as_unlocked() {
        let mut overlay = AnnotationOverlay::new();
        overlay.merge([("inputLocked".to_string(), json!("yes"))]);
        assert!(!overlay.input_locked());
    }

    proptest! {
        // Per-key last-writer-wins: after any merge sequence, each key holds
        // the value of its final write.
        #[test]
        fn last_writer_wins_per_key(writes in prop::collection::vec(
            (prop::sample::select(vec!["a", "b", "c"]), any::<i64>()),
            0..32,
        )) {
            let mut overlay = AnnotationOverlay::new();
            for (key, value) in &writes {
                overlay.merge([(key.to_string(), json!(value))]);
            }
            for key in ["a", "b", "c"] {
                let expected = writes.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| json!(v));
                prop_assert_eq!(overlay.get(key).cloned(), expected);
            }
        }
    }
}
