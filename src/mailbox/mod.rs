// SPDX-License-Identifier: MIT
// Mailbox subsystem — the single-slot command relay core.
//
// Exposes:
//   - model    — Command, CommandParams, KnownKind, Delivery
//   - overlay  — AnnotationOverlay (latched key→value facts)
//   - slot     — Mailbox (publish/consume/status), outcomes, errors

pub mod model;
pub mod overlay;
pub mod slot;

pub use model::{delivery_of, Command, CommandParams, Delivery, KnownKind};
pub use overlay::AnnotationOverlay;
pub use slot::{
    ConsumeOutcome, Mailbox, MailboxError, PublishReceipt, StatusSnapshot, VALIDITY_WINDOW_MS,
};
