//! Per-user conversation history persistence.
//!
//! A small document store with three operations: get-or-create a user
//! record, append to a named array field, and clear a named array field.
//! Backed by an append-only JSONL op log with state derived by replay.

pub mod store;

// Re-export key types
pub use store::{HistoryError, HistoryStore};

/// Array field holding the conversation history
pub const MESSAGES_FIELD: &str = "messages";
