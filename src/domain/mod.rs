//! Domain types for the voxbot relay.
//!
//! This module contains the core data structures:
//! - Messages: Role-tagged conversation entries and per-user records
//! - Voice: Voice requests and the in-flight transcode job state

pub mod message;
pub mod voice;

// Re-export commonly used types
pub use message::{ChatMessage, Role, UserRecord};
pub use voice::{JobState, TranscodeJob, VoiceRequest};
