//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: Errors from session, customer and booking storage
//! - `DispatchError`: Errors from delivering a reply to the sender
//! - `NotifyError`: Errors from sending a clinic notification
//! - `BookingError`: Booking Recorder context
//! - `ConversationError`: High-level wrapper for context

use clinic_booking_core::{ClinicId, SessionId};
use std::fmt;

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested record does not exist.
    NotFound { entity: &'static str, key: String },
    /// The backing store could not be reached or rejected the query.
    Unavailable { reason: String },
    /// A stored row could not be decoded into a domain value.
    Corrupt { entity: &'static str, reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Unavailable { reason } => write!(f, "store unavailable: {reason}"),
            Self::Corrupt { entity, reason } => {
                write!(f, "corrupt {entity} record: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from the outbound reply channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The messaging platform answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The request never produced a response.
    Transport { reason: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, body } => {
                write!(f, "reply rejected with status {status}: {body}")
            }
            Self::Transport { reason } => write!(f, "reply transport failed: {reason}"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Errors from the clinic notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The relay answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The request never produced a response.
    Transport { reason: String },
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status, body } => {
                write!(f, "notification rejected with status {status}: {body}")
            }
            Self::Transport { reason } => {
                write!(f, "notification transport failed: {reason}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// Booking Recorder errors (use as context wrapper).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Inserting the booking row failed.
    InsertFailed { clinic_id: ClinicId, phone: String },
}

impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsertFailed { clinic_id, phone } => {
                write!(f, "failed to record booking for {phone} at {clinic_id}")
            }
        }
    }
}

impl std::error::Error for BookingError {}

/// High-level conversation errors.
///
/// Use these to add context when wrapping lower-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// Loading or creating the sender's session failed.
    SessionLookup { sender: String },
    /// Recording the inbound message id failed.
    Deduplication { sender: String, message_id: String },
    /// Persisting a computed transition failed.
    SessionUpdate { session_id: SessionId },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionLookup { sender } => {
                write!(f, "session lookup failed for sender {sender}")
            }
            Self::Deduplication { sender, message_id } => {
                write!(
                    f,
                    "failed to record message {message_id} for sender {sender}"
                )
            }
            Self::SessionUpdate { session_id } => {
                write!(f, "failed to persist session {session_id}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}
