//! Core domain types and utilities for the clinic-booking service.
//!
//! This crate provides the identifier types and the error-handling alias
//! shared by the conversation library and the webhook server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{BookingId, ClinicId, CustomerId, ParseIdError, SessionId};
