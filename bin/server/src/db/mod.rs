//! Database repositories for the clinic-booking server.
//!
//! This module provides Postgres implementations of the conversation
//! stores:
//! - Conversation sessions
//! - Customers and bookings

pub mod booking;
pub mod session;

pub use booking::{BookingRepository, CustomerRepository};
pub use session::SessionRepository;

use clinic_booking_conversation::StoreError;

/// Maps a driver error onto the store taxonomy.
fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::RowNotFound => StoreError::NotFound {
            entity: "row",
            key: String::new(),
        },
        sqlx::Error::ColumnDecode { index, source } => StoreError::Corrupt {
            entity: "row",
            reason: format!("column {index}: {source}"),
        },
        other => StoreError::Unavailable {
            reason: other.to_string(),
        },
    }
}
