//! Booking conversation core for the clinic-booking service.
//!
//! This crate provides:
//!
//! - **Session Store**: Durable per-sender conversation state
//! - **Deduplicator**: Exactly-once processing of retried deliveries
//! - **Conversation Engine**: The booking state machine
//! - **Booking Recorder**: Customer/booking persistence and clinic alerts
//! - **Message Processor**: One inbound message, end to end

pub mod booking;
pub mod dedup;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod inbound;
pub mod memory;
pub mod processor;
pub mod session;
pub mod templates;

pub use booking::{
    Booking, BookingDraft, BookingRecorder, BookingRepository, BookingStatus, Customer,
    CustomerRepository, Notification, Notifier,
};
pub use dedup::{Deduplicator, Delivery};
pub use dispatch::ReplySender;
pub use engine::{ConversationEngine, SideEffect, Transition};
pub use error::{BookingError, ConversationError, DispatchError, NotifyError, StoreError};
pub use inbound::{InboundMessage, WebhookPayload};
pub use memory::{InMemoryBookingRepository, InMemoryCustomerRepository, InMemorySessionStore};
pub use processor::{MessageProcessor, TurnOutcome};
pub use session::{DraftChange, DraftField, Session, SessionStore, SessionUpdate, Step};
pub use templates::Templates;
