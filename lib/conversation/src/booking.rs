//! Customers, bookings and the Booking Recorder.
//!
//! The recorder commits a confirmed draft in three independent, best-effort
//! steps: upsert the customer, insert the booking, notify the clinic. A
//! failed customer upsert leaves the booking unlinked rather than blocking
//! it, and the notification runs on its own task so a slow relay never holds
//! up the conversational turn.

use crate::error::{BookingError, NotifyError, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_booking_core::{BookingId, ClinicId, CustomerId};
use rootcause::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by the customer, awaiting the clinic.
    Pending,
}

impl BookingStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

/// A customer, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub phone: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[must_use]
    pub fn new(phone: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CustomerId::new(),
            phone: phone.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A confirmed appointment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub clinic_id: ClinicId,
    /// The linked customer, or `None` when the customer upsert failed.
    pub customer_id: Option<CustomerId>,
    pub service: String,
    pub date: String,
    pub time: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a pending booking from a completed draft.
    #[must_use]
    pub fn pending(draft: &BookingDraft, customer_id: Option<CustomerId>) -> Self {
        Self {
            id: BookingId::new(),
            clinic_id: draft.clinic_id,
            customer_id,
            service: draft.service.clone(),
            date: draft.date.clone(),
            time: draft.time.clone(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// The four collected fields plus who and where they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub sender: String,
    pub clinic_id: ClinicId,
    pub name: String,
    pub service: String,
    pub date: String,
    pub time: String,
}

/// Storage for customers.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Creates the customer for `phone`, or renames the existing one.
    async fn upsert_by_phone(&self, phone: &str, name: &str) -> Result<Customer, StoreError>;
}

/// Storage for bookings.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts a new booking.
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError>;
}

/// A human-readable alert for clinic staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient address.
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Builds the new-booking alert sent to `to`.
    #[must_use]
    pub fn new_booking(to: impl Into<String>, draft: &BookingDraft, booking: &Booking) -> Self {
        let subject = format!(
            "New booking: {} on {} at {}",
            booking.service, booking.date, booking.time
        );
        let body = format!(
            "A new appointment was requested over WhatsApp.\n\n\
             Name: {}\n\
             Phone: {}\n\
             Service: {}\n\
             Date: {}\n\
             Time: {}\n\
             Status: {}\n\n\
             Clinic: {}\n\
             Booking: {}\n",
            draft.name,
            draft.sender,
            booking.service,
            booking.date,
            booking.time,
            booking.status.as_str(),
            booking.clinic_id,
            booking.id,
        );
        Self {
            to: to.into(),
            subject,
            body,
        }
    }
}

/// Delivers notifications to clinic staff.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Commits confirmed bookings and alerts the clinic.
#[derive(Clone)]
pub struct BookingRecorder {
    customers: Arc<dyn CustomerRepository>,
    bookings: Arc<dyn BookingRepository>,
    notifier: Arc<dyn Notifier>,
    notify_to: String,
}

impl BookingRecorder {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        bookings: Arc<dyn BookingRepository>,
        notifier: Arc<dyn Notifier>,
        notify_to: impl Into<String>,
    ) -> Self {
        Self {
            customers,
            bookings,
            notifier,
            notify_to: notify_to.into(),
        }
    }

    /// Records a confirmed draft.
    ///
    /// Returns the stored booking together with the handle of the spawned
    /// notification task. Only a failed booking insert is an error; a failed
    /// customer upsert degrades to an unlinked booking.
    pub async fn record(
        &self,
        draft: &BookingDraft,
    ) -> Result<(Booking, JoinHandle<()>), Report<BookingError>> {
        let customer_id = match self
            .customers
            .upsert_by_phone(&draft.sender, &draft.name)
            .await
        {
            Ok(customer) => Some(customer.id),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    sender = %draft.sender,
                    "Customer upsert failed; recording booking without customer"
                );
                None
            }
        };

        let booking = Booking::pending(draft, customer_id);
        self.bookings
            .insert(&booking)
            .await
            .context(BookingError::InsertFailed {
                clinic_id: draft.clinic_id,
                phone: draft.sender.clone(),
            })?;

        tracing::info!(
            booking_id = %booking.id,
            clinic_id = %booking.clinic_id,
            customer_linked = customer_id.is_some(),
            "Booking recorded"
        );

        let notification = Notification::new_booking(&self.notify_to, draft, &booking);
        let notifier = Arc::clone(&self.notifier);
        let booking_id = booking.id;
        let handle = tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notification).await {
                tracing::error!(
                    error = %e,
                    booking_id = %booking_id,
                    "Failed to notify clinic of booking"
                );
            }
        });

        Ok((booking, handle))
    }
}
