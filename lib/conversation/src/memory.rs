//! In-process store implementations.
//!
//! These back single-instance deployments without a database and every
//! test in the workspace. State lives only as long as the process.

use crate::booking::{Booking, BookingRepository, Customer, CustomerRepository};
use crate::error::StoreError;
use crate::session::{Session, SessionStore, SessionUpdate};
use async_trait::async_trait;
use chrono::Utc;
use clinic_booking_core::{ClinicId, SessionId};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Sessions keyed by sender, with a reverse index from session id.
#[derive(Default)]
pub struct InMemorySessionStore {
    inner: Mutex<SessionMap>,
}

#[derive(Default)]
struct SessionMap {
    by_sender: HashMap<String, Session>,
    senders: HashMap<SessionId, String>,
}

impl SessionMap {
    fn get_mut(&mut self, id: SessionId) -> Result<&mut Session, StoreError> {
        let Self { by_sender, senders } = self;
        senders
            .get(&id)
            .and_then(|sender| by_sender.get_mut(sender))
            .ok_or_else(|| StoreError::NotFound {
                entity: "session",
                key: id.to_string(),
            })
    }
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored sessions.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_sender.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.by_sender.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, sender: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.inner.lock().await.by_sender.get(sender).cloned())
    }

    async fn create(&self, sender: &str, clinic_id: ClinicId) -> Result<Session, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.by_sender.get(sender) {
            return Ok(existing.clone());
        }

        let session = Session::new(sender, clinic_id);
        inner.senders.insert(session.id, sender.to_string());
        inner.by_sender.insert(sender.to_string(), session.clone());
        Ok(session)
    }

    async fn update(&self, id: SessionId, update: &SessionUpdate) -> Result<(), StoreError> {
        self.inner.lock().await.get_mut(id)?.apply(update);
        Ok(())
    }

    async fn claim_message(&self, id: SessionId, message_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let session = inner.get_mut(id)?;
        if session.last_message_id.as_deref() == Some(message_id) {
            return Ok(false);
        }
        session.last_message_id = Some(message_id.to_string());
        session.updated_at = Utc::now();
        Ok(true)
    }
}

/// Customers keyed by phone.
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: Mutex<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_phone(&self, phone: &str) -> Option<Customer> {
        self.customers.lock().await.get(phone).cloned()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn upsert_by_phone(&self, phone: &str, name: &str) -> Result<Customer, StoreError> {
        let mut customers = self.customers.lock().await;
        let customer = customers
            .entry(phone.to_string())
            .and_modify(|c| {
                c.name = name.to_string();
                c.updated_at = Utc::now();
            })
            .or_insert_with(|| Customer::new(phone, name));
        Ok(customer.clone())
    }
}

/// Bookings in insertion order.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<Vec<Booking>>,
}

impl InMemoryBookingRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded booking.
    pub async fn all(&self) -> Vec<Booking> {
        self.bookings.lock().await.clone()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings.lock().await.push(booking.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Step;

    #[tokio::test]
    async fn create_returns_existing_session() {
        let store = InMemorySessionStore::new();
        let clinic = ClinicId::new();

        let first = store.create("15551234567", clinic).await.unwrap();
        let second = store.create("15551234567", ClinicId::new()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.clinic_id, clinic);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_unknown_session_is_not_found() {
        let store = InMemorySessionStore::new();
        let err = store
            .update(SessionId::new(), &SessionUpdate::step(Step::AskName))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn update_targets_session_by_id() {
        let store = InMemorySessionStore::new();
        let clinic = ClinicId::new();
        let jane = store.create("15551234567", clinic).await.unwrap();
        let john = store.create("15557654321", clinic).await.unwrap();

        store
            .update(john.id, &SessionUpdate::step(Step::AskName))
            .await
            .unwrap();

        let jane = store.get(&jane.sender).await.unwrap().expect("jane");
        let john = store.get(&john.sender).await.unwrap().expect("john");
        assert_eq!(jane.step, Step::Idle);
        assert_eq!(john.step, Step::AskName);
    }

    #[tokio::test]
    async fn claim_message_is_compare_and_set() {
        let store = InMemorySessionStore::new();
        let session = store.create("15551234567", ClinicId::new()).await.unwrap();

        assert!(store.claim_message(session.id, "wamid.1").await.unwrap());
        assert!(!store.claim_message(session.id, "wamid.1").await.unwrap());
        assert!(store.claim_message(session.id, "wamid.2").await.unwrap());
    }

    #[tokio::test]
    async fn customer_upsert_renames_existing() {
        let repo = InMemoryCustomerRepository::new();
        let first = repo.upsert_by_phone("15551234567", "Jane").await.unwrap();
        let second = repo.upsert_by_phone("15551234567", "Jane Doe").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Jane Doe");
    }
}
