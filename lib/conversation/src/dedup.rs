//! Suppression of retried webhook deliveries.
//!
//! The message id is recorded *before* the turn is processed. A retry that
//! arrives while the first copy is still running therefore finds its id
//! already claimed and is dropped instead of racing the first delivery.

use crate::error::ConversationError;
use crate::session::{Session, SessionStore};
use clinic_booking_core::ClinicId;
use rootcause::prelude::*;
use std::sync::Arc;

/// Result of checking an inbound message against the sender's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// First sighting; the id is now recorded and the turn may proceed.
    Fresh(Session),
    /// Already processed; acknowledge without side effects.
    Duplicate,
}

/// Guards against re-processing a message id already seen for a sender.
#[derive(Clone)]
pub struct Deduplicator {
    sessions: Arc<dyn SessionStore>,
}

impl Deduplicator {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Loads (or lazily creates) the sender's session and claims `message_id`.
    pub async fn check(
        &self,
        sender: &str,
        clinic_id: ClinicId,
        message_id: &str,
    ) -> Result<Delivery, Report<ConversationError>> {
        let session = self
            .sessions
            .get_or_create(sender, clinic_id)
            .await
            .context(ConversationError::SessionLookup {
                sender: sender.to_string(),
            })?;

        if session.last_message_id.as_deref() == Some(message_id) {
            return Ok(Delivery::Duplicate);
        }

        let claimed = self
            .sessions
            .claim_message(session.id, message_id)
            .await
            .context(ConversationError::Deduplication {
                sender: sender.to_string(),
                message_id: message_id.to_string(),
            })?;

        if claimed {
            Ok(Delivery::Fresh(session))
        } else {
            Ok(Delivery::Duplicate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;

    #[tokio::test]
    async fn first_delivery_is_fresh_and_recorded() {
        let store = Arc::new(InMemorySessionStore::new());
        let dedup = Deduplicator::new(store.clone());
        let clinic = ClinicId::new();

        let delivery = dedup.check("15551234567", clinic, "wamid.1").await.unwrap();
        assert!(matches!(delivery, Delivery::Fresh(_)));

        let session = store.get("15551234567").await.unwrap().expect("created");
        assert_eq!(session.last_message_id.as_deref(), Some("wamid.1"));
        assert_eq!(session.clinic_id, clinic);
    }

    #[tokio::test]
    async fn repeated_id_is_duplicate() {
        let store = Arc::new(InMemorySessionStore::new());
        let dedup = Deduplicator::new(store);
        let clinic = ClinicId::new();

        dedup.check("15551234567", clinic, "wamid.1").await.unwrap();
        let again = dedup.check("15551234567", clinic, "wamid.1").await.unwrap();
        assert_eq!(again, Delivery::Duplicate);

        let next = dedup.check("15551234567", clinic, "wamid.2").await.unwrap();
        assert!(matches!(next, Delivery::Fresh(_)));
    }

    #[tokio::test]
    async fn same_id_for_other_sender_is_fresh() {
        let store = Arc::new(InMemorySessionStore::new());
        let dedup = Deduplicator::new(store);
        let clinic = ClinicId::new();

        dedup.check("15551234567", clinic, "wamid.1").await.unwrap();
        let other = dedup.check("15557654321", clinic, "wamid.1").await.unwrap();
        assert!(matches!(other, Delivery::Fresh(_)));
    }

    #[tokio::test]
    async fn concurrent_retries_admit_exactly_one() {
        let store = Arc::new(InMemorySessionStore::new());
        let dedup = Deduplicator::new(store);
        let clinic = ClinicId::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dedup = dedup.clone();
                tokio::spawn(async move { dedup.check("15551234567", clinic, "wamid.9").await })
            })
            .collect();

        let mut fresh = 0;
        for handle in handles {
            if let Delivery::Fresh(_) = handle.await.unwrap().unwrap() {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1);
    }
}
