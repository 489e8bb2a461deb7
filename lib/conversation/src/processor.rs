//! One conversational turn, end to end.
//!
//! The processor:
//! 1. Claims the message id for the sender (duplicates stop here)
//! 2. Reloads the latest session row
//! 3. Computes the transition
//! 4. Persists it
//! 5. Records a confirmed booking, if the transition asks for one
//! 6. Hands the reply to the Dispatch Boundary on its own task
//!
//! Only a failure to load the session or record the message id aborts the
//! turn; every later failure is logged and the reply still goes out.

use crate::booking::BookingRecorder;
use crate::dedup::{Deduplicator, Delivery};
use crate::dispatch::{ReplySender, spawn_reply};
use crate::engine::{ConversationEngine, SideEffect};
use crate::error::ConversationError;
use crate::inbound::InboundMessage;
use crate::session::{SessionStore, Step};
use clinic_booking_core::{BookingId, ClinicId};
use rootcause::prelude::*;
use std::sync::Arc;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The message id was already processed; nothing was done.
    Duplicate,
    /// The turn ran and a reply was dispatched.
    Replied {
        /// The step the session moved to.
        step: Step,
        /// The reply text handed to the Dispatch Boundary.
        reply: String,
        /// The booking recorded on this turn, if any.
        booking: Option<BookingId>,
    },
}

/// Drives inbound messages through the booking conversation.
#[derive(Clone)]
pub struct MessageProcessor {
    clinic_id: ClinicId,
    sessions: Arc<dyn SessionStore>,
    dedup: Deduplicator,
    engine: ConversationEngine,
    recorder: BookingRecorder,
    replies: Arc<dyn ReplySender>,
}

impl MessageProcessor {
    pub fn new(
        clinic_id: ClinicId,
        sessions: Arc<dyn SessionStore>,
        engine: ConversationEngine,
        recorder: BookingRecorder,
        replies: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            clinic_id,
            dedup: Deduplicator::new(Arc::clone(&sessions)),
            sessions,
            engine,
            recorder,
            replies,
        }
    }

    /// Processes one inbound message.
    #[tracing::instrument(
        skip(self, message),
        fields(sender = %message.sender, message_id = %message.message_id)
    )]
    pub async fn process(
        &self,
        message: &InboundMessage,
    ) -> Result<TurnOutcome, Report<ConversationError>> {
        let claimed = self
            .dedup
            .check(&message.sender, self.clinic_id, &message.message_id)
            .await?;

        let Delivery::Fresh(claimed) = claimed else {
            tracing::info!("Duplicate delivery ignored");
            return Ok(TurnOutcome::Duplicate);
        };

        tracing::debug!(text = %message.text, "Processing message");

        let session = match self.sessions.get(&message.sender).await {
            Ok(Some(latest)) => latest,
            Ok(None) => claimed,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to reload session; using claimed copy");
                claimed
            }
        };

        let transition = self.engine.advance(&session, &message.text);
        let step = transition.update.step;

        if let Err(e) = self
            .sessions
            .update(session.id, &transition.update)
            .await
            .context(ConversationError::SessionUpdate {
                session_id: session.id,
            })
        {
            tracing::error!(error = %e, step = %step, "Failed to persist transition");
        }

        let booking = match transition.effect {
            Some(SideEffect::RecordBooking(draft)) => match self.recorder.record(&draft).await {
                Ok((booking, _notification)) => Some(booking.id),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to record booking");
                    None
                }
            },
            None => None,
        };

        tracing::info!(from = %session.step, to = %step, "Turn complete");

        spawn_reply(
            Arc::clone(&self.replies),
            message.sender.clone(),
            transition.reply.clone(),
        );

        Ok(TurnOutcome::Replied {
            step,
            reply: transition.reply,
            booking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{Notification, Notifier};
    use crate::error::{DispatchError, NotifyError, StoreError};
    use crate::memory::{InMemoryBookingRepository, InMemoryCustomerRepository, InMemorySessionStore};
    use crate::session::SessionUpdate;
    use crate::templates::Templates;
    use async_trait::async_trait;
    use clinic_booking_core::SessionId;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct ChannelSender(mpsc::UnboundedSender<(String, String)>);

    #[async_trait]
    impl ReplySender for ChannelSender {
        async fn send(&self, recipient: &str, body: &str) -> Result<(), DispatchError> {
            let _ = self.0.send((recipient.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    struct Harness {
        processor: MessageProcessor,
        sessions: Arc<InMemorySessionStore>,
        bookings: Arc<InMemoryBookingRepository>,
        replies: mpsc::UnboundedReceiver<(String, String)>,
        clinic_id: ClinicId,
    }

    impl Harness {
        fn with_sessions(sessions: Arc<dyn SessionStore>, memory: Arc<InMemorySessionStore>) -> Self {
            let bookings = Arc::new(InMemoryBookingRepository::new());
            let (tx, rx) = mpsc::unbounded_channel();
            let clinic_id = ClinicId::new();
            let recorder = BookingRecorder::new(
                Arc::new(InMemoryCustomerRepository::new()),
                bookings.clone(),
                Arc::new(NullNotifier),
                "front-desk@clinic.test",
            );
            let processor = MessageProcessor::new(
                clinic_id,
                sessions,
                ConversationEngine::new(Templates::new("Test Clinic")),
                recorder,
                Arc::new(ChannelSender(tx)),
            );
            Self {
                processor,
                sessions: memory,
                bookings,
                replies: rx,
                clinic_id,
            }
        }

        fn new() -> Self {
            let sessions = Arc::new(InMemorySessionStore::new());
            Self::with_sessions(sessions.clone(), sessions)
        }

        async fn send(&self, id: &str, text: &str) -> TurnOutcome {
            self.processor
                .process(&InboundMessage::new("15551234567", id, text))
                .await
                .expect("turn")
        }

        async fn next_reply(&mut self) -> (String, String) {
            tokio::time::timeout(Duration::from_secs(1), self.replies.recv())
                .await
                .expect("reply within timeout")
                .expect("channel open")
        }

        async fn session(&self) -> crate::session::Session {
            self.sessions
                .get("15551234567")
                .await
                .unwrap()
                .expect("session exists")
        }
    }

    #[tokio::test]
    async fn new_sender_greeting_gets_menu() {
        let mut h = Harness::new();

        let outcome = h.send("wamid.1", "hello").await;

        let menu = Templates::new("Test Clinic").main_menu();
        assert_eq!(
            outcome,
            TurnOutcome::Replied {
                step: Step::Idle,
                reply: menu.clone(),
                booking: None,
            }
        );
        assert_eq!(h.next_reply().await, ("15551234567".to_string(), menu));

        let session = h.session().await;
        assert_eq!(session.step, Step::Idle);
        assert!(session.draft_is_empty());
        assert_eq!(session.clinic_id, h.clinic_id);
    }

    #[tokio::test]
    async fn completed_flow_records_booking_and_resets() {
        let h = Harness::new();
        let steps = [
            ("wamid.1", "1", Step::AskName),
            ("wamid.2", "Jane Doe", Step::AskService),
            ("wamid.3", "Filler", Step::AskDate),
            ("wamid.4", "20 Feb", Step::AskTime),
            ("wamid.5", "10:00", Step::Confirm),
        ];
        for (id, text, expected) in steps {
            match h.send(id, text).await {
                TurnOutcome::Replied { step, .. } => assert_eq!(step, expected, "after {text}"),
                TurnOutcome::Duplicate => panic!("unexpected duplicate"),
            }
        }

        let at_confirm = h.session().await;
        assert_eq!(at_confirm.name.as_deref(), Some("Jane Doe"));
        assert_eq!(at_confirm.service.as_deref(), Some("Filler"));
        assert_eq!(at_confirm.date.as_deref(), Some("20 Feb"));
        assert_eq!(at_confirm.time.as_deref(), Some("10:00"));

        let outcome = h.send("wamid.6", "1").await;
        let TurnOutcome::Replied { step, booking, .. } = outcome else {
            panic!("expected reply");
        };
        assert_eq!(step, Step::Idle);

        let bookings = h.bookings.all().await;
        assert_eq!(bookings.len(), 1);
        let recorded = &bookings[0];
        assert_eq!(booking, Some(recorded.id));
        assert_eq!(recorded.clinic_id, h.clinic_id);
        assert_eq!(recorded.service, "Filler");
        assert_eq!(recorded.date, "20 Feb");
        assert_eq!(recorded.time, "10:00");
        assert_eq!(recorded.status.as_str(), "pending");
        assert!(recorded.customer_id.is_some());

        let session = h.session().await;
        assert_eq!(session.step, Step::Idle);
        assert!(session.draft_is_empty());
    }

    #[tokio::test]
    async fn duplicate_confirmation_books_once() {
        let mut h = Harness::new();
        for (i, text) in ["1", "Jane Doe", "Filler", "20 Feb", "10:00"].iter().enumerate() {
            h.send(&format!("wamid.{i}"), text).await;
            h.next_reply().await;
        }

        let first = h.send("wamid.confirm", "1").await;
        let retry = h.send("wamid.confirm", "1").await;

        assert!(matches!(first, TurnOutcome::Replied { booking: Some(_), .. }));
        assert_eq!(retry, TurnOutcome::Duplicate);
        assert_eq!(h.bookings.all().await.len(), 1);

        h.next_reply().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.replies.try_recv().is_err(), "retry must not send a reply");
    }

    #[tokio::test]
    async fn duplicate_does_not_transition() {
        let h = Harness::new();
        h.send("wamid.1", "1").await;
        assert_eq!(h.session().await.step, Step::AskName);

        let retry = h.send("wamid.1", "1").await;

        assert_eq!(retry, TurnOutcome::Duplicate);
        let session = h.session().await;
        assert_eq!(session.step, Step::AskName);
        assert!(session.name.is_none());
    }

    #[tokio::test]
    async fn cancel_at_confirm_creates_no_booking() {
        let mut h = Harness::new();
        for (i, text) in ["1", "Jane Doe", "Filler", "20 Feb", "10:00"].iter().enumerate() {
            h.send(&format!("wamid.{i}"), text).await;
            h.next_reply().await;
        }

        h.send("wamid.cancel", "2").await;

        let (_, reply) = h.next_reply().await;
        assert_eq!(reply, Templates::new("Test Clinic").cancelled());
        assert!(h.bookings.all().await.is_empty());
        let session = h.session().await;
        assert_eq!(session.step, Step::Idle);
        assert!(session.draft_is_empty());
    }

    #[tokio::test]
    async fn unrecognized_confirmation_reprompts() {
        let mut h = Harness::new();
        for (i, text) in ["1", "Jane Doe", "Filler", "20 Feb", "10:00"].iter().enumerate() {
            h.send(&format!("wamid.{i}"), text).await;
            h.next_reply().await;
        }

        h.send("wamid.maybe", "maybe").await;

        let (_, reply) = h.next_reply().await;
        assert_eq!(reply, Templates::new("Test Clinic").confirm_reprompt());
        assert!(h.bookings.all().await.is_empty());
        assert_eq!(h.session().await.step, Step::Confirm);
    }

    #[tokio::test]
    async fn menu_twice_is_idempotent() {
        let h = Harness::new();
        h.send("wamid.1", "1").await;
        h.send("wamid.2", "Jane Doe").await;

        let first = h.send("wamid.3", "menu").await;
        let after_first = h.session().await;
        let second = h.send("wamid.4", "Menu").await;
        let after_second = h.session().await;

        assert_eq!(first, second);
        assert_eq!(after_first.step, Step::Idle);
        assert!(after_first.draft_is_empty());
        assert_eq!(after_second.step, after_first.step);
        assert_eq!(after_second.name, after_first.name);
    }

    /// Fails every `update` but otherwise delegates to an in-memory store.
    struct ReadOnlySessions(Arc<InMemorySessionStore>);

    #[async_trait]
    impl SessionStore for ReadOnlySessions {
        async fn get(&self, sender: &str) -> Result<Option<crate::session::Session>, StoreError> {
            self.0.get(sender).await
        }

        async fn create(
            &self,
            sender: &str,
            clinic_id: ClinicId,
        ) -> Result<crate::session::Session, StoreError> {
            self.0.create(sender, clinic_id).await
        }

        async fn update(&self, _id: SessionId, _update: &SessionUpdate) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                reason: "read-only replica".to_string(),
            })
        }

        async fn claim_message(&self, id: SessionId, message_id: &str) -> Result<bool, StoreError> {
            self.0.claim_message(id, message_id).await
        }
    }

    #[tokio::test]
    async fn update_failure_still_replies() {
        let memory = Arc::new(InMemorySessionStore::new());
        let mut h = Harness::with_sessions(Arc::new(ReadOnlySessions(memory.clone())), memory);

        let outcome = h.send("wamid.1", "1").await;

        assert!(matches!(outcome, TurnOutcome::Replied { step: Step::AskName, .. }));
        let (_, reply) = h.next_reply().await;
        assert_eq!(reply, Templates::new("Test Clinic").ask_name());
        assert_eq!(h.session().await.step, Step::Idle);
    }

    /// Moves the session to `AskDate` right after a successful claim, as a
    /// concurrent writer would.
    struct AdvancingSessions(Arc<InMemorySessionStore>);

    #[async_trait]
    impl SessionStore for AdvancingSessions {
        async fn get(&self, sender: &str) -> Result<Option<crate::session::Session>, StoreError> {
            self.0.get(sender).await
        }

        async fn create(
            &self,
            sender: &str,
            clinic_id: ClinicId,
        ) -> Result<crate::session::Session, StoreError> {
            self.0.create(sender, clinic_id).await
        }

        async fn update(&self, id: SessionId, update: &SessionUpdate) -> Result<(), StoreError> {
            self.0.update(id, update).await
        }

        async fn claim_message(&self, id: SessionId, message_id: &str) -> Result<bool, StoreError> {
            let claimed = self.0.claim_message(id, message_id).await?;
            if claimed {
                self.0.update(id, &SessionUpdate::step(Step::AskDate)).await?;
            }
            Ok(claimed)
        }
    }

    #[tokio::test]
    async fn transition_follows_reloaded_session() {
        let memory = Arc::new(InMemorySessionStore::new());
        let h = Harness::with_sessions(Arc::new(AdvancingSessions(memory.clone())), memory);

        let outcome = h.send("wamid.1", "20 Feb").await;

        assert!(matches!(outcome, TurnOutcome::Replied { step: Step::AskTime, .. }));
        let session = h.session().await;
        assert_eq!(session.step, Step::AskTime);
        assert_eq!(session.date.as_deref(), Some("20 Feb"));
    }
}
