//! Per-sender conversation sessions.
//!
//! A session records where a sender is in the booking pipeline, the draft
//! fields collected so far, and the id of the last inbound message that was
//! processed for them. Sessions are created lazily on first contact and are
//! never deleted; a finished or abandoned booking resets them to `Idle`.

use crate::booking::BookingDraft;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_booking_core::{ClinicId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The sender's position in the booking pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// No booking in progress; the main menu applies.
    Idle,
    /// Waiting for the customer's full name.
    AskName,
    /// Waiting for the treatment or service.
    AskService,
    /// Waiting for the preferred date.
    AskDate,
    /// Waiting for the preferred time.
    AskTime,
    /// Waiting for the customer to confirm or cancel the summary.
    Confirm,
}

impl Step {
    /// All steps, in pipeline order.
    pub const ALL: [Step; 6] = [
        Self::Idle,
        Self::AskName,
        Self::AskService,
        Self::AskDate,
        Self::AskTime,
        Self::Confirm,
    ];

    /// Returns the stored representation of the step.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AskName => "ask_name",
            Self::AskService => "ask_service",
            Self::AskDate => "ask_date",
            Self::AskTime => "ask_time",
            Self::Confirm => "confirm",
        }
    }

    /// Parses the stored representation of a step.
    ///
    /// Unknown values are rejected rather than mapped to a default so that a
    /// corrupt row never silently restarts a conversation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.as_str() == value)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the free-text fields collected while booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Service,
    Date,
    Time,
}

/// How a transition changes the draft fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftChange {
    /// Leave every draft field as it is.
    Keep,
    /// Store a value in one field.
    Set(DraftField, String),
    /// Clear every draft field.
    Clear,
}

/// The persisted part of a transition: the next step plus the draft change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    /// The step the session moves to.
    pub step: Step,
    /// The change to the draft fields.
    pub draft: DraftChange,
}

impl SessionUpdate {
    /// Moves to `step` without touching the draft.
    #[must_use]
    pub fn step(step: Step) -> Self {
        Self {
            step,
            draft: DraftChange::Keep,
        }
    }

    /// Moves to `step` and stores `value` in `field`.
    #[must_use]
    pub fn set(step: Step, field: DraftField, value: impl Into<String>) -> Self {
        Self {
            step,
            draft: DraftChange::Set(field, value.into()),
        }
    }

    /// Returns to `Idle` with every draft field cleared.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            step: Step::Idle,
            draft: DraftChange::Clear,
        }
    }
}

/// A per-sender conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// Stable identifier of the remote party (their phone number).
    pub sender: String,
    /// The clinic this conversation books into.
    pub clinic_id: ClinicId,
    /// Current position in the booking pipeline.
    pub step: Step,
    pub name: Option<String>,
    pub service: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    /// The most recently processed inbound message id.
    pub last_message_id: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last written.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an idle session with no draft fields.
    #[must_use]
    pub fn new(sender: impl Into<String>, clinic_id: ClinicId) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            sender: sender.into(),
            clinic_id,
            step: Step::Idle,
            name: None,
            service: None,
            date: None,
            time: None,
            last_message_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a transition in place.
    pub fn apply(&mut self, update: &SessionUpdate) {
        self.step = update.step;
        match &update.draft {
            DraftChange::Keep => {}
            DraftChange::Set(field, value) => {
                let slot = match field {
                    DraftField::Name => &mut self.name,
                    DraftField::Service => &mut self.service,
                    DraftField::Date => &mut self.date,
                    DraftField::Time => &mut self.time,
                };
                *slot = Some(value.clone());
            }
            DraftChange::Clear => {
                self.name = None;
                self.service = None;
                self.date = None;
                self.time = None;
            }
        }
        self.updated_at = Utc::now();
    }

    /// Returns true when no draft field is populated.
    #[must_use]
    pub fn draft_is_empty(&self) -> bool {
        self.name.is_none() && self.service.is_none() && self.date.is_none() && self.time.is_none()
    }

    /// Builds the booking draft, if all four fields have been collected.
    #[must_use]
    pub fn draft(&self) -> Option<BookingDraft> {
        Some(BookingDraft {
            sender: self.sender.clone(),
            clinic_id: self.clinic_id,
            name: self.name.clone()?,
            service: self.service.clone()?,
            date: self.date.clone()?,
            time: self.time.clone()?,
        })
    }
}

/// Durable keyed storage for sessions.
///
/// Reads always return the latest stored row; callers must not rely on an
/// earlier copy when making a decision.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Gets the session for a sender, if one exists.
    async fn get(&self, sender: &str) -> Result<Option<Session>, StoreError>;

    /// Creates an idle session for a sender.
    ///
    /// Two callers may race to create the same sender's session; both must
    /// receive the single row that won.
    async fn create(&self, sender: &str, clinic_id: ClinicId) -> Result<Session, StoreError>;

    /// Persists a transition for a session.
    async fn update(&self, id: SessionId, update: &SessionUpdate) -> Result<(), StoreError>;

    /// Records `message_id` as the session's last processed message.
    ///
    /// This is a compare-and-set: it returns `true` only when the stored
    /// value differed and this call replaced it, and `false` when the id was
    /// already recorded.
    async fn claim_message(&self, id: SessionId, message_id: &str) -> Result<bool, StoreError>;

    /// Gets the sender's session, creating it on first contact.
    async fn get_or_create(&self, sender: &str, clinic_id: ClinicId) -> Result<Session, StoreError> {
        match self.get(sender).await? {
            Some(session) => Ok(session),
            None => self.create(sender, clinic_id).await,
        }
    }
}
