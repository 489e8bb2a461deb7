//! The booking conversation state machine.
//!
//! [`ConversationEngine::advance`] is a total, pure function of the current
//! session and one inbound text: every `(step, text)` pair maps to a next
//! step, a draft change and a reply. Storage, delivery and booking side
//! effects are left to the caller.

use crate::booking::BookingDraft;
use crate::session::{DraftField, Session, SessionUpdate, Step};
use crate::templates::Templates;

/// Command that returns to the main menu from any step.
const MENU_COMMAND: &str = "menu";

/// Greetings that show the main menu when no booking is in progress.
const GREETINGS: &[&str] = &["hi", "hello", "hey"];

/// Side effects a transition asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// Commit the confirmed booking.
    RecordBooking(BookingDraft),
}

/// The outcome of interpreting one inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state change to persist.
    pub update: SessionUpdate,
    /// The reply to send to the sender.
    pub reply: String,
    /// An optional side effect to run after persisting.
    pub effect: Option<SideEffect>,
}

impl Transition {
    fn reply(update: SessionUpdate, reply: String) -> Self {
        Self {
            update,
            reply,
            effect: None,
        }
    }
}

/// Interprets inbound text against session state.
#[derive(Debug, Clone, Default)]
pub struct ConversationEngine {
    templates: Templates,
}

impl ConversationEngine {
    #[must_use]
    pub fn new(templates: Templates) -> Self {
        Self { templates }
    }

    /// Computes the transition for `text` received in `session`.
    #[must_use]
    pub fn advance(&self, session: &Session, text: &str) -> Transition {
        let text = text.trim();
        let t = &self.templates;

        if text.eq_ignore_ascii_case(MENU_COMMAND) {
            return Transition::reply(SessionUpdate::reset(), t.main_menu());
        }

        match session.step {
            Step::Idle => self.idle(text),
            Step::AskName => {
                if text.is_empty() {
                    Transition::reply(SessionUpdate::step(Step::AskName), t.ask_name())
                } else {
                    Transition::reply(
                        SessionUpdate::set(Step::AskService, DraftField::Name, text),
                        t.ask_service(text),
                    )
                }
            }
            Step::AskService => Transition::reply(
                SessionUpdate::set(Step::AskDate, DraftField::Service, text),
                t.ask_date(),
            ),
            Step::AskDate => Transition::reply(
                SessionUpdate::set(Step::AskTime, DraftField::Date, text),
                t.ask_time(),
            ),
            Step::AskTime => {
                let update = SessionUpdate::set(Step::Confirm, DraftField::Time, text);
                let mut preview = session.clone();
                preview.apply(&update);
                match preview.draft() {
                    Some(draft) => Transition::reply(update, t.summary(&draft)),
                    None => Transition::reply(SessionUpdate::reset(), t.draft_lost()),
                }
            }
            Step::Confirm => self.confirm(session, text),
        }
    }

    fn idle(&self, text: &str) -> Transition {
        let t = &self.templates;
        let stay = SessionUpdate::step(Step::Idle);

        if text.is_empty() || GREETINGS.iter().any(|g| text.eq_ignore_ascii_case(g)) {
            return Transition::reply(stay, t.main_menu());
        }

        match text {
            "1" => Transition::reply(SessionUpdate::step(Step::AskName), t.ask_name()),
            "2" => Transition::reply(stay, t.opening_hours()),
            "3" => Transition::reply(stay, t.reception()),
            _ => Transition::reply(stay, t.fallback()),
        }
    }

    fn confirm(&self, session: &Session, text: &str) -> Transition {
        let t = &self.templates;
        match text {
            "1" => match session.draft() {
                Some(draft) => Transition {
                    update: SessionUpdate::reset(),
                    reply: t.booked(),
                    effect: Some(SideEffect::RecordBooking(draft)),
                },
                None => Transition::reply(SessionUpdate::reset(), t.draft_lost()),
            },
            "2" => Transition::reply(SessionUpdate::reset(), t.cancelled()),
            _ => Transition::reply(SessionUpdate::step(Step::Confirm), t.confirm_reprompt()),
        }
    }
}
