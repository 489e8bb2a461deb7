//! Reply text for the booking conversation.

use crate::booking::BookingDraft;

const OPENING_HOURS: &str = "Our opening hours:\n\
Mon-Fri: 9:00 - 19:00\n\
Sat: 10:00 - 16:00\n\
Sun: closed\n\n\
Reply *menu* to see the options again.";

const RECEPTION: &str = "Connecting you to our reception. A member of the team \
will reply here shortly.\n\nReply *menu* to see the options again.";

const ASK_NAME: &str = "Great, let's book your appointment. What is your full name?";

const CONFIRM_OPTIONS: &str = "Reply *1* to confirm or *2* to cancel.";

/// Renders every reply the conversation sends.
#[derive(Debug, Clone)]
pub struct Templates {
    clinic_name: String,
}

impl Templates {
    /// Creates templates that greet customers on behalf of `clinic_name`.
    #[must_use]
    pub fn new(clinic_name: impl Into<String>) -> Self {
        Self {
            clinic_name: clinic_name.into(),
        }
    }

    pub fn main_menu(&self) -> String {
        format!(
            "Welcome to {}! How can we help you today?\n\n\
             1. Book an appointment\n\
             2. Opening hours\n\
             3. Talk to reception\n\n\
             Reply with the number of an option.",
            self.clinic_name
        )
    }

    pub fn fallback(&self) -> String {
        format!("Sorry, I didn't understand that.\n\n{}", self.main_menu())
    }

    pub fn opening_hours(&self) -> String {
        OPENING_HOURS.to_string()
    }

    pub fn reception(&self) -> String {
        RECEPTION.to_string()
    }

    pub fn ask_name(&self) -> String {
        ASK_NAME.to_string()
    }

    pub fn ask_service(&self, name: &str) -> String {
        format!("Thanks, {name}. Which treatment or service would you like?")
    }

    pub fn ask_date(&self) -> String {
        "Which date would suit you? (e.g. 20 Feb)".to_string()
    }

    pub fn ask_time(&self) -> String {
        "And what time would you prefer? (e.g. 10:00)".to_string()
    }

    /// Summarises the collected draft and asks for confirmation.
    pub fn summary(&self, draft: &BookingDraft) -> String {
        format!(
            "Please check your booking:\n\n\
             Name: {}\n\
             Service: {}\n\
             Date: {}\n\
             Time: {}\n\n\
             {CONFIRM_OPTIONS}",
            draft.name, draft.service, draft.date, draft.time
        )
    }

    pub fn confirm_reprompt(&self) -> String {
        CONFIRM_OPTIONS.to_string()
    }

    pub fn booked(&self) -> String {
        format!(
            "Your appointment request has been sent to {}. We will be in touch to \
             confirm it. Reply *menu* for anything else.",
            self.clinic_name
        )
    }

    pub fn cancelled(&self) -> String {
        "Your booking has been cancelled. Reply *menu* to start again.".to_string()
    }

    /// Sent when a confirmation arrives but the draft has gone missing.
    pub fn draft_lost(&self) -> String {
        format!(
            "Sorry, we lost track of your booking details. Please start again.\n\n{}",
            self.main_menu()
        )
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::new("our clinic")
    }
}
