//! Clinic notification delivery.
//!
//! Booking alerts go to an HTTP mail relay when one is configured, and to
//! the log otherwise.

use async_trait::async_trait;
use clinic_booking_conversation::{Notification, Notifier, NotifyError};

/// Posts notifications as JSON to a mail relay endpoint.
#[derive(Clone)]
pub struct EmailRelayNotifier {
    http: reqwest::Client,
    relay_url: String,
    token: Option<String>,
}

impl EmailRelayNotifier {
    pub fn new(http: reqwest::Client, relay_url: String, token: Option<String>) -> Self {
        Self {
            http,
            relay_url,
            token,
        }
    }
}

#[async_trait]
impl Notifier for EmailRelayNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut request = self.http.post(&self.relay_url).json(notification);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| NotifyError::Transport {
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %notification.to, subject = %notification.subject, "Notification sent");
        Ok(())
    }
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            body = %notification.body,
            "Booking notification (no relay configured)"
        );
        Ok(())
    }
}
