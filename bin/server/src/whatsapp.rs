//! WhatsApp Cloud API reply client.

use async_trait::async_trait;
use clinic_booking_conversation::{DispatchError, ReplySender};
use serde::Serialize;

use crate::config::WhatsAppConfig;

/// Request body for a plain text message.
#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

/// Sends replies through the Graph API `/{phone_number_id}/messages` endpoint.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    messages_url: String,
    access_token: String,
}

impl WhatsAppClient {
    /// Creates a client from configuration.
    pub fn new(http: reqwest::Client, config: &WhatsAppConfig) -> Self {
        Self {
            http,
            messages_url: format!(
                "{}/{}/messages",
                config.api_base_url.trim_end_matches('/'),
                config.phone_number_id
            ),
            access_token: config.access_token.clone(),
        }
    }

    /// The endpoint replies are posted to.
    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }
}

#[async_trait]
impl ReplySender for WhatsAppClient {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), DispatchError> {
        let message = TextMessage {
            messaging_product: "whatsapp",
            to: recipient,
            kind: "text",
            text: TextBody { body },
        };

        let response = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&message)
            .send()
            .await
            .map_err(|e| DispatchError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(recipient = %recipient, status = %status, "WhatsApp accepted reply");
        Ok(())
    }
}
