//! Inbound webhook payloads.
//!
//! Only the sender, message id and text body of each message matter here;
//! the rest of the subscription-notification envelope is tolerated and
//! ignored. Elements missing any of those fields are skipped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The `object` value of WhatsApp Business Account notifications.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// One text message to run through the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The sender's phone number.
    pub sender: String,
    /// Platform-assigned message id, stable across delivery retries.
    pub message_id: String,
    /// Message body text.
    pub text: String,
}

impl InboundMessage {
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        message_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            message_id: message_id.into(),
            text: text.into(),
        }
    }
}

/// Top-level webhook notification.
///
/// Every field tolerates `null`, a missing key or a value of the wrong
/// type. Array elements that fail to decode are dropped on their own, so
/// one malformed message never hides its neighbours.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub object: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Change {
    #[serde(default, deserialize_with = "lenient")]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub messages: Vec<RawMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default, deserialize_with = "lenient")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<RawText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawText {
    #[serde(default, deserialize_with = "lenient")]
    pub body: Option<String>,
}

/// Decodes `T`, falling back to its default when the value does not fit.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decodes each array element independently, keeping the ones that fit.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl WebhookPayload {
    /// Reads a notification from any JSON value. Non-object values yield an
    /// empty payload.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Returns true when the notification comes from a WhatsApp Business Account.
    #[must_use]
    pub fn is_whatsapp(&self) -> bool {
        self.object.as_deref() == Some(WHATSAPP_OBJECT)
    }

    /// Extracts every complete text message, in payload order.
    #[must_use]
    pub fn messages(&self) -> Vec<InboundMessage> {
        if !self.is_whatsapp() {
            return Vec::new();
        }

        self.entry
            .iter()
            .flat_map(|entry| &entry.changes)
            .flat_map(|change| &change.value.messages)
            .filter(|m| m.kind.as_deref().is_none_or(|kind| kind == "text"))
            .filter_map(|m| {
                Some(InboundMessage {
                    sender: m.from.clone()?,
                    message_id: m.id.clone()?,
                    text: m.text.as_ref()?.body.clone()?,
                })
            })
            .collect()
    }
}
