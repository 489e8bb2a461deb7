//! Webhook routes.
//!
//! - `GET /` - liveness text
//! - `GET /webhook` - subscription verification handshake
//! - `POST /webhook` - inbound message notifications

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use clinic_booking_conversation::{InboundMessage, MessageProcessor, TurnOutcome, WebhookPayload};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::VerifyError;

/// Shared application state.
pub struct AppState {
    /// Runs inbound messages through the conversation.
    pub processor: MessageProcessor,
    /// Shared secret expected in the verification handshake.
    pub verify_token: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(processor: MessageProcessor, verify_token: String) -> Self {
        Self {
            processor,
            verify_token,
        }
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", get(verify).post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "Bot is running"
}

/// Query parameters of the verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Echoes the challenge when the platform presents the configured token.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, VerifyError> {
    let (Some(mode), Some(token)) = (params.mode, params.verify_token) else {
        return Err(VerifyError::MissingParameters);
    };

    if mode != "subscribe" || token != state.verify_token {
        tracing::warn!(mode = %mode, "Webhook verification rejected");
        return Err(VerifyError::TokenMismatch);
    }

    tracing::info!("Webhook verified");
    Ok(params.challenge.unwrap_or_default())
}

/// Acknowledges a notification and processes its messages in the background.
///
/// Any JSON body is answered with `200 OK` straight away. Store and delivery
/// latency only affect the spawned task.
pub async fn receive(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> StatusCode {
    let payload = WebhookPayload::from_value(body);
    if !payload.is_whatsapp() {
        tracing::debug!(object = ?payload.object, "Ignoring non-WhatsApp notification");
        return StatusCode::OK;
    }

    let messages = payload.messages();
    if !messages.is_empty() {
        tokio::spawn(process_batch(state, messages));
    }

    StatusCode::OK
}

/// Runs one notification's messages in payload order.
async fn process_batch(state: Arc<AppState>, messages: Vec<InboundMessage>) {
    for message in messages {
        match state.processor.process(&message).await {
            Ok(TurnOutcome::Duplicate) => {}
            Ok(TurnOutcome::Replied { step, booking, .. }) => {
                tracing::debug!(
                    sender = %message.sender,
                    step = %step,
                    booked = booking.is_some(),
                    "Message processed"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    sender = %message.sender,
                    message_id = %message.message_id,
                    "Failed to process message"
                );
            }
        }
    }
}
