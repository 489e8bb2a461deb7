//! The Dispatch Boundary: delivery of replies back to the sender.

use crate::error::DispatchError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Best-effort delivery of a text reply to a sender.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), DispatchError>;
}

/// Sends a reply on its own task, logging any failure.
///
/// The turn that produced the reply has already been committed; delivery
/// failures never feed back into it.
pub fn spawn_reply(
    sender: Arc<dyn ReplySender>,
    recipient: String,
    body: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match sender.send(&recipient, &body).await {
            Ok(()) => tracing::debug!(recipient = %recipient, "Reply delivered"),
            Err(e) => {
                tracing::warn!(error = %e, recipient = %recipient, "Failed to deliver reply");
            }
        }
    })
}
