//! Error types for the webhook HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// Rejections from the verification handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// `hub.mode` or `hub.verify_token` was not supplied.
    MissingParameters,
    /// The mode was not `subscribe` or the token did not match.
    TokenMismatch,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameters => write!(f, "missing hub.mode or hub.verify_token"),
            Self::TokenMismatch => write!(f, "verification token mismatch"),
        }
    }
}

impl std::error::Error for VerifyError {}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingParameters => StatusCode::BAD_REQUEST.into_response(),
            Self::TokenMismatch => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// Errors raised while starting the server.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config,
    /// The database could not be reached or migrated.
    Database,
    /// The listener could not bind or serve.
    Listener { address: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "failed to load configuration"),
            Self::Database => write!(f, "failed to prepare database"),
            Self::Listener { address } => write!(f, "failed to serve on {address}"),
        }
    }
}

impl std::error::Error for StartupError {}
