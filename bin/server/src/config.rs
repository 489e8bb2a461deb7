//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys
//! use `__` as the separator, e.g. `WHATSAPP__VERIFY_TOKEN`.

use clinic_booking_core::ClinicId;
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// PostgreSQL database connection URL.
    /// When unset, sessions and bookings are kept in process memory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// The clinic this deployment books for.
    pub clinic: ClinicConfig,

    /// WhatsApp Cloud API configuration.
    pub whatsapp: WhatsAppConfig,

    /// Clinic notification configuration.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Clinic identity and contact details.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicConfig {
    /// Clinic identifier recorded on sessions and bookings.
    pub id: ClinicId,

    /// Name shown in the main menu.
    #[serde(default = "default_clinic_name")]
    pub name: String,

    /// Address that receives new-booking alerts.
    pub notify_email: String,
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    /// Shared secret echoed back by the platform during the verification handshake.
    pub verify_token: String,

    /// Bearer token for the Graph API.
    pub access_token: String,

    /// Phone number id that replies are sent from.
    pub phone_number_id: String,

    /// Graph API base URL, including the version segment.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

/// Notification relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// HTTP mail relay endpoint. Notifications are logged when unset.
    #[serde(default)]
    pub relay_url: Option<String>,

    /// Optional bearer token for the relay.
    #[serde(default)]
    pub relay_token: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_max_connections() -> u32 {
    5
}

fn default_clinic_name() -> String {
    "our clinic".to_string()
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v22.0".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_config(
            config::Config::builder()
                .add_source(
                    config::Environment::default()
                        .separator("__")
                        .try_parsing(true),
                )
                .build()?,
        )
    }

    /// Deserializes configuration from an already-built source.
    pub fn from_config(source: config::Config) -> Result<Self, config::ConfigError> {
        source.try_deserialize()
    }
}
