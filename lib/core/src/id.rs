//! Typed identifiers for clinics, sessions, customers and bookings.
//!
//! Each id wraps a ULID and renders as `<prefix>_<ulid>`. Parsing and
//! deserialization accept the prefixed form or a bare ULID, so values can be
//! copied straight out of the database or from a raw ULID in configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when an id string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// Name of the id type being parsed.
    pub id_type: &'static str,
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a fresh id.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    reason: e.to_string(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_id!(
    /// The clinic that owns a conversation and its bookings.
    ClinicId,
    "clinic"
);

define_id!(
    /// A per-sender conversation session.
    SessionId,
    "sess"
);

define_id!(
    /// A customer, unique by phone number.
    CustomerId,
    "cust"
);

define_id!(
    /// A confirmed booking.
    BookingId,
    "bkg"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_prefix() {
        assert!(SessionId::new().to_string().starts_with("sess_"));
        assert!(BookingId::new().to_string().starts_with("bkg_"));
        assert!(CustomerId::new().to_string().starts_with("cust_"));
        assert!(ClinicId::new().to_string().starts_with("clinic_"));
    }

    #[test]
    fn parse_with_prefix() {
        let id = ClinicId::new();
        let parsed: ClinicId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_bare_ulid() {
        let id = CustomerId::new();
        let bare = id.to_string().trim_start_matches("cust_").to_string();
        assert_eq!(bare.parse::<CustomerId>().expect("should parse"), id);
    }

    #[test]
    fn parse_rejects_foreign_prefix() {
        let booking = BookingId::new().to_string();
        assert!(booking.parse::<CustomerId>().is_err());
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "clinic_nope".parse::<ClinicId>().unwrap_err();
        assert_eq!(err.id_type, "ClinicId");
    }

    #[test]
    fn serde_uses_prefixed_form() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{id}\""));
        let back: SessionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn deserialize_accepts_bare_ulid() {
        let ulid = Ulid::new();
        let id: ClinicId = serde_json::from_str(&format!("\"{ulid}\"")).expect("deserialize");
        assert_eq!(id.to_string(), format!("clinic_{ulid}"));
    }
}
