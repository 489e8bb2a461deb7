//! clinic-booking webhook server.
//!
//! This crate wires the booking conversation to the outside world:
//! the WhatsApp webhook routes, Postgres-backed stores, the Cloud API
//! reply client and the clinic notification relay.

pub mod config;
pub mod db;
pub mod error;
pub mod notify;
pub mod webhook;
pub mod whatsapp;
