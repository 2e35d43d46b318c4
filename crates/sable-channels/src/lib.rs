//! # sable-channels
//!
//! Messaging platform integrations for Sable. WhatsApp is the only one.

pub mod whatsapp;
