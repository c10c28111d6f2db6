//! Parasara Chat, a guided Vedic astrology consultation client.

pub mod api;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
