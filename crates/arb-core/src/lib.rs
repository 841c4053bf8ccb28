//! Core domain + application logic for the anonymous relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! messaging port implemented in the `arb-telegram` adapter crate.

pub mod admins;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod router;

pub use errors::{Error, Result};
