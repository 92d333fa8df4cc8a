//! # Planboard Worker Library
//!
//! Periodic maintenance for the Planboard engine.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `scheduler`: The maintenance loop (deadline reminders, notification retention)

pub mod config;
pub mod scheduler;
