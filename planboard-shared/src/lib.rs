//! # Planboard Shared Library
//!
//! Domain types and the project/task consistency engine used by the Planboard
//! API server and the maintenance worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `db`: Connection pool and migrations
//! - `store`: Persistence trait with Postgres and in-memory backends
//! - `auth`: Token validation and the authorization guard
//! - `services`: The [`services::Planboard`] engine and its side effects
//! - `error`: Engine error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Planboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
