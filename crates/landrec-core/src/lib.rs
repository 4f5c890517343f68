//! Core library for landrec, a client for a municipal property-records
//! (UPIN) service.
//!
//! The interesting part lives in [`auth`]: a session manager that owns the
//! JWT credential pair, collapses concurrent token refreshes into a single
//! backend call, and wraps every authenticated request with a
//! refresh-and-replay-once policy on 401. [`api`] builds the typed record,
//! file, account, audit and statistics endpoints on top of it.

#![recursion_limit = "256"]

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError};
pub use auth::{Claims, SessionManager, SessionState, SessionStore};
pub use config::Config;
