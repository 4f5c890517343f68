//! REST API layer for the property-records backend.
//!
//! `transport` is the seam between the session manager and the network;
//! `client` builds the typed record/file/account/report endpoints on top
//! of the session manager's authorized-request wrapper.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, RecordSearch};
pub use error::ApiError;
