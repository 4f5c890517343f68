//! Domain models for the property-records service.
//!
//! Wire names follow the backend's serializers exactly (mixed-case field
//! names included), with explicit renames on every struct so the Rust side
//! stays snake_case.

pub mod audit;
pub mod record;
pub mod stats;
pub mod user;
pub mod validate;

pub use audit::{AuditAction, AuditEntry};
pub use record::{
    Attachment, FieldError, Record, RecordDraft, RecordFile, REQUIRED_DOCUMENT_CATEGORIES,
};
pub use stats::{
    AmountPaidCount, DashboardMetrics, ProofOfPossessionCount, ServiceOfEstateCount,
};
pub use user::{Group, NewUser, Registration, RoleAction, User};
