//! Audit trail entries.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Actions the backend records. Unknown values collapse to `Other` so a
/// newer backend does not break the log view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    Download,
    View,
    #[serde(other)]
    Other,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Download => "DOWNLOAD",
            AuditAction::View => "VIEW",
            AuditAction::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user: Option<String>,
    pub action: AuditAction,
    #[serde(default)]
    pub details: String,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub role: Option<String>,
}
