//! Aggregate statistics rows for the report and dashboard views.

use serde::Deserialize;

/// One slice of the proof-of-possession breakdown.
#[derive(Debug, Clone, Deserialize)]
pub struct ProofOfPossessionCount {
    #[serde(rename = "proofOfPossession")]
    pub proof_of_possession: String,
    pub count: i64,
}

/// One slice of the service-of-estate breakdown.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceOfEstateCount {
    #[serde(rename = "ServiceOfEstate")]
    pub service_of_estate: String,
    pub count: i64,
}

/// One slice of the amount-paid chart (named series, not a field value).
#[derive(Debug, Clone, Deserialize)]
pub struct AmountPaidCount {
    pub name: String,
    pub count: i64,
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardMetrics {
    #[serde(rename = "totalRecords")]
    pub total_records: i64,
    #[serde(rename = "registeredUsers")]
    pub registered_users: i64,
    #[serde(rename = "reportsGenerated")]
    pub reports_generated: i64,
    #[serde(rename = "filesUploaded")]
    pub files_uploaded: i64,
    #[serde(rename = "recentActiveUsers")]
    pub recent_active_users: i64,
}
