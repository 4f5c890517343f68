//! Typed endpoints for records, files, accounts, audit logs and
//! statistics.
//!
//! Every call goes through the session manager's authorized-request
//! wrapper, so the 401 refresh-and-replay policy applies uniformly and no
//! endpoint needs to think about tokens.

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::auth::SessionManager;
use crate::models::{
    AmountPaidCount, Attachment, AuditEntry, DashboardMetrics, Group, NewUser,
    ProofOfPossessionCount, Record, RecordDraft, RecordFile, Registration, RoleAction,
    ServiceOfEstateCount, User,
};

use super::transport::{Body, FilePart, Method, RawResponse};
use super::ApiError;

/// Lookup key for the two-field record search endpoint.
#[derive(Debug, Clone, Copy)]
pub enum RecordSearch<'a> {
    Upin(&'a str),
    ArchiveCode(&'a str),
}

#[derive(serde::Deserialize)]
struct ExistsResponse {
    exists: bool,
}

#[derive(serde::Deserialize)]
struct DetailResponse {
    detail: String,
}

/// API client for the property-records service.
pub struct ApiClient {
    session: SessionManager,
}

impl ApiClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn parse<T: DeserializeOwned>(path: &str, response: RawResponse) -> Result<T, ApiError> {
        if !response.is_success() {
            return Err(ApiError::from_status(response.status, &response.text()));
        }
        response
            .json()
            .map_err(|e| ApiError::InvalidResponse(format!("{path}: {e}")))
    }

    fn ensure_success(response: RawResponse) -> Result<(), ApiError> {
        if response.is_success() {
            Ok(())
        } else {
            Err(ApiError::from_status(response.status, &response.text()))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.session.request(Method::Get, path, Body::Empty).await?;
        Self::parse(path, response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let response = self.session.request(method, path, Body::Json(body)).await?;
        Self::parse(path, response)
    }

    // ===== Records =====

    pub async fn list_records(&self) -> Result<Vec<Record>, ApiError> {
        self.get_json("records/").await
    }

    /// The four most recently registered parcels, for the home screen.
    pub async fn recent_records(&self) -> Result<Vec<Record>, ApiError> {
        self.get_json("records/recent/").await
    }

    /// Register a new parcel with its supporting documents.
    ///
    /// Validation failures short-circuit locally: nothing is sent until the
    /// draft passes the form rules and every required document category has
    /// an attachment.
    pub async fn create_record(
        &self,
        draft: &RecordDraft,
        attachments: &[Attachment],
    ) -> Result<Record, ApiError> {
        if let Err(errors) = draft.validate() {
            let summary = errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::Rejected(summary));
        }
        let missing = RecordDraft::missing_required_documents(attachments);
        if !missing.is_empty() {
            return Err(ApiError::Rejected(format!(
                "Missing required documents: {}",
                missing.join(", ")
            )));
        }

        let mut fields = draft.form_fields();
        let mut files = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            fields.push(("names[]".to_string(), attachment.display_name.clone()));
            fields.push(("categories[]".to_string(), attachment.category.clone()));
            files.push(FilePart {
                field: "files".to_string(),
                file_name: attachment.file_name.clone(),
                mime: attachment.mime.clone(),
                bytes: attachment.bytes.clone(),
            });
        }
        debug!(upin = %draft.upin, files = files.len(), "Creating record");
        let response = self
            .session
            .request(Method::Post, "records/", Body::Form { fields, files })
            .await?;
        Self::parse("records/", response)
    }

    /// Search by exact UPIN or archive code.
    pub async fn search_records(&self, search: RecordSearch<'_>) -> Result<Vec<Record>, ApiError> {
        let path = match search {
            RecordSearch::Upin(upin) => format!("records/search/?UPIN={upin}"),
            RecordSearch::ArchiveCode(code) => {
                format!("records/search/?ExistingArchiveCode={code}")
            }
        };
        self.get_json(&path).await
    }

    pub async fn search_by_service(&self, service: &str) -> Result<Vec<Record>, ApiError> {
        self.get_json(&format!(
            "records/search-by-service/?ServiceOfEstate={service}"
        ))
        .await
    }

    pub async fn search_by_kebele(&self, kebele: &str) -> Result<Vec<Record>, ApiError> {
        self.get_json(&format!("records/search-by-kebele/?kebele={kebele}"))
            .await
    }

    pub async fn search_by_proof(&self, proof: &str) -> Result<Vec<Record>, ApiError> {
        self.get_json(&format!(
            "records/search-by-proof/?proofOfPossession={proof}"
        ))
        .await
    }

    pub async fn search_by_possession(&self, possession: &str) -> Result<Vec<Record>, ApiError> {
        self.get_json(&format!(
            "records/search-by-possession/?possessionStatus={possession}"
        ))
        .await
    }

    /// Whether a UPIN is already registered (duplicate check during entry).
    pub async fn check_upin(&self, upin: &str) -> Result<bool, ApiError> {
        let path = format!("records/check-upin/{upin}/");
        let exists: ExistsResponse = self.get_json(&path).await?;
        Ok(exists.exists)
    }

    /// Partial update of a record, addressed by UPIN.
    pub async fn update_record(&self, upin: &str, draft: &RecordDraft) -> Result<Record, ApiError> {
        let path = format!("records/{upin}/");
        self.send_json(Method::Put, &path, draft.to_patch()).await
    }

    pub async fn delete_record(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("records/{id}");
        let response = self.session.request(Method::Delete, &path, Body::Empty).await?;
        Self::ensure_success(response)
    }

    // ===== Files =====

    pub async fn list_files(&self, upin: &str) -> Result<Vec<RecordFile>, ApiError> {
        self.get_json(&format!("records/{upin}/files/")).await
    }

    /// Attach one supplementary document to an existing record.
    pub async fn upload_file(&self, upin: &str, attachment: &Attachment) -> Result<(), ApiError> {
        let path = format!("files/{upin}/upload/");
        let body = Body::Form {
            fields: vec![
                ("display_name".to_string(), attachment.display_name.clone()),
                ("category".to_string(), attachment.category.clone()),
            ],
            files: vec![FilePart {
                field: "uploaded_file".to_string(),
                file_name: attachment.file_name.clone(),
                mime: attachment.mime.clone(),
                bytes: attachment.bytes.clone(),
            }],
        };
        let response = self.session.request(Method::Post, &path, body).await?;
        Self::ensure_success(response)
    }

    /// Swap the stored file behind an existing document entry.
    pub async fn replace_file(&self, file_id: i64, attachment: &Attachment) -> Result<(), ApiError> {
        let path = format!("files/{file_id}/replace/");
        let body = Body::Form {
            fields: Vec::new(),
            files: vec![FilePart {
                field: "uploaded_file".to_string(),
                file_name: attachment.file_name.clone(),
                mime: attachment.mime.clone(),
                bytes: attachment.bytes.clone(),
            }],
        };
        let response = self.session.request(Method::Put, &path, body).await?;
        Self::ensure_success(response)
    }

    /// Delete a supplementary document. Required documents are refused
    /// locally; the backend enforces the same rule.
    pub async fn delete_file(&self, file: &RecordFile) -> Result<(), ApiError> {
        if file.is_required() {
            return Err(ApiError::Rejected(
                "Required files cannot be deleted.".to_string(),
            ));
        }
        let path = format!("files/{}/delete/", file.id);
        let response = self.session.request(Method::Delete, &path, Body::Empty).await?;
        Self::ensure_success(response)
    }

    // ===== Accounts =====

    pub async fn register(&self, new_user: &NewUser) -> Result<Registration, ApiError> {
        self.send_json(
            Method::Post,
            "accounts/register/",
            serde_json::to_value(new_user)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        )
        .await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("accounts/users/").await
    }

    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, ApiError> {
        self.send_json(
            Method::Post,
            "accounts/users/",
            serde_json::to_value(new_user)
                .map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        )
        .await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        self.get_json(&format!("accounts/users/{id}/")).await
    }

    pub async fn update_user(&self, id: i64, user: &NewUser) -> Result<User, ApiError> {
        self.send_json(
            Method::Put,
            &format!("accounts/users/{id}/"),
            serde_json::to_value(user).map_err(|e| ApiError::InvalidResponse(e.to_string()))?,
        )
        .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("accounts/users/{id}/");
        let response = self.session.request(Method::Delete, &path, Body::Empty).await?;
        Self::ensure_success(response)
    }

    /// Add a user to or remove them from a group. Returns the backend's
    /// confirmation message.
    pub async fn manage_role(
        &self,
        user_id: i64,
        group_name: &str,
        action: RoleAction,
    ) -> Result<String, ApiError> {
        let path = format!("accounts/users/{user_id}/roles/");
        let detail: DetailResponse = self
            .send_json(
                Method::Post,
                &path,
                json!({ "group_name": group_name, "action": action.as_str() }),
            )
            .await?;
        Ok(detail.detail)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.get_json("accounts/groups/").await
    }

    // ===== Reporting =====

    pub async fn audit_logs(&self) -> Result<Vec<AuditEntry>, ApiError> {
        self.get_json("audit-logs/").await
    }

    pub async fn proof_of_possession_stats(&self) -> Result<Vec<ProofOfPossessionCount>, ApiError> {
        self.get_json("statistics/proof-of-possession").await
    }

    pub async fn service_of_estate_stats(&self) -> Result<Vec<ServiceOfEstateCount>, ApiError> {
        self.get_json("statistics/service-of-estate").await
    }

    pub async fn amount_paid_stats(&self) -> Result<Vec<AmountPaidCount>, ApiError> {
        self.get_json("statistics/amount-paid").await
    }

    pub async fn dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError> {
        self.get_json("dashboard-metrics/").await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{SessionData, SessionStore};
    use crate::testing::FakeTransport;

    fn client_with(transport: &Arc<FakeTransport>, dir: &tempfile::TempDir) -> ApiClient {
        let mut store = SessionStore::new(dir.path().to_path_buf());
        store
            .replace(SessionData {
                access: Some("A1".into()),
                refresh: Some("R1".into()),
                profile: None,
            })
            .expect("seed session");
        let session = SessionManager::new(transport.clone(), "http://backend/api", store);
        ApiClient::new(session)
    }

    fn attachment(category: &str) -> Attachment {
        Attachment {
            display_name: format!("{category} scan"),
            category: category.to_string(),
            file_name: "scan.pdf".into(),
            mime: "application/pdf".into(),
            bytes: vec![0x25, 0x50, 0x44, 0x46],
        }
    }

    fn full_attachments() -> Vec<Attachment> {
        crate::models::REQUIRED_DOCUMENT_CATEGORIES
            .iter()
            .map(|category| attachment(category))
            .collect()
    }

    fn golden_draft() -> RecordDraft {
        RecordDraft {
            upin: "AA-01-0001".into(),
            property_owner_name: "Abebe Bikila".into(),
            existing_archive_code: "ARC-77".into(),
            phone_number: "0911223344".into(),
            national_id: "123456789012".into(),
            service_of_estate: "Residential".into(),
            place_level: "Level 2".into(),
            possession_status: "Permanent".into(),
            space_size: "250".into(),
            kebele: "05".into(),
            proof_of_possession: "Map".into(),
            debt_restriction: "None".into(),
            last_tax_paymt_date: "2015".into(),
            last_date_pay_prop_tax: "2015".into(),
            end_lease_pay_period: "2030".into(),
            folder_number: "F-12".into(),
            row: "3".into(),
            shelf_number: "9".into(),
            number_of_pages: "14".into(),
            sorting_number: "S-8".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn invalid_draft_never_reaches_the_network() {
        let transport = Arc::new(FakeTransport::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        let mut draft = golden_draft();
        draft.national_id = "123".into();

        let result = client.create_record(&draft, &full_attachments()).await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn missing_required_documents_block_submission() {
        let transport = Arc::new(FakeTransport::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        let result = client
            .create_record(&golden_draft(), &[attachment("additional")])
            .await;
        match result {
            Err(ApiError::Rejected(message)) => {
                assert!(message.starts_with("Missing required documents"))
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn create_record_sends_parallel_name_and_category_fields() {
        let transport = Arc::new(FakeTransport::new());
        transport.script("records/", 201, sample_record_json().to_string().as_str());
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        client
            .create_record(&golden_draft(), &full_attachments())
            .await
            .expect("create");

        let request = transport.last_request_to("records/").expect("logged");
        match request.body {
            Body::Form { fields, files } => {
                let names: Vec<&str> = fields
                    .iter()
                    .filter(|(n, _)| n == "names[]")
                    .map(|(_, v)| v.as_str())
                    .collect();
                let categories: Vec<&str> = fields
                    .iter()
                    .filter(|(n, _)| n == "categories[]")
                    .map(|(_, v)| v.as_str())
                    .collect();
                assert_eq!(names.len(), 4);
                assert_eq!(
                    categories,
                    crate::models::REQUIRED_DOCUMENT_CATEGORIES.to_vec()
                );
                assert_eq!(files.len(), 4);
                assert!(files.iter().all(|f| f.field == "files"));
                assert!(fields.iter().any(|(n, v)| n == "UPIN" && v == "AA-01-0001"));
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn required_documents_cannot_be_deleted_locally() {
        let transport = Arc::new(FakeTransport::new());
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        let file = RecordFile {
            id: 5,
            record: 1,
            uploaded_file: "/media/uploads/possession.pdf".into(),
            uploaded_at: None,
            display_name: "Possession certificate".into(),
            category: crate::models::REQUIRED_DOCUMENT_CATEGORIES[0].into(),
            kind: "application/pdf".into(),
            file_hash: None,
        };
        let result = client.delete_file(&file).await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn check_upin_unwraps_the_exists_flag() {
        let transport = Arc::new(FakeTransport::new());
        transport.script("records/check-upin/AA-01-0001/", 200, r#"{"exists": true}"#);
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        assert!(client.check_upin("AA-01-0001").await.expect("check"));
    }

    #[tokio::test]
    async fn manage_role_posts_the_action_verb() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(
            "accounts/users/4/roles/",
            200,
            r#"{"detail": "User 'mulu' added to group 'Editors'."}"#,
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        let message = client
            .manage_role(4, "Editors", RoleAction::Add)
            .await
            .expect("manage role");
        assert!(message.contains("added"));

        let bodies = transport.json_bodies_to("accounts/users/4/roles/");
        assert_eq!(bodies[0]["action"], "add");
        assert_eq!(bodies[0]["group_name"], "Editors");
    }

    #[tokio::test]
    async fn statistics_feeds_parse_into_rows() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(
            "statistics/amount-paid",
            200,
            r#"[{"name": "FirstAmount Paid", "count": 10},
                {"name": "SecondAmount Paid", "count": 7},
                {"name": "ThirdAmount Paid", "count": 2}]"#,
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        let rows = client.amount_paid_stats().await.expect("stats");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].count, 10);
    }

    #[tokio::test]
    async fn backend_rejection_surfaces_the_error_payload() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(
            "records/",
            400,
            r#"{"error": "A record with UPIN 'AA-01-0001' already exists."}"#,
        );
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_with(&transport, &dir);

        let result = client
            .create_record(&golden_draft(), &full_attachments())
            .await;
        match result {
            Err(ApiError::Rejected(message)) => assert!(message.contains("already exists")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn sample_record_json() -> serde_json::Value {
        serde_json::json!({
            "id": 12,
            "UPIN": "AA-01-0001",
            "PropertyOwnerName": "Abebe Bikila",
            "ExistingArchiveCode": "ARC-77",
            "PhoneNumber": "0911223344",
            "NationalId": "123456789012",
            "ServiceOfEstate": "Residential",
            "placeLevel": "Level 2",
            "possessionStatus": "Permanent",
            "spaceSize": "250",
            "kebele": "05",
            "proofOfPossession": "Map",
            "DebtRestriction": "None",
            "LastTaxPaymtDate": "2015-01-01",
            "unpaidTaxDebt": null,
            "InvoiceNumber": null,
            "FirstAmount": null,
            "lastDatePayPropTax": "2015-01-01",
            "unpaidPropTaxDebt": null,
            "InvoiceNumber2": null,
            "SecondAmount": null,
            "filePath": null,
            "EndLeasePayPeriod": "2030-01-01",
            "unpaidLeaseDebt": null,
            "InvoiceNumber3": null,
            "ThirdAmount": null,
            "FolderNumber": "F-12",
            "Row": "3",
            "ShelfNumber": "9",
            "NumberOfPages": 14,
            "sortingNumber": "S-8",
            "created_at": "2024-05-02T08:30:00Z",
            "updated_at": "2024-05-02T08:30:00Z",
            "files": []
        })
    }
}
