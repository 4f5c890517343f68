//! Parcel records and their attached documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::validate;

/// Document categories every registered parcel must carry
/// (possession certificate, lease receipt, property-tax receipt,
/// tax receipt). Names are the registry's own labels.
pub const REQUIRED_DOCUMENT_CATEGORIES: [&str; 4] = [
    "የይዞታ ማረጋገጫ ፋይል",
    "ሊዝ የተከፈለበት ደረሰኝ ፋይል",
    "የንብረት ግብር ደረሰኝ ፋይል",
    "የግብር ደረሰኝ ፋይል",
];

/// A registered parcel, as the backend serializes it.
///
/// Decimal amounts arrive as strings (the backend renders decimals that
/// way); dates without a time component are plain dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(rename = "UPIN")]
    pub upin: String,
    #[serde(rename = "PropertyOwnerName")]
    pub property_owner_name: String,
    #[serde(rename = "ExistingArchiveCode")]
    pub existing_archive_code: String,
    #[serde(rename = "PhoneNumber")]
    pub phone_number: Option<String>,
    #[serde(rename = "NationalId")]
    pub national_id: Option<String>,
    #[serde(rename = "ServiceOfEstate")]
    pub service_of_estate: String,
    #[serde(rename = "placeLevel")]
    pub place_level: String,
    #[serde(rename = "possessionStatus")]
    pub possession_status: String,
    #[serde(rename = "spaceSize")]
    pub space_size: String,
    pub kebele: String,
    #[serde(rename = "proofOfPossession")]
    pub proof_of_possession: String,
    #[serde(rename = "DebtRestriction")]
    pub debt_restriction: String,
    #[serde(rename = "LastTaxPaymtDate")]
    pub last_tax_paymt_date: Option<NaiveDate>,
    #[serde(rename = "unpaidTaxDebt")]
    pub unpaid_tax_debt: Option<String>,
    #[serde(rename = "InvoiceNumber")]
    pub invoice_number: Option<String>,
    #[serde(rename = "FirstAmount")]
    pub first_amount: Option<String>,
    #[serde(rename = "lastDatePayPropTax")]
    pub last_date_pay_prop_tax: Option<NaiveDate>,
    #[serde(rename = "unpaidPropTaxDebt")]
    pub unpaid_prop_tax_debt: Option<String>,
    #[serde(rename = "InvoiceNumber2")]
    pub invoice_number2: Option<String>,
    #[serde(rename = "SecondAmount")]
    pub second_amount: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "EndLeasePayPeriod")]
    pub end_lease_pay_period: Option<NaiveDate>,
    #[serde(rename = "unpaidLeaseDebt")]
    pub unpaid_lease_debt: Option<String>,
    #[serde(rename = "InvoiceNumber3")]
    pub invoice_number3: Option<String>,
    #[serde(rename = "ThirdAmount")]
    pub third_amount: Option<String>,
    #[serde(rename = "FolderNumber")]
    pub folder_number: Option<String>,
    #[serde(rename = "Row")]
    pub row: Option<String>,
    #[serde(rename = "ShelfNumber")]
    pub shelf_number: Option<String>,
    #[serde(rename = "NumberOfPages")]
    pub number_of_pages: Option<i64>,
    #[serde(rename = "sortingNumber")]
    pub sorting_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<RecordFile>,
}

/// A supporting document attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFile {
    pub id: i64,
    pub record: i64,
    pub uploaded_file: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub file_hash: Option<String>,
}

impl RecordFile {
    /// Required documents cannot be deleted, only replaced.
    pub fn is_required(&self) -> bool {
        self.category == "required"
            || REQUIRED_DOCUMENT_CATEGORIES.contains(&self.category.as_str())
    }
}

/// A file staged for upload.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub display_name: String,
    pub category: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// A single failed form rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Form input for creating or editing a record. Everything is kept as the
/// entered text; the backend parses dates and amounts on its side.
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub upin: String,
    pub property_owner_name: String,
    pub existing_archive_code: String,
    pub phone_number: String,
    pub national_id: String,
    pub service_of_estate: String,
    pub place_level: String,
    pub possession_status: String,
    pub space_size: String,
    pub kebele: String,
    pub proof_of_possession: String,
    pub debt_restriction: String,
    pub last_tax_paymt_date: String,
    pub last_date_pay_prop_tax: String,
    pub end_lease_pay_period: String,
    pub folder_number: String,
    pub row: String,
    pub shelf_number: String,
    pub number_of_pages: String,
    pub sorting_number: String,
    pub unpaid_tax_debt: Option<String>,
    pub invoice_number: Option<String>,
    pub first_amount: Option<String>,
    pub unpaid_prop_tax_debt: Option<String>,
    pub invoice_number2: Option<String>,
    pub second_amount: Option<String>,
    pub unpaid_lease_debt: Option<String>,
    pub invoice_number3: Option<String>,
    pub third_amount: Option<String>,
}

const REQUIRED_MESSAGE: &str = "This field is required.";

impl RecordDraft {
    /// The fields the entry form refuses to submit without.
    fn required_fields(&self) -> [(&'static str, &str); 19] {
        [
            ("UPIN", &self.upin),
            ("PropertyOwnerName", &self.property_owner_name),
            ("ServiceOfEstate", &self.service_of_estate),
            ("placeLevel", &self.place_level),
            ("possessionStatus", &self.possession_status),
            ("spaceSize", &self.space_size),
            ("kebele", &self.kebele),
            ("proofOfPossession", &self.proof_of_possession),
            ("DebtRestriction", &self.debt_restriction),
            ("LastTaxPaymtDate", &self.last_tax_paymt_date),
            ("lastDatePayPropTax", &self.last_date_pay_prop_tax),
            ("EndLeasePayPeriod", &self.end_lease_pay_period),
            ("FolderNumber", &self.folder_number),
            ("Row", &self.row),
            ("ShelfNumber", &self.shelf_number),
            ("NumberOfPages", &self.number_of_pages),
            ("PhoneNumber", &self.phone_number),
            ("NationalId", &self.national_id),
            ("sortingNumber", &self.sorting_number),
        ]
    }

    /// Check every rule and report all failures, not just the first.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        for (field, value) in self.required_fields() {
            if value.trim().is_empty() {
                errors.push(FieldError {
                    field,
                    message: REQUIRED_MESSAGE,
                });
            }
        }
        if !self.property_owner_name.trim().is_empty()
            && !validate::is_valid_owner_name(&self.property_owner_name)
        {
            errors.push(FieldError {
                field: "PropertyOwnerName",
                message: "Please enter only valid Amharic or English characters.",
            });
        }
        if !self.national_id.trim().is_empty()
            && !validate::is_valid_national_id(&self.national_id)
        {
            errors.push(FieldError {
                field: "NationalId",
                message: "Invalid Fayda Number. It must be a 12-digit number.",
            });
        }
        if !self.phone_number.trim().is_empty() && !validate::is_valid_phone(&self.phone_number) {
            errors.push(FieldError {
                field: "PhoneNumber",
                message: "Invalid phone number. Use +2519XXXXXXXX, +2517XXXXXXXX, 09XXXXXXXX, or 07XXXXXXXX format.",
            });
        }
        if !self.number_of_pages.trim().is_empty()
            && self.number_of_pages.trim().parse::<i64>().is_err()
        {
            errors.push(FieldError {
                field: "NumberOfPages",
                message: "Number of pages must be a whole number.",
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Check that every required document category has an attachment.
    pub fn missing_required_documents(attachments: &[Attachment]) -> Vec<&'static str> {
        REQUIRED_DOCUMENT_CATEGORIES
            .iter()
            .filter(|category| !attachments.iter().any(|a| a.category == **category))
            .copied()
            .collect()
    }

    /// Multipart text fields for create/update, in wire naming.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = self
            .required_fields()
            .iter()
            .map(|(name, value)| (name.to_string(), value.trim().to_string()))
            .collect();
        fields.push((
            "ExistingArchiveCode".to_string(),
            self.existing_archive_code.trim().to_string(),
        ));
        let optionals = [
            ("unpaidTaxDebt", &self.unpaid_tax_debt),
            ("InvoiceNumber", &self.invoice_number),
            ("FirstAmount", &self.first_amount),
            ("unpaidPropTaxDebt", &self.unpaid_prop_tax_debt),
            ("InvoiceNumber2", &self.invoice_number2),
            ("SecondAmount", &self.second_amount),
            ("unpaidLeaseDebt", &self.unpaid_lease_debt),
            ("InvoiceNumber3", &self.invoice_number3),
            ("ThirdAmount", &self.third_amount),
        ];
        for (name, value) in optionals {
            if let Some(value) = value {
                if !value.trim().is_empty() {
                    fields.push((name.to_string(), value.trim().to_string()));
                }
            }
        }
        fields
    }

    /// JSON body for a partial update (PUT by UPIN). Same fields as the
    /// multipart form, minus anything left blank.
    pub fn to_patch(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, value) in self.form_fields() {
            if !value.is_empty() {
                map.insert(name, serde_json::Value::String(value));
            }
        }
        serde_json::Value::Object(map)
    }
}
