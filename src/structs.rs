use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::utils::{self, serialize_timestamp};

pub const STATUS_PENDING: &str = "pending";

/// Shared by every record that stores an Argon2 password hash.
pub trait Credentialed {
    fn password_hash(&self) -> &str;

    fn check_password(&self, password: &str) -> bool {
        utils::verify_password(password, self.password_hash())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Manufacturer {
    pub id: i64,
    pub company_name: String,
    pub license_number: String,
    pub license_authority: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub gstin: Option<String>,
    pub pan: Option<String>,
    pub factory_address: Option<String>,
    pub registered_address: Option<String>,
    pub contact_name: String,
    pub contact_designation: Option<String>,
    pub contact_phone: String,
    pub contact_email: String,
    pub official_email: Option<String>,
    pub website: Option<String>,
    pub company_profile: Option<String>,
    pub certifications: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub license_file: Option<String>,
    pub other_documents: Option<String>,
    pub status: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: NaiveDateTime,
}

impl Credentialed for Manufacturer {
    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct Pharmacy {
    pub id: i64,
    pub pharmacy_name: String,
    pub pharmacy_type: Option<String>,
    pub license_number: String,
    pub license_authority: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub gstin: Option<String>,
    pub pharmacy_address: String,
    pub operating_hours: Option<String>,
    pub website: Option<String>,
    pub pharmacy_description: Option<String>,
    pub owner_name: String,
    pub owner_pan: Option<String>,
    pub contact_name: String,
    pub contact_designation: Option<String>,
    pub contact_phone: String,
    pub contact_email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub license_file: Option<String>,
    pub pharmacist_certificate: Option<String>,
    pub other_documents: Option<String>,
    pub certifications: Option<String>,
    pub status: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: NaiveDateTime,
}

impl Pharmacy {
    /// Paths of the extra documents, in upload order.
    pub fn other_document_paths(&self) -> Vec<&str> {
        self.other_documents
            .as_deref()
            .map(|docs| docs.split(',').filter(|p| !p.is_empty()).collect())
            .unwrap_or_default()
    }
}

impl Credentialed for Pharmacy {
    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct MedicineBatch {
    pub medicine_id: i64,
    pub batch_number: String,
    pub medicine_name: String,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub pharmacy_name: Option<String>,
    #[serde(serialize_with = "utils::serialize_optional_timestamp")]
    pub date_uploaded: Option<NaiveDateTime>,
}

impl MedicineBatch {
    /// A batch stays authentic through the whole of its expiry day.
    pub fn is_authentic(&self, today: NaiveDate) -> bool {
        self.expiry_date >= today
    }

    pub fn status_label(&self, today: NaiveDate) -> &'static str {
        if self.is_authentic(today) {
            "Authentic"
        } else {
            "Expired"
        }
    }
}

/// Row for `medicine_batches` before the database assigns anything.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedicineBatch {
    pub medicine_id: Option<i64>,
    pub batch_number: String,
    pub medicine_name: String,
    pub manufacture_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub pharmacy_name: Option<String>,
    pub date_uploaded: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewManufacturer {
    pub company_name: String,
    pub license_number: String,
    pub license_authority: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub gstin: Option<String>,
    pub pan: Option<String>,
    pub factory_address: Option<String>,
    pub registered_address: Option<String>,
    pub contact_name: String,
    pub contact_designation: Option<String>,
    pub contact_phone: String,
    pub contact_email: String,
    pub official_email: Option<String>,
    pub website: Option<String>,
    pub company_profile: Option<String>,
    pub certifications: Option<String>,
    pub password_hash: String,
    pub license_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPharmacy {
    pub pharmacy_name: String,
    pub pharmacy_type: Option<String>,
    pub license_number: String,
    pub license_authority: Option<String>,
    pub license_expiry: Option<NaiveDate>,
    pub gstin: Option<String>,
    pub pharmacy_address: String,
    pub operating_hours: Option<String>,
    pub website: Option<String>,
    pub pharmacy_description: Option<String>,
    pub owner_name: String,
    pub owner_pan: Option<String>,
    pub contact_name: String,
    pub contact_designation: Option<String>,
    pub contact_phone: String,
    pub contact_email: String,
    pub password_hash: String,
    pub license_file: Option<String>,
    pub pharmacist_certificate: Option<String>,
    pub other_documents: Vec<String>,
    pub certifications: Option<String>,
}

/// Which registry table a registration or availability check targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrantKind {
    Manufacturer,
    Pharmacy,
}

impl RegistrantKind {
    /// Anything other than `pharmacy` falls back to the manufacturer registry.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("pharmacy") => RegistrantKind::Pharmacy,
            _ => RegistrantKind::Manufacturer,
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            RegistrantKind::Manufacturer => "manufacturers",
            RegistrantKind::Pharmacy => "pharmacies",
        }
    }

    pub fn upload_dir(self) -> &'static str {
        self.table()
    }

    /// URL prefix uploaded documents of this kind are served under.
    pub fn public_upload_prefix(self) -> String {
        format!("/static/uploads/{}", self.upload_dir())
    }

    pub fn id_key(self) -> &'static str {
        match self {
            RegistrantKind::Manufacturer => "manufacturer_id",
            RegistrantKind::Pharmacy => "pharmacy_id",
        }
    }

    /// Human readable code such as `MFG-000001`.
    pub fn registration_id(self, id: i64) -> String {
        let prefix = match self {
            RegistrantKind::Manufacturer => "MFG",
            RegistrantKind::Pharmacy => "PHR",
        };
        format!("{}-{:06}", prefix, id)
    }
}

/// Contact and licence columns that must be unique per registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Phone,
    License,
}

impl UniqueField {
    /// Order in which registration checks for duplicates.
    pub const CHECK_ORDER: [UniqueField; 3] =
        [UniqueField::Email, UniqueField::Phone, UniqueField::License];

    pub fn column(self) -> &'static str {
        match self {
            UniqueField::Email => "contact_email",
            UniqueField::Phone => "contact_phone",
            UniqueField::License => "license_number",
        }
    }

    /// Name of the registration form field holding this value.
    pub fn form_field(self) -> &'static str {
        match self {
            UniqueField::Email => "contact-email",
            UniqueField::Phone => "contact-phone",
            UniqueField::License => "license-number",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UniqueField::Email => "Email",
            UniqueField::Phone => "Phone",
            UniqueField::License => "License",
        }
    }

    /// Emails compare case-insensitively, everything else verbatim.
    pub fn normalize(self, value: &str) -> String {
        let value = value.trim();
        match self {
            UniqueField::Email => value.to_lowercase(),
            _ => value.to_owned(),
        }
    }

    /// Picks the column out of a SQLite `UNIQUE constraint failed: table.column` message.
    pub fn from_constraint_message(message: &str) -> Option<Self> {
        Self::CHECK_ORDER
            .into_iter()
            .find(|field| message.contains(&format!(".{}", field.column())))
    }
}

impl FromStr for UniqueField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(UniqueField::Email),
            "phone" => Ok(UniqueField::Phone),
            "license" => Ok(UniqueField::License),
            other => Err(format!("unknown field: {}", other)),
        }
    }
}
