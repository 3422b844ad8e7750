use sqlx::SqlitePool;

use crate::{
    db,
    errors::AppError,
    multipart::{save_upload, RegistrationForm},
    structs::{NewManufacturer, NewPharmacy, RegistrantKind, UniqueField},
    utils, AppState,
};

pub const MANUFACTURER_REQUIRED: [&str; 6] = [
    "company-name",
    "license-number",
    "contact-name",
    "contact-phone",
    "contact-email",
    "password",
];

pub const PHARMACY_REQUIRED: [&str; 8] = [
    "pharmacy-name",
    "pharmacy-type",
    "license-number",
    "owner-name",
    "contact-name",
    "contact-phone",
    "contact-email",
    "password",
];

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub kind: RegistrantKind,
    pub id: i64,
    pub registration_id: String,
}

impl Registration {
    fn new(kind: RegistrantKind, id: i64) -> Self {
        Registration {
            kind,
            id,
            registration_id: kind.registration_id(id),
        }
    }
}

fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::WeakPassword(MIN_PASSWORD_LEN));
    }
    Ok(())
}

/// Email, then phone, then licence; stops at the first value already taken.
async fn ensure_available(
    pool: &SqlitePool,
    kind: RegistrantKind,
    form: &RegistrationForm,
) -> Result<(), AppError> {
    for field in UniqueField::CHECK_ORDER {
        let value = field.normalize(form.text(field.form_field()));
        if db::field_exists(pool, kind, field, &value).await? {
            log::info!("{} registration rejected: {} taken", kind.table(), field.label());
            return Err(AppError::AlreadyRegistered(field));
        }
    }
    Ok(())
}

async fn save_file(
    state: &AppState,
    kind: RegistrantKind,
    form: &RegistrationForm,
    field: &str,
    role: &str,
) -> Result<Option<String>, AppError> {
    match form.file(field) {
        Some(upload) => {
            let dir = state.config.upload_dir(kind);
            let path = save_upload(&dir, &kind.public_upload_prefix(), role, upload).await?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

pub async fn register_manufacturer(
    state: &AppState,
    form: &RegistrationForm,
) -> Result<Registration, AppError> {
    let kind = RegistrantKind::Manufacturer;
    form.require(&MANUFACTURER_REQUIRED)?;
    check_password(form.raw("password"))?;
    ensure_available(&state.db_pool, kind, form).await?;

    let license_file = save_file(state, kind, form, "license-document", "license").await?;

    let record = NewManufacturer {
        company_name: form.text("company-name").to_owned(),
        license_number: UniqueField::License.normalize(form.text("license-number")),
        license_authority: form.optional("license-authority"),
        license_expiry: form.optional_date("license-expiry"),
        gstin: form.optional_upper("gstin"),
        pan: form.optional_upper("pan"),
        factory_address: form.optional("factory-address"),
        registered_address: form.optional("registered-address"),
        contact_name: form.text("contact-name").to_owned(),
        contact_designation: form.optional("contact-designation"),
        contact_phone: UniqueField::Phone.normalize(form.text("contact-phone")),
        contact_email: UniqueField::Email.normalize(form.text("contact-email")),
        official_email: form.optional_lower("official-email"),
        website: form.optional("website"),
        company_profile: form.optional("company-profile"),
        certifications: form.optional("certifications"),
        password_hash: utils::hash_password(form.raw("password"))?,
        license_file,
    };

    let id = db::create_manufacturer(&state.db_pool, &record).await?;
    Ok(Registration::new(kind, id))
}

pub async fn register_pharmacy(
    state: &AppState,
    form: &RegistrationForm,
) -> Result<Registration, AppError> {
    let kind = RegistrantKind::Pharmacy;
    form.require(&PHARMACY_REQUIRED)?;
    check_password(form.raw("password"))?;
    ensure_available(&state.db_pool, kind, form).await?;

    let license_file = save_file(state, kind, form, "license-document", "license").await?;
    let pharmacist_certificate =
        save_file(state, kind, form, "pharmacist-certificate", "pharmacist").await?;

    let dir = state.config.upload_dir(kind);
    let prefix = kind.public_upload_prefix();
    let mut other_documents = Vec::new();
    for upload in form.files("other-documents") {
        other_documents.push(save_upload(&dir, &prefix, "other", upload).await?);
    }

    let record = NewPharmacy {
        pharmacy_name: form.text("pharmacy-name").to_owned(),
        pharmacy_type: form.optional("pharmacy-type"),
        license_number: UniqueField::License.normalize(form.text("license-number")),
        license_authority: form.optional("license-authority"),
        license_expiry: form.optional_date("license-expiry"),
        gstin: form.optional_upper("gstin"),
        pharmacy_address: form.text("pharmacy-address").to_owned(),
        operating_hours: form.optional("operating-hours"),
        website: form.optional("website"),
        pharmacy_description: form.optional("pharmacy-description"),
        owner_name: form.text("owner-name").to_owned(),
        owner_pan: form.optional_upper("owner-pan"),
        contact_name: form.text("contact-name").to_owned(),
        contact_designation: form.optional("contact-designation"),
        contact_phone: UniqueField::Phone.normalize(form.text("contact-phone")),
        contact_email: UniqueField::Email.normalize(form.text("contact-email")),
        password_hash: utils::hash_password(form.raw("password"))?,
        license_file,
        pharmacist_certificate,
        other_documents,
        certifications: form.optional("other-certifications"),
    };

    let id = db::create_pharmacy(&state.db_pool, &record).await?;
    Ok(Registration::new(kind, id))
}
