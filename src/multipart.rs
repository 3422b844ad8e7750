use std::{collections::HashMap, path::Path};

use actix_multipart::Multipart;
use chrono::NaiveDate;
use futures_util::TryStreamExt;

use crate::{
    errors::AppError,
    utils::{self, field_label, UPLOAD_STAMP_FORMAT},
};

/// A file part from a registration form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub field: String,
    pub filename: String,
    pub data: Vec<u8>,
}

/// Text fields and file parts of one multipart request, fully buffered.
#[derive(Debug, Default)]
pub struct RegistrationForm {
    fields: HashMap<String, String>,
    files: Vec<Upload>,
}

impl RegistrationForm {
    /// Drains `payload`, failing once the combined part size passes `limit`.
    pub async fn read(mut payload: Multipart, limit: usize) -> Result<Self, AppError> {
        let mut form = RegistrationForm::default();
        let mut total = 0usize;

        while let Some(mut field) = payload
            .try_next()
            .await
            .map_err(|e| AppError::MultipartError(e.to_string()))?
        {
            let (name, filename) = match field.content_disposition() {
                Some(cd) => (
                    cd.get_name().map(str::to_owned),
                    cd.get_filename().map(str::to_owned),
                ),
                None => (None, None),
            };

            let mut data = Vec::new();
            while let Some(chunk) = field
                .try_next()
                .await
                .map_err(|e| AppError::MultipartError(e.to_string()))?
            {
                total += chunk.len();
                if total > limit {
                    return Err(AppError::PayloadTooLarge(limit));
                }
                data.extend_from_slice(&chunk);
            }

            let Some(name) = name else { continue };
            match filename {
                Some(filename) => form.files.push(Upload {
                    field: name,
                    filename,
                    data,
                }),
                None => {
                    let value = String::from_utf8_lossy(&data).into_owned();
                    form.fields.entry(name).or_insert(value);
                }
            }
        }

        Ok(form)
    }

    pub fn insert_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_owned(), value.to_owned());
    }

    pub fn push_file(&mut self, upload: Upload) {
        self.files.push(upload);
    }

    /// Untrimmed value, used for the password.
    pub fn raw(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn text(&self, name: &str) -> &str {
        self.raw(name).trim()
    }

    /// Trimmed value, or `None` when blank.
    pub fn optional(&self, name: &str) -> Option<String> {
        Some(self.text(name))
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    }

    pub fn optional_upper(&self, name: &str) -> Option<String> {
        self.optional(name).map(|value| value.to_uppercase())
    }

    pub fn optional_lower(&self, name: &str) -> Option<String> {
        self.optional(name).map(|value| value.to_lowercase())
    }

    /// Unparseable dates are dropped rather than rejected.
    pub fn optional_date(&self, name: &str) -> Option<NaiveDate> {
        self.optional(name)
            .and_then(|value| NaiveDate::parse_from_str(&value, utils::DATE_FORMAT).ok())
    }

    /// Fails on the first blank field, in the order given.
    pub fn require(&self, names: &[&str]) -> Result<(), AppError> {
        match names.iter().find(|name| self.text(name).is_empty()) {
            Some(name) => Err(AppError::MissingField(field_label(name))),
            None => Ok(()),
        }
    }

    /// File parts submitted under `field` that carry a file name.
    pub fn files<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Upload> + 'a {
        self.files
            .iter()
            .filter(move |upload| upload.field == field && !upload.filename.is_empty())
    }

    pub fn file(&self, field: &str) -> Option<&Upload> {
        self.files
            .iter()
            .find(|upload| upload.field == field && !upload.filename.is_empty())
    }
}

/// Writes `upload` into `dir` under a timestamped, sanitized name and returns
/// the public path it will be served from.
pub async fn save_upload(
    dir: &Path,
    public_prefix: &str,
    role: &str,
    upload: &Upload,
) -> Result<String, AppError> {
    let stamp = chrono::Local::now().format(UPLOAD_STAMP_FORMAT);
    let filename = utils::secure_filename(&format!("{}_{}_{}", stamp, role, upload.filename));

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&filename), &upload.data).await?;
    log::info!("Saved upload {} ({} bytes)", filename, upload.data.len());

    Ok(format!("{}/{}", public_prefix.trim_end_matches('/'), filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        let mut form = RegistrationForm::default();
        form.insert_field("company-name", "  Acme Pharma ");
        form.insert_field("gstin", " 27aapfu0939f1zv ");
        form.insert_field("license-expiry", "2031-02-30");
        form.insert_field("password", " pass word ");
        form.insert_field("license-number", "   ");
        form
    }

    #[test]
    fn require_names_first_blank_field() {
        let form = form();
        let err = form
            .require(&["company-name", "license-number", "contact-name"])
            .unwrap_err();
        assert_eq!(err.to_string(), "License Number is required");
        assert!(form.require(&["company-name"]).is_ok());
    }

    #[test]
    fn text_helpers_normalize_values() {
        let form = form();
        assert_eq!(form.text("company-name"), "Acme Pharma");
        assert_eq!(form.raw("password"), " pass word ");
        assert_eq!(form.optional_upper("gstin").as_deref(), Some("27AAPFU0939F1ZV"));
        assert_eq!(form.optional("website"), None);
        assert_eq!(form.optional_date("license-expiry"), None);
    }

    #[test]
    fn files_without_names_are_ignored() {
        let mut form = RegistrationForm::default();
        form.push_file(Upload {
            field: "other-documents".to_string(),
            filename: String::new(),
            data: Vec::new(),
        });
        form.push_file(Upload {
            field: "other-documents".to_string(),
            filename: "gmp.pdf".to_string(),
            data: b"%PDF".to_vec(),
        });
        assert_eq!(form.files("other-documents").count(), 1);
        assert!(form.file("license-document").is_none());
    }

    #[actix_web::test]
    async fn save_upload_writes_sanitized_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = Upload {
            field: "license-document".to_string(),
            filename: "my licence (signed).pdf".to_string(),
            data: b"%PDF-1.4".to_vec(),
        };
        let path = save_upload(dir.path(), "/static/uploads/manufacturers", "license", &upload)
            .await
            .unwrap();

        assert!(path.starts_with("/static/uploads/manufacturers/"));
        assert!(path.ends_with("_license_my_licence_signed.pdf"));
        let stored = path.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(dir.path().join(stored)).unwrap(), b"%PDF-1.4");
    }
}
