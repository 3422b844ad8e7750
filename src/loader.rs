use std::{io::Read, path::Path};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{db, errors::AppError, structs::NewMedicineBatch};

const PROGRESS_EVERY: usize = 5;

#[derive(Debug, Deserialize)]
struct BatchRow {
    medicine_id: Option<i64>,
    batch_number: String,
    medicine_name: String,
    manufacture_date: NaiveDate,
    expiry_date: NaiveDate,
    #[serde(default)]
    pharmacy_name: Option<String>,
}

impl BatchRow {
    fn into_batch(self, uploaded_at: NaiveDateTime) -> NewMedicineBatch {
        NewMedicineBatch {
            medicine_id: self.medicine_id,
            batch_number: self.batch_number.to_uppercase(),
            medicine_name: self.medicine_name,
            manufacture_date: self.manufacture_date,
            expiry_date: self.expiry_date,
            pharmacy_name: self.pharmacy_name.filter(|name| !name.is_empty()),
            date_uploaded: uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub inserted: u64,
    pub rows_in_table: i64,
}

/// Parses batch rows from CSV with a header line. Blank rows are skipped and
/// every row shares `uploaded_at`.
pub fn parse_batches<R: Read>(
    reader: R,
    uploaded_at: NaiveDateTime,
) -> Result<Vec<NewMedicineBatch>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut batches = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: BatchRow = record.deserialize(Some(&headers))?;
        batches.push(row.into_batch(uploaded_at));
        if batches.len() % PROGRESS_EVERY == 0 {
            log::info!("Read {} rows...", batches.len());
        }
    }
    Ok(batches)
}

/// Replaces the whole batch table with the contents of `path`.
pub async fn load_batches(pool: &SqlitePool, path: &Path) -> Result<LoadReport, AppError> {
    log::info!("Loading medicine batches from {}", path.display());
    let file = std::fs::File::open(path)?;
    let batches = parse_batches(file, chrono::Utc::now().naive_utc())?;

    if batches.is_empty() {
        log::warn!("No valid data found in {}", path.display());
    }

    log::info!("Inserting {} batches...", batches.len());
    let inserted = db::replace_batches(pool, &batches).await?;
    let rows_in_table = db::count_batches(pool).await?;
    Ok(LoadReport {
        inserted,
        rows_in_table,
    })
}
