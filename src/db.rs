use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};

use crate::{
    errors::AppError,
    structs::{
        MedicineBatch, NewManufacturer, NewMedicineBatch, NewPharmacy, RegistrantKind,
        UniqueField, STATUS_PENDING,
    },
};

/// SQLite caps bound parameters per statement; seven are bound per batch row.
// 7 binds per row, well under SQLite's bound-parameter limit
const BATCH_INSERT_CHUNK: usize = 500;

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new().connect_with(opts).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// First batch stored under `batch_number`; the caller normalizes case.
pub async fn find_batch(
    pool: &SqlitePool,
    batch_number: &str,
) -> Result<Option<MedicineBatch>, sqlx::Error> {
    sqlx::query_as::<_, MedicineBatch>(
        "SELECT * FROM medicine_batches WHERE batch_number = ? ORDER BY medicine_id LIMIT 1",
    )
    .bind(batch_number)
    .fetch_optional(pool)
    .await
}

pub async fn get_all_batches(pool: &SqlitePool) -> Result<Vec<MedicineBatch>, sqlx::Error> {
    sqlx::query_as::<_, MedicineBatch>("SELECT * FROM medicine_batches ORDER BY medicine_id")
        .fetch_all(pool)
        .await
}

pub async fn count_batches(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM medicine_batches")
        .fetch_one(pool)
        .await
}

/// Whether a registrant of `kind` already uses `value` for `field`.
/// `value` must already be normalized.
pub async fn field_exists(
    pool: &SqlitePool,
    kind: RegistrantKind,
    field: UniqueField,
    value: &str,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        kind.table(),
        field.column()
    );
    let count = sqlx::query_scalar::<_, i64>(&query)
        .bind(value)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn create_manufacturer(
    pool: &SqlitePool,
    record: &NewManufacturer,
) -> Result<i64, AppError> {
    let now = chrono::Utc::now().naive_utc();
    let mut tx = pool.begin().await?;
    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO manufacturers (company_name, license_number, license_authority, license_expiry, \
         gstin, pan, factory_address, registered_address, contact_name, contact_designation, \
         contact_phone, contact_email, official_email, website, company_profile, certifications, \
         password_hash, license_file, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&record.company_name)
    .bind(&record.license_number)
    .bind(&record.license_authority)
    .bind(record.license_expiry)
    .bind(&record.gstin)
    .bind(&record.pan)
    .bind(&record.factory_address)
    .bind(&record.registered_address)
    .bind(&record.contact_name)
    .bind(&record.contact_designation)
    .bind(&record.contact_phone)
    .bind(&record.contact_email)
    .bind(&record.official_email)
    .bind(&record.website)
    .bind(&record.company_profile)
    .bind(&record.certifications)
    .bind(&record.password_hash)
    .bind(&record.license_file)
    .bind(STATUS_PENDING)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    match inserted {
        Ok(id) => {
            tx.commit().await?;
            log::info!("Manufacturer created: {} (id {})", record.company_name, id);
            Ok(id)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!("Failed to roll back manufacturer insert: {}", rollback_err);
            }
            Err(AppError::from_insert(e))
        }
    }
}

pub async fn create_pharmacy(pool: &SqlitePool, record: &NewPharmacy) -> Result<i64, AppError> {
    let now = chrono::Utc::now().naive_utc();
    let other_documents = if record.other_documents.is_empty() {
        None
    } else {
        Some(record.other_documents.join(","))
    };
    let mut tx = pool.begin().await?;
    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO pharmacies (pharmacy_name, pharmacy_type, license_number, license_authority, \
         license_expiry, gstin, pharmacy_address, operating_hours, website, pharmacy_description, \
         owner_name, owner_pan, contact_name, contact_designation, contact_phone, contact_email, \
         password_hash, license_file, pharmacist_certificate, other_documents, certifications, \
         status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&record.pharmacy_name)
    .bind(&record.pharmacy_type)
    .bind(&record.license_number)
    .bind(&record.license_authority)
    .bind(record.license_expiry)
    .bind(&record.gstin)
    .bind(&record.pharmacy_address)
    .bind(&record.operating_hours)
    .bind(&record.website)
    .bind(&record.pharmacy_description)
    .bind(&record.owner_name)
    .bind(&record.owner_pan)
    .bind(&record.contact_name)
    .bind(&record.contact_designation)
    .bind(&record.contact_phone)
    .bind(&record.contact_email)
    .bind(&record.password_hash)
    .bind(&record.license_file)
    .bind(&record.pharmacist_certificate)
    .bind(other_documents)
    .bind(&record.certifications)
    .bind(STATUS_PENDING)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    match inserted {
        Ok(id) => {
            tx.commit().await?;
            log::info!("Pharmacy created: {} (id {})", record.pharmacy_name, id);
            Ok(id)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!("Failed to roll back pharmacy insert: {}", rollback_err);
            }
            Err(AppError::from_insert(e))
        }
    }
}

/// Empties `medicine_batches` and inserts `batches` in a single transaction.
pub async fn replace_batches(
    pool: &SqlitePool,
    batches: &[NewMedicineBatch],
) -> Result<u64, AppError> {
    let mut tx = pool.begin().await?;
    let cleared = sqlx::query("DELETE FROM medicine_batches")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    log::info!("Cleared {} existing batches", cleared);

    let mut inserted = 0;
    for chunk in batches.chunks(BATCH_INSERT_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO medicine_batches (medicine_id, batch_number, medicine_name, \
             manufacture_date, expiry_date, pharmacy_name, date_uploaded) ",
        );
        builder.push_values(chunk, |mut row, batch| {
            row.push_bind(batch.medicine_id)
                .push_bind(batch.batch_number.clone())
                .push_bind(batch.medicine_name.clone())
                .push_bind(batch.manufacture_date)
                .push_bind(batch.expiry_date)
                .push_bind(batch.pharmacy_name.clone())
                .push_bind(batch.date_uploaded);
        });
        inserted += builder.build().execute(&mut *tx).await?.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
