//! Offline seeding: `load-batches [CSV_PATH]` wipes `medicine_batches` and
//! reloads it from CSV.
use std::path::PathBuf;

use envconfig::Envconfig;

use pharmaledger::{config::Config, db, errors::AppError, loader};

async fn run() -> Result<(), AppError> {
    let config = Config::init_from_env()?;
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.batch_csv.clone());

    if !path.exists() {
        log::error!("CSV file '{}' not found", path.display());
        std::process::exit(1);
    }

    let pool = db::connect(&config.database_url).await?;
    db::migrate(&pool).await?;

    let report = loader::load_batches(&pool, &path).await?;
    log::info!("Data loaded successfully, {} batches inserted", report.inserted);
    log::info!("DB verification: {} rows in table", report.rows_in_table);
    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Err(e) = run().await {
        log::error!("Batch load failed: {}", e);
        std::process::exit(1);
    }
}
