//! Medicine batch verification registry: manufacturer and pharmacy
//! registration plus public batch lookup, served over actix-web on SQLite.
use sqlx::SqlitePool;

pub mod config;
pub mod db;
pub mod errors;
pub mod loader;
pub mod multipart;
pub mod registration;
pub mod routes;
pub mod structs;
pub mod utils;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: config::Config,
}
