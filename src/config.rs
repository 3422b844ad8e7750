use envconfig::Envconfig;
use std::path::PathBuf;

use crate::structs::RegistrantKind;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL", default = "sqlite://pharmaledger.db")]
    pub database_url: String,

    #[envconfig(from = "HOST", default = "127.0.0.1")]
    pub host: String,

    #[envconfig(from = "PORT", default = "5000")]
    pub port: u16,

    /// Served under `/static`; uploads land in `<static_dir>/uploads/<kind>`.
    #[envconfig(from = "STATIC_DIR", default = "static")]
    pub static_dir: PathBuf,

    #[envconfig(from = "MAX_UPLOAD_BYTES", default = "10485760")]
    pub max_upload_bytes: usize,

    #[envconfig(from = "BATCH_CSV", default = "medicine_batches.csv")]
    pub batch_csv: PathBuf,
}

impl Config {
    pub fn upload_dir(&self, kind: RegistrantKind) -> PathBuf {
        self.static_dir.join("uploads").join(kind.upload_dir())
    }

    pub fn ensure_upload_dirs(&self) -> std::io::Result<()> {
        for kind in [RegistrantKind::Manufacturer, RegistrantKind::Pharmacy] {
            std::fs::create_dir_all(self.upload_dir(kind))?;
        }
        Ok(())
    }
}
