#![allow(dead_code)]
use std::collections::HashMap;

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::header::CONTENT_TYPE,
    test,
    web::{self, Data},
    App, Error,
};
use chrono::{Duration, NaiveDate, Utc};
use envconfig::Envconfig;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use pharmaledger::{config::Config, db, routes, structs::NewMedicineBatch, AppState};

const BOUNDARY: &str = "----pharmaledger-test-boundary";

/// App state over an in-memory database, with uploads under a temp dir that
/// lives as long as the context.
pub struct TestContext {
    pub state: AppState,
    pub static_dir: TempDir,
}

pub async fn context() -> TestContext {
    let static_dir = tempfile::tempdir().unwrap();
    let mut env = HashMap::new();
    env.insert(
        "STATIC_DIR".to_string(),
        static_dir.path().to_string_lossy().into_owned(),
    );
    let config = Config::init_from_hashmap(&env).unwrap();
    config.ensure_upload_dirs().unwrap();

    // one connection, otherwise every connection gets its own empty memory db
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::migrate(&db_pool).await.unwrap();

    TestContext {
        state: AppState { db_pool, config },
        static_dir,
    }
}

pub async fn initialize_app(
    state: &AppState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = Error> {
    test::init_service(
        App::new()
            .app_data(Data::new(state.clone()))
            .configure(routes::configure)
            .default_service(web::to(routes::default_handler)),
    )
    .await
}

pub async fn call_json<S, B>(app: &S, req: Request) -> (u16, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn batch(number: &str, expiry: NaiveDate) -> NewMedicineBatch {
    NewMedicineBatch {
        medicine_id: None,
        batch_number: number.to_string(),
        medicine_name: "Paracetamol 500mg".to_string(),
        manufacture_date: expiry - Duration::days(730),
        expiry_date: expiry,
        pharmacy_name: Some("City Care".to_string()),
        date_uploaded: Utc::now().naive_utc(),
    }
}

pub async fn seed_batches(state: &AppState, batches: &[NewMedicineBatch]) {
    db::replace_batches(&state.db_pool, batches).await.unwrap();
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn to_request(mut self, uri: &str) -> Request {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(self.body)
            .to_request()
    }
}

pub fn manufacturer_form() -> MultipartBody {
    MultipartBody::new()
        .text("company-name", "Acme Pharma Ltd")
        .text("license-number", "MH/DL/2024/0001")
        .text("license-authority", "CDSCO")
        .text("license-expiry", "2030-12-31")
        .text("gstin", "27aapfu0939f1zv")
        .text("contact-name", "Asha Rao")
        .text("contact-phone", "+91 98200 00001")
        .text("contact-email", "Asha.Rao@AcmePharma.in")
        .text("password", "Str0ng!pass")
}

pub fn pharmacy_form() -> MultipartBody {
    MultipartBody::new()
        .text("pharmacy-name", "City Care Chemists")
        .text("pharmacy-type", "retail")
        .text("license-number", "KA-RX-5521")
        .text("pharmacy-address", "12 MG Road, Bengaluru")
        .text("owner-name", "Ravi Kumar")
        .text("owner-pan", "abcde1234f")
        .text("contact-name", "Ravi Kumar")
        .text("contact-phone", "9000000002")
        .text("contact-email", "ravi@citycare.in")
        .text("password", "pharmacy-pass")
}
