use actix_multipart::Multipart;
use actix_web::{
    get, post,
    web::{self, Data},
    HttpRequest, HttpResponse, Responder, ResponseError,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    db,
    errors::AppError,
    multipart::RegistrationForm,
    registration::{self, Registration},
    structs::{RegistrantKind, UniqueField},
    utils::{DATE_FORMAT, TIMESTAMP_FORMAT},
    AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index_handler)
        .service(health_handler)
        .service(verify_batch_handler)
        .service(batches_handler)
        .service(register_manufacturer_handler)
        .service(register_pharmacy_handler)
        .service(check_field_handler);
}

/// Query pairs in request order. A repeated key keeps its first value and an
/// undecodable query string reads as empty.
struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn from_request(req: &HttpRequest) -> Self {
        let pairs = web::Query::<Vec<(String, String)>>::from_query(req.query_string())
            .map(web::Query::into_inner)
            .unwrap_or_default();
        QueryParams(pairs)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

fn iso_now() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[get("/")]
pub async fn index_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "PharmaLedger Backend is running successfully!",
        "status": "active",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/api/health")]
pub async fn health_handler(state: Data<AppState>) -> impl Responder {
    match db::ping(&state.db_pool).await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "healthy",
            "database": "connected",
            "timestamp": iso_now(),
        })),
        Err(e) => {
            log::error!("Health check failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "status": "unhealthy",
                "error": e.to_string(),
                "timestamp": iso_now(),
            }))
        }
    }
}

#[get("/api/verify-batch")]
pub async fn verify_batch_handler(req: HttpRequest, state: Data<AppState>) -> impl Responder {
    let query = QueryParams::from_request(&req);
    let batch_number = query.get("batch_number").unwrap_or("").trim().to_owned();
    if batch_number.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "message": "Batch number is required",
        }));
    }

    let batch = match db::find_batch(&state.db_pool, &batch_number.to_uppercase()).await {
        Ok(Some(batch)) => batch,
        Ok(None) => {
            return HttpResponse::NotFound().json(json!({
                "success": false,
                "isAuthentic": false,
                "message": "Batch number not found in database",
                "batchNumber": batch_number,
            }));
        }
        Err(e) => {
            log::error!("Failed to verify batch {}: {}", batch_number, e);
            return HttpResponse::InternalServerError().json(json!({
                "success": false,
                "message": "Internal server error",
                "error": e.to_string(),
            }));
        }
    };

    let today = Utc::now().date_naive();
    HttpResponse::Ok().json(json!({
        "success": true,
        "isAuthentic": batch.is_authentic(today),
        "batchNumber": batch.batch_number,
        "productName": batch.medicine_name,
        "manufacturer": "Verified Manufacturer",
        "manufactureDate": batch.manufacture_date.format(DATE_FORMAT).to_string(),
        "expiryDate": batch.expiry_date.format(DATE_FORMAT).to_string(),
        "status": batch.status_label(today),
        "pharmacyName": batch.pharmacy_name,
        "dateUploaded": batch
            .date_uploaded
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
    }))
}

#[get("/api/batches")]
pub async fn batches_handler(state: Data<AppState>) -> impl Responder {
    match db::get_all_batches(&state.db_pool).await {
        Ok(batches) => HttpResponse::Ok().json(json!({
            "success": true,
            "count": batches.len(),
            "batches": batches,
        })),
        Err(e) => {
            log::error!("Failed to get batches: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "message": "Error fetching batches",
                "error": e.to_string(),
            }))
        }
    }
}

/// 201 on success; client errors pass through, anything else is logged and flattened.
fn registration_response(result: Result<Registration, AppError>) -> HttpResponse {
    match result {
        Ok(registration) => {
            let mut body = json!({
                "success": true,
                "message": "Registration successful!",
                "registration_id": registration.registration_id,
            });
            body[registration.kind.id_key()] = json!(registration.id);
            HttpResponse::Created().json(body)
        }
        Err(e) if e.status_code().is_client_error() => e.error_response(),
        Err(e) => {
            log::error!("Registration failed: {:?}", e);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": "Registration failed. Please try again.",
            }))
        }
    }
}

#[post("/api/register-manufacturer")]
pub async fn register_manufacturer_handler(
    payload: Multipart,
    state: Data<AppState>,
) -> impl Responder {
    log::info!("Manufacturer registration received");
    let result = match RegistrationForm::read(payload, state.config.max_upload_bytes).await {
        Ok(form) => registration::register_manufacturer(&state, &form).await,
        Err(e) => Err(e),
    };
    registration_response(result)
}

#[post("/api/register-pharmacy")]
pub async fn register_pharmacy_handler(
    payload: Multipart,
    state: Data<AppState>,
) -> impl Responder {
    log::info!("Pharmacy registration received");
    let result = match RegistrationForm::read(payload, state.config.max_upload_bytes).await {
        Ok(form) => registration::register_pharmacy(&state, &form).await,
        Err(e) => Err(e),
    };
    registration_response(result)
}

#[get("/api/check-field")]
pub async fn check_field_handler(req: HttpRequest, state: Data<AppState>) -> impl Responder {
    let query = QueryParams::from_request(&req);
    let value = query.get("value").unwrap_or("").trim();
    let field = query.get("field").and_then(|f| f.parse::<UniqueField>().ok());
    let kind = RegistrantKind::from_param(query.get("type"));

    let exists = match field {
        Some(field) if !value.is_empty() => {
            db::field_exists(&state.db_pool, kind, field, &field.normalize(value))
                .await
                .unwrap_or_else(|e| {
                    log::error!("Check field error: {}", e);
                    false
                })
        }
        _ => false,
    };
    HttpResponse::Ok().json(json!({ "exists": exists }))
}

/// 405 for a known path hit with the wrong method, 404 for anything else.
pub async fn default_handler(req: HttpRequest) -> HttpResponse {
    if req.resource_map().has_resource(req.path()) {
        AppError::MethodNotAllowed.error_response()
    } else {
        AppError::NotFound.error_response()
    }
}
