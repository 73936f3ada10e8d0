//! RepairDesk API Library
//!
//! Maintenance requests, invoicing and a point-of-sale product catalog
//! behind one axum service.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod pos;
pub mod reports;
pub mod seed;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::ToSchema;

use handlers::{invoices, maintenance_requests, products, technicians};
use services::storage::{ImageStore, LocalImageStore};

/// Room left in a product form for the text fields next to the largest image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the services over `db`, storing product images under `config.storage_dir`.
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let images: Arc<dyn ImageStore> = Arc::new(LocalImageStore::new(
            config.storage_dir.clone(),
            config.storage_url_prefix.clone(),
        ));
        let services = handlers::AppServices::new(db.clone(), &config, images);
        Self {
            db,
            config,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Result of a handler that creates a record (201)
pub type ApiCreated<T> =
    Result<(axum::http::StatusCode, Json<ApiResponse<T>>), errors::ServiceError>;

/// Resource routes for the maintenance desk and the POS catalog
pub fn api_routes(config: &config::AppConfig) -> Router<AppState> {
    let maintenance = Router::new()
        .route(
            "/maintenance/requests",
            get(maintenance_requests::list_requests).post(maintenance_requests::create_request),
        )
        .route(
            "/maintenance/requests/:id",
            get(maintenance_requests::get_request)
                .put(maintenance_requests::update_request)
                .delete(maintenance_requests::delete_request),
        )
        .route(
            "/maintenance/technicians",
            get(technicians::list_technicians).post(technicians::create_technician),
        )
        .route(
            "/maintenance/technicians/:id",
            get(technicians::get_technician).delete(technicians::delete_technician),
        )
        .route(
            "/maintenance/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/maintenance/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/maintenance/invoices/:id/print", get(invoices::print_invoice));

    let catalog = Router::new()
        .route(
            "/productpos",
            get(products::list_products).post(products::create_product),
        )
        .route("/productpos/checkout", post(products::checkout))
        .route(
            "/productpos/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .layer(DefaultBodyLimit::max(
            config.max_image_bytes + FORM_OVERHEAD_BYTES,
        ));

    maintenance.merge(catalog)
}

/// Full application router: API, health, stored images, Swagger UI,
/// request ids and HTTP tracing. CORS and compression are added by the binary.
pub fn app_router(state: AppState) -> Router {
    let images = ServeDir::new(&state.config.storage_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(api_status))
        .merge(api_routes(&state.config))
        .nest_service(&state.config.storage_url_prefix, images)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses((status = 200, description = "Service status", body = ApiResponse<serde_json::Value>)),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "repairdesk-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
        "numbering_strategy": state.config.numbering_strategy,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Database connectivity", body = ApiResponse<serde_json::Value>)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "health check could not reach the database");
            "unhealthy"
        }
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
