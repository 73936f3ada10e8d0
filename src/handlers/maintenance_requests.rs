use crate::{
    entities::{maintenance_request, technician, RequestCategory, RequestStatus},
    errors::ServiceError,
    handlers::{
        common::{created, deleted, ok, ValidJson},
        invoices::InvoiceSummary,
        technicians::TechnicianSummary,
    },
    services::maintenance_requests::{CreateRequestInput, RequestFilter, UpdateRequestInput},
    ApiCreated, ApiResponse, ApiResult, AppState,
};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "request_no": "REQ-20250601-0001",
    "customer_name": "Somsak Rakdee",
    "customer_phone": "0812345678",
    "description": "Laptop does not power on",
    "category": "computer",
    "status": "pending",
    "technician_id": 2,
    "notes": null,
    "created_at": "2025-06-01T09:00:00Z",
    "updated_at": "2025-06-01T09:00:00Z",
    "technician": {"id": 2, "name": "Somying Chaidee", "specialty": "Computer", "contact": "082-345-6789",
        "created_at": "2025-06-01T08:00:00Z", "updated_at": "2025-06-01T08:00:00Z"}
}))]
pub struct RequestSummary {
    pub id: i32,
    /// Generated `REQ-YYYYMMDD-NNNN` number
    #[schema(example = "REQ-20250601-0001")]
    pub request_no: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub description: String,
    pub category: RequestCategory,
    pub status: RequestStatus,
    pub technician_id: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Assigned technician, if any
    pub technician: Option<TechnicianSummary>,
}

impl RequestSummary {
    pub fn new(model: maintenance_request::Model, technician: Option<technician::Model>) -> Self {
        Self {
            id: model.id,
            request_no: model.request_no,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            description: model.description,
            category: model.category,
            status: model.status,
            technician_id: model.technician_id,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
            technician: technician.map(TechnicianSummary::from),
        }
    }
}

/// A request with its technician and invoice
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDetailResponse {
    #[serde(flatten)]
    pub request: RequestSummary,
    pub invoice: Option<InvoiceSummary>,
}

#[utoipa::path(
    get,
    path = "/maintenance/requests",
    params(RequestFilter),
    responses(
        (status = 200, description = "Requests listed", body = ApiResponse<Vec<RequestSummary>>)
    ),
    tag = "maintenance-requests"
)]
pub async fn list_requests(
    State(state): State<AppState>,
    Query(filter): Query<RequestFilter>,
) -> ApiResult<Vec<RequestSummary>> {
    let rows = state.services.requests.list(&filter).await?;
    let requests = rows
        .into_iter()
        .map(|(request, technician)| RequestSummary::new(request, technician))
        .collect();
    Ok(ok("Maintenance requests retrieved successfully", requests))
}

#[utoipa::path(
    get,
    path = "/maintenance/requests/{id}",
    params(("id" = i32, Path, description = "Maintenance request ID")),
    responses(
        (status = 200, description = "Request fetched", body = ApiResponse<RequestDetailResponse>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "maintenance-requests"
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<RequestDetailResponse> {
    let detail = state.services.requests.get_detail(id).await?;
    let invoice = detail
        .invoice
        .map(|invoice| InvoiceSummary::new(invoice, None))
        .transpose()?;

    Ok(ok(
        "Maintenance request retrieved successfully",
        RequestDetailResponse {
            request: RequestSummary::new(detail.request, detail.technician),
            invoice,
        },
    ))
}

#[utoipa::path(
    post,
    path = "/maintenance/requests",
    request_body = CreateRequestInput,
    responses(
        (status = 201, description = "Request created", body = ApiResponse<RequestSummary>),
        (status = 409, description = "Request number already taken", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "maintenance-requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateRequestInput>,
) -> ApiCreated<RequestSummary> {
    let request = state.services.requests.create(payload).await?;
    let technician = assigned_technician(&state, &request).await?;
    Ok(created(
        "Maintenance request created successfully",
        RequestSummary::new(request, technician),
    ))
}

#[utoipa::path(
    put,
    path = "/maintenance/requests/{id}",
    params(("id" = i32, Path, description = "Maintenance request ID")),
    request_body = UpdateRequestInput,
    responses(
        (status = 200, description = "Request updated", body = ApiResponse<RequestSummary>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "maintenance-requests"
)]
pub async fn update_request(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidJson(payload): ValidJson<UpdateRequestInput>,
) -> ApiResult<RequestSummary> {
    let request = state.services.requests.update(id, payload).await?;
    let technician = assigned_technician(&state, &request).await?;
    Ok(ok(
        "Maintenance request updated successfully",
        RequestSummary::new(request, technician),
    ))
}

/// Deletes the request and its invoice.
#[utoipa::path(
    delete,
    path = "/maintenance/requests/{id}",
    params(("id" = i32, Path, description = "Maintenance request ID")),
    responses(
        (status = 200, description = "Request deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Request not found", body = crate::errors::ErrorResponse)
    ),
    tag = "maintenance-requests"
)]
pub async fn delete_request(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    state.services.requests.delete(id).await?;
    Ok(deleted("Maintenance request deleted successfully"))
}

async fn assigned_technician(
    state: &AppState,
    request: &maintenance_request::Model,
) -> Result<Option<technician::Model>, ServiceError> {
    match request.technician_id {
        Some(id) => state.services.technicians.get(id).await.map(Some),
        None => Ok(None),
    }
}
