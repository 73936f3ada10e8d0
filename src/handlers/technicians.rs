use crate::{
    entities::technician,
    handlers::common::{created, deleted, ok, ValidJson},
    services::technicians::CreateTechnicianInput,
    ApiCreated, ApiResponse, ApiResult, AppState,
};
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Somchai Jaidee",
    "specialty": "Air conditioner",
    "contact": "081-234-5678",
    "created_at": "2025-06-01T09:00:00Z",
    "updated_at": "2025-06-01T09:00:00Z"
}))]
pub struct TechnicianSummary {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Somchai Jaidee")]
    pub name: String,
    pub specialty: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<technician::Model> for TechnicianSummary {
    fn from(model: technician::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            specialty: model.specialty,
            contact: model.contact,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/maintenance/technicians",
    responses(
        (status = 200, description = "Technicians listed", body = ApiResponse<Vec<TechnicianSummary>>)
    ),
    tag = "technicians"
)]
pub async fn list_technicians(State(state): State<AppState>) -> ApiResult<Vec<TechnicianSummary>> {
    let technicians = state.services.technicians.list().await?;
    Ok(ok(
        "Technicians retrieved successfully",
        technicians.into_iter().map(TechnicianSummary::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/maintenance/technicians/{id}",
    params(("id" = i32, Path, description = "Technician ID")),
    responses(
        (status = 200, description = "Technician fetched", body = ApiResponse<TechnicianSummary>),
        (status = 404, description = "Technician not found", body = crate::errors::ErrorResponse)
    ),
    tag = "technicians"
)]
pub async fn get_technician(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<TechnicianSummary> {
    let technician = state.services.technicians.get(id).await?;
    Ok(ok("Technician retrieved successfully", technician.into()))
}

#[utoipa::path(
    post,
    path = "/maintenance/technicians",
    request_body = CreateTechnicianInput,
    responses(
        (status = 201, description = "Technician created", body = ApiResponse<TechnicianSummary>),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "technicians"
)]
pub async fn create_technician(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateTechnicianInput>,
) -> ApiCreated<TechnicianSummary> {
    let technician = state.services.technicians.create(payload).await?;
    Ok(created("Technician created successfully", technician.into()))
}

/// Deleting a technician unassigns them from their requests.
#[utoipa::path(
    delete,
    path = "/maintenance/technicians/{id}",
    params(("id" = i32, Path, description = "Technician ID")),
    responses(
        (status = 200, description = "Technician deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Technician not found", body = crate::errors::ErrorResponse)
    ),
    tag = "technicians"
)]
pub async fn delete_technician(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<()> {
    let unassigned = state.services.technicians.delete(id).await?;
    Ok(deleted(&format!(
        "Technician deleted successfully; {} request(s) unassigned",
        unassigned
    )))
}
