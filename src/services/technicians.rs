use crate::{
    db::DbPool,
    entities::{maintenance_request, technician},
    errors::ServiceError,
    services::validate_not_blank,
};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Input for registering a technician
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTechnicianInput {
    #[validate(
        length(min = 1, max = 255, message = "name is required (max 255 characters)"),
        custom = "validate_not_blank"
    )]
    #[schema(example = "Somchai Jaidee")]
    pub name: String,
    #[validate(length(max = 255, message = "specialty may be at most 255 characters"))]
    #[schema(example = "Air conditioner")]
    pub specialty: Option<String>,
    #[validate(length(max = 255, message = "contact may be at most 255 characters"))]
    #[schema(example = "somchai@example.com")]
    pub contact: Option<String>,
}

/// Technician directory
#[derive(Clone)]
pub struct TechnicianService {
    db_pool: Arc<DbPool>,
}

impl TechnicianService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<technician::Model>, ServiceError> {
        let technicians = technician::Entity::find()
            .order_by_asc(technician::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(technicians)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<technician::Model, ServiceError> {
        technician::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Technician {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateTechnicianInput,
    ) -> Result<technician::Model, ServiceError> {
        input.validate()?;

        let model = technician::ActiveModel {
            name: Set(input.name.trim().to_string()),
            specialty: Set(blank_to_none(input.specialty)),
            contact: Set(blank_to_none(input.contact)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| ServiceError::from_write(e, "Technician"))?;

        counter!("repairdesk.technicians.created", 1);
        info!(technician_id = model.id, "technician created");
        Ok(model)
    }

    /// Removes a technician; their requests stay, unassigned.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<u64, ServiceError> {
        let txn = self.db_pool.begin().await?;

        technician::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Technician {} not found", id)))?;

        let unassigned = maintenance_request::Entity::update_many()
            .col_expr(
                maintenance_request::Column::TechnicianId,
                Expr::value(Option::<i32>::None),
            )
            .filter(maintenance_request::Column::TechnicianId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        technician::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        counter!("repairdesk.technicians.deleted", 1);
        info!(technician_id = id, unassigned, "technician deleted");
        Ok(unassigned)
    }
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
