use crate::{
    db::DbPool,
    entities::{invoice, maintenance_request, technician, RequestCategory, RequestStatus},
    errors::{FieldErrors, ServiceError},
    services::{
        contains_ci, double_option, non_blank, validate_not_blank,
        numbering::{SequenceAllocator, SequenceKind},
        technicians::blank_to_none,
    },
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Intake form for a new repair request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRequestInput {
    #[validate(
        length(min = 1, max = 255, message = "customer_name is required (max 255 characters)"),
        custom = "validate_not_blank"
    )]
    #[schema(example = "Somsak Rakdee")]
    pub customer_name: String,
    #[validate(
        length(min = 1, max = 20, message = "customer_phone is required (max 20 characters)"),
        custom = "validate_not_blank"
    )]
    #[schema(example = "0812345678")]
    pub customer_phone: String,
    #[validate(length(min = 1, message = "description is required"), custom = "validate_not_blank")]
    #[schema(example = "Laptop does not power on")]
    pub description: String,
    pub category: RequestCategory,
    pub technician_id: Option<i32>,
    pub notes: Option<String>,
}

/// Partial update; omitted fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRequestInput {
    #[validate(
        length(min = 1, max = 255, message = "customer_name must be 1-255 characters"),
        custom = "validate_not_blank"
    )]
    pub customer_name: Option<String>,
    #[validate(
        length(min = 1, max = 20, message = "customer_phone must be 1-20 characters"),
        custom = "validate_not_blank"
    )]
    pub customer_phone: Option<String>,
    #[validate(length(min = 1, message = "description must not be empty"), custom = "validate_not_blank")]
    pub description: Option<String>,
    pub category: Option<RequestCategory>,
    pub status: Option<RequestStatus>,
    /// `null` unassigns the technician.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub technician_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

/// Query filters for the request listing
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    /// Matches request number, customer name, phone or description
    pub search: Option<String>,
    pub category: Option<RequestCategory>,
    pub status: Option<RequestStatus>,
}

/// A request with what it links to
#[derive(Debug, Clone)]
pub struct RequestDetail {
    pub request: maintenance_request::Model,
    pub technician: Option<technician::Model>,
    pub invoice: Option<invoice::Model>,
}

/// Intake, listing and lifecycle of repair requests
#[derive(Clone)]
pub struct MaintenanceRequestService {
    db_pool: Arc<DbPool>,
    numbering: SequenceAllocator,
}

impl MaintenanceRequestService {
    pub fn new(db_pool: Arc<DbPool>, numbering: SequenceAllocator) -> Self {
        Self { db_pool, numbering }
    }

    /// Lists requests with their assigned technician, oldest first
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<(maintenance_request::Model, Option<technician::Model>)>, ServiceError> {
        let mut query = maintenance_request::Entity::find().find_also_related(technician::Entity);

        if let Some(term) = non_blank(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(contains_ci(
                        (maintenance_request::Entity, maintenance_request::Column::RequestNo),
                        term,
                    ))
                    .add(contains_ci(
                        (maintenance_request::Entity, maintenance_request::Column::CustomerName),
                        term,
                    ))
                    .add(contains_ci(
                        (maintenance_request::Entity, maintenance_request::Column::CustomerPhone),
                        term,
                    ))
                    .add(contains_ci(
                        (maintenance_request::Entity, maintenance_request::Column::Description),
                        term,
                    )),
            );
        }
        if let Some(category) = filter.category {
            query = query.filter(maintenance_request::Column::Category.eq(category));
        }
        if let Some(status) = filter.status {
            query = query.filter(maintenance_request::Column::Status.eq(status));
        }

        let rows = query
            .order_by_asc(maintenance_request::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<maintenance_request::Model, ServiceError> {
        find_request(&*self.db_pool, id).await
    }

    /// Request with its technician and invoice
    #[instrument(skip(self))]
    pub async fn get_detail(&self, id: i32) -> Result<RequestDetail, ServiceError> {
        let db = &*self.db_pool;
        let request = find_request(db, id).await?;
        let technician = request.find_related(technician::Entity).one(db).await?;
        let invoice = request.find_related(invoice::Entity).one(db).await?;

        Ok(RequestDetail {
            request,
            technician,
            invoice,
        })
    }

    /// Records a new request in `pending` with a freshly allocated `REQ-` number
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CreateRequestInput,
    ) -> Result<maintenance_request::Model, ServiceError> {
        input.validate()?;

        let txn = self.db_pool.begin().await?;

        if let Some(technician_id) = input.technician_id {
            ensure_technician_exists(&txn, technician_id).await?;
        }

        let request_no = self
            .numbering
            .next_number(&txn, SequenceKind::Request, Utc::now().date_naive())
            .await?;

        let model = maintenance_request::ActiveModel {
            request_no: Set(request_no),
            customer_name: Set(input.customer_name.trim().to_string()),
            customer_phone: Set(input.customer_phone.trim().to_string()),
            description: Set(input.description),
            category: Set(input.category),
            status: Set(RequestStatus::Pending),
            technician_id: Set(input.technician_id),
            notes: Set(blank_to_none(input.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            let err = ServiceError::from_write(e, "Maintenance request");
            if matches!(err, ServiceError::Conflict(_)) {
                counter!("repairdesk.numbering.conflicts", 1);
                warn!(error = %err, "request number already taken");
            }
            err
        })?;

        txn.commit().await?;

        counter!("repairdesk.requests.created", 1);
        info!(request_id = model.id, request_no = %model.request_no, "maintenance request created");
        Ok(model)
    }

    /// Applies the supplied fields; a payload that changes nothing writes nothing.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: UpdateRequestInput,
    ) -> Result<maintenance_request::Model, ServiceError> {
        input.validate()?;

        let db = &*self.db_pool;
        let current = find_request(db, id).await?;

        if let Some(Some(technician_id)) = input.technician_id {
            if current.technician_id != Some(technician_id) {
                ensure_technician_exists(db, technician_id).await?;
            }
        }

        let mut active: maintenance_request::ActiveModel = current.clone().into();
        let mut changed = false;

        if let Some(name) = input.customer_name.map(|v| v.trim().to_string()) {
            if name != current.customer_name {
                active.customer_name = Set(name);
                changed = true;
            }
        }
        if let Some(phone) = input.customer_phone.map(|v| v.trim().to_string()) {
            if phone != current.customer_phone {
                active.customer_phone = Set(phone);
                changed = true;
            }
        }
        if let Some(description) = input.description {
            if description != current.description {
                active.description = Set(description);
                changed = true;
            }
        }
        if let Some(category) = input.category {
            if category != current.category {
                active.category = Set(category);
                changed = true;
            }
        }
        // Any status may follow any other.
        if let Some(status) = input.status {
            if status != current.status {
                active.status = Set(status);
                changed = true;
            }
        }
        if let Some(technician_id) = input.technician_id {
            if technician_id != current.technician_id {
                active.technician_id = Set(technician_id);
                changed = true;
            }
        }
        if let Some(notes) = input.notes.map(blank_to_none) {
            if notes != current.notes {
                active.notes = Set(notes);
                changed = true;
            }
        }

        if !changed {
            return Ok(current);
        }

        let updated = active.update(db).await?;
        info!(request_id = id, status = ?updated.status, "maintenance request updated");
        Ok(updated)
    }

    /// Deletes the request together with its invoice
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        find_request(&txn, id).await?;

        let invoices_removed = invoice::Entity::delete_many()
            .filter(invoice::Column::RequestId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        maintenance_request::Entity::delete_by_id(id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        counter!("repairdesk.requests.deleted", 1);
        info!(request_id = id, invoices_removed, "maintenance request deleted");
        Ok(())
    }
}

pub(crate) async fn find_request<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<maintenance_request::Model, ServiceError> {
    maintenance_request::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Maintenance request {} not found", id)))
}

async fn ensure_technician_exists<C: ConnectionTrait>(
    conn: &C,
    technician_id: i32,
) -> Result<(), ServiceError> {
    let exists = technician::Entity::find_by_id(technician_id)
        .one(conn)
        .await?
        .is_some();
    if exists {
        Ok(())
    } else {
        Err(ServiceError::Validation(FieldErrors::single(
            "technician_id",
            "selected technician does not exist",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_payload_distinguishes_null_from_absent() {
        let absent: UpdateRequestInput = serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(absent.technician_id, None);
        assert_eq!(absent.status, Some(RequestStatus::Completed));

        let cleared: UpdateRequestInput = serde_json::from_str(r#"{"technician_id":null}"#).unwrap();
        assert_eq!(cleared.technician_id, Some(None));

        let assigned: UpdateRequestInput = serde_json::from_str(r#"{"technician_id":3}"#).unwrap();
        assert_eq!(assigned.technician_id, Some(Some(3)));
    }

    #[test]
    fn unknown_status_is_rejected_at_parse_time() {
        let parsed = serde_json::from_str::<UpdateRequestInput>(r#"{"status":"archived"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn create_input_limits_phone_length() {
        let input = CreateRequestInput {
            customer_name: "Somsak".into(),
            customer_phone: "0".repeat(21),
            description: "Fan noise".into(),
            category: RequestCategory::AirConditioner,
            technician_id: None,
            notes: None,
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("customer_phone"));
    }

    #[test]
    fn whitespace_only_text_fails_validation() {
        let input = CreateRequestInput {
            customer_name: "   ".into(),
            customer_phone: "0812345678".into(),
            description: "Fan noise".into(),
            category: RequestCategory::AirConditioner,
            technician_id: None,
            notes: None,
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_name"));
        assert!(!fields.contains_key("description"));

        let update = UpdateRequestInput {
            description: Some("\t".into()),
            ..Default::default()
        };
        assert!(update.validate().unwrap_err().field_errors().contains_key("description"));
    }
}
