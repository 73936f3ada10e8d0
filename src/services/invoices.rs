use crate::{
    common::{format_money, max_money, to_money},
    db::DbPool,
    entities::{invoice, maintenance_request, InvoiceStatus},
    errors::{FieldErrors, ServiceError},
    services::{
        contains_ci,
        invoicing::{decode_items, LineItem, PricedItems},
        maintenance_requests::find_request,
        non_blank,
        numbering::{SequenceAllocator, SequenceKind},
    },
};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

/// New invoice for a maintenance request. The amount is always derived from `items`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateInvoiceInput {
    #[schema(example = 1)]
    pub request_id: i32,
    #[schema(value_type = String, format = Date, example = "2025-06-01")]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-06-15")]
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
}

/// Partial invoice update.
///
/// Supplying `items` replaces them and recomputes `amount`, ignoring any
/// `amount` in the same payload. Without `items`, `amount` may be set directly.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateInvoiceInput {
    pub request_id: Option<i32>,
    #[schema(value_type = Option<String>, example = "450.00")]
    pub amount: Option<Decimal>,
    #[schema(value_type = Option<String>, format = Date)]
    pub issue_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub due_date: Option<NaiveDate>,
    pub items: Option<Vec<LineItem>>,
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    /// Matches invoice number or the customer on the linked request
    pub search: Option<String>,
    pub status: Option<InvoiceStatus>,
}

/// Everything the printable invoice shows
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub invoice: invoice::Model,
    pub request: maintenance_request::Model,
    pub items: Vec<LineItem>,
}

/// Billing for maintenance requests
#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    numbering: SequenceAllocator,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>, numbering: SequenceAllocator) -> Self {
        Self { db_pool, numbering }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &InvoiceFilter,
    ) -> Result<Vec<(invoice::Model, Option<maintenance_request::Model>)>, ServiceError> {
        let mut query = invoice::Entity::find().find_also_related(maintenance_request::Entity);

        if let Some(term) = non_blank(filter.search.as_deref()) {
            query = query.filter(
                Condition::any()
                    .add(contains_ci(
                        (invoice::Entity, invoice::Column::InvoiceNo),
                        term,
                    ))
                    .add(contains_ci(
                        (maintenance_request::Entity, maintenance_request::Column::CustomerName),
                        term,
                    ))
                    .add(contains_ci(
                        (maintenance_request::Entity, maintenance_request::Column::RequestNo),
                        term,
                    )),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(invoice::Column::Status.eq(status));
        }

        let rows = query
            .order_by_asc(invoice::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<invoice::Model, ServiceError> {
        find_invoice(&*self.db_pool, id).await
    }

    /// Invoice, its request and decoded line items
    #[instrument(skip(self))]
    pub async fn document(&self, id: i32) -> Result<InvoiceDocument, ServiceError> {
        let db = &*self.db_pool;
        let invoice = find_invoice(db, id).await?;
        let request = find_request(db, invoice.request_id).await?;
        let items = decode_items(invoice.items.as_deref())?;

        Ok(InvoiceDocument {
            invoice,
            request,
            items,
        })
    }

    /// Bills a request. Every rule is checked before anything is written.
    #[instrument(skip(self, input), fields(request_id = input.request_id))]
    pub async fn create(&self, input: CreateInvoiceInput) -> Result<invoice::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let mut errors = FieldErrors::new();
        if !request_exists(&txn, input.request_id).await? {
            errors.add("request_id", "selected maintenance request does not exist");
        }
        check_dates(&mut errors, input.issue_date, input.due_date);
        let priced = match PricedItems::price(input.items) {
            Ok(priced) => Some(priced),
            Err(ServiceError::Validation(item_errors)) => {
                errors.merge(item_errors);
                None
            }
            Err(other) => return Err(other),
        };
        errors.into_result()?;
        let priced = priced.ok_or_else(|| {
            ServiceError::InternalError("line items priced without result".to_string())
        })?;

        ensure_request_not_billed(&txn, input.request_id, None).await?;

        let invoice_no = self
            .numbering
            .next_number(&txn, SequenceKind::Invoice, Utc::now().date_naive())
            .await?;

        let model = invoice::ActiveModel {
            request_id: Set(input.request_id),
            amount: Set(priced.amount),
            invoice_no: Set(invoice_no),
            issue_date: Set(input.issue_date),
            due_date: Set(input.due_date),
            status: Set(InvoiceStatus::Unpaid),
            items: Set(Some(priced.to_column()?)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| write_error(e, "Invoice"))?;

        txn.commit().await?;

        counter!("repairdesk.invoices.created", 1);
        info!(invoice_id = model.id, invoice_no = %model.invoice_no, amount = %model.amount, "invoice created");
        Ok(model)
    }

    /// Applies a partial update. Identical payloads leave the row untouched.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: UpdateInvoiceInput,
    ) -> Result<invoice::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = find_invoice(&txn, id).await?;

        let mut errors = FieldErrors::new();

        if let Some(request_id) = input.request_id {
            if request_id != current.request_id && !request_exists(&txn, request_id).await? {
                errors.add("request_id", "selected maintenance request does not exist");
            }
        }

        let issue_date = input.issue_date.unwrap_or(current.issue_date);
        let due_date = input.due_date.unwrap_or(current.due_date);
        if input.issue_date.is_some() || input.due_date.is_some() {
            check_dates(&mut errors, issue_date, due_date);
        }

        let priced = match input.items {
            Some(items) => match PricedItems::price(items) {
                Ok(priced) => Some(priced),
                Err(ServiceError::Validation(item_errors)) => {
                    errors.merge(item_errors);
                    None
                }
                Err(other) => return Err(other),
            },
            None => {
                if let Some(amount) = input.amount {
                    if amount.is_sign_negative() && !amount.is_zero() {
                        errors.add("amount", "amount must not be negative");
                    } else if to_money(amount) > max_money() {
                        errors.add(
                            "amount",
                            format!("amount may not exceed {}", format_money(max_money())),
                        );
                    }
                }
                None
            }
        };

        errors.into_result()?;

        let mut active: invoice::ActiveModel = current.clone().into();
        let mut changed = false;

        if let Some(request_id) = input.request_id {
            if request_id != current.request_id {
                ensure_request_not_billed(&txn, request_id, Some(id)).await?;
                active.request_id = Set(request_id);
                changed = true;
            }
        }
        if issue_date != current.issue_date {
            active.issue_date = Set(issue_date);
            changed = true;
        }
        if due_date != current.due_date {
            active.due_date = Set(due_date);
            changed = true;
        }
        if let Some(status) = input.status {
            if status != current.status {
                active.status = Set(status);
                changed = true;
            }
        }

        match priced {
            Some(priced) => {
                let column = priced.to_column()?;
                if current.items.as_deref() != Some(column.as_str()) {
                    active.items = Set(Some(column));
                    changed = true;
                }
                if priced.amount != current.amount {
                    active.amount = Set(priced.amount);
                    changed = true;
                }
            }
            None => {
                if let Some(amount) = input.amount.map(to_money) {
                    if amount != current.amount {
                        active.amount = Set(amount);
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            txn.commit().await?;
            return Ok(current);
        }

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| write_error(e, "Invoice"))?;
        txn.commit().await?;

        info!(invoice_id = id, status = ?updated.status, amount = %updated.amount, "invoice updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = invoice::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Invoice {} not found", id)));
        }

        counter!("repairdesk.invoices.deleted", 1);
        info!(invoice_id = id, "invoice deleted");
        Ok(())
    }
}

async fn find_invoice<C: ConnectionTrait>(conn: &C, id: i32) -> Result<invoice::Model, ServiceError> {
    invoice::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", id)))
}

async fn request_exists<C: ConnectionTrait>(conn: &C, request_id: i32) -> Result<bool, ServiceError> {
    Ok(maintenance_request::Entity::find_by_id(request_id)
        .one(conn)
        .await?
        .is_some())
}

/// A request carries at most one invoice.
async fn ensure_request_not_billed<C: ConnectionTrait>(
    conn: &C,
    request_id: i32,
    except_invoice: Option<i32>,
) -> Result<(), ServiceError> {
    let mut query = invoice::Entity::find().filter(invoice::Column::RequestId.eq(request_id));
    if let Some(invoice_id) = except_invoice {
        query = query.filter(invoice::Column::Id.ne(invoice_id));
    }

    if let Some(existing) = query.one(conn).await? {
        warn!(request_id, existing = %existing.invoice_no, "request already invoiced");
        return Err(ServiceError::Conflict(format!(
            "Maintenance request {} already has invoice {}",
            request_id, existing.invoice_no
        )));
    }
    Ok(())
}

fn check_dates(errors: &mut FieldErrors, issue_date: NaiveDate, due_date: NaiveDate) {
    if due_date < issue_date {
        errors.add("due_date", "due_date must be on or after issue_date");
    }
}

fn write_error(err: sea_orm::DbErr, what: &str) -> ServiceError {
    let err = ServiceError::from_write(err, what);
    if matches!(err, ServiceError::Conflict(_)) {
        counter!("repairdesk.numbering.conflicts", 1);
        warn!(error = %err, "invoice write rejected by unique constraint");
    }
    err
}
