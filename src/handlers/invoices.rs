use crate::{
    common::to_money,
    entities::{invoice, maintenance_request, InvoiceStatus, RequestStatus},
    errors::ServiceError,
    handlers::common::{created, deleted, ok, ValidJson},
    reports::render_invoice,
    services::{
        invoices::{CreateInvoiceInput, InvoiceFilter, UpdateInvoiceInput},
        invoicing::{decode_items, LineItem},
    },
    ApiCreated, ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// The billed request as shown next to an invoice
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestBrief {
    pub id: i32,
    #[schema(example = "REQ-20250601-0001")]
    pub request_no: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: RequestStatus,
}

impl From<maintenance_request::Model> for RequestBrief {
    fn from(model: maintenance_request::Model) -> Self {
        Self {
            id: model.id,
            request_no: model.request_no,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            status: model.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "request_id": 1,
    "invoice_no": "INV-20250601-0001",
    "amount": "399.50",
    "issue_date": "2025-06-01",
    "due_date": "2025-06-15",
    "status": "unpaid",
    "items": [
        {"description": "labor", "quantity": 2, "unit_price": "150.00"},
        {"description": "part", "quantity": 1, "unit_price": "99.50"}
    ],
    "created_at": "2025-06-01T09:00:00Z",
    "updated_at": "2025-06-01T09:00:00Z"
}))]
pub struct InvoiceSummary {
    pub id: i32,
    pub request_id: i32,
    /// Generated `INV-YYYYMMDD-NNNN` number
    #[schema(example = "INV-20250601-0001")]
    pub invoice_no: String,
    #[schema(value_type = String, example = "399.50")]
    pub amount: Decimal,
    #[schema(value_type = String, format = Date)]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present in listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestBrief>,
}

impl InvoiceSummary {
    /// Fails only when the stored items column is unreadable.
    pub fn new(
        model: invoice::Model,
        request: Option<maintenance_request::Model>,
    ) -> Result<Self, ServiceError> {
        let items = decode_items(model.items.as_deref())?;
        Ok(Self {
            id: model.id,
            request_id: model.request_id,
            invoice_no: model.invoice_no,
            amount: to_money(model.amount),
            issue_date: model.issue_date,
            due_date: model.due_date,
            status: model.status,
            items: items
                .into_iter()
                .map(|item| LineItem {
                    unit_price: to_money(item.unit_price),
                    ..item
                })
                .collect(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            request: request.map(RequestBrief::from),
        })
    }
}

#[utoipa::path(
    get,
    path = "/maintenance/invoices",
    params(InvoiceFilter),
    responses(
        (status = 200, description = "Invoices listed", body = ApiResponse<Vec<InvoiceSummary>>)
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(filter): Query<InvoiceFilter>,
) -> ApiResult<Vec<InvoiceSummary>> {
    let rows = state.services.invoices.list(&filter).await?;
    let invoices = rows
        .into_iter()
        .map(|(invoice, request)| InvoiceSummary::new(invoice, request))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ok("Invoices retrieved successfully", invoices))
}

#[utoipa::path(
    get,
    path = "/maintenance/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice fetched", body = ApiResponse<InvoiceSummary>),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<InvoiceSummary> {
    let doc = state.services.invoices.document(id).await?;
    Ok(ok(
        "Invoice retrieved successfully",
        InvoiceSummary::new(doc.invoice, Some(doc.request))?,
    ))
}

/// Bills a maintenance request. `amount` is computed from `items`.
#[utoipa::path(
    post,
    path = "/maintenance/invoices",
    request_body = CreateInvoiceInput,
    responses(
        (status = 201, description = "Invoice created", body = ApiResponse<InvoiceSummary>),
        (status = 409, description = "Request already invoiced or number taken", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateInvoiceInput>,
) -> ApiCreated<InvoiceSummary> {
    let invoice = state.services.invoices.create(payload).await?;
    Ok(created(
        "Invoice created successfully",
        InvoiceSummary::new(invoice, None)?,
    ))
}

#[utoipa::path(
    put,
    path = "/maintenance/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceInput,
    responses(
        (status = 200, description = "Invoice updated", body = ApiResponse<InvoiceSummary>),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Target request already invoiced", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidJson(payload): ValidJson<UpdateInvoiceInput>,
) -> ApiResult<InvoiceSummary> {
    let invoice = state.services.invoices.update(id, payload).await?;
    Ok(ok(
        "Invoice updated successfully",
        InvoiceSummary::new(invoice, None)?,
    ))
}

#[utoipa::path(
    delete,
    path = "/maintenance/invoices/{id}",
    params(("id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn delete_invoice(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    state.services.invoices.delete(id).await?;
    Ok(deleted("Invoice deleted successfully"))
}

/// Printable HTML invoice
#[utoipa::path(
    get,
    path = "/maintenance/invoices/{id}/print",
    params(("id" = i32, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Printable invoice", content_type = "text/html", body = String),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn print_invoice(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Html<String>, ServiceError> {
    let doc = state.services.invoices.document(id).await?;
    Ok(Html(render_invoice(&doc)))
}
