use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RepairDesk API",
        version = "0.1.0",
        description = r#"
# RepairDesk API

Back office for a repair shop with a small point-of-sale counter.

## Features

- **Maintenance requests**: intake with generated `REQ-YYYYMMDD-NNNN` numbers, technician assignment and status tracking
- **Invoices**: one per request, totals computed from line items, `INV-YYYYMMDD-NNNN` numbers, printable HTML view
- **Technicians**: the repair staff directory
- **POS catalog**: products with uploaded or linked images, and a stateless checkout that returns a receipt

## Error Handling

Failures share one body. Validation failures list every violated rule per field:

```json
{
  "error": "Unprocessable Entity",
  "message": "Validation failed",
  "errors": {"items.0.quantity": ["quantity must be at least 1"]},
  "request_id": "3f1c...",
  "timestamp": "2025-06-01T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "maintenance-requests", description = "Repair request intake and lifecycle"),
        (name = "technicians", description = "Technician directory"),
        (name = "invoices", description = "Invoicing for maintenance requests"),
        (name = "products", description = "POS catalog and checkout"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Maintenance requests
        crate::handlers::maintenance_requests::list_requests,
        crate::handlers::maintenance_requests::get_request,
        crate::handlers::maintenance_requests::create_request,
        crate::handlers::maintenance_requests::update_request,
        crate::handlers::maintenance_requests::delete_request,

        // Technicians
        crate::handlers::technicians::list_technicians,
        crate::handlers::technicians::get_technician,
        crate::handlers::technicians::create_technician,
        crate::handlers::technicians::delete_technician,

        // Invoices
        crate::handlers::invoices::list_invoices,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::update_invoice,
        crate::handlers::invoices::delete_invoice,
        crate::handlers::invoices::print_invoice,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::checkout,

        // Health
        crate::health_check,
        crate::api_status,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::ResponseMeta,

            // Requests and technicians
            crate::handlers::maintenance_requests::RequestSummary,
            crate::handlers::maintenance_requests::RequestDetailResponse,
            crate::services::maintenance_requests::CreateRequestInput,
            crate::services::maintenance_requests::UpdateRequestInput,
            crate::entities::RequestStatus,
            crate::entities::RequestCategory,
            crate::handlers::technicians::TechnicianSummary,
            crate::services::technicians::CreateTechnicianInput,

            // Invoices
            crate::handlers::invoices::InvoiceSummary,
            crate::handlers::invoices::RequestBrief,
            crate::services::invoices::CreateInvoiceInput,
            crate::services::invoices::UpdateInvoiceInput,
            crate::services::invoicing::LineItem,
            crate::entities::InvoiceStatus,

            // Products and POS
            crate::handlers::products::ProductSummary,
            crate::handlers::products::ProductUpload,
            crate::handlers::products::ProductJson,
            crate::entities::ProductCategory,
            crate::services::products::CheckoutInput,
            crate::services::products::CheckoutLine,
            crate::pos::Receipt,
            crate::pos::ReceiptLine,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_resource() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("RepairDesk API"));
        assert!(json.contains("/maintenance/requests/{id}"));
        assert!(json.contains("/maintenance/invoices/{id}/print"));
        assert!(json.contains("/productpos/checkout"));
        assert!(json.contains("InvoiceSummary"));
    }
}
