use crate::{
    common::to_money,
    entities::{product, ProductCategory},
    errors::{FieldErrors, ServiceError},
    handlers::common::{created, deleted, ok, ValidJson},
    pos::Receipt,
    services::{
        products::{CheckoutInput, ImageChange, ProductDraft, ProductFilter},
        storage::{ImageFormat, ImageUpload},
    },
    ApiCreated, ApiResponse, ApiResult, AppState,
};
use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "name": "Pizza",
    "price": "99.00",
    "image": "/storage/products/6f1c0f1e-8a7b-4c1e-9d55-0b6c9a1e2f30.jpg",
    "category": "food",
    "created_at": "2025-06-01T09:00:00Z",
    "updated_at": "2025-06-01T09:00:00Z"
}))]
pub struct ProductSummary {
    pub id: i32,
    #[schema(example = "Pizza")]
    pub name: String,
    #[schema(value_type = String, example = "99.00")]
    pub price: Decimal,
    /// Stored upload URL or external link
    pub image: Option<String>,
    pub category: ProductCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: to_money(model.price),
            image: model.image,
            category: model.category,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Multipart form accepted by create and update (documentation shape).
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ProductUpload {
    #[schema(example = "Pizza")]
    name: String,
    #[schema(example = "99.00")]
    price: String,
    #[schema(example = "food")]
    category: String,
    /// jpg, jpeg or png file, or a URL as plain text
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
}

/// JSON alternative to the multipart form; `image` may only be a URL.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductJson {
    pub name: Option<String>,
    #[schema(value_type = Option<String>, example = "99.00")]
    pub price: Option<Decimal>,
    #[schema(example = "food")]
    pub category: Option<String>,
    pub image: Option<String>,
}

/// Product fields collected from either a multipart form or a JSON body.
#[derive(Debug)]
pub struct ProductForm(pub ProductDraft);

#[derive(Debug, Default)]
struct RawProductForm {
    name: Option<String>,
    price: Option<String>,
    category: Option<String>,
    image: ImageChange,
    errors: FieldErrors,
}

impl RawProductForm {
    fn into_draft(self) -> Result<ProductDraft, ServiceError> {
        let mut errors = self.errors;

        let name = self.name.unwrap_or_default();
        if name.trim().is_empty() {
            errors.add("name", "name is required");
        }

        let price = match self.price.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("price", "price is required");
                None
            }
            Some(raw) => match Decimal::from_str(raw) {
                Ok(price) => Some(price),
                Err(_) => {
                    errors.add("price", "price must be a number");
                    None
                }
            },
        };

        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("category", "category is required");
                None
            }
            Some(raw) => match ProductCategory::from_str(raw) {
                Ok(category) => Some(category),
                Err(message) => {
                    errors.add("category", message);
                    None
                }
            },
        };

        match (price, category) {
            (Some(price), Some(category)) if errors.is_empty() => Ok(ProductDraft {
                name,
                price,
                category,
                image: self.image,
            }),
            _ => Err(ServiceError::Validation(errors)),
        }
    }
}

#[async_trait]
impl FromRequest<AppState> for ProductForm {
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("multipart/form-data"))
            .unwrap_or(false);

        let raw = if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
            read_multipart(multipart, state.config.max_image_bytes).await?
        } else {
            let ValidJson(body) = ValidJson::<ProductJson>::from_request(req, state).await?;
            RawProductForm {
                name: body.name,
                price: body.price.map(|p| p.to_string()),
                category: body.category,
                image: match body.image {
                    Some(url) if !url.trim().is_empty() => ImageChange::Url(url.trim().to_string()),
                    _ => ImageChange::Keep,
                },
                errors: FieldErrors::new(),
            }
        };

        raw.into_draft().map(ProductForm)
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    max_image_bytes: usize,
) -> Result<RawProductForm, ServiceError> {
    let mut form = RawProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_image_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" | "price" | "category" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_image_bytes))?;
                match name.as_str() {
                    "name" => form.name = Some(value),
                    "price" => form.price = Some(value),
                    _ => form.category = Some(value),
                }
            }
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_image_bytes))?;

                match file_name {
                    // Browsers send an empty part when no file was chosen.
                    Some(file) if file.is_empty() && data.is_empty() => {}
                    Some(file) => {
                        if data.len() > max_image_bytes {
                            form.errors.add("image", too_large(max_image_bytes));
                            continue;
                        }
                        match ImageFormat::detect(Some(&file), content_type.as_deref()) {
                            Some(format) => {
                                form.image = ImageChange::Upload(ImageUpload { format, data })
                            }
                            None => form
                                .errors
                                .add("image", "image must be a file of type: jpg, jpeg, png"),
                        }
                    }
                    None => {
                        let url = String::from_utf8_lossy(&data).trim().to_string();
                        if !url.is_empty() {
                            form.image = ImageChange::Url(url);
                        }
                    }
                }
            }
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

fn too_large(max_image_bytes: usize) -> String {
    format!(
        "image may not be greater than {} kilobytes",
        max_image_bytes / 1024
    )
}

fn multipart_error(err: MultipartError, max_image_bytes: usize) -> ServiceError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::invalid_field("image", too_large(max_image_bytes))
    } else {
        ServiceError::BadRequest(err.body_text())
    }
}

#[utoipa::path(
    get,
    path = "/productpos",
    params(ProductFilter),
    responses(
        (status = 200, description = "Products listed", body = ApiResponse<Vec<ProductSummary>>)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<ProductSummary>> {
    let products = state.services.products.list(&filter).await?;
    Ok(ok(
        "Products retrieved successfully",
        products.into_iter().map(ProductSummary::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/productpos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = ApiResponse<ProductSummary>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<ProductSummary> {
    let product = state.services.products.get(id).await?;
    Ok(ok("Product retrieved successfully", product.into()))
}

#[utoipa::path(
    post,
    path = "/productpos",
    request_body(content = ProductUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductSummary>),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 500, description = "Image could not be stored", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ProductForm(draft): ProductForm,
) -> ApiCreated<ProductSummary> {
    let product = state.services.products.create(draft).await?;
    Ok(created("Product created successfully", product.into()))
}

/// Replaces the product fields. Without an `image` field the current picture is kept.
#[utoipa::path(
    put,
    path = "/productpos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    request_body(content = ProductUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductSummary>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ProductForm(draft): ProductForm,
) -> ApiResult<ProductSummary> {
    let product = state.services.products.update(id, draft).await?;
    Ok(ok("Product updated successfully", product.into()))
}

#[utoipa::path(
    delete,
    path = "/productpos/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<()> {
    state.services.products.delete(id).await?;
    Ok(deleted("Product deleted successfully"))
}

/// Prices a sale at current catalog prices and returns its receipt. Nothing is stored.
#[utoipa::path(
    post,
    path = "/productpos/checkout",
    request_body = CheckoutInput,
    responses(
        (status = 200, description = "Sale checked out", body = ApiResponse<Receipt>),
        (status = 422, description = "Empty cart, unknown product or insufficient cash", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn checkout(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CheckoutInput>,
) -> ApiResult<Receipt> {
    let receipt = state.services.products.checkout(payload).await?;
    Ok(ok("Checkout completed", receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn raw(name: &str, price: &str, category: &str) -> RawProductForm {
        RawProductForm {
            name: Some(name.into()),
            price: Some(price.into()),
            category: Some(category.into()),
            ..Default::default()
        }
    }

    #[test]
    fn form_fields_become_a_draft() {
        let draft = raw("Green Tea", "25", "Beverage").into_draft().unwrap();
        assert_eq!(draft.price, dec!(25));
        assert_eq!(draft.category, ProductCategory::Beverage);
        assert!(matches!(draft.image, ImageChange::Keep));
    }

    #[test]
    fn every_bad_field_is_reported() {
        let err = raw("", "abc", "toys").into_draft().unwrap_err();
        match err {
            ServiceError::Validation(fields) => {
                assert!(fields.contains("name"));
                assert!(fields.contains("price"));
                assert!(fields.contains("category"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn image_errors_survive_into_the_result() {
        let mut form = raw("Cake", "80", "dessert");
        form.errors.add("image", "image must be a file of type: jpg, jpeg, png");
        let err = form.into_draft().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(f) if f.contains("image")));
    }
}
