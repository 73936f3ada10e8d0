use crate::{
    common::{format_money, has_cents_precision, max_money, to_money},
    db::DbPool,
    entities::{product, ProductCategory},
    errors::{FieldErrors, ServiceError},
    pos::{Cart, ProductSnapshot, Receipt},
    services::{
        contains_ci, non_blank,
        storage::{ImageStore, ImageUpload},
    },
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};

const MAX_NAME_LEN: usize = 255;

/// What to do with the product picture
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    /// Leave it as it is (new products get none)
    #[default]
    Keep,
    /// Point at an external or previously stored URL
    Url(String),
    /// Store a freshly uploaded file
    Upload(ImageUpload),
}

/// Product fields as submitted by the catalog form
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub price: Decimal,
    pub category: ProductCategory,
    pub image: ImageChange,
}

impl ProductDraft {
    fn validate(&self) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        let name_len = self.name.trim().chars().count();
        if name_len == 0 {
            errors.add("name", "name is required");
        } else if name_len > MAX_NAME_LEN {
            errors.add("name", "name may be at most 255 characters");
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            errors.add("price", "price must not be negative");
        } else if !has_cents_precision(self.price) {
            errors.add("price", "price may have at most two decimal places");
        } else if self.price > max_money() {
            errors.add(
                "price",
                format!("price may not exceed {}", format_money(max_money())),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive match on the product name
    pub search: Option<String>,
    pub category: Option<ProductCategory>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutLine {
    pub product_id: i32,
    pub quantity: u32,
}

/// A whole sale submitted at once
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CheckoutInput {
    pub lines: Vec<CheckoutLine>,
    #[schema(value_type = String, example = "250.00")]
    pub cash_tendered: Decimal,
}

/// POS product catalog
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    images: Arc<dyn ImageStore>,
    receipt_prefix: String,
}

impl ProductService {
    pub fn new(
        db_pool: Arc<DbPool>,
        images: Arc<dyn ImageStore>,
        receipt_prefix: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            images,
            receipt_prefix: receipt_prefix.into(),
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = product::Entity::find();

        if let Some(term) = non_blank(filter.search.as_deref()) {
            query = query.filter(Condition::any().add(contains_ci(
                (product::Entity, product::Column::Name),
                term,
            )));
        }
        if let Some(category) = filter.category {
            query = query.filter(product::Column::Category.eq(category));
        }

        let products = query
            .order_by_asc(product::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: ProductDraft) -> Result<product::Model, ServiceError> {
        draft.validate()?;

        let (image, stored) = match draft.image {
            ImageChange::Keep => (None, None),
            ImageChange::Url(url) => (non_blank(Some(url.as_str())).map(str::to_string), None),
            ImageChange::Upload(upload) => {
                let url = self.images.put(upload).await?;
                (Some(url.clone()), Some(url))
            }
        };

        let inserted = product::ActiveModel {
            name: Set(draft.name.trim().to_string()),
            price: Set(to_money(draft.price)),
            image: Set(image),
            category: Set(draft.category),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await;

        let model = match inserted {
            Ok(model) => model,
            Err(e) => {
                self.discard(stored.as_deref()).await;
                return Err(ServiceError::from_write(e, "Product"));
            }
        };

        counter!("repairdesk.products.created", 1);
        info!(product_id = model.id, "product created");
        Ok(model)
    }

    /// Replaces name, price and category; the image follows `draft.image`.
    /// A replaced stored image is deleted once the row is updated.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: i32, draft: ProductDraft) -> Result<product::Model, ServiceError> {
        draft.validate()?;
        let current = self.get(id).await?;

        let (image, stored) = match draft.image {
            ImageChange::Keep => (current.image.clone(), None),
            ImageChange::Url(url) => (non_blank(Some(url.as_str())).map(str::to_string), None),
            ImageChange::Upload(upload) => {
                let url = self.images.put(upload).await?;
                (Some(url.clone()), Some(url))
            }
        };

        let name = draft.name.trim().to_string();
        let mut active: product::ActiveModel = current.clone().into();
        let mut changed = false;
        if name != current.name {
            active.name = Set(name);
            changed = true;
        }
        let price = to_money(draft.price);
        if price != current.price {
            active.price = Set(price);
            changed = true;
        }
        if draft.category != current.category {
            active.category = Set(draft.category);
            changed = true;
        }
        if image != current.image {
            active.image = Set(image.clone());
            changed = true;
        }

        if !changed {
            return Ok(current);
        }

        let updated = match active.update(&*self.db_pool).await {
            Ok(model) => model,
            Err(e) => {
                self.discard(stored.as_deref()).await;
                return Err(ServiceError::from_write(e, "Product"));
            }
        };

        if let Some(old) = current.image.as_deref() {
            if image.as_deref() != Some(old) {
                self.discard(Some(old)).await;
            }
        }

        info!(product_id = id, "product updated");
        Ok(updated)
    }

    /// Deletes the stored picture, then the product.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let current = self.get(id).await?;

        if let Some(url) = current.image.as_deref() {
            self.images.delete(url).await?;
        }
        product::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;

        counter!("repairdesk.products.deleted", 1);
        info!(product_id = id, "product deleted");
        Ok(())
    }

    /// Prices a sale against the current catalog and opens its receipt.
    /// Nothing is written.
    #[instrument(skip(self, input))]
    pub async fn checkout(&self, input: CheckoutInput) -> Result<Receipt, ServiceError> {
        let ids: Vec<i32> = input.lines.iter().map(|l| l.product_id).collect();
        let catalog: HashMap<i32, product::Model> = if ids.is_empty() {
            HashMap::new()
        } else {
            product::Entity::find()
                .filter(product::Column::Id.is_in(ids))
                .all(&*self.db_pool)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let mut errors = FieldErrors::new();
        let mut cart = Cart::new(self.receipt_prefix.clone(), &mut rand::thread_rng());

        for (i, line) in input.lines.iter().enumerate() {
            match catalog.get(&line.product_id) {
                None => errors.add(
                    format!("lines.{}.product_id", i),
                    format!("product {} does not exist", line.product_id),
                ),
                Some(_) if line.quantity == 0 => errors.add(
                    format!("lines.{}.quantity", i),
                    "quantity must be at least 1",
                ),
                Some(model) => {
                    if let Err(e) = cart.add_quantity(ProductSnapshot::from(model), line.quantity) {
                        errors.add(format!("lines.{}.quantity", i), e.to_string());
                    }
                }
            }
        }
        errors.into_result()?;

        cart.set_cash(input.cash_tendered)?;
        let receipt = cart.checkout(Utc::now())?.clone();

        counter!("repairdesk.pos.checkouts", 1);
        info!(receipt_no = %receipt.receipt_no, total = %receipt.total, "checkout completed");
        Ok(receipt)
    }

    /// Best-effort removal of an image that is no longer referenced.
    async fn discard(&self, url: Option<&str>) {
        let Some(url) = url else { return };
        if !self.images.owns(url) {
            return;
        }
        if let Err(e) = self.images.delete(url).await {
            error!(%url, error = %e, "could not remove unreferenced image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft(name: &str, price: Decimal) -> ProductDraft {
        ProductDraft {
            name: name.into(),
            price,
            category: ProductCategory::Food,
            image: ImageChange::Keep,
        }
    }

    #[test]
    fn draft_requires_name_and_non_negative_price() {
        let err = draft("  ", dec!(-1)).validate().unwrap_err();
        match err {
            ServiceError::Validation(fields) => {
                assert!(fields.contains("name"));
                assert!(fields.contains("price"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(draft("Pizza", dec!(99)).validate().is_ok());
    }

    #[test]
    fn price_must_fit_the_money_column() {
        for price in [dec!(45.004), dec!(0.001), dec!(100000000), Decimal::MAX] {
            let err = draft("Tea", price).validate().unwrap_err();
            assert!(matches!(err, ServiceError::Validation(f) if f.contains("price")));
        }
        assert!(draft("Tea", dec!(45.000)).validate().is_ok());
        assert!(draft("Tea", dec!(99999999.99)).validate().is_ok());
    }

    #[test]
    fn long_names_are_rejected() {
        let err = draft(&"x".repeat(256), dec!(1)).validate().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(f) if f.contains("name")));
    }

    #[test]
    fn checkout_payload_parses() {
        let input: CheckoutInput = serde_json::from_str(
            r#"{"lines":[{"product_id":1,"quantity":2}],"cash_tendered":"250"}"#,
        )
        .unwrap();
        assert_eq!(input.lines[0].quantity, 2);
        assert_eq!(input.cash_tendered, dec!(250));
    }
}
