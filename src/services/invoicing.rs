use crate::{
    common::{format_money, max_money, to_money},
    errors::{FieldErrors, ServiceError},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One billable entry on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    #[schema(example = "labor")]
    pub description: String,
    #[schema(example = 2)]
    pub quantity: i32,
    #[schema(value_type = String, example = "150.00")]
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: i32, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// quantity × unit_price, or `None` when the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }
}

/// Checks every item rule and reports all violations at once, keyed
/// `items`, `items.N.description`, `items.N.quantity`, `items.N.unit_price`.
pub fn validate_line_items(items: &[LineItem]) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if items.is_empty() {
        errors.add("items", "items must contain at least one line item");
        return errors;
    }

    for (i, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            errors.add(
                format!("items.{}.description", i),
                "description is required",
            );
        }
        if item.quantity < 1 {
            errors.add(
                format!("items.{}.quantity", i),
                "quantity must be at least 1",
            );
        }
        if item.unit_price.is_sign_negative() && !item.unit_price.is_zero() {
            errors.add(
                format!("items.{}.unit_price", i),
                "unit_price must not be negative",
            );
        }
        if item.line_total().is_none() {
            errors.add(
                format!("items.{}.unit_price", i),
                "quantity × unit_price is too large",
            );
        }
    }

    match compute_total(items) {
        Some(total) if total <= max_money() => {}
        _ => errors.add(
            "items",
            format!("invoice total may not exceed {}", format_money(max_money())),
        ),
    }

    errors
}

/// Σ quantity × unit_price, rounded to two places. `None` on overflow.
pub fn compute_total(items: &[LineItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
        .map(to_money)
}

/// Validated items and their total, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItems {
    pub items: Vec<LineItem>,
    pub amount: Decimal,
}

impl PricedItems {
    pub fn price(items: Vec<LineItem>) -> Result<Self, ServiceError> {
        validate_line_items(&items).into_result()?;
        let amount = compute_total(&items).ok_or_else(|| {
            ServiceError::InternalError("validated line items overflowed".to_string())
        })?;
        Ok(Self { items, amount })
    }

    /// Column text for `invoices.items`.
    pub fn to_column(&self) -> Result<String, ServiceError> {
        encode_items(&self.items)
    }
}

pub fn encode_items(items: &[LineItem]) -> Result<String, ServiceError> {
    Ok(serde_json::to_string(items)?)
}

/// Reads `invoices.items`; a missing column reads as no items.
pub fn decode_items(column: Option<&str>) -> Result<Vec<LineItem>, ServiceError> {
    match column.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(text) => Ok(serde_json::from_str(text)?),
    }
}
