//! Point-of-sale cart and receipts.
//!
//! The cart is a plain value owned by one session (the CLI's interactive
//! loop, or a single checkout request). Nothing here touches storage.

pub mod cart;
pub mod receipt;

pub use cart::{Cart, CartError, CartLine, CartPhase, ProductSnapshot};
pub use receipt::{Receipt, ReceiptLine, ReceiptNumber};

use crate::errors::ServiceError;

impl From<CartError> for ServiceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InsufficientFunds { .. } => ServiceError::InsufficientFunds(err.to_string()),
            CartError::InvalidQuantity { .. } | CartError::TotalTooLarge { .. } => {
                ServiceError::invalid_field("quantity", err.to_string())
            }
            CartError::NegativeCash | CartError::CashTooLarge { .. } => {
                ServiceError::invalid_field("cash_tendered", err.to_string())
            }
            CartError::EmptyCart | CartError::ReceiptOpen => {
                ServiceError::InvalidOperation(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    #[test]
    fn cart_errors_map_to_unprocessable() {
        let errors = [
            CartError::EmptyCart,
            CartError::ReceiptOpen,
            CartError::NegativeCash,
            CartError::InvalidQuantity { quantity: 0 },
            CartError::TotalTooLarge { limit: dec!(99999999.99) },
            CartError::CashTooLarge { limit: dec!(99999999.99) },
            CartError::InsufficientFunds {
                total: dec!(203),
                tendered: dec!(150),
            },
        ];
        for err in errors {
            let service: ServiceError = err.into();
            assert_eq!(service.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
}
