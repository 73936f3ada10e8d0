use super::receipt::{Receipt, ReceiptLine, ReceiptNumber};
use crate::common::{max_money, to_money};
use crate::entities::product;
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// What the cart remembers about a product when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSnapshot {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
}

impl From<&product::Model> for ProductSnapshot {
    fn from(model: &product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            price: model.price,
        }
    }
}

/// A product and how many of it. Only [`Cart`] builds lines, and it never
/// admits one whose total would overflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    product: ProductSnapshot,
    quantity: u32,
    line_total: Decimal,
}

impl CartLine {
    pub fn product(&self) -> &ProductSnapshot {
        &self.product
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn line_total(&self) -> Decimal {
        self.line_total
    }

    fn checked_total(product: &ProductSnapshot, quantity: u32) -> Option<Decimal> {
        product.price.checked_mul(Decimal::from(quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartPhase {
    Ordering,
    Receipt(Receipt),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Insufficient cash: total is {total}, tendered {tendered}")]
    InsufficientFunds { total: Decimal, tendered: Decimal },
    #[error("A receipt is open; finish the transaction or edit the order first")]
    ReceiptOpen,
    #[error("quantity must be at least 1 (got {quantity})")]
    InvalidQuantity { quantity: u32 },
    #[error("cash_tendered must not be negative")]
    NegativeCash,
    #[error("order total may not exceed {limit}")]
    TotalTooLarge { limit: Decimal },
    #[error("cash_tendered may not exceed {limit}")]
    CashTooLarge { limit: Decimal },
}

/// One cashier session: lines in the order they were first added, cash on
/// the counter, and the receipt number the next sale will carry.
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    cash_tendered: Decimal,
    receipt_prefix: String,
    receipt_no: ReceiptNumber,
    phase: CartPhase,
}

impl Cart {
    pub fn new<R: Rng + ?Sized>(receipt_prefix: impl Into<String>, rng: &mut R) -> Self {
        let receipt_prefix = receipt_prefix.into();
        let receipt_no = ReceiptNumber::generate(&receipt_prefix, rng);
        Self {
            lines: Vec::new(),
            cash_tendered: Decimal::ZERO,
            receipt_prefix,
            receipt_no,
            phase: CartPhase::Ordering,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn cash_tendered(&self) -> Decimal {
        self.cash_tendered
    }

    pub fn receipt_no(&self) -> &ReceiptNumber {
        &self.receipt_no
    }

    pub fn phase(&self) -> &CartPhase {
        &self.phase
    }

    /// The open receipt, if checkout succeeded and the sale is not finished.
    pub fn receipt(&self) -> Option<&Receipt> {
        match &self.phase {
            CartPhase::Receipt(receipt) => Some(receipt),
            CartPhase::Ordering => None,
        }
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Cash minus total; negative while the customer still owes money.
    pub fn change(&self) -> Decimal {
        self.cash_tendered - self.total()
    }

    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn quantity_of(&self, product_id: i32) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product.id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// One more of `product`; a new line starts at quantity 1.
    pub fn add(&mut self, product: ProductSnapshot) -> Result<(), CartError> {
        self.add_quantity(product, 1)
    }

    pub fn add_quantity(&mut self, product: ProductSnapshot, quantity: u32) -> Result<(), CartError> {
        self.ensure_ordering()?;
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let too_large = CartError::TotalTooLarge { limit: max_money() };
        let existing = self.lines.iter().position(|l| l.product.id == product.id);
        let (priced_as, quantity_after) = match existing {
            Some(index) => {
                let line = &self.lines[index];
                let after = line.quantity.checked_add(quantity).ok_or(too_large.clone())?;
                (&line.product, after)
            }
            None => (&product, quantity),
        };

        let line_total =
            CartLine::checked_total(priced_as, quantity_after).ok_or(too_large.clone())?;
        self.lines
            .iter()
            .filter(|l| l.product.id != product.id)
            .try_fold(line_total, |sum, l| sum.checked_add(l.line_total))
            .filter(|total| *total <= max_money())
            .ok_or(too_large)?;

        match existing {
            Some(index) => {
                let line = &mut self.lines[index];
                line.quantity = quantity_after;
                line.line_total = line_total;
            }
            None => self.lines.push(CartLine {
                product,
                quantity: quantity_after,
                line_total,
            }),
        }
        Ok(())
    }

    /// One fewer of the product; the line disappears at zero.
    /// Returns false when the product was not in the cart.
    pub fn remove(&mut self, product_id: i32) -> Result<bool, CartError> {
        self.ensure_ordering()?;

        let Some(index) = self.lines.iter().position(|l| l.product.id == product_id) else {
            return Ok(false);
        };
        let line = &mut self.lines[index];
        if line.quantity > 1 {
            line.quantity -= 1;
            line.line_total -= line.product.price;
        } else {
            self.lines.remove(index);
        }
        Ok(true)
    }

    pub fn set_cash(&mut self, amount: Decimal) -> Result<(), CartError> {
        self.ensure_ordering()?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CartError::NegativeCash);
        }
        if amount > max_money() {
            return Err(CartError::CashTooLarge { limit: max_money() });
        }
        self.cash_tendered = amount;
        Ok(())
    }

    /// Adds a banknote or coin to the cash on the counter.
    pub fn add_cash(&mut self, amount: Decimal) -> Result<(), CartError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(CartError::NegativeCash);
        }
        let total = self
            .cash_tendered
            .checked_add(amount)
            .ok_or(CartError::CashTooLarge { limit: max_money() })?;
        self.set_cash(total)
    }

    /// Clears lines and cash once `confirm` agrees. Returns whether it did.
    pub fn reset<F>(&mut self, confirm: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if !confirm() {
            return false;
        }
        self.lines.clear();
        self.cash_tendered = Decimal::ZERO;
        self.phase = CartPhase::Ordering;
        true
    }

    /// Opens the receipt. On error nothing changes.
    pub fn checkout(&mut self, now: DateTime<Utc>) -> Result<&Receipt, CartError> {
        self.ensure_ordering()?;
        if self.lines.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let total = self.total();
        if self.cash_tendered < total {
            return Err(CartError::InsufficientFunds {
                total: to_money(total),
                tendered: to_money(self.cash_tendered),
            });
        }

        let lines = self
            .lines
            .iter()
            .map(|l| ReceiptLine {
                product_id: l.product.id,
                name: l.product.name.clone(),
                quantity: l.quantity,
                unit_price: to_money(l.product.price),
                line_total: to_money(l.line_total()),
            })
            .collect();

        self.phase = CartPhase::Receipt(Receipt::new(
            self.receipt_no.clone(),
            lines,
            total,
            self.cash_tendered,
            now,
        ));

        match &self.phase {
            CartPhase::Receipt(receipt) => Ok(receipt),
            CartPhase::Ordering => Err(CartError::EmptyCart),
        }
    }

    /// Closes the receipt and goes back to editing the same order.
    pub fn edit_order(&mut self) {
        self.phase = CartPhase::Ordering;
    }

    /// Finishes the sale: empties the cart and draws the next receipt number.
    pub fn complete_transaction<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &ReceiptNumber {
        self.lines.clear();
        self.cash_tendered = Decimal::ZERO;
        self.phase = CartPhase::Ordering;
        self.receipt_no = ReceiptNumber::generate(&self.receipt_prefix, rng);
        &self.receipt_no
    }

    fn ensure_ordering(&self) -> Result<(), CartError> {
        match self.phase {
            CartPhase::Ordering => Ok(()),
            CartPhase::Receipt(_) => Err(CartError::ReceiptOpen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal_macros::dec;

    fn burger() -> ProductSnapshot {
        ProductSnapshot {
            id: 1,
            name: "Burger".into(),
            price: dec!(79),
        }
    }

    fn tea() -> ProductSnapshot {
        ProductSnapshot {
            id: 2,
            name: "Tea".into(),
            price: dec!(45),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn lunch_cart() -> Cart {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cart = Cart::new("VRU-TH", &mut rng);
        cart.add(burger()).unwrap();
        cart.add(tea()).unwrap();
        cart.add(burger()).unwrap();
        cart
    }

    #[test]
    fn burger_and_tea_total() {
        let cart = lunch_cart();
        assert_eq!(cart.total(), dec!(203));
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.quantity_of(1), 2);
        // First-added order is kept.
        assert_eq!(cart.lines()[0].product().name, "Burger");
    }

    #[test]
    fn checkout_with_enough_cash_gives_change() {
        let mut cart = lunch_cart();
        cart.set_cash(dec!(250)).unwrap();

        let receipt = cart.checkout(now()).unwrap();
        assert_eq!(receipt.total, dec!(203));
        assert_eq!(receipt.change, dec!(47));
        assert_eq!(receipt.change.to_string(), "47.00");
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.issued_at_display, "01/06/2025 12:00");
        assert!(cart.receipt().is_some());
    }

    #[test]
    fn short_cash_is_rejected_without_state_change() {
        let mut cart = lunch_cart();
        cart.set_cash(dec!(150)).unwrap();
        let before_lines = cart.lines().to_vec();

        let result = cart.checkout(now());
        assert_matches!(
            result,
            Err(CartError::InsufficientFunds { total, tendered })
                if total == dec!(203) && tendered == dec!(150)
        );
        assert_eq!(cart.lines(), before_lines.as_slice());
        assert_eq!(cart.cash_tendered(), dec!(150));
        assert_eq!(cart.phase(), &CartPhase::Ordering);
    }

    #[test]
    fn empty_cart_cannot_check_out() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut cart = Cart::new("VRU-TH", &mut rng);
        cart.set_cash(dec!(100)).unwrap();
        assert_matches!(cart.checkout(now()), Err(CartError::EmptyCart));
    }

    #[test]
    fn exact_cash_is_enough() {
        let mut cart = lunch_cart();
        cart.set_cash(dec!(203)).unwrap();
        let receipt = cart.checkout(now()).unwrap();
        assert_eq!(receipt.change, Decimal::ZERO);
    }

    #[test]
    fn remove_decrements_then_drops_line() {
        let mut cart = lunch_cart();
        assert!(cart.remove(1).unwrap());
        assert_eq!(cart.quantity_of(1), 1);
        assert_eq!(cart.total(), dec!(124));
        assert!(cart.remove(1).unwrap());
        assert_eq!(cart.quantity_of(1), 0);
        assert_eq!(cart.lines().len(), 1);
        assert!(!cart.remove(99).unwrap());
    }

    #[test]
    fn reset_needs_confirmation() {
        let mut cart = lunch_cart();
        cart.set_cash(dec!(500)).unwrap();

        assert!(!cart.reset(|| false));
        assert_eq!(cart.item_count(), 3);

        assert!(cart.reset(|| true));
        assert!(cart.is_empty());
        assert_eq!(cart.cash_tendered(), Decimal::ZERO);
    }

    #[test]
    fn cash_accumulates_and_rejects_negatives() {
        let mut cart = lunch_cart();
        cart.add_cash(dec!(100)).unwrap();
        cart.add_cash(dec!(100)).unwrap();
        cart.add_cash(dec!(20)).unwrap();
        assert_eq!(cart.cash_tendered(), dec!(220));
        assert_eq!(cart.change(), dec!(17));
        assert_matches!(cart.add_cash(dec!(-5)), Err(CartError::NegativeCash));
        assert_matches!(cart.set_cash(dec!(-1)), Err(CartError::NegativeCash));
    }

    #[test]
    fn open_receipt_blocks_edits_until_edit_order() {
        let mut cart = lunch_cart();
        cart.set_cash(dec!(300)).unwrap();
        cart.checkout(now()).unwrap();

        assert_matches!(cart.add(tea()), Err(CartError::ReceiptOpen));
        assert_matches!(cart.remove(1), Err(CartError::ReceiptOpen));
        assert_matches!(cart.checkout(now()), Err(CartError::ReceiptOpen));

        cart.edit_order();
        cart.add(tea()).unwrap();
        assert_eq!(cart.total(), dec!(248));
    }

    #[test]
    fn complete_transaction_clears_and_draws_new_number() {
        let mut cart = lunch_cart();
        cart.set_cash(dec!(300)).unwrap();
        let sold_as = cart.checkout(now()).unwrap().receipt_no.clone();
        assert_eq!(&sold_as, cart.receipt_no());

        let mut rng = StdRng::seed_from_u64(99);
        let next = cart.complete_transaction(&mut rng).clone();

        assert!(next.as_str().starts_with("VRU-TH-"));
        assert!(cart.is_empty());
        assert_eq!(cart.cash_tendered(), Decimal::ZERO);
        assert!(cart.receipt().is_none());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut cart = Cart::new("VRU-TH", &mut rng);
        assert_matches!(
            cart.add_quantity(tea(), 0),
            Err(CartError::InvalidQuantity { quantity: 0 })
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn quantities_that_would_overflow_the_sale_are_rejected() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut cart = Cart::new("VRU-TH", &mut rng);
        cart.add_quantity(tea(), 3).unwrap();

        assert_matches!(
            cart.add_quantity(tea(), u32::MAX),
            Err(CartError::TotalTooLarge { .. })
        );
        assert_matches!(
            cart.add_quantity(burger(), 2_000_000_000),
            Err(CartError::TotalTooLarge { .. })
        );
        assert_eq!(cart.quantity_of(2), 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.total(), dec!(135));
    }

    #[test]
    fn item_count_is_not_capped_at_u32() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut cart = Cart::new("VRU-TH", &mut rng);
        let free = |id| ProductSnapshot {
            id,
            name: format!("sticker {}", id),
            price: Decimal::ZERO,
        };
        cart.add_quantity(free(1), u32::MAX).unwrap();
        cart.add_quantity(free(2), u32::MAX).unwrap();

        assert_eq!(cart.item_count(), 2 * u64::from(u32::MAX));
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn cash_beyond_the_money_ceiling_is_rejected() {
        let mut cart = lunch_cart();
        cart.set_cash(max_money()).unwrap();
        assert_matches!(cart.add_cash(dec!(0.01)), Err(CartError::CashTooLarge { .. }));
        assert_matches!(cart.add_cash(Decimal::MAX), Err(CartError::CashTooLarge { .. }));
        assert_eq!(cart.cash_tendered(), max_money());
    }
}
