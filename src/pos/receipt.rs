use crate::common::{format_display_timestamp, format_money, to_money};
use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Upper bound (exclusive) of the random part of a receipt number.
const RECEIPT_SERIAL_RANGE: u32 = 100_000;

/// `PREFIX-<0..99999>`. Random, so two sessions can draw the same number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReceiptNumber(String);

impl ReceiptNumber {
    pub fn generate<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> Self {
        let serial = rng.gen_range(0..RECEIPT_SERIAL_RANGE);
        ReceiptNumber(format!("{}-{}", prefix, serial))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReceiptLine {
    pub product_id: i32,
    pub name: String,
    pub quantity: u32,
    #[schema(value_type = String, example = "79.00")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "158.00")]
    pub line_total: Decimal,
}

/// Checkout summary shown to the cashier. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Receipt {
    #[schema(value_type = String, example = "VRU-TH-48213")]
    pub receipt_no: ReceiptNumber,
    pub lines: Vec<ReceiptLine>,
    pub item_count: u64,
    #[schema(value_type = String, example = "203.00")]
    pub total: Decimal,
    #[schema(value_type = String, example = "250.00")]
    pub cash_tendered: Decimal,
    #[schema(value_type = String, example = "47.00")]
    pub change: Decimal,
    pub issued_at: DateTime<Utc>,
    /// `dd/mm/yyyy HH:MM`
    #[schema(example = "01/06/2025 14:05")]
    pub issued_at_display: String,
}

impl Receipt {
    pub(crate) fn new(
        receipt_no: ReceiptNumber,
        lines: Vec<ReceiptLine>,
        total: Decimal,
        cash_tendered: Decimal,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let item_count = lines.iter().map(|l| u64::from(l.quantity)).sum();
        Self {
            receipt_no,
            lines,
            item_count,
            total: to_money(total),
            cash_tendered: to_money(cash_tendered),
            change: to_money(cash_tendered - total),
            issued_at,
            issued_at_display: format_display_timestamp(issued_at),
        }
    }

    /// Fixed-width text rendition for terminals.
    pub fn render_text(&self, width: usize) -> String {
        let rule = "-".repeat(width);
        let mut out = String::new();

        out.push_str(&center(&format!("Receipt {}", self.receipt_no), width));
        out.push('\n');
        out.push_str(&center(&self.issued_at_display, width));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');

        for line in &self.lines {
            let left = format!("{} x{}", line.name, line.quantity);
            out.push_str(&two_columns(&left, &format_money(line.line_total), width));
            out.push('\n');
        }

        out.push_str(&rule);
        out.push('\n');
        out.push_str(&two_columns("Total", &format_money(self.total), width));
        out.push('\n');
        out.push_str(&two_columns("Cash", &format_money(self.cash_tendered), width));
        out.push('\n');
        out.push_str(&two_columns("Change", &format_money(self.change), width));
        out.push('\n');
        out
    }
}

fn two_columns(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    let gap = width.saturating_sub(used).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let pad = width.saturating_sub(len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal_macros::dec;

    #[test]
    fn receipt_numbers_use_prefix_and_bounded_serial() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let number = ReceiptNumber::generate("VRU-TH", &mut rng);
            let serial = number
                .as_str()
                .strip_prefix("VRU-TH-")
                .expect("prefix present");
            let serial: u32 = serial.parse().unwrap();
            assert!(serial < 100_000);
        }
    }

    #[test]
    fn text_rendition_lists_lines_and_totals() {
        let receipt = Receipt::new(
            ReceiptNumber("VRU-TH-42".into()),
            vec![ReceiptLine {
                product_id: 1,
                name: "Burger".into(),
                quantity: 2,
                unit_price: dec!(79),
                line_total: dec!(158),
            }],
            dec!(158),
            dec!(200),
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
        );

        let text = receipt.render_text(32);
        assert!(text.contains("Receipt VRU-TH-42"));
        assert!(text.contains("01/06/2025 09:30"));
        assert!(text.contains("Burger x2"));
        assert!(text.contains("158.00"));
        assert!(text.contains("42.00"));
        assert_eq!(receipt.item_count, 2);
    }
}
