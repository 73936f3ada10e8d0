//! Property-based tests for money handling and document numbering.

use chrono::NaiveDate;
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use repairdesk_api::{
    common::{format_money, max_money, to_money},
    pos::{Cart, ProductSnapshot},
    services::{
        invoicing::{compute_total, validate_line_items, LineItem},
        numbering::format_sequence_number,
    },
};
use rust_decimal::Decimal;

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..4).prop_map(|(units, scale)| Decimal::new(units, scale))
}

fn item_strategy() -> impl Strategy<Value = LineItem> {
    ("[a-z]{1,12}", 1i32..500, price_strategy())
        .prop_map(|(description, quantity, price)| LineItem::new(description, quantity, price))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn invoice_total_is_rounded_sum_of_lines(items in prop::collection::vec(item_strategy(), 1..20)) {
        let exact: Decimal = items
            .iter()
            .map(|i| Decimal::from(i.quantity) * i.unit_price)
            .sum();
        let total = compute_total(&items).unwrap();

        prop_assert_eq!(total, to_money(exact));
        prop_assert_eq!(total.scale(), 2);
        prop_assert!((total - exact).abs() <= Decimal::new(5, 3));
        prop_assert_eq!(validate_line_items(&items).is_empty(), total <= max_money());
    }

    #[test]
    fn money_formatting_keeps_two_places(value in price_strategy()) {
        let text = format_money(value);
        let (_, cents) = text.rsplit_once('.').unwrap();
        prop_assert_eq!(cents.len(), 2);
        prop_assert_eq!(text.replace(',', "").parse::<Decimal>().unwrap(), to_money(value));
    }

    #[test]
    fn sequence_numbers_sort_by_ordinal_within_a_day(a in 1i64..9999, b in 1i64..9999) {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let na = format_sequence_number("REQ", day, a);
        let nb = format_sequence_number("REQ", day, b);

        prop_assert_eq!(na.len(), "REQ-20250601-0001".len());
        prop_assert_eq!(a.cmp(&b), na.cmp(&nb));
    }

    #[test]
    fn change_is_cash_minus_total(
        prices in prop::collection::vec(price_strategy(), 1..8),
        extra in price_strategy(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut cart = Cart::new("VRU-TH", &mut rng);
        for (i, price) in prices.iter().enumerate() {
            cart.add(ProductSnapshot { id: i as i32 + 1, name: format!("p{}", i), price: *price })
                .unwrap();
        }

        let total = cart.total();
        cart.set_cash(total + extra).unwrap();
        let receipt = cart.checkout(chrono::Utc::now()).unwrap().clone();

        prop_assert_eq!(receipt.change, to_money(extra));
        prop_assert_eq!(receipt.item_count as usize, prices.len());
        prop_assert!(receipt.receipt_no.as_str().starts_with("VRU-TH-"));
    }
}
