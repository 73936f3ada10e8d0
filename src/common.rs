/// Money and date helpers shared by services, print views and the POS
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds half away from zero to two places and fixes the scale at 2,
/// so `399.5` becomes `399.50`.
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Largest value the `DECIMAL(10,2)` money columns hold: `99,999,999.99`.
pub fn max_money() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// True when `value` has no more than two decimal places once trailing zeros go.
pub fn has_cents_precision(value: Decimal) -> bool {
    value.normalize().scale() <= 2
}

/// Two-decimal amount with thousands separators, e.g. `1,234.50`.
pub fn format_money(value: Decimal) -> String {
    let text = to_money(value).abs().to_string();
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value.is_sign_negative() && !to_money(value).is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac)
}

/// `dd/mm/yyyy`
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `dd/mm/yyyy HH:MM`
pub fn format_display_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn money_has_two_places() {
        assert_eq!(to_money(dec!(399.5)).to_string(), "399.50");
        assert_eq!(to_money(dec!(203)).to_string(), "203.00");
        assert_eq!(to_money(dec!(0.125)).to_string(), "0.13");
        assert_eq!(to_money(dec!(-0.125)).to_string(), "-0.13");
    }

    #[test]
    fn money_column_bounds() {
        assert_eq!(max_money().to_string(), "99999999.99");
        assert!(has_cents_precision(dec!(45.00)));
        assert!(has_cents_precision(dec!(45.000)));
        assert!(!has_cents_precision(dec!(45.004)));
    }

    #[test]
    fn money_groups_thousands() {
        assert_eq!(format_money(dec!(1234567.891)), "1,234,567.89");
        assert_eq!(format_money(dec!(999)), "999.00");
        assert_eq!(format_money(dec!(1000)), "1,000.00");
        assert_eq!(format_money(dec!(-47)), "-47.00");
        assert_eq!(format_money(Decimal::ZERO), "0.00");
    }

    #[test]
    fn dates_render_day_first() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(format_display_date(date), "01/06/2025");

        let at = Utc.with_ymd_and_hms(2025, 6, 1, 14, 5, 0).unwrap();
        assert_eq!(format_display_timestamp(at), "01/06/2025 14:05");
    }
}
