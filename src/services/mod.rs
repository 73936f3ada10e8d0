use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

// Maintenance desk
pub mod invoices;
pub mod invoicing;
pub mod maintenance_requests;
pub mod numbering;
pub mod technicians;

// Point of sale catalog
pub mod products;
pub mod storage;

/// Case-insensitive substring match on `col`, portable across SQLite and Postgres.
pub(crate) fn contains_ci<C: IntoColumnRef>(col: C, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", term.trim().to_lowercase()))
}

/// Blank search terms count as no filter.
pub(crate) fn non_blank(term: Option<&str>) -> Option<&str> {
    term.map(str::trim).filter(|t| !t.is_empty())
}

/// Rejects text that is empty once surrounding whitespace is trimmed.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
