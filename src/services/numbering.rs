use crate::{
    entities::{invoice, maintenance_request, sequence_counter},
    errors::ServiceError,
};
use chrono::NaiveDate;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

/// Record families that receive a `PREFIX-YYYYMMDD-NNNN` number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Request,
    Invoice,
}

impl SequenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceKind::Request => "REQ",
            SequenceKind::Invoice => "INV",
        }
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// How the trailing ordinal is chosen.
///
/// `RecordCount` reproduces the legacy rule (`existing rows + 1`). It reuses
/// numbers after deletions and races under concurrent creates; the unique
/// column rejects the collision and the caller sees a 409.
/// `Counter` keeps a per-prefix row in `sequence_counters` and bumps it inside
/// the creating transaction, so numbers are never handed out twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingStrategy {
    #[default]
    Counter,
    RecordCount,
}

/// `PREFIX-YYYYMMDD-NNNN`; the ordinal widens past four digits rather than wrapping.
pub fn format_sequence_number(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), seq)
}

/// Hands out request and invoice numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceAllocator {
    strategy: NumberingStrategy,
}

impl SequenceAllocator {
    pub fn new(strategy: NumberingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> NumberingStrategy {
        self.strategy
    }

    /// Allocates the next number for `kind` dated `date`.
    ///
    /// Call this on the same transaction that inserts the record so a failed
    /// insert rolls the counter back with it.
    #[instrument(skip(self, conn))]
    pub async fn next_number<C>(
        &self,
        conn: &C,
        kind: SequenceKind,
        date: NaiveDate,
    ) -> Result<String, ServiceError>
    where
        C: ConnectionTrait,
    {
        let seq = match self.strategy {
            NumberingStrategy::RecordCount => existing_records(conn, kind).await? as i64 + 1,
            NumberingStrategy::Counter => bump_counter(conn, kind).await?,
        };

        let number = format_sequence_number(kind.prefix(), date, seq);
        debug!(%number, "allocated sequence number");
        Ok(number)
    }
}

async fn existing_records<C: ConnectionTrait>(
    conn: &C,
    kind: SequenceKind,
) -> Result<u64, ServiceError> {
    let count = match kind {
        SequenceKind::Request => maintenance_request::Entity::find().count(conn).await?,
        SequenceKind::Invoice => invoice::Entity::find().count(conn).await?,
    };
    Ok(count)
}

async fn bump_counter<C: ConnectionTrait>(conn: &C, kind: SequenceKind) -> Result<i64, ServiceError> {
    let prefix = kind.prefix();

    let updated = sequence_counter::Entity::update_many()
        .col_expr(
            sequence_counter::Column::LastValue,
            Expr::col(sequence_counter::Column::LastValue).add(1),
        )
        .filter(sequence_counter::Column::Prefix.eq(prefix))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        // First allocation for this prefix: continue after any rows created
        // before the counter existed.
        let start = existing_records(conn, kind).await? as i64 + 1;
        sequence_counter::ActiveModel {
            prefix: Set(prefix.to_string()),
            last_value: Set(start),
        }
        .insert(conn)
        .await
        .map_err(|e| {
            warn!(prefix, "sequence counter initialisation raced");
            counter!("repairdesk.numbering.conflicts", 1);
            ServiceError::from_write(e, "Sequence counter")
        })?;
        return Ok(start);
    }

    let row = sequence_counter::Entity::find_by_id(prefix.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InternalError(format!("sequence counter {} vanished", prefix)))?;

    Ok(row.last_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{RequestCategory, RequestStatus};
    use chrono::Utc;
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        crate::migrator::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn insert_request(db: &DatabaseConnection, request_no: &str) -> maintenance_request::Model {
        maintenance_request::ActiveModel {
            request_no: Set(request_no.to_string()),
            customer_name: Set("Somchai".into()),
            customer_phone: Set("0812345678".into()),
            description: Set("Screen flickers".into()),
            category: Set(RequestCategory::Computer),
            status: Set(RequestStatus::Pending),
            technician_id: Set(None),
            notes: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn formats_prefix_date_and_padded_ordinal() {
        assert_eq!(
            format_sequence_number("REQ", june_first(), 5),
            "REQ-20250601-0005"
        );
        assert_eq!(
            format_sequence_number("INV", june_first(), 42),
            "INV-20250601-0042"
        );
    }

    #[test]
    fn ordinal_widens_past_four_digits() {
        assert_eq!(
            format_sequence_number("REQ", june_first(), 10000),
            "REQ-20250601-10000"
        );
    }

    #[test]
    fn strategy_deserializes_from_snake_case() {
        let s: NumberingStrategy = serde_json::from_str("\"record_count\"").unwrap();
        assert_eq!(s, NumberingStrategy::RecordCount);
        assert_eq!(NumberingStrategy::default(), NumberingStrategy::Counter);
    }

    #[tokio::test]
    async fn fifth_request_under_record_count() {
        let db = setup_db().await;
        for i in 1..=4 {
            insert_request(&db, &format!("REQ-20250601-{:04}", i)).await;
        }

        let allocator = SequenceAllocator::new(NumberingStrategy::RecordCount);
        let number = allocator
            .next_number(&db, SequenceKind::Request, june_first())
            .await
            .unwrap();
        assert_eq!(number, "REQ-20250601-0005");
    }

    #[tokio::test]
    async fn record_count_reuses_numbers_after_deletion() {
        let db = setup_db().await;
        insert_request(&db, "REQ-20250601-0001").await;
        let second = insert_request(&db, "REQ-20250601-0002").await;
        maintenance_request::Entity::delete_by_id(second.id)
            .exec(&db)
            .await
            .unwrap();
        insert_request(&db, "REQ-20250601-0003").await;

        let allocator = SequenceAllocator::new(NumberingStrategy::RecordCount);
        let number = allocator
            .next_number(&db, SequenceKind::Request, june_first())
            .await
            .unwrap();
        // Two rows remain, so the rule hands out 0003 again.
        assert_eq!(number, "REQ-20250601-0003");
    }

    #[tokio::test]
    async fn counter_is_monotonic_and_per_prefix() {
        let db = setup_db().await;
        let allocator = SequenceAllocator::new(NumberingStrategy::Counter);

        let mut numbers = Vec::new();
        for _ in 0..5 {
            numbers.push(
                allocator
                    .next_number(&db, SequenceKind::Request, june_first())
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(numbers[0], "REQ-20250601-0001");
        assert_eq!(numbers[4], "REQ-20250601-0005");

        let invoice_no = allocator
            .next_number(&db, SequenceKind::Invoice, june_first())
            .await
            .unwrap();
        assert_eq!(invoice_no, "INV-20250601-0001");
    }

    #[tokio::test]
    async fn counter_starts_after_existing_rows() {
        let db = setup_db().await;
        insert_request(&db, "REQ-20250601-0001").await;
        insert_request(&db, "REQ-20250601-0002").await;

        let allocator = SequenceAllocator::new(NumberingStrategy::Counter);
        let first = allocator
            .next_number(&db, SequenceKind::Request, june_first())
            .await
            .unwrap();
        assert_eq!(first, "REQ-20250601-0003");

        // Deleting rows does not pull the counter back.
        maintenance_request::Entity::delete_many().exec(&db).await.unwrap();
        let next = allocator
            .next_number(&db, SequenceKind::Request, june_first())
            .await
            .unwrap();
        assert_eq!(next, "REQ-20250601-0004");
    }
}
