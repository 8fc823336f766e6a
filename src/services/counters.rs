//! Document numbering. Each kind owns one row in `counters`; callers pass
//! their open transaction so the number and the document commit together.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::counter;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Order,
    Quotation,
    Invoice,
}

impl CounterKind {
    pub fn key(&self) -> &'static str {
        match self {
            CounterKind::Order => "orders",
            CounterKind::Quotation => "quotations",
            CounterKind::Invoice => "invoices",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            CounterKind::Order => "ORD",
            CounterKind::Quotation => "QT",
            CounterKind::Invoice => "INV",
        }
    }

    pub fn format(&self, value: i64) -> String {
        format!("{}-{:05}", self.prefix(), value)
    }
}

/// Increments the counter for `kind` and returns the formatted number.
///
/// The `UPDATE` takes the row lock first so concurrent transactions queue
/// behind each other instead of reading the same value.
pub async fn next_number<C>(conn: &C, kind: CounterKind) -> Result<String, ServiceError>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let bumped = counter::Entity::update_many()
        .col_expr(counter::Column::Value, Expr::col(counter::Column::Value).add(1))
        .col_expr(counter::Column::UpdatedAt, Expr::value(now))
        .filter(counter::Column::Name.eq(kind.key()))
        .exec(conn)
        .await?;

    if bumped.rows_affected == 0 {
        counter::ActiveModel {
            name: Set(kind.key().to_string()),
            value: Set(1),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;
        return Ok(kind.format(1));
    }

    let row = counter::Entity::find_by_id(kind.key().to_string())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::InternalError(format!("counter {} vanished", kind.key())))?;
    Ok(kind.format(row.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use sea_orm::TransactionTrait;

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(CounterKind::Order.format(1), "ORD-00001");
        assert_eq!(CounterKind::Quotation.format(42), "QT-00042");
        assert_eq!(CounterKind::Invoice.format(123456), "INV-123456");
    }

    #[tokio::test]
    async fn numbers_increase_per_kind() {
        let db = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&db).await.unwrap();

        let txn = db.begin().await.unwrap();
        assert_eq!(next_number(&txn, CounterKind::Order).await.unwrap(), "ORD-00001");
        assert_eq!(next_number(&txn, CounterKind::Order).await.unwrap(), "ORD-00002");
        assert_eq!(next_number(&txn, CounterKind::Invoice).await.unwrap(), "INV-00001");
        txn.commit().await.unwrap();

        // a rolled back transaction does not consume a number
        let txn = db.begin().await.unwrap();
        next_number(&txn, CounterKind::Order).await.unwrap();
        txn.rollback().await.unwrap();
        assert_eq!(next_number(&db, CounterKind::Order).await.unwrap(), "ORD-00003");
    }
}
