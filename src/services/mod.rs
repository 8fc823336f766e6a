// Staff and customers
pub mod customers;
pub mod users;

// Order workflow
pub mod counters;
pub mod orders;
pub mod quotations;

// Accounting
pub mod invoices;

// Stock
pub mod inventory;
pub mod material_requests;

// Communication
pub mod calls;
pub mod chat;
pub mod notifications;

// Reporting and housekeeping
pub mod dashboard;
pub mod maintenance;

use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait, Select};

use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::PaginatedResponse;

/// Trims optional form input and drops it when nothing is left.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Unwraps a checked money operation; overflow means the input was out of range.
pub(crate) fn checked_amount(value: Option<Decimal>, what: &str) -> Result<Decimal, ServiceError> {
    value.ok_or_else(|| ServiceError::ValidationError(format!("{what} is out of range")))
}

/// Row offset of a 1-based page, `None` when it does not fit a SQL offset.
pub(crate) fn page_offset(page: u64, limit: u64) -> Option<u64> {
    page.saturating_sub(1)
        .checked_mul(limit)
        .filter(|offset| *offset <= i64::MAX as u64)
}

/// Runs `select` as one page (1-based) and counts the full result set.
pub(crate) async fn fetch_page<'db, E>(
    select: Select<E>,
    db: &'db DbPool,
    page: u64,
    limit: u64,
) -> Result<PaginatedResponse<E::Model>, ServiceError>
where
    E: EntityTrait,
    E::Model: Send + Sync + 'db,
{
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    let items = match page_offset(page, limit) {
        Some(offset) if offset < total => paginator.fetch_page(page.saturating_sub(1)).await?,
        _ => Vec::new(),
    };
    Ok(PaginatedResponse::new(items, total, page, limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offsets_never_overflow() {
        assert_eq!(page_offset(1, 20), Some(0));
        assert_eq!(page_offset(0, 20), Some(0));
        assert_eq!(page_offset(3, 20), Some(40));
        assert_eq!(page_offset(u64::MAX, 50), None);
        assert_eq!(page_offset(u64::MAX / 2, 4), None);
    }

    #[test]
    fn checked_amount_reports_overflow_as_validation() {
        assert_eq!(checked_amount(Some(Decimal::ONE), "Total").unwrap(), Decimal::ONE);
        assert!(matches!(
            checked_amount(Decimal::MAX.checked_add(Decimal::ONE), "Total"),
            Err(ServiceError::ValidationError(msg)) if msg == "Total is out of range"
        ));
    }
}
