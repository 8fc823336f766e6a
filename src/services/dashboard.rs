use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::invoice::{self, InvoiceStatus};
use crate::entities::material_request::{self, MaterialRequestStatus};
use crate::entities::order::{self, OrderStatus};
use crate::entities::quotation::{self, QuotationStatus};
use crate::entities::{inventory_item, payment};
use crate::errors::ServiceError;

/// Company-wide figures for the management dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub generated_at: DateTime<Utc>,
    pub orders_by_status: BTreeMap<String, u64>,
    pub orders_by_department: BTreeMap<String, u64>,
    pub total_orders: u64,
    pub active_orders: u64,
    pub overdue_orders: u64,
    pub invoiced_total: Decimal,
    pub collected_total: Decimal,
    pub outstanding_total: Decimal,
    pub payments_this_month: Decimal,
    pub low_stock_items: u64,
    pub pending_material_requests: u64,
    pub quotations_awaiting_approval: u64,
}

fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Order figures; split out so the counting rules can be tested without a database.
fn tally_orders(
    orders: &[order::Model],
    now: DateTime<Utc>,
) -> (BTreeMap<String, u64>, BTreeMap<String, u64>, u64, u64) {
    let mut by_status = empty_status_grid();
    let mut by_department = BTreeMap::new();
    let mut active = 0;
    let mut overdue = 0;

    for order in orders {
        *by_status.entry(order.status.to_string()).or_insert(0) += 1;
        if order.status.is_active() {
            active += 1;
            *by_department
                .entry(order.status.department().to_string())
                .or_insert(0) += 1;
        }
        if !order.status.is_terminal() && order.due_date.map_or(false, |due| due < now) {
            overdue += 1;
        }
    }
    (by_status, by_department, active, overdue)
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, now: DateTime<Utc>) -> Result<DashboardSummary, ServiceError> {
        let db = &*self.db_pool;

        let orders = order::Entity::find().all(db).await?;
        let (orders_by_status, orders_by_department, active_orders, overdue_orders) =
            tally_orders(&orders, now);

        let invoices = invoice::Entity::find()
            .filter(invoice::Column::Status.ne(InvoiceStatus::Cancelled))
            .all(db)
            .await?;
        let invoiced_total: Decimal = invoices.iter().map(|i| i.total_amount).sum();
        let collected_total: Decimal = invoices.iter().map(|i| i.paid_amount).sum();
        let outstanding_total: Decimal = invoices.iter().map(|i| i.remaining_amount).sum();

        let payments_this_month: Decimal = payment::Entity::find()
            .filter(payment::Column::PaidAt.gte(month_start(now)))
            .all(db)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum();

        let low_stock_items = inventory_item::Entity::find()
            .all(db)
            .await?
            .iter()
            .filter(|i| i.is_low_stock())
            .count() as u64;

        let pending_material_requests = material_request::Entity::find()
            .filter(material_request::Column::Status.eq(MaterialRequestStatus::Pending))
            .count(db)
            .await?;
        let quotations_awaiting_approval = quotation::Entity::find()
            .filter(quotation::Column::Status.eq(QuotationStatus::PendingApproval))
            .count(db)
            .await?;

        Ok(DashboardSummary {
            generated_at: now,
            orders_by_status,
            orders_by_department,
            total_orders: orders.len() as u64,
            active_orders,
            overdue_orders,
            invoiced_total,
            collected_total,
            outstanding_total,
            payments_this_month,
            low_stock_items,
            pending_material_requests,
            quotations_awaiting_approval,
        })
    }
}

/// Every status label with a zero count, so clients can render a fixed grid.
pub fn empty_status_grid() -> BTreeMap<String, u64> {
    use sea_orm::Iterable;
    OrderStatus::iter().map(|s| (s.to_string(), 0)).collect()
}
