use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::invoice::{self, InvoiceStatus};
use crate::entities::payment::{self, PaymentMethod};
use crate::entities::order;
use crate::errors::{map_versioned_update, ServiceError};
use crate::events::{Event, EventSender};
use crate::services::counters::{next_number, CounterKind};
use crate::services::orders::append_timeline;
use crate::PaginatedResponse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    /// Copy customer and total from this order; the amount fields below are ignored
    pub from_order: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub tax_amount: Decimal,
    pub due_date: Option<DateTime<Utc>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 120))]
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceDetail {
    pub invoice: invoice::Model,
    pub payments: Vec<payment::Model>,
}

/// Status an open invoice should carry once `paid` of `total` is settled.
pub fn settled_status(total: Decimal, paid: Decimal) -> InvoiceStatus {
    if paid >= total {
        InvoiceStatus::Paid
    } else if paid > Decimal::ZERO {
        InvoiceStatus::PartiallyPaid
    } else {
        InvoiceStatus::Unpaid
    }
}

#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn find(&self, id: Uuid) -> Result<invoice::Model, ServiceError> {
        invoice::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("invoice", id))
    }

    #[instrument(skip(self, actor, request), fields(from_order = ?request.from_order))]
    pub async fn create_invoice(
        &self,
        actor: &AuthUser,
        request: CreateInvoiceRequest,
    ) -> Result<invoice::Model, ServiceError> {
        request.validate()?;

        let linked = match request.from_order {
            Some(order_id) => Some(
                order::Entity::find_by_id(order_id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("order", order_id))?,
            ),
            None => None,
        };

        let (customer_id, customer_name, subtotal, discount, tax_amount, total, paid) =
            match &linked {
                Some(o) => (
                    o.customer_id,
                    o.customer_name.clone(),
                    o.total_amount,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    o.total_amount,
                    o.paid_amount,
                ),
                None => {
                    let name = super::clean(request.customer_name).ok_or_else(|| {
                        ServiceError::ValidationError("Customer name is required".to_string())
                    })?;
                    let subtotal = request.subtotal.ok_or_else(|| {
                        ServiceError::ValidationError("Subtotal is required".to_string())
                    })?;
                    if subtotal < Decimal::ZERO
                        || request.discount < Decimal::ZERO
                        || request.discount > subtotal
                        || request.tax_amount < Decimal::ZERO
                    {
                        return Err(ServiceError::ValidationError(
                            "Amounts must be non-negative and the discount within the subtotal"
                                .to_string(),
                        ));
                    }
                    let total = super::checked_amount(
                        (subtotal - request.discount).checked_add(request.tax_amount),
                        "Invoice total",
                    )?;
                    (
                        request.customer_id,
                        name,
                        subtotal,
                        request.discount,
                        request.tax_amount,
                        total,
                        Decimal::ZERO,
                    )
                }
            };

        let txn = self.db_pool.begin().await?;
        let number = next_number(&txn, CounterKind::Invoice).await?;
        let now = Utc::now();
        let model = invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(number),
            order_id: Set(request.from_order),
            customer_id: Set(customer_id),
            customer_name: Set(customer_name),
            subtotal: Set(subtotal),
            discount: Set(discount),
            tax_amount: Set(tax_amount),
            total_amount: Set(total),
            paid_amount: Set(paid),
            remaining_amount: Set(total - paid),
            status: Set(settled_status(total, paid)),
            due_date: Set(request.due_date),
            notes: Set(super::clean(request.notes)),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(invoice_id = %model.id, number = %model.invoice_number, total = %model.total_amount, "Invoice created");
        self.event_sender
            .publish(Event::InvoiceCreated {
                invoice_id: model.id,
                invoice_number: model.invoice_number.clone(),
            })
            .await;
        Ok(model)
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<InvoiceDetail, ServiceError> {
        let invoice = self.find(id).await?;
        let payments = payment::Entity::find()
            .filter(payment::Column::InvoiceId.eq(id))
            .order_by_asc(payment::Column::PaidAt)
            .all(&*self.db_pool)
            .await?;
        Ok(InvoiceDetail { invoice, payments })
    }

    pub async fn list_invoices(
        &self,
        filter: InvoiceFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<invoice::Model>, ServiceError> {
        let mut select = invoice::Entity::find().order_by_desc(invoice::Column::CreatedAt);
        if let Some(status) = filter.status {
            select = select.filter(invoice::Column::Status.eq(status));
        }
        if let Some(customer_id) = filter.customer_id {
            select = select.filter(invoice::Column::CustomerId.eq(customer_id));
        }
        if let Some(order_id) = filter.order_id {
            select = select.filter(invoice::Column::OrderId.eq(order_id));
        }
        if let Some(term) = super::clean(filter.search) {
            select = select.filter(
                Condition::any()
                    .add(invoice::Column::InvoiceNumber.contains(term.as_str()))
                    .add(invoice::Column::CustomerName.contains(term.as_str())),
            );
        }
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    /// Records a payment and advances the linked order's balance in the same
    /// transaction.
    #[instrument(skip(self, actor, request), fields(invoice_id = %id, amount = %request.amount))]
    pub async fn record_payment(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<InvoiceDetail, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        let existing = invoice::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("invoice", id))?;
        if !existing.status.is_open() {
            return Err(ServiceError::InvalidStatus(format!(
                "Invoice {} is {} and accepts no payments",
                existing.invoice_number, existing.status
            )));
        }
        if request.amount > existing.remaining_amount {
            return Err(ServiceError::ValidationError(format!(
                "Payment of {} exceeds the remaining {}",
                request.amount, existing.remaining_amount
            )));
        }

        let payment = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_id: Set(id),
            amount: Set(request.amount),
            method: Set(request.method),
            reference: Set(super::clean(request.reference)),
            notes: Set(super::clean(request.notes)),
            received_by: Set(actor.user_id),
            paid_at: Set(request.paid_at.unwrap_or_else(Utc::now)),
        }
        .insert(&txn)
        .await?;

        let paid = existing.paid_amount + request.amount;
        let remaining = existing.total_amount - paid;
        let mut status = settled_status(existing.total_amount, paid);
        // still late until fully settled
        if existing.status == InvoiceStatus::Overdue && status != InvoiceStatus::Paid {
            status = InvoiceStatus::Overdue;
        }
        let order_id = existing.order_id;
        let version = existing.version;

        let mut active: invoice::ActiveModel = existing.into();
        active.paid_amount = Set(paid);
        active.remaining_amount = Set(remaining);
        active.status = Set(status);
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());
        // a concurrent payment bumps the version first and this one rolls back
        let invoice = invoice::Entity::update(active)
            .filter(invoice::Column::Version.eq(version))
            .exec(&txn)
            .await
            .map_err(map_versioned_update(id))?;

        if let Some(order_id) = order_id {
            if let Some(linked) = order::Entity::find_by_id(order_id).one(&txn).await? {
                let order_paid = (linked.paid_amount + request.amount).min(linked.total_amount);
                let version = linked.version;
                let total = linked.total_amount;
                let mut order_active: order::ActiveModel = linked.into();
                order_active.paid_amount = Set(order_paid);
                order_active.remaining_amount = Set(total - order_paid);
                order_active.version = Set(version + 1);
                order_active.updated_at = Set(Utc::now());
                order::Entity::update(order_active)
                    .filter(order::Column::Version.eq(version))
                    .exec(&txn)
                    .await
                    .map_err(map_versioned_update(order_id))?;

                append_timeline(
                    &txn,
                    order_id,
                    actor,
                    "payment",
                    None,
                    Some(format!(
                        "Payment of {} recorded on {}",
                        request.amount, invoice.invoice_number
                    )),
                )
                .await?;
            }
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit payment");
            ServiceError::DatabaseError(e)
        })?;

        crate::metrics::record_payment();
        info!(payment_id = %payment.id, remaining = %remaining, status = %status, "Payment recorded");
        self.event_sender
            .publish(Event::PaymentRecorded {
                invoice_id: id,
                payment_id: payment.id,
                amount: payment.amount,
                remaining,
            })
            .await;
        if let Some(order_id) = order_id {
            self.event_sender
                .publish(Event::OrderUpdated { order_id })
                .await;
        }

        self.get_invoice(id).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid) -> Result<invoice::Model, ServiceError> {
        let existing = self.find(id).await?;
        if existing.status == InvoiceStatus::Cancelled {
            return Err(ServiceError::InvalidStatus(format!(
                "Invoice {} is already cancelled",
                existing.invoice_number
            )));
        }
        if existing.paid_amount > Decimal::ZERO {
            return Err(ServiceError::InvalidOperation(format!(
                "Invoice {} has payments and cannot be cancelled",
                existing.invoice_number
            )));
        }

        let version = existing.version;
        let mut active: invoice::ActiveModel = existing.into();
        active.status = Set(InvoiceStatus::Cancelled);
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());
        let model = invoice::Entity::update(active)
            .filter(invoice::Column::Version.eq(version))
            .exec(&*self.db_pool)
            .await
            .map_err(map_versioned_update(id))?;

        info!(invoice_id = %id, "Invoice cancelled");
        self.event_sender
            .publish(Event::InvoiceStatusChanged {
                invoice_id: id,
                status: model.status,
            })
            .await;
        Ok(model)
    }

    /// Flags open invoices whose due date is before `now`. Returns how many changed.
    #[instrument(skip(self))]
    pub async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let result = invoice::Entity::update_many()
            .col_expr(invoice::Column::Status, Expr::value(InvoiceStatus::Overdue))
            .col_expr(invoice::Column::UpdatedAt, Expr::value(now))
            .col_expr(
                invoice::Column::Version,
                Expr::col(invoice::Column::Version).add(1),
            )
            .filter(
                invoice::Column::Status
                    .is_in([InvoiceStatus::Unpaid, InvoiceStatus::PartiallyPaid]),
            )
            .filter(invoice::Column::DueDate.lt(now))
            .exec(&*self.db_pool)
            .await?;

        if result.rows_affected > 0 {
            info!(count = result.rows_affected, "Invoices marked overdue");
        }
        Ok(result.rows_affected)
    }

    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;
        if existing.status != InvoiceStatus::Unpaid || existing.paid_amount > Decimal::ZERO {
            return Err(ServiceError::InvalidOperation(format!(
                "Only unpaid invoices can be deleted; {} is {}",
                existing.invoice_number, existing.status
            )));
        }
        invoice::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn settled_status_follows_balance() {
        assert_eq!(settled_status(dec!(100), dec!(0)), InvoiceStatus::Unpaid);
        assert_eq!(settled_status(dec!(100), dec!(40)), InvoiceStatus::PartiallyPaid);
        assert_eq!(settled_status(dec!(100), dec!(100)), InvoiceStatus::Paid);
        // a zero-value invoice is settled on creation
        assert_eq!(settled_status(dec!(0), dec!(0)), InvoiceStatus::Paid);
    }
}
