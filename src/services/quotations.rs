use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::order::{self, OrderType, Priority};
use crate::entities::quotation::{self, QuotationStatus};
use crate::entities::quotation_item;
use crate::entities::user::UserRole;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::counters::{next_number, CounterKind};
use crate::services::notifications::{NewNotification, NotificationService};
use crate::services::orders::{insert_order, CreateOrderRequest};
use crate::PaginatedResponse;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuotationItemInput {
    #[validate(length(min = 1, max = 500, message = "Item description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "Item quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateQuotationRequest {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<QuotationItemInput>,
    #[serde(default)]
    pub discount: Decimal,
    /// Falls back to the configured default rate
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Send straight to approval instead of saving a draft
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateQuotationRequest {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Option<Vec<QuotationItemInput>>,
    pub discount: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConvertQuotationRequest {
    pub order_type: OrderType,
    #[serde(default)]
    pub priority: Priority,
    pub description: Option<String>,
    pub dimensions: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotationFilter {
    pub status: Option<QuotationStatus>,
    pub customer_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuotationDetail {
    pub quotation: quotation::Model,
    pub items: Vec<quotation_item::Model>,
}

/// Computed money fields of a quotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotationTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `quantity * unit_price`, refusing amounts too large to represent.
pub fn line_total(item: &QuotationItemInput) -> Result<Decimal, ServiceError> {
    super::checked_amount(
        Decimal::from(item.quantity).checked_mul(item.unit_price),
        "Line total",
    )
}

/// `total = subtotal - discount + round2((subtotal - discount) * tax_rate)`
pub fn compute_totals(
    items: &[QuotationItemInput],
    discount: Decimal,
    tax_rate: Decimal,
) -> Result<QuotationTotals, ServiceError> {
    if items.iter().any(|i| i.unit_price < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "Unit price cannot be negative".to_string(),
        ));
    }
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
        return Err(ServiceError::ValidationError(
            "Tax rate must be between 0 and 1".to_string(),
        ));
    }

    let mut subtotal = Decimal::ZERO;
    for item in items {
        subtotal = super::checked_amount(subtotal.checked_add(line_total(item)?), "Subtotal")?;
    }
    if discount < Decimal::ZERO || discount > subtotal {
        return Err(ServiceError::ValidationError(
            "Discount must be between 0 and the subtotal".to_string(),
        ));
    }

    let taxable = subtotal - discount;
    let tax_amount = round2(super::checked_amount(taxable.checked_mul(tax_rate), "Tax amount")?);
    let total = super::checked_amount(taxable.checked_add(tax_amount), "Total")?;
    Ok(QuotationTotals {
        subtotal,
        discount,
        tax_rate,
        tax_amount,
        total,
    })
}

async fn replace_items<C: ConnectionTrait>(
    conn: &C,
    quotation_id: Uuid,
    items: &[QuotationItemInput],
) -> Result<(), ServiceError> {
    quotation_item::Entity::delete_many()
        .filter(quotation_item::Column::QuotationId.eq(quotation_id))
        .exec(conn)
        .await?;

    let rows = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            Ok(quotation_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                quotation_id: Set(quotation_id),
                position: Set(position as i32),
                description: Set(item.description.trim().to_string()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(line_total(item)?),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;
    quotation_item::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

#[derive(Clone)]
pub struct QuotationService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    notifications: NotificationService,
    default_tax_rate: Decimal,
}

impl QuotationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        notifications: NotificationService,
        default_tax_rate: Decimal,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            notifications,
            default_tax_rate,
        }
    }

    async fn find(&self, id: Uuid) -> Result<quotation::Model, ServiceError> {
        quotation::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("quotation", id))
    }

    async fn items(&self, id: Uuid) -> Result<Vec<quotation_item::Model>, ServiceError> {
        Ok(quotation_item::Entity::find()
            .filter(quotation_item::Column::QuotationId.eq(id))
            .order_by_asc(quotation_item::Column::Position)
            .all(&*self.db_pool)
            .await?)
    }

    async fn announce_submission(&self, model: &quotation::Model) {
        let note = NewNotification::new(
            "quotation_pending",
            format!("Quotation {} awaits approval", model.quotation_number),
            format!("{} for {}: {}", model.title, model.customer_name, model.total),
        )
        .link("quotation", model.id);
        if let Err(e) = self.notifications.notify_roles(&[UserRole::Ceo], note).await {
            warn!(quotation_id = %model.id, error = %e, "Failed to notify approvers");
        }
        self.event_sender
            .publish(Event::QuotationSubmitted {
                quotation_id: model.id,
                quotation_number: model.quotation_number.clone(),
            })
            .await;
    }

    #[instrument(skip(self, actor, request), fields(title = %request.title))]
    pub async fn create_quotation(
        &self,
        actor: &AuthUser,
        request: CreateQuotationRequest,
    ) -> Result<QuotationDetail, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }
        let totals = compute_totals(
            &request.items,
            request.discount,
            request.tax_rate.unwrap_or(self.default_tax_rate),
        )?;
        let status = if request.submit {
            QuotationStatus::PendingApproval
        } else {
            QuotationStatus::Draft
        };

        let txn = self.db_pool.begin().await?;
        let number = next_number(&txn, CounterKind::Quotation).await?;
        let now = Utc::now();
        let model = quotation::ActiveModel {
            id: Set(Uuid::new_v4()),
            quotation_number: Set(number),
            customer_id: Set(request.customer_id),
            customer_name: Set(request.customer_name.trim().to_string()),
            customer_phone: Set(super::clean(request.customer_phone)),
            title: Set(request.title.trim().to_string()),
            notes: Set(super::clean(request.notes)),
            subtotal: Set(totals.subtotal),
            discount: Set(totals.discount),
            tax_rate: Set(totals.tax_rate),
            tax_amount: Set(totals.tax_amount),
            total: Set(totals.total),
            status: Set(status),
            valid_until: Set(request.valid_until),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            rejection_reason: Set(None),
            order_id: Set(None),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        replace_items(&txn, model.id, &request.items).await?;
        txn.commit().await?;

        info!(quotation_id = %model.id, number = %model.quotation_number, total = %model.total, "Quotation created");
        if status == QuotationStatus::PendingApproval {
            self.announce_submission(&model).await;
        }

        let items = self.items(model.id).await?;
        Ok(QuotationDetail {
            quotation: model,
            items,
        })
    }

    pub async fn get_quotation(&self, id: Uuid) -> Result<QuotationDetail, ServiceError> {
        let quotation = self.find(id).await?;
        let items = self.items(id).await?;
        Ok(QuotationDetail { quotation, items })
    }

    pub async fn list_quotations(
        &self,
        filter: QuotationFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<quotation::Model>, ServiceError> {
        let mut select = quotation::Entity::find().order_by_desc(quotation::Column::CreatedAt);
        if let Some(status) = filter.status {
            select = select.filter(quotation::Column::Status.eq(status));
        }
        if let Some(customer_id) = filter.customer_id {
            select = select.filter(quotation::Column::CustomerId.eq(customer_id));
        }
        if let Some(term) = super::clean(filter.search) {
            select = select.filter(
                Condition::any()
                    .add(quotation::Column::QuotationNumber.contains(term.as_str()))
                    .add(quotation::Column::Title.contains(term.as_str()))
                    .add(quotation::Column::CustomerName.contains(term.as_str())),
            );
        }
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    /// Editing a rejected quotation sends it back to draft.
    #[instrument(skip(self, request))]
    pub async fn update_quotation(
        &self,
        id: Uuid,
        request: UpdateQuotationRequest,
    ) -> Result<QuotationDetail, ServiceError> {
        request.validate()?;
        let existing = self.find(id).await?;
        if !existing.status.is_editable() {
            return Err(ServiceError::InvalidStatus(format!(
                "Quotation {} is {} and cannot be edited",
                existing.quotation_number, existing.status
            )));
        }

        let items: Vec<QuotationItemInput> = match &request.items {
            Some(items) => {
                for item in items {
                    item.validate()?;
                }
                items.clone()
            }
            None => self
                .items(id)
                .await?
                .into_iter()
                .map(|i| QuotationItemInput {
                    description: i.description,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
        };
        let totals = compute_totals(
            &items,
            request.discount.unwrap_or(existing.discount),
            request.tax_rate.unwrap_or(existing.tax_rate),
        )?;

        let was_rejected = existing.status == QuotationStatus::Rejected;
        let mut active: quotation::ActiveModel = existing.into();
        if let Some(name) = super::clean(request.customer_name) {
            active.customer_name = Set(name);
        }
        if request.customer_phone.is_some() {
            active.customer_phone = Set(super::clean(request.customer_phone));
        }
        if let Some(title) = super::clean(request.title) {
            active.title = Set(title);
        }
        if request.notes.is_some() {
            active.notes = Set(super::clean(request.notes));
        }
        if request.valid_until.is_some() {
            active.valid_until = Set(request.valid_until);
        }
        if was_rejected {
            active.status = Set(QuotationStatus::Draft);
            active.rejection_reason = Set(None);
            active.reviewed_by = Set(None);
            active.reviewed_at = Set(None);
        }
        active.subtotal = Set(totals.subtotal);
        active.discount = Set(totals.discount);
        active.tax_rate = Set(totals.tax_rate);
        active.tax_amount = Set(totals.tax_amount);
        active.total = Set(totals.total);
        active.updated_at = Set(Utc::now());

        let txn = self.db_pool.begin().await?;
        let model = active.update(&txn).await?;
        if request.items.is_some() {
            replace_items(&txn, id, &items).await?;
        }
        txn.commit().await?;

        let items = self.items(id).await?;
        Ok(QuotationDetail {
            quotation: model,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn submit(&self, id: Uuid) -> Result<quotation::Model, ServiceError> {
        let existing = self.find(id).await?;
        if existing.status != QuotationStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "Only draft quotations can be submitted; {} is {}",
                existing.quotation_number, existing.status
            )));
        }
        let mut active: quotation::ActiveModel = existing.into();
        active.status = Set(QuotationStatus::PendingApproval);
        active.updated_at = Set(Utc::now());
        let model = active.update(&*self.db_pool).await?;

        self.announce_submission(&model).await;
        Ok(model)
    }

    async fn review(
        &self,
        actor: &AuthUser,
        id: Uuid,
        approve: bool,
        reason: Option<String>,
    ) -> Result<quotation::Model, ServiceError> {
        let existing = self.find(id).await?;
        if existing.status != QuotationStatus::PendingApproval {
            return Err(ServiceError::InvalidStatus(format!(
                "Quotation {} is {}, not pending approval",
                existing.quotation_number, existing.status
            )));
        }
        let reason = super::clean(reason);
        if !approve && reason.is_none() {
            return Err(ServiceError::ValidationError(
                "A reason is required to reject a quotation".to_string(),
            ));
        }

        let status = if approve {
            QuotationStatus::Approved
        } else {
            QuotationStatus::Rejected
        };
        let creator = existing.created_by;
        let now = Utc::now();
        let mut active: quotation::ActiveModel = existing.into();
        active.status = Set(status);
        active.reviewed_by = Set(Some(actor.user_id));
        active.reviewed_at = Set(Some(now));
        active.rejection_reason = Set(reason.clone());
        active.updated_at = Set(now);
        let model = active.update(&*self.db_pool).await?;

        info!(quotation_id = %id, status = %status, reviewer = %actor.user_id, "Quotation reviewed");
        let body = match &reason {
            Some(r) => format!("{} was {} by {}: {}", model.title, status, actor.name, r),
            None => format!("{} was {} by {}", model.title, status, actor.name),
        };
        let note = NewNotification::new(
            "quotation_reviewed",
            format!("Quotation {} {}", model.quotation_number, status),
            body,
        )
        .link("quotation", id);
        if let Err(e) = self.notifications.notify_user(creator, note).await {
            warn!(quotation_id = %id, error = %e, "Failed to notify quotation author");
        }
        self.event_sender
            .publish(Event::QuotationReviewed {
                quotation_id: id,
                status,
            })
            .await;
        Ok(model)
    }

    pub async fn approve(&self, actor: &AuthUser, id: Uuid) -> Result<quotation::Model, ServiceError> {
        self.review(actor, id, true, None).await
    }

    pub async fn reject(
        &self,
        actor: &AuthUser,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<quotation::Model, ServiceError> {
        self.review(actor, id, false, reason).await
    }

    /// Creates an order for the quotation total and marks the quotation converted.
    #[instrument(skip(self, actor, request))]
    pub async fn convert_to_order(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: ConvertQuotationRequest,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = quotation::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("quotation", id))?;
        if existing.status != QuotationStatus::Approved {
            return Err(ServiceError::InvalidStatus(format!(
                "Only approved quotations can be converted; {} is {}",
                existing.quotation_number, existing.status
            )));
        }

        let quantity: i32 = quotation_item::Entity::find()
            .filter(quotation_item::Column::QuotationId.eq(id))
            .all(&txn)
            .await?
            .iter()
            .map(|i| i.quantity)
            .sum();

        let order = insert_order(
            &txn,
            actor,
            CreateOrderRequest {
                customer_id: existing.customer_id,
                customer_name: Some(existing.customer_name.clone()),
                customer_phone: existing.customer_phone.clone(),
                title: existing.title.clone(),
                description: request.description.or_else(|| existing.notes.clone()),
                order_type: request.order_type,
                quantity: quantity.max(1),
                dimensions: request.dimensions,
                priority: request.priority,
                total_amount: existing.total,
                paid_amount: Decimal::ZERO,
                due_date: request.due_date,
            },
            Some(id),
        )
        .await?;

        let mut active: quotation::ActiveModel = existing.into();
        active.status = Set(QuotationStatus::Converted);
        active.order_id = Set(Some(order.id));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;

        crate::metrics::record_order_created();
        info!(quotation_id = %id, order_id = %order.id, "Quotation converted to order");
        self.event_sender
            .publish(Event::OrderCreated {
                order_id: order.id,
                order_number: order.order_number.clone(),
            })
            .await;
        self.event_sender
            .publish(Event::QuotationConverted {
                quotation_id: id,
                order_id: order.id,
            })
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn delete_quotation(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find(id).await?;
        if existing.status == QuotationStatus::Converted {
            return Err(ServiceError::InvalidOperation(format!(
                "Quotation {} was converted to an order and cannot be deleted",
                existing.quotation_number
            )));
        }
        quotation::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(quotation_id = %id, "Quotation deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(quantity: i32, unit_price: Decimal) -> QuotationItemInput {
        QuotationItemInput {
            description: "Business cards".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn totals_apply_discount_before_tax() {
        let totals = compute_totals(
            &[item(2, dec!(50.00)), item(1, dec!(100.00))],
            dec!(20),
            dec!(0.15),
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec!(200.00));
        assert_eq!(totals.tax_amount, dec!(27.00));
        assert_eq!(totals.total, dec!(207.00));
    }

    #[test]
    fn tax_is_rounded_to_cents() {
        let totals = compute_totals(&[item(3, dec!(3.33))], Decimal::ZERO, dec!(0.15)).unwrap();
        // 9.99 * 0.15 = 1.4985
        assert_eq!(totals.tax_amount, dec!(1.50));
        assert_eq!(totals.total, dec!(11.49));
    }

    #[test]
    fn discount_cannot_exceed_subtotal() {
        assert!(compute_totals(&[item(1, dec!(10))], dec!(10.01), Decimal::ZERO).is_err());
        assert!(compute_totals(&[item(1, dec!(10))], dec!(-1), Decimal::ZERO).is_err());
        assert!(compute_totals(&[item(1, dec!(-10))], Decimal::ZERO, Decimal::ZERO).is_err());
    }

    #[test]
    fn oversized_amounts_are_rejected_not_panicking() {
        assert_matches::assert_matches!(
            compute_totals(&[item(1000, Decimal::MAX)], Decimal::ZERO, Decimal::ZERO),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches::assert_matches!(
            compute_totals(
                &[item(1, Decimal::MAX), item(1, Decimal::MAX)],
                Decimal::ZERO,
                Decimal::ZERO
            ),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches::assert_matches!(
            compute_totals(&[item(1, Decimal::MAX)], Decimal::ZERO, dec!(0.5)),
            Err(ServiceError::ValidationError(_))
        );
    }

    proptest! {
        #[test]
        fn total_identity_holds(
            lines in prop::collection::vec((1i32..500, 0i64..1_000_000), 1..8),
            discount_pct in 0u32..=100,
            rate_bp in 0u32..=2500,
        ) {
            let items: Vec<_> = lines
                .iter()
                .map(|(q, cents)| item(*q, Decimal::new(*cents, 2)))
                .collect();
            let subtotal: Decimal = items.iter().map(|i| Decimal::from(i.quantity) * i.unit_price).sum();
            let discount = round2(subtotal * Decimal::new(discount_pct as i64, 2)).min(subtotal);
            let rate = Decimal::new(rate_bp as i64, 4);

            let totals = compute_totals(&items, discount, rate).unwrap();
            prop_assert_eq!(totals.subtotal, subtotal);
            prop_assert_eq!(totals.total, totals.subtotal - totals.discount + totals.tax_amount);
            prop_assert!(totals.total >= Decimal::ZERO);
            prop_assert_eq!(totals.tax_amount, round2(totals.tax_amount));
        }
    }
}
