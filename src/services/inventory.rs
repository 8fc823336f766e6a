use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::db::DbPool;
use crate::entities::user::UserRole;
use crate::entities::{inventory_item, inventory_transaction};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::notifications::{NewNotification, NotificationService};
use crate::PaginatedResponse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200, message = "Item name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 32, message = "Unit is required"))]
    pub unit: String,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub min_quantity: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

/// Metadata changes; stock only moves through adjustments.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub unit: Option<String>,
    pub min_quantity: Option<Decimal>,
    pub unit_cost: Option<Decimal>,
    pub location: Option<String>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    /// Positive to add stock, negative to consume it
    pub delta: Decimal,
    #[validate(length(min = 1, max = 200, message = "A reason is required"))]
    pub reason: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub low_stock_only: Option<bool>,
}

/// Outcome of one stock movement
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub item: inventory_item::Model,
    pub transaction: inventory_transaction::Model,
    /// The movement took the item from above its threshold to at or below it
    pub crossed_threshold: bool,
}

/// Applies `delta` to an item inside the caller's transaction and records the movement.
pub(crate) async fn apply_adjustment<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthUser,
    item_id: Uuid,
    request: &AdjustStockRequest,
) -> Result<Adjustment, ServiceError> {
    if request.delta.is_zero() {
        return Err(ServiceError::ValidationError(
            "Adjustment cannot be zero".to_string(),
        ));
    }

    let item = inventory_item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("inventory item", item_id))?;

    let after = super::checked_amount(item.quantity.checked_add(request.delta), "Stock quantity")?;
    if after < Decimal::ZERO {
        return Err(ServiceError::InsufficientStock(format!(
            "{} has {} {} in stock, cannot remove {}",
            item.name,
            item.quantity,
            item.unit,
            request.delta.abs()
        )));
    }
    let was_low = item.is_low_stock();

    let mut active: inventory_item::ActiveModel = item.into();
    active.quantity = Set(after);
    active.updated_at = Set(Utc::now());
    let item = active.update(conn).await?;

    let transaction = inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        item_id: Set(item_id),
        delta: Set(request.delta),
        quantity_after: Set(after),
        reason: Set(request.reason.trim().to_string()),
        reference_type: Set(super::clean(request.reference_type.clone())),
        reference_id: Set(request.reference_id),
        actor_id: Set(actor.user_id),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    let crossed_threshold = !was_low && item.is_low_stock();
    Ok(Adjustment {
        item,
        transaction,
        crossed_threshold,
    })
}

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    notifications: NotificationService,
}

impl InventoryService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        notifications: NotificationService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            notifications,
        }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_item(
        &self,
        request: CreateItemRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;
        if request.quantity < Decimal::ZERO
            || request.min_quantity < Decimal::ZERO
            || request.unit_cost < Decimal::ZERO
        {
            return Err(ServiceError::ValidationError(
                "Quantities and cost cannot be negative".to_string(),
            ));
        }

        let sku = request.sku.trim().to_uppercase();
        let taken = inventory_item::Entity::find()
            .filter(inventory_item::Column::Sku.eq(sku.as_str()))
            .one(&*self.db_pool)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict(format!("SKU {} already exists", sku)));
        }

        let now = Utc::now();
        let model = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            sku: Set(sku),
            category: Set(super::clean(request.category)),
            unit: Set(request.unit.trim().to_string()),
            quantity: Set(request.quantity),
            min_quantity: Set(request.min_quantity),
            unit_cost: Set(request.unit_cost),
            location: Set(super::clean(request.location)),
            supplier: Set(super::clean(request.supplier)),
            notes: Set(super::clean(request.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(item_id = %model.id, "Inventory item created");
        Ok(model)
    }

    pub async fn get_item(&self, id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        inventory_item::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("inventory item", id))
    }

    pub async fn list_items(
        &self,
        filter: ItemFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<inventory_item::Model>, ServiceError> {
        let mut select = inventory_item::Entity::find().order_by_asc(inventory_item::Column::Name);
        if let Some(term) = super::clean(filter.search) {
            select = select.filter(
                Condition::any()
                    .add(inventory_item::Column::Name.contains(term.as_str()))
                    .add(inventory_item::Column::Sku.contains(term.to_uppercase().as_str())),
            );
        }
        if let Some(category) = super::clean(filter.category) {
            select = select.filter(inventory_item::Column::Category.eq(category));
        }
        if filter.low_stock_only.unwrap_or(false) {
            // thresholds compare two decimal columns, done here rather than in SQL
            let low: Vec<_> = select
                .all(&*self.db_pool)
                .await?
                .into_iter()
                .filter(inventory_item::Model::is_low_stock)
                .collect();
            let total = low.len() as u64;
            let items = match super::page_offset(page, limit) {
                Some(offset) if offset < total => low
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect(),
                _ => Vec::new(),
            };
            return Ok(PaginatedResponse::new(items, total, page, limit));
        }
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;
        if request.min_quantity.map_or(false, |q| q < Decimal::ZERO)
            || request.unit_cost.map_or(false, |c| c < Decimal::ZERO)
        {
            return Err(ServiceError::ValidationError(
                "Threshold and cost cannot be negative".to_string(),
            ));
        }

        let mut active: inventory_item::ActiveModel = self.get_item(id).await?.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if request.category.is_some() {
            active.category = Set(super::clean(request.category));
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit.trim().to_string());
        }
        if let Some(min_quantity) = request.min_quantity {
            active.min_quantity = Set(min_quantity);
        }
        if let Some(unit_cost) = request.unit_cost {
            active.unit_cost = Set(unit_cost);
        }
        if request.location.is_some() {
            active.location = Set(super::clean(request.location));
        }
        if request.supplier.is_some() {
            active.supplier = Set(super::clean(request.supplier));
        }
        if request.notes.is_some() {
            active.notes = Set(super::clean(request.notes));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = inventory_item::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("inventory item", id));
        }
        info!(item_id = %id, "Inventory item deleted");
        Ok(())
    }

    #[instrument(skip(self, actor, request), fields(item_id = %id, delta = %request.delta))]
    pub async fn adjust(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: AdjustStockRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let adjustment = apply_adjustment(&txn, actor, id, &request).await?;
        txn.commit().await?;

        self.announce(adjustment).await
    }

    /// Publishes the movement and warns inventory staff when stock runs low.
    pub(crate) async fn announce(
        &self,
        adjustment: Adjustment,
    ) -> Result<inventory_item::Model, ServiceError> {
        let Adjustment {
            item,
            transaction,
            crossed_threshold,
        } = adjustment;

        crate::metrics::record_stock_adjustment(transaction.delta > Decimal::ZERO);
        info!(quantity = %item.quantity, "Stock adjusted");
        self.event_sender
            .publish(Event::StockAdjusted {
                item_id: item.id,
                delta: transaction.delta,
                quantity: item.quantity,
            })
            .await;

        if crossed_threshold {
            self.event_sender
                .publish(Event::LowStock {
                    item_id: item.id,
                    name: item.name.clone(),
                    quantity: item.quantity,
                    min_quantity: item.min_quantity,
                })
                .await;
            let note = NewNotification::new(
                "low_stock",
                format!("{} is running low", item.name),
                format!(
                    "{} {} left, reorder threshold is {}",
                    item.quantity, item.unit, item.min_quantity
                ),
            )
            .link("inventory_item", item.id);
            if let Err(e) = self
                .notifications
                .notify_roles(&[UserRole::Inventory], note)
                .await
            {
                warn!(item_id = %item.id, error = %e, "Failed to send low stock notice");
            }
        }
        Ok(item)
    }

    pub async fn transactions(
        &self,
        item_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<inventory_transaction::Model>, ServiceError> {
        self.get_item(item_id).await?;
        let select = inventory_transaction::Entity::find()
            .filter(inventory_transaction::Column::ItemId.eq(item_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt);
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    /// Items at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let mut items: Vec<_> = inventory_item::Entity::find()
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .filter(inventory_item::Model::is_low_stock)
            .collect();
        items.sort_by(|a, b| a.quantity.cmp(&b.quantity));
        Ok(items)
    }
}
