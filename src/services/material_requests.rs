use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{perm, AuthUser};
use crate::db::DbPool;
use crate::entities::inventory_item;
use crate::entities::material_request::{self, MaterialRequestStatus};
use crate::entities::order::Priority;
use crate::entities::user::Department;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory::{apply_adjustment, AdjustStockRequest, InventoryService};
use crate::services::notifications::{NewNotification, NotificationService};
use crate::PaginatedResponse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialRequest {
    /// Stock item to replenish; name and unit are copied when set
    pub item_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub item_name: Option<String>,
    pub quantity: Decimal,
    #[validate(length(max = 32))]
    pub unit: Option<String>,
    pub reason: Option<String>,
    #[serde(default)]
    pub urgency: Priority,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialRequestFilter {
    pub status: Option<MaterialRequestStatus>,
    pub department: Option<Department>,
}

#[derive(Clone)]
pub struct MaterialRequestService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    notifications: NotificationService,
    inventory: InventoryService,
}

impl MaterialRequestService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        notifications: NotificationService,
        inventory: InventoryService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            notifications,
            inventory,
        }
    }

    fn can_see_all(actor: &AuthUser) -> bool {
        actor.has_permission(perm::MATERIAL_REQUESTS_READ_ALL)
    }

    async fn find(&self, id: Uuid) -> Result<material_request::Model, ServiceError> {
        material_request::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("material request", id))
    }

    #[instrument(skip(self, actor, request), fields(department = %actor.department))]
    pub async fn create(
        &self,
        actor: &AuthUser,
        request: CreateMaterialRequest,
    ) -> Result<material_request::Model, ServiceError> {
        request.validate()?;
        if request.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        let item = match request.item_id {
            Some(item_id) => Some(
                inventory_item::Entity::find_by_id(item_id)
                    .one(&*self.db_pool)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("inventory item", item_id))?,
            ),
            None => None,
        };
        let item_name = super::clean(request.item_name)
            .or_else(|| item.as_ref().map(|i| i.name.clone()))
            .ok_or_else(|| ServiceError::ValidationError("Item name is required".to_string()))?;
        let unit = super::clean(request.unit)
            .or_else(|| item.as_ref().map(|i| i.unit.clone()))
            .unwrap_or_else(|| "pcs".to_string());

        let now = Utc::now();
        let model = material_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            department: Set(actor.department),
            requested_by: Set(actor.user_id),
            item_id: Set(request.item_id),
            item_name: Set(item_name),
            quantity: Set(request.quantity),
            unit: Set(unit),
            reason: Set(super::clean(request.reason)),
            urgency: Set(request.urgency),
            status: Set(MaterialRequestStatus::Pending),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            review_note: Set(None),
            fulfilled_by: Set(None),
            fulfilled_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(request_id = %model.id, item = %model.item_name, "Material request created");
        self.event_sender
            .publish(Event::MaterialRequestCreated {
                request_id: model.id,
                item_name: model.item_name.clone(),
            })
            .await;
        Ok(model)
    }

    /// Managers and inventory staff see every department; others see their own.
    pub async fn list(
        &self,
        actor: &AuthUser,
        filter: MaterialRequestFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<material_request::Model>, ServiceError> {
        let mut select =
            material_request::Entity::find().order_by_desc(material_request::Column::CreatedAt);

        let department = if Self::can_see_all(actor) {
            filter.department
        } else {
            Some(actor.department)
        };
        if let Some(department) = department {
            select = select.filter(material_request::Column::Department.eq(department));
        }
        if let Some(status) = filter.status {
            select = select.filter(material_request::Column::Status.eq(status));
        }
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    pub async fn get(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<material_request::Model, ServiceError> {
        let model = self.find(id).await?;
        if !Self::can_see_all(actor) && model.department != actor.department {
            return Err(ServiceError::Forbidden(
                "Material request belongs to another department".to_string(),
            ));
        }
        Ok(model)
    }

    async fn review(
        &self,
        actor: &AuthUser,
        id: Uuid,
        approve: bool,
        note: Option<String>,
    ) -> Result<material_request::Model, ServiceError> {
        let existing = self.find(id).await?;
        if existing.status != MaterialRequestStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Material request is {}, not pending",
                existing.status
            )));
        }
        let note = super::clean(note);
        if !approve && note.is_none() {
            return Err(ServiceError::ValidationError(
                "A note is required to reject a request".to_string(),
            ));
        }

        let status = if approve {
            MaterialRequestStatus::Approved
        } else {
            MaterialRequestStatus::Rejected
        };
        let requester = existing.requested_by;
        let now = Utc::now();
        let mut active: material_request::ActiveModel = existing.into();
        active.status = Set(status);
        active.reviewed_by = Set(Some(actor.user_id));
        active.reviewed_at = Set(Some(now));
        active.review_note = Set(note);
        active.updated_at = Set(now);
        let model = active.update(&*self.db_pool).await?;

        info!(request_id = %id, status = %status, "Material request reviewed");
        self.notify_requester(requester, &model).await;
        self.event_sender
            .publish(Event::MaterialRequestUpdated {
                request_id: id,
                status,
            })
            .await;
        Ok(model)
    }

    async fn notify_requester(&self, requester: Uuid, model: &material_request::Model) {
        let body = match &model.review_note {
            Some(note) => format!("{} {} {}: {}", model.quantity, model.unit, model.item_name, note),
            None => format!("{} {} {}", model.quantity, model.unit, model.item_name),
        };
        let note = NewNotification::new(
            "material_request_reviewed",
            format!("Your material request was {}", model.status),
            body,
        )
        .link("material_request", model.id);
        if let Err(e) = self.notifications.notify_user(requester, note).await {
            warn!(request_id = %model.id, error = %e, "Failed to notify requester");
        }
    }

    pub async fn approve(
        &self,
        actor: &AuthUser,
        id: Uuid,
        note: Option<String>,
    ) -> Result<material_request::Model, ServiceError> {
        self.review(actor, id, true, note).await
    }

    pub async fn reject(
        &self,
        actor: &AuthUser,
        id: Uuid,
        note: Option<String>,
    ) -> Result<material_request::Model, ServiceError> {
        self.review(actor, id, false, note).await
    }

    /// Marks an approved request delivered, adding the quantity to stock when
    /// the request names an inventory item.
    #[instrument(skip(self, actor))]
    pub async fn fulfil(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<material_request::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = material_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("material request", id))?;
        if existing.status != MaterialRequestStatus::Approved {
            return Err(ServiceError::InvalidStatus(format!(
                "Only approved requests can be fulfilled; this one is {}",
                existing.status
            )));
        }

        let (item_id, quantity) = (existing.item_id, existing.quantity);
        let reason = format!("Material request for {}", existing.department);

        let now = Utc::now();
        let mut active: material_request::ActiveModel = existing.into();
        active.status = Set(MaterialRequestStatus::Fulfilled);
        active.fulfilled_by = Set(Some(actor.user_id));
        active.fulfilled_at = Set(Some(now));
        active.updated_at = Set(now);
        // claim the transition before touching stock so a request restocks once
        let model = material_request::Entity::update(active)
            .filter(material_request::Column::Status.eq(MaterialRequestStatus::Approved))
            .exec(&txn)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => ServiceError::InvalidStatus(format!(
                    "Material request {id} is no longer approved"
                )),
                other => ServiceError::DatabaseError(other),
            })?;

        let adjustment = match item_id {
            Some(item_id) => Some(
                apply_adjustment(
                    &txn,
                    actor,
                    item_id,
                    &AdjustStockRequest {
                        delta: quantity,
                        reason,
                        reference_type: Some("material_request".to_string()),
                        reference_id: Some(id),
                    },
                )
                .await?,
            ),
            None => None,
        };
        txn.commit().await?;

        if let Some(adjustment) = adjustment {
            self.inventory.announce(adjustment).await?;
        }
        info!(request_id = %id, "Material request fulfilled");
        self.event_sender
            .publish(Event::MaterialRequestUpdated {
                request_id: id,
                status: model.status,
            })
            .await;
        Ok(model)
    }

    #[instrument(skip(self, actor))]
    pub async fn cancel(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<material_request::Model, ServiceError> {
        let existing = self.find(id).await?;
        if existing.requested_by != actor.user_id && !actor.is_admin() {
            return Err(ServiceError::Forbidden(
                "Only the requester can cancel a material request".to_string(),
            ));
        }
        if existing.status != MaterialRequestStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Only pending requests can be cancelled; this one is {}",
                existing.status
            )));
        }

        let mut active: material_request::ActiveModel = existing.into();
        active.status = Set(MaterialRequestStatus::Cancelled);
        active.updated_at = Set(Utc::now());
        let model = active.update(&*self.db_pool).await?;

        self.event_sender
            .publish(Event::MaterialRequestUpdated {
                request_id: id,
                status: model.status,
            })
            .await;
        Ok(model)
    }
}
