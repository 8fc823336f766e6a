use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{perm, AuthUser};
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus, OrderType, Priority};
use crate::entities::order_attachment::{self, AttachmentKind};
use crate::entities::user::{self, Department, UserRole};
use crate::entities::{customer, order_timeline};
use crate::errors::{map_versioned_update, ServiceError};
use crate::events::{Event, EventSender};
use crate::services::counters::{next_number, CounterKind};
use crate::services::notifications::{NewNotification, NotificationService};
use crate::storage::{validate_key, ObjectStore};
use crate::PaginatedResponse;

/// Request to open a new order
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Existing customer; name and phone are copied when omitted below
    pub customer_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub order_type: OrderType,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub dimensions: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub total_amount: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub order_type: Option<OrderType>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub dimensions: Option<String>,
    pub priority: Option<Priority>,
    pub total_amount: Option<Decimal>,
    pub paid_amount: Option<Decimal>,
    pub due_date: Option<DateTime<Utc>>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
    /// Rejects the change when the order has moved on since it was read
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AssignOrderRequest {
    pub designer_id: Option<Uuid>,
    pub printer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AttachFileRequest {
    pub kind: AttachmentKind,
    pub storage_key: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub department: Option<Department>,
    pub assignee_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

/// An order with its history and files
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetail {
    pub order: order::Model,
    pub timeline: Vec<order_timeline::Model>,
    pub attachments: Vec<order_attachment::Model>,
}

/// Checks whether `actor` may move an order from `from` to `to`.
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
    actor_role: UserRole,
    actor_department: Department,
    note: Option<&str>,
) -> Result<(), ServiceError> {
    if from == to {
        return Err(ServiceError::InvalidStatus(format!(
            "Order is already {}",
            to
        )));
    }
    if from.is_terminal() {
        return Err(ServiceError::InvalidStatus(format!(
            "Order is {} and can no longer change",
            from
        )));
    }
    if from == OrderStatus::Delivered
        && !matches!(to, OrderStatus::Completed | OrderStatus::Returned)
    {
        return Err(ServiceError::InvalidStatus(format!(
            "A delivered order can only become completed or returned, not {}",
            to
        )));
    }

    let overrides = matches!(actor_role, UserRole::Admin | UserRole::Ceo | UserRole::Sales);
    if !overrides && actor_department != to.department() {
        return Err(ServiceError::Forbidden(format!(
            "Status {} belongs to the {} department",
            to,
            to.department()
        )));
    }

    if to == OrderStatus::Cancelled && note.map_or(true, |n| n.trim().is_empty()) {
        return Err(ServiceError::ValidationError(
            "A note is required to cancel an order".to_string(),
        ));
    }
    Ok(())
}

fn validate_amounts(total: Decimal, paid: Decimal) -> Result<(), ServiceError> {
    if total < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Total amount cannot be negative".to_string(),
        ));
    }
    if paid < Decimal::ZERO || paid > total {
        return Err(ServiceError::ValidationError(
            "Paid amount must be between 0 and the total amount".to_string(),
        ));
    }
    Ok(())
}

/// Appends one row to an order's history.
pub(crate) async fn append_timeline<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    actor: &AuthUser,
    action: &str,
    transition: Option<(OrderStatus, OrderStatus)>,
    note: Option<String>,
) -> Result<order_timeline::Model, ServiceError> {
    let entry = order_timeline::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        action: Set(action.to_string()),
        from_status: Set(transition.map(|(from, _)| from)),
        to_status: Set(transition.map(|(_, to)| to)),
        note: Set(note),
        actor_id: Set(actor.user_id),
        actor_name: Set(actor.name.clone()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(entry)
}

/// Numbers and inserts an order inside the caller's transaction.
pub(crate) async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    actor: &AuthUser,
    request: CreateOrderRequest,
    quotation_id: Option<Uuid>,
) -> Result<order::Model, ServiceError> {
    request.validate()?;
    validate_amounts(request.total_amount, request.paid_amount)?;

    let customer = match request.customer_id {
        Some(id) => Some(
            customer::Entity::find_by_id(id)
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::not_found("customer", id))?,
        ),
        None => None,
    };
    let customer_name = super::clean(request.customer_name)
        .or_else(|| customer.as_ref().map(|c| c.name.clone()))
        .ok_or_else(|| ServiceError::ValidationError("Customer name is required".to_string()))?;
    let customer_phone = super::clean(request.customer_phone)
        .or_else(|| customer.as_ref().and_then(|c| c.phone.clone()));

    let order_number = next_number(conn, CounterKind::Order).await?;
    let now = Utc::now();
    let model = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_number: Set(order_number),
        customer_id: Set(request.customer_id),
        customer_name: Set(customer_name),
        customer_phone: Set(customer_phone),
        quotation_id: Set(quotation_id),
        title: Set(request.title.trim().to_string()),
        description: Set(super::clean(request.description)),
        order_type: Set(request.order_type),
        quantity: Set(request.quantity),
        dimensions: Set(super::clean(request.dimensions)),
        priority: Set(request.priority),
        status: Set(OrderStatus::New),
        assigned_designer_id: Set(None),
        assigned_printer_id: Set(None),
        total_amount: Set(request.total_amount),
        paid_amount: Set(request.paid_amount),
        remaining_amount: Set(request.total_amount - request.paid_amount),
        due_date: Set(request.due_date),
        created_by: Set(actor.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        version: Set(1),
    }
    .insert(conn)
    .await?;

    append_timeline(
        conn,
        model.id,
        actor,
        "created",
        None,
        quotation_id.map(|_| "Created from quotation".to_string()),
    )
    .await?;
    Ok(model)
}

/// Service for the order workflow
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
    notifications: NotificationService,
    storage: Arc<dyn ObjectStore>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: EventSender,
        notifications: NotificationService,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            notifications,
            storage,
        }
    }

    async fn find(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))
    }

    /// Floor staff without `orders:read_all` only see their own assignments.
    fn ensure_visible(actor: &AuthUser, order: &order::Model) -> Result<(), ServiceError> {
        if actor.has_permission(perm::ORDERS_READ_ALL)
            || order.assigned_designer_id == Some(actor.user_id)
            || order.assigned_printer_id == Some(actor.user_id)
        {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Order is not assigned to you".to_string(),
            ))
        }
    }

    #[instrument(skip(self, actor, request), fields(title = %request.title))]
    pub async fn create_order(
        &self,
        actor: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let model = insert_order(&txn, actor, request, None).await?;
        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order creation");
            ServiceError::DatabaseError(e)
        })?;

        crate::metrics::record_order_created();
        info!(order_id = %model.id, order_number = %model.order_number, "Order created");
        self.event_sender
            .publish(Event::OrderCreated {
                order_id: model.id,
                order_number: model.order_number.clone(),
            })
            .await;
        Ok(model)
    }

    pub async fn get_order(&self, actor: &AuthUser, id: Uuid) -> Result<OrderDetail, ServiceError> {
        let order = self.find(id).await?;
        Self::ensure_visible(actor, &order)?;

        let timeline = order_timeline::Entity::find()
            .filter(order_timeline::Column::OrderId.eq(id))
            .order_by_asc(order_timeline::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        let attachments = self.list_attachments(actor, id).await?;

        Ok(OrderDetail {
            order,
            timeline,
            attachments,
        })
    }

    pub async fn list_orders(
        &self,
        actor: &AuthUser,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<order::Model>, ServiceError> {
        let mut select = order::Entity::find().order_by_desc(order::Column::CreatedAt);

        if !actor.has_permission(perm::ORDERS_READ_ALL) {
            select = select.filter(
                Condition::any()
                    .add(order::Column::AssignedDesignerId.eq(actor.user_id))
                    .add(order::Column::AssignedPrinterId.eq(actor.user_id)),
            );
        }
        if let Some(status) = filter.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        if let Some(department) = filter.department {
            select = select.filter(order::Column::Status.is_in(OrderStatus::owned_by(department)));
        }
        if let Some(assignee) = filter.assignee_id {
            select = select.filter(
                Condition::any()
                    .add(order::Column::AssignedDesignerId.eq(assignee))
                    .add(order::Column::AssignedPrinterId.eq(assignee)),
            );
        }
        if let Some(customer_id) = filter.customer_id {
            select = select.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(priority) = filter.priority {
            select = select.filter(order::Column::Priority.eq(priority));
        }
        if let Some(term) = super::clean(filter.search) {
            select = select.filter(
                Condition::any()
                    .add(order::Column::OrderNumber.contains(term.as_str()))
                    .add(order::Column::Title.contains(term.as_str()))
                    .add(order::Column::CustomerName.contains(term.as_str())),
            );
        }

        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    #[instrument(skip(self, actor, request))]
    pub async fn update_order(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;
        let existing = self.find(id).await?;
        if existing.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and can no longer be edited",
                existing.order_number, existing.status
            )));
        }
        if request.expected_version.map_or(false, |v| v != existing.version) {
            return Err(ServiceError::ConcurrentModification(id));
        }

        let total = request.total_amount.unwrap_or(existing.total_amount);
        let paid = request.paid_amount.unwrap_or(existing.paid_amount);
        validate_amounts(total, paid)?;

        let version = existing.version;
        let mut active: order::ActiveModel = existing.into();
        if let Some(title) = request.title {
            active.title = Set(title.trim().to_string());
        }
        if request.description.is_some() {
            active.description = Set(super::clean(request.description));
        }
        if let Some(name) = super::clean(request.customer_name) {
            active.customer_name = Set(name);
        }
        if request.customer_phone.is_some() {
            active.customer_phone = Set(super::clean(request.customer_phone));
        }
        if let Some(order_type) = request.order_type {
            active.order_type = Set(order_type);
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if request.dimensions.is_some() {
            active.dimensions = Set(super::clean(request.dimensions));
        }
        if let Some(priority) = request.priority {
            active.priority = Set(priority);
        }
        if request.due_date.is_some() {
            active.due_date = Set(request.due_date);
        }
        active.total_amount = Set(total);
        active.paid_amount = Set(paid);
        active.remaining_amount = Set(total - paid);
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());

        let updated = order::Entity::update(active)
            .filter(order::Column::Version.eq(version))
            .exec(&*self.db_pool)
            .await
            .map_err(map_versioned_update(id))?;

        info!(order_id = %id, actor = %actor.user_id, "Order updated");
        self.event_sender
            .publish(Event::OrderUpdated { order_id: id })
            .await;
        Ok(updated)
    }

    #[instrument(skip(self, actor, request), fields(order_id = %id, to = %request.status))]
    pub async fn update_status(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<order::Model, ServiceError> {
        let note = super::clean(request.note);
        let txn = self.db_pool.begin().await?;

        let existing = order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))?;
        Self::ensure_visible(actor, &existing)?;
        if request
            .expected_version
            .map_or(false, |v| v != existing.version)
        {
            warn!(
                expected = ?request.expected_version,
                actual = existing.version,
                "Stale order status update"
            );
            return Err(ServiceError::ConcurrentModification(id));
        }

        let from = existing.status;
        check_transition(
            from,
            request.status,
            actor.role,
            actor.department,
            note.as_deref(),
        )?;

        let version = existing.version;
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(request.status);
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());
        let updated = order::Entity::update(active)
            .filter(order::Column::Version.eq(version))
            .exec(&txn)
            .await
            .map_err(map_versioned_update(id))?;

        append_timeline(
            &txn,
            id,
            actor,
            "status_changed",
            Some((from, request.status)),
            note,
        )
        .await?;
        txn.commit().await?;

        crate::metrics::record_status_change(&request.status.to_string());
        info!(from = %from, version = updated.version, "Order status changed");
        self.event_sender
            .publish(Event::OrderStatusChanged {
                order_id: id,
                order_number: updated.order_number.clone(),
                from,
                to: updated.status,
                version: updated.version,
            })
            .await;
        Ok(updated)
    }

    async fn assignee(&self, id: Uuid, role: UserRole) -> Result<user::Model, ServiceError> {
        let user = user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))?;
        if user.role != role {
            return Err(ServiceError::ValidationError(format!(
                "{} is a {}, not a {}",
                user.name, user.role, role
            )));
        }
        if !user.active {
            return Err(ServiceError::ValidationError(format!(
                "{} is deactivated",
                user.name
            )));
        }
        Ok(user)
    }

    #[instrument(skip(self, actor, request), fields(order_id = %id))]
    pub async fn assign(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: AssignOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        if request.designer_id.is_none() && request.printer_id.is_none() {
            return Err(ServiceError::ValidationError(
                "Provide a designer or a printer to assign".to_string(),
            ));
        }

        let designer = match request.designer_id {
            Some(uid) => Some(self.assignee(uid, UserRole::Designer).await?),
            None => None,
        };
        let printer = match request.printer_id {
            Some(uid) => Some(self.assignee(uid, UserRole::Printing).await?),
            None => None,
        };

        let txn = self.db_pool.begin().await?;
        let existing = order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))?;
        if existing.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {}",
                existing.order_number, existing.status
            )));
        }

        let version = existing.version;
        let order_number = existing.order_number.clone();
        let mut active: order::ActiveModel = existing.into();
        let mut names = Vec::new();
        if let Some(d) = &designer {
            active.assigned_designer_id = Set(Some(d.id));
            names.push(format!("designer {}", d.name));
        }
        if let Some(p) = &printer {
            active.assigned_printer_id = Set(Some(p.id));
            names.push(format!("printer {}", p.name));
        }
        active.version = Set(version + 1);
        active.updated_at = Set(Utc::now());
        let updated = order::Entity::update(active)
            .filter(order::Column::Version.eq(version))
            .exec(&txn)
            .await
            .map_err(map_versioned_update(id))?;

        append_timeline(
            &txn,
            id,
            actor,
            "assigned",
            None,
            Some(format!("Assigned to {}", names.join(" and "))),
        )
        .await?;
        txn.commit().await?;

        for assignee in designer.iter().chain(printer.iter()) {
            let note = NewNotification::new(
                "order_assigned",
                format!("Order {} assigned to you", order_number),
                updated.title.clone(),
            )
            .link("order", id);
            if let Err(e) = self.notifications.notify_user(assignee.id, note).await {
                warn!(user_id = %assignee.id, error = %e, "Failed to notify assignee");
            }
        }

        info!(designer = ?request.designer_id, printer = ?request.printer_id, "Order assigned");
        self.event_sender
            .publish(Event::OrderAssigned {
                order_id: id,
                designer_id: updated.assigned_designer_id,
                printer_id: updated.assigned_printer_id,
            })
            .await;
        Ok(updated)
    }

    pub async fn add_timeline_note(
        &self,
        actor: &AuthUser,
        id: Uuid,
        note: String,
    ) -> Result<order_timeline::Model, ServiceError> {
        let note = super::clean(Some(note))
            .ok_or_else(|| ServiceError::ValidationError("Note cannot be empty".to_string()))?;
        let order = self.find(id).await?;
        Self::ensure_visible(actor, &order)?;

        let entry = append_timeline(&*self.db_pool, id, actor, "note", None, Some(note)).await?;
        self.event_sender
            .publish(Event::OrderUpdated { order_id: id })
            .await;
        Ok(entry)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: Uuid) -> Result<(), ServiceError> {
        self.find(id).await?;
        let attachments = order_attachment::Entity::find()
            .filter(order_attachment::Column::OrderId.eq(id))
            .all(&*self.db_pool)
            .await?;

        order::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;

        for attachment in attachments {
            if let Err(e) = self.storage.delete(&attachment.storage_key).await {
                warn!(key = %attachment.storage_key, error = %e, "Failed to remove attachment file");
            }
        }

        info!(order_id = %id, "Order deleted");
        self.event_sender
            .publish(Event::OrderDeleted { order_id: id })
            .await;
        Ok(())
    }

    #[instrument(skip(self, actor, request), fields(order_id = %order_id, key = %request.storage_key))]
    pub async fn attach_file(
        &self,
        actor: &AuthUser,
        order_id: Uuid,
        request: AttachFileRequest,
    ) -> Result<order_attachment::Model, ServiceError> {
        validate_key(&request.storage_key)?;
        let order = self.find(order_id).await?;
        Self::ensure_visible(actor, &order)?;
        if !self.storage.exists(&request.storage_key).await? {
            return Err(ServiceError::not_found("file", &request.storage_key));
        }

        let file_name = super::clean(Some(request.file_name))
            .ok_or_else(|| ServiceError::ValidationError("File name is required".to_string()))?;
        let content_type = super::clean(request.content_type)
            .unwrap_or_else(|| crate::storage::content_type_for(&file_name).to_string());

        let txn = self.db_pool.begin().await?;
        let attachment = order_attachment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            kind: Set(request.kind),
            storage_key: Set(request.storage_key),
            file_name: Set(file_name.clone()),
            content_type: Set(content_type),
            size_bytes: Set(request.size_bytes.unwrap_or(0).max(0)),
            uploaded_by: Set(actor.user_id),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        append_timeline(
            &txn,
            order_id,
            actor,
            "attachment",
            None,
            Some(format!("{} added: {}", request.kind, file_name)),
        )
        .await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::OrderUpdated { order_id })
            .await;
        Ok(attachment)
    }

    pub async fn list_attachments(
        &self,
        actor: &AuthUser,
        order_id: Uuid,
    ) -> Result<Vec<order_attachment::Model>, ServiceError> {
        let order = self.find(order_id).await?;
        Self::ensure_visible(actor, &order)?;
        Ok(order_attachment::Entity::find()
            .filter(order_attachment::Column::OrderId.eq(order_id))
            .order_by_asc(order_attachment::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }
}
