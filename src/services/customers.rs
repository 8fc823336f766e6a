use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{customer, invoice, order};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::PaginatedResponse;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name cannot be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Order and billing totals for one customer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    pub customer: customer::Model,
    pub order_count: u64,
    pub active_order_count: u64,
    pub invoiced_total: Decimal,
    pub paid_total: Decimal,
    pub outstanding_balance: Decimal,
}

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_customer(
        &self,
        actor_id: Uuid,
        request: CreateCustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            phone: Set(super::clean(request.phone)),
            email: Set(super::clean(request.email).map(|e| e.to_lowercase())),
            company: Set(super::clean(request.company)),
            address: Set(super::clean(request.address)),
            notes: Set(super::clean(request.notes)),
            created_by: Set(actor_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(customer_id = %model.id, "Customer created");
        self.event_sender
            .publish(Event::CustomerChanged {
                customer_id: model.id,
            })
            .await;
        Ok(model)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("customer", id))
    }

    pub async fn list_customers(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<customer::Model>, ServiceError> {
        let mut select = customer::Entity::find().order_by_asc(customer::Column::Name);
        if let Some(term) = super::clean(search) {
            select = select.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(term.as_str()))
                    .add(customer::Column::Phone.contains(term.as_str()))
                    .add(customer::Column::Company.contains(term.as_str())),
            );
        }
        super::fetch_page(select, &self.db_pool, page, limit).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_customer(
        &self,
        id: Uuid,
        request: UpdateCustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let mut active: customer::ActiveModel = self.get_customer(id).await?.into();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if request.phone.is_some() {
            active.phone = Set(super::clean(request.phone));
        }
        if request.email.is_some() {
            active.email = Set(super::clean(request.email).map(|e| e.to_lowercase()));
        }
        if request.company.is_some() {
            active.company = Set(super::clean(request.company));
        }
        if request.address.is_some() {
            active.address = Set(super::clean(request.address));
        }
        if request.notes.is_some() {
            active.notes = Set(super::clean(request.notes));
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db_pool).await?;
        self.event_sender
            .publish(Event::CustomerChanged { customer_id: id })
            .await;
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_customer(id).await?;
        let orders = order::Entity::find()
            .filter(order::Column::CustomerId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "Customer {} still has {} order(s)",
                id, orders
            )));
        }

        customer::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        info!(customer_id = %id, "Customer deleted");
        self.event_sender
            .publish(Event::CustomerChanged { customer_id: id })
            .await;
        Ok(())
    }

    pub async fn summary(&self, id: Uuid) -> Result<CustomerSummary, ServiceError> {
        let customer = self.get_customer(id).await?;

        let orders = order::Entity::find()
            .filter(order::Column::CustomerId.eq(id))
            .all(&*self.db_pool)
            .await?;
        let invoices = invoice::Entity::find()
            .filter(invoice::Column::CustomerId.eq(id))
            .filter(invoice::Column::Status.ne(invoice::InvoiceStatus::Cancelled))
            .all(&*self.db_pool)
            .await?;

        let invoiced_total: Decimal = invoices.iter().map(|i| i.total_amount).sum();
        let paid_total: Decimal = invoices.iter().map(|i| i.paid_amount).sum();

        Ok(CustomerSummary {
            customer,
            order_count: orders.len() as u64,
            active_order_count: orders.iter().filter(|o| o.status.is_active()).count() as u64,
            invoiced_total,
            paid_total,
            outstanding_balance: invoiced_total - paid_total,
        })
    }
}
