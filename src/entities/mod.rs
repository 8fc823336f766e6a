pub mod call;
pub mod call_candidate;
pub mod chat;
pub mod chat_participant;
pub mod counter;
pub mod customer;
pub mod inventory_item;
pub mod inventory_transaction;
pub mod invoice;
pub mod material_request;
pub mod message;
pub mod notification;
pub mod order;
pub mod order_attachment;
pub mod order_timeline;
pub mod payment;
pub mod quotation;
pub mod quotation_item;
pub mod user;
