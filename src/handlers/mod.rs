pub mod admin;
pub mod cart;
pub mod checkout;
pub mod common;
pub mod health;
pub mod payment_webhooks;
pub mod reservations;
