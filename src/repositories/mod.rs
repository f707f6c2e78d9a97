//! Ports onto the surrounding commerce platform.
//!
//! The gateway never owns order persistence, sessions or carts. It reaches them
//! through these traits; [`in_memory`] provides DashMap-backed adapters so the
//! service runs stand-alone and in tests.

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::models::{Cart, NewOrder, Order, OrderId, SessionId};

pub mod in_memory;

pub use in_memory::{InMemoryCartStore, InMemoryOrderRepository, InMemorySessionStore};

/// Order subsystem port
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Allocates an id and persists the record.
    async fn create(&self, order: NewOrder) -> Result<Order, ServiceError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, ServiceError>;

    /// Persists every field of an existing order. `OrderNotFound` if it vanished.
    async fn update(&self, order: &Order) -> Result<Order, ServiceError>;

    /// Permanently removes an order. Returns whether anything was deleted.
    async fn delete(&self, id: OrderId) -> Result<bool, ServiceError>;

    /// Provisional orders still in draft status.
    async fn find_provisional_drafts(&self) -> Result<Vec<Order>, ServiceError>;
}

/// Per-session single-slot reservation association
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn reservation(&self, session: &SessionId) -> Result<Option<OrderId>, ServiceError>;

    async fn set_reservation(&self, session: &SessionId, order_id: OrderId)
        -> Result<(), ServiceError>;

    /// Clears the slot, returning what it held.
    async fn clear_reservation(&self, session: &SessionId)
        -> Result<Option<OrderId>, ServiceError>;
}

/// Shopper cart port
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn cart(&self, session: &SessionId) -> Result<Cart, ServiceError>;

    async fn replace(&self, session: &SessionId, cart: Cart) -> Result<(), ServiceError>;

    async fn clear(&self, session: &SessionId) -> Result<(), ServiceError>;
}
