use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{CartStore, OrderRepository, SessionStore};
use crate::errors::ServiceError;
use crate::models::{Cart, NewOrder, Order, OrderId, SessionId};

/// Order store keyed by id, allocating ids from a counter.
#[derive(Debug)]
pub struct InMemoryOrderRepository {
    orders: DashMap<OrderId, Order>,
    next_id: AtomicU64,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::with_starting_id(1)
    }

    /// First allocated id will be `first`.
    pub fn with_starting_id(first: u64) -> Self {
        Self {
            orders: DashMap::new(),
            next_id: AtomicU64::new(first),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, ServiceError> {
        let id = OrderId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let order = order.into_order(id);
        self.orders.insert(id, order.clone());
        debug!(order_id = %id, status = %order.status, "order created");
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update(&self, order: &Order) -> Result<Order, ServiceError> {
        match self.orders.get_mut(&order.id) {
            Some(mut entry) => {
                *entry = order.clone();
                Ok(order.clone())
            }
            None => Err(ServiceError::OrderNotFound(order.id)),
        }
    }

    async fn delete(&self, id: OrderId) -> Result<bool, ServiceError> {
        Ok(self.orders.remove(&id).is_some())
    }

    async fn find_provisional_drafts(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self
            .orders
            .iter()
            .filter(|entry| entry.is_live_reservation())
            .map(|entry| entry.value().clone())
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    reservations: DashMap<SessionId, OrderId>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn reservation(&self, session: &SessionId) -> Result<Option<OrderId>, ServiceError> {
        Ok(self.reservations.get(session).map(|entry| *entry.value()))
    }

    async fn set_reservation(
        &self,
        session: &SessionId,
        order_id: OrderId,
    ) -> Result<(), ServiceError> {
        self.reservations.insert(session.clone(), order_id);
        Ok(())
    }

    async fn clear_reservation(
        &self,
        session: &SessionId,
    ) -> Result<Option<OrderId>, ServiceError> {
        Ok(self.reservations.remove(session).map(|(_, id)| id))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: DashMap<SessionId, Cart>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn cart(&self, session: &SessionId) -> Result<Cart, ServiceError> {
        Ok(self
            .carts
            .get(session)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn replace(&self, session: &SessionId, cart: Cart) -> Result<(), ServiceError> {
        self.carts.insert(session.clone(), cart);
        Ok(())
    }

    async fn clear(&self, session: &SessionId) -> Result<(), ServiceError> {
        self.carts.remove(session);
        Ok(())
    }
}
