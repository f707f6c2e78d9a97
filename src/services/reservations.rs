//! Session-scoped provisional order reservations.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{Cart, IdentifierOrigin, NewOrder, Order, OrderId, SessionId};
use crate::repositories::{OrderRepository, SessionStore};
use crate::services::identifier_source::IdentifierSource;
use crate::services::settings::GatewaySettings;

/// What the shopper sees once a reservation is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Reservation {
    pub order_id: OrderId,
    pub cvu: String,
    pub alias: String,
    /// Configured payment window in days
    pub days: u32,
    pub origin: IdentifierOrigin,
    /// True when an existing reservation was handed back
    pub reused: bool,
}

impl Reservation {
    fn from_order(order: &Order, days: u32, reused: bool) -> Option<Self> {
        let assignment = order.identifier.as_ref()?;
        if !assignment.pair.is_complete() {
            return None;
        }
        Some(Self {
            order_id: order.id,
            cvu: assignment.pair.cvu.clone(),
            alias: assignment.pair.alias.clone(),
            days,
            origin: assignment.origin,
            reused,
        })
    }

    pub fn is_backup(&self) -> bool {
        self.origin == IdentifierOrigin::Backup
    }

    /// Shopper-facing note for a freshly issued pair.
    pub fn message(&self) -> Option<&'static str> {
        if self.reused {
            return None;
        }
        Some(match self.origin {
            IdentifierOrigin::Api => "CVU/Alias assigned by the issuing service.",
            IdentifierOrigin::Backup => "The store's backup CVU/Alias has been assigned.",
        })
    }
}

#[derive(Clone)]
pub struct ReservationManager {
    orders: Arc<dyn OrderRepository>,
    sessions: Arc<dyn SessionStore>,
    source: IdentifierSource,
    settings: GatewaySettings,
}

impl ReservationManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        sessions: Arc<dyn SessionStore>,
        source: IdentifierSource,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            orders,
            sessions,
            source,
            settings,
        }
    }

    /// Returns the session's live reservation, or creates one from `cart`.
    #[instrument(skip(self, cart), fields(session = %session, items = cart.items.len()))]
    pub async fn create_or_reuse(
        &self,
        session: &SessionId,
        cart: &Cart,
    ) -> Result<Reservation, ServiceError> {
        let config = self.settings.snapshot().await;
        if !config.use_api {
            return Err(ServiceError::ApiDisabled);
        }
        if cart.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        if let Some(existing_id) = self.sessions.reservation(session).await? {
            let existing = self.orders.find_by_id(existing_id).await?;
            if let Some(order) = existing.as_ref().filter(|o| o.is_live_reservation()) {
                if let Some(reservation) =
                    Reservation::from_order(order, config.expiration_days, true)
                {
                    info!(order_id = %order.id, "reusing provisional order");
                    return Ok(reservation);
                }
            }

            warn!(order_id = %existing_id, "discarding stale reservation");
            self.discard_if_provisional(existing.as_ref()).await?;
            self.sessions.clear_reservation(session).await?;
        }

        let draft = self
            .orders
            .create(NewOrder::provisional_from_cart(cart, Utc::now()))
            .await?;

        let assignment = match self.source.acquire(draft.id, &config).await {
            Ok(assignment) => assignment,
            Err(err) => {
                self.orders.delete(draft.id).await?;
                warn!(order_id = %draft.id, error = %err, "identifier assignment failed, draft removed");
                return Err(ServiceError::NoIdentifierAvailable);
            }
        };

        let mut order = draft;
        order.identifier = Some(assignment);
        order.updated_at = Some(Utc::now());
        let order = match self.orders.update(&order).await {
            Ok(order) => order,
            Err(err) => {
                self.orders.delete(order.id).await?;
                return Err(err);
            }
        };
        self.sessions.set_reservation(session, order.id).await?;

        let reservation = Reservation::from_order(&order, config.expiration_days, false)
            .ok_or(ServiceError::IdentifierMissing(order.id))?;
        info!(
            order_id = %order.id,
            origin = ?reservation.origin,
            "provisional order reserved"
        );
        Ok(reservation)
    }

    /// Drops the session's reservation. Succeeds when nothing is reserved.
    #[instrument(skip(self), fields(session = %session))]
    pub async fn release(&self, session: &SessionId) -> Result<(), ServiceError> {
        let Some(order_id) = self.sessions.clear_reservation(session).await? else {
            return Ok(());
        };

        let order = self.orders.find_by_id(order_id).await?;
        if self.discard_if_provisional(order.as_ref()).await? {
            info!(order_id = %order_id, "provisional order released");
        }
        Ok(())
    }

    /// Deletes `order` only while it is still a provisional draft.
    async fn discard_if_provisional(&self, order: Option<&Order>) -> Result<bool, ServiceError> {
        match order {
            Some(order) if order.is_live_reservation() => self.orders.delete(order.id).await,
            _ => Ok(false),
        }
    }
}
