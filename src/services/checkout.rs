//! Turns a reservation (or, in backup-only mode, the submitted order) into an
//! on-hold order awaiting the bank transfer.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::errors::ServiceError;
use crate::models::{Address, IdentifierAssignment, Order, OrderId, OrderStatus, SessionId, GATEWAY_ID};
use crate::repositories::{CartStore, OrderRepository, SessionStore};
use crate::services::reminders::ReminderService;
use crate::services::settings::GatewaySettings;

const NOTE_AWAITING_TRANSFER: &str = "Awaiting bank transfer.";
const NOTE_AWAITING_TRANSFER_BACKUP: &str = "Awaiting bank transfer (external API disabled).";

#[derive(Clone)]
pub struct CheckoutFinalizer {
    orders: Arc<dyn OrderRepository>,
    sessions: Arc<dyn SessionStore>,
    carts: Arc<dyn CartStore>,
    reminders: ReminderService,
    settings: GatewaySettings,
}

impl CheckoutFinalizer {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        sessions: Arc<dyn SessionStore>,
        carts: Arc<dyn CartStore>,
        reminders: ReminderService,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            orders,
            sessions,
            carts,
            reminders,
            settings,
        }
    }

    /// Finalizes checkout for `order_id`, returning the order as persisted.
    #[instrument(skip(self, billing, shipping), fields(session = %session, order_id = %order_id))]
    pub async fn finalize(
        &self,
        session: &SessionId,
        order_id: OrderId,
        billing: Address,
        shipping: Address,
    ) -> Result<Order, ServiceError> {
        let config = self.settings.snapshot().await;

        let mut order = if config.use_api {
            let mut order = self.resolve_reservation(session, order_id).await?;
            apply_checkout_details(&mut order, billing, shipping);

            if order.identifier_pair().is_none() {
                self.orders.update(&order).await?;
                warn!(order_id = %order.id, "finalize attempted without an assigned CVU/Alias");
                return Err(ServiceError::IdentifierMissing(order.id));
            }

            let now = Utc::now();
            order.status = OrderStatus::OnHold;
            order.is_provisional = false;
            order.add_note(NOTE_AWAITING_TRANSFER, now);
            order
        } else {
            let mut order = self
                .orders
                .find_by_id(order_id)
                .await?
                .ok_or(ServiceError::OrderNotFound(order_id))?;
            let held = self.sessions.reservation(session).await?;
            ensure_finalizable(&order, held)?;
            apply_checkout_details(&mut order, billing, shipping);

            let Some(backup) = config.backup_pair() else {
                self.orders.update(&order).await?;
                error!(order_id = %order.id, "backup-only mode without a backup pair");
                return Err(ServiceError::NoBackupConfigured);
            };

            let now = Utc::now();
            order.identifier = Some(IdentifierAssignment::backup(backup));
            order.status = OrderStatus::OnHold;
            order.is_provisional = false;
            order.add_note(NOTE_AWAITING_TRANSFER_BACKUP, now);
            order
        };

        order = self.orders.update(&order).await?;
        self.carts.clear(session).await?;
        if config.use_api {
            self.sessions.clear_reservation(session).await?;
        }

        info!(order_id = %order.id, "order on hold awaiting bank transfer");

        if let Err(err) = self.reminders.notify_awaiting_transfer(&order).await {
            error!(order_id = %order.id, error = %err, "failed to send payment instructions email");
        }

        Ok(order)
    }

    /// Picks the session's reservation over the submitted order, discarding the latter.
    async fn resolve_reservation(
        &self,
        session: &SessionId,
        submitted_id: OrderId,
    ) -> Result<Order, ServiceError> {
        let held = self.sessions.reservation(session).await?;

        let Some(reserved_id) = held.filter(|id| *id != submitted_id) else {
            let order = self
                .orders
                .find_by_id(submitted_id)
                .await?
                .ok_or(ServiceError::OrderNotFound(submitted_id))?;
            ensure_finalizable(&order, held)?;
            return Ok(order);
        };

        let Some(mut reservation) = self.orders.find_by_id(reserved_id).await? else {
            self.sessions.clear_reservation(session).await?;
            warn!(reserved = %reserved_id, "reservation vanished before finalize");
            return Err(ServiceError::OrderNotFound(reserved_id));
        };
        ensure_finalizable(&reservation, held)?;

        if let Some(submitted) = self.orders.find_by_id(submitted_id).await? {
            ensure_finalizable(&submitted, held)?;
            if !submitted.items.is_empty() {
                reservation.replace_items(submitted.items);
            }
            self.orders.delete(submitted_id).await?;
            info!(
                submitted = %submitted_id,
                reserved = %reserved_id,
                "submitted order discarded in favour of reservation"
            );
        }

        Ok(reservation)
    }
}

/// Only a freshly submitted order, or the draft this session holds, may be finalized.
fn ensure_finalizable(order: &Order, held: Option<OrderId>) -> Result<(), ServiceError> {
    let submitted = order.status == OrderStatus::Pending && !order.is_provisional;
    let own_draft = order.is_live_reservation() && held == Some(order.id);
    if submitted || own_draft {
        Ok(())
    } else {
        warn!(order_id = %order.id, status = %order.status, "order cannot be finalized");
        Err(ServiceError::OrderNotFinalizable(order.id))
    }
}

fn apply_checkout_details(order: &mut Order, billing: Address, shipping: Address) {
    order.billing = Some(billing);
    order.shipping = Some(shipping);
    order.payment_method = Some(GATEWAY_ID.to_string());
    order.updated_at = Some(Utc::now());
}
