use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::errors::ServiceError;
use crate::models::{Order, OrderId};
use crate::notifications::{EmailMessage, Mailer};
use crate::presentation::{reminder_email, ReminderKind};
use crate::repositories::OrderRepository;
use crate::services::settings::GatewaySettings;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days left before the payment window closes, rounded up, never negative.
pub fn days_remaining(created_at: DateTime<Utc>, expiration_days: u32, now: DateTime<Utc>) -> i64 {
    let deadline = created_at + Duration::days(i64::from(expiration_days));
    let remaining = (deadline - now).num_seconds();
    if remaining <= 0 {
        return 0;
    }
    (remaining + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Payment-instruction and reminder emails for on-hold transfer orders.
#[derive(Clone)]
pub struct ReminderService {
    orders: Arc<dyn OrderRepository>,
    mailer: Arc<dyn Mailer>,
    settings: GatewaySettings,
    store_name: String,
}

impl ReminderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        mailer: Arc<dyn Mailer>,
        settings: GatewaySettings,
        store_name: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            mailer,
            settings,
            store_name: store_name.into(),
        }
    }

    /// Sends the instructions email for an order that just entered on-hold.
    /// `Ok(false)` when the order has no billing email or no pair.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn notify_awaiting_transfer(&self, order: &Order) -> Result<bool, ServiceError> {
        self.send(order, ReminderKind::PaymentInstructions).await
    }

    /// Administrator-triggered reminder.
    #[instrument(skip(self))]
    pub async fn send_manual_reminder(&self, order_id: OrderId) -> Result<bool, ServiceError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;
        if !order.uses_gateway() {
            return Err(ServiceError::WrongPaymentMethod(order_id));
        }
        self.send(&order, ReminderKind::Reminder).await
    }

    async fn send(&self, order: &Order, kind: ReminderKind) -> Result<bool, ServiceError> {
        let (Some(to), Some(pair)) = (order.billing_email(), order.identifier_pair()) else {
            debug!(?kind, "order has no billing email or identifier pair, skipping email");
            return Ok(false);
        };

        let config = self.settings.snapshot().await;
        let days = days_remaining(order.created_at, config.expiration_days, Utc::now());
        let (subject, html_body) = reminder_email(kind, &self.store_name, days, pair);

        self.mailer
            .send(EmailMessage {
                to: to.to_string(),
                subject,
                html_body,
            })
            .await?;

        info!(?kind, days_left = days, "payment email sent");
        Ok(true)
    }
}
