//! Third-party assertion that an order's bank transfer arrived.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::models::{OrderId, OrderStatus};
use crate::repositories::OrderRepository;

const PAID_STATUS: &str = "paid";
const NOTE_PAYMENT_CONFIRMED: &str = "Payment confirmed via external API.";

/// Webhook payload. Fields stay loose so bad input maps onto the documented error codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PaymentConfirmation {
    /// Number or numeric string
    #[schema(value_type = Option<String>, example = "42")]
    #[serde(default)]
    pub order_id: Option<Value>,
    #[schema(value_type = Option<String>, example = "paid")]
    #[serde(default)]
    pub status: Option<Value>,
}

impl PaymentConfirmation {
    pub fn new(order_id: impl Into<Value>, status: impl Into<Value>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            status: Some(status.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConfirmationOutcome {
    pub success: bool,
    #[schema(example = "Order updated to processing.")]
    pub message: String,
}

/// Scalar JSON value as trimmed text; empty, zero and non-scalars count as absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty() && text != "0").then_some(text)
}

#[derive(Clone)]
pub struct PaymentConfirmationService {
    orders: Arc<dyn OrderRepository>,
}

impl PaymentConfirmationService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    #[instrument(skip(self, payload))]
    pub async fn confirm(
        &self,
        payload: PaymentConfirmation,
    ) -> Result<ConfirmationOutcome, ServiceError> {
        let raw_id = scalar_text(payload.order_id.as_ref())
            .ok_or_else(|| ServiceError::MissingParameters("order_id".to_string()))?;
        let status = scalar_text(payload.status.as_ref())
            .ok_or_else(|| ServiceError::MissingParameters("status".to_string()))?;

        let order_id = raw_id
            .parse::<u64>()
            .map(OrderId)
            .map_err(|_| ServiceError::OrderNotFound(OrderId(0)))?;
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound(order_id))?;

        if !order.uses_gateway() {
            warn!(order_id = %order_id, payment_method = ?order.payment_method, "confirmation for foreign order");
            return Err(ServiceError::WrongPaymentMethod(order_id));
        }

        if status != PAID_STATUS {
            return Err(ServiceError::UnrecognizedStatus(status));
        }

        let now = Utc::now();
        if order.status.needs_payment() {
            order.status = OrderStatus::Processing;
            order.paid_at = Some(now);
        }
        order.add_note(NOTE_PAYMENT_CONFIRMED, now);
        self.orders.update(&order).await?;

        info!(order_id = %order_id, status = %order.status, "payment confirmed");
        Ok(ConfirmationOutcome {
            success: true,
            message: "Order updated to processing.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewOrder, Order, GATEWAY_ID};
    use crate::repositories::InMemoryOrderRepository;
    use assert_matches::assert_matches;
    use serde_json::json;

    async fn on_hold_order(orders: &InMemoryOrderRepository, method: &str) -> Order {
        let mut order = orders
            .create(NewOrder::pending(Vec::new(), Utc::now()))
            .await
            .unwrap();
        order.status = OrderStatus::OnHold;
        order.payment_method = Some(method.to_string());
        orders.update(&order).await.unwrap()
    }

    fn service() -> (Arc<InMemoryOrderRepository>, PaymentConfirmationService) {
        let orders = Arc::new(InMemoryOrderRepository::with_starting_id(42));
        (orders.clone(), PaymentConfirmationService::new(orders))
    }

    #[tokio::test]
    async fn paid_moves_order_to_processing() {
        let (orders, service) = service();
        let order = on_hold_order(&orders, GATEWAY_ID).await;

        let outcome = service
            .confirm(PaymentConfirmation::new(42, "paid"))
            .await
            .unwrap();
        assert!(outcome.success);

        let stored = orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Processing);
        assert!(stored.paid_at.is_some());
        assert_eq!(stored.notes.last().unwrap().message, NOTE_PAYMENT_CONFIRMED);
    }

    #[tokio::test]
    async fn string_order_id_is_accepted() {
        let (orders, service) = service();
        on_hold_order(&orders, GATEWAY_ID).await;
        assert!(service
            .confirm(PaymentConfirmation::new(" 42 ", " paid "))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn already_processing_order_is_left_in_place() {
        let (orders, service) = service();
        let mut order = on_hold_order(&orders, GATEWAY_ID).await;
        order.status = OrderStatus::Completed;
        orders.update(&order).await.unwrap();

        service
            .confirm(PaymentConfirmation::new(42, "paid"))
            .await
            .unwrap();
        let stored = orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        assert!(stored.paid_at.is_none());
    }

    #[tokio::test]
    async fn pending_status_is_unrecognized() {
        let (orders, service) = service();
        on_hold_order(&orders, GATEWAY_ID).await;
        assert_matches!(
            service.confirm(PaymentConfirmation::new(42, "pending")).await,
            Err(ServiceError::UnrecognizedStatus(s)) if s == "pending"
        );
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (_, service) = service();
        assert_matches!(
            service.confirm(PaymentConfirmation::new(999, "paid")).await,
            Err(ServiceError::OrderNotFound(OrderId(999)))
        );
        assert_matches!(
            service.confirm(PaymentConfirmation::new("abc", "paid")).await,
            Err(ServiceError::OrderNotFound(_))
        );
    }

    #[tokio::test]
    async fn foreign_payment_method_is_rejected() {
        let (orders, service) = service();
        on_hold_order(&orders, "card").await;
        assert_matches!(
            service.confirm(PaymentConfirmation::new(42, "paid")).await,
            Err(ServiceError::WrongPaymentMethod(OrderId(42)))
        );
    }

    #[tokio::test]
    async fn missing_fields_are_reported() {
        let (_, service) = service();
        for payload in [
            PaymentConfirmation::default(),
            PaymentConfirmation::new(42, ""),
            PaymentConfirmation::new(0, "paid"),
            PaymentConfirmation {
                order_id: Some(json!(42)),
                status: Some(json!(null)),
            },
        ] {
            assert_matches!(
                service.confirm(payload).await,
                Err(ServiceError::MissingParameters(_))
            );
        }
    }
}
