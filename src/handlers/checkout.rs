use axum::{
    extract::State,
    response::Html,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::common::ShopperError;
use crate::errors::ServiceError;
use crate::models::{Address, OrderId, OrderStatus, SessionId};
use crate::presentation;
use crate::services::reminders::days_remaining;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    /// Order the platform created on submission
    pub order_id: OrderId,
    pub billing: Address,
    #[serde(default)]
    pub shipping: Address,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FinalizeResponse {
    #[schema(example = "success")]
    pub result: String,
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Payment instructions block for the order-received page
    pub instructions_html: String,
}

/// Finalize checkout with this payment method
#[utoipa::path(
    post,
    path = "/api/v1/checkout/cvu/finalize",
    summary = "Finalize checkout",
    description = "Reconciles the session's reservation into the submitted order and puts it on hold awaiting the transfer",
    params(("x-session-id" = String, Header, description = "Shopper session id")),
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Order awaiting transfer", body = FinalizeResponse),
        (status = 404, description = "Order not found", body = crate::handlers::common::ShopperEnvelope<String>),
        (status = 409, description = "Order has no CVU/Alias or can no longer be finalized", body = crate::handlers::common::ShopperEnvelope<String>),
        (status = 503, description = "No backup CVU/Alias configured", body = crate::handlers::common::ShopperEnvelope<String>),
    ),
    tag = "Checkout"
)]
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn finalize_checkout(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<FinalizeRequest>,
) -> Result<Json<FinalizeResponse>, ShopperError> {
    if request.order_id.0 == 0 {
        return Err(ServiceError::MissingParameters("order_id".to_string()).into());
    }

    let order = state
        .services
        .checkout
        .finalize(&session, request.order_id, request.billing, request.shipping)
        .await?;

    let config = state.settings.snapshot().await;
    let days = days_remaining(order.created_at, config.expiration_days, Utc::now());
    Ok(Json(FinalizeResponse {
        result: "success".to_string(),
        order_id: order.id,
        status: order.status,
        instructions_html: presentation::thank_you(&order, days),
    }))
}

/// Checkout panel markup for the payment method
#[utoipa::path(
    get,
    path = "/api/v1/checkout/cvu/payment-fields",
    summary = "Payment method panel",
    responses((status = 200, description = "HTML fragment", body = String, content_type = "text/html")),
    tag = "Checkout"
)]
pub async fn payment_fields(State(state): State<AppState>) -> Html<String> {
    let config = state.settings.snapshot().await;
    Html(presentation::payment_fields(&config))
}
