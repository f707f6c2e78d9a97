use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::config::GatewayConfig;
use crate::errors::ServiceError;
use crate::models::OrderId;
use crate::presentation::{self, AdminRenderState};
use crate::services::reminders::days_remaining;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReminderResult {
    pub order_id: OrderId,
    /// False when the order has no billing email or no CVU/Alias
    pub sent: bool,
}

/// Send the pending-payment reminder email for an order
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/reminder",
    params(("id" = u64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Reminder processed", body = ApiResponse<ReminderResult>),
        (status = 400, description = "Order not paid with this method", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
#[instrument(skip(state))]
pub async fn send_reminder(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<ReminderResult> {
    let order_id = OrderId(id);
    let sent = state.services.reminders.send_manual_reminder(order_id).await?;
    info!(order_id = %order_id, sent, "manual reminder requested");
    Ok(Json(ApiResponse::success(ReminderResult { order_id, sent })))
}

/// Admin order panel for an order paid with this method
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}/payment-details",
    params(("id" = u64, Path, description = "Order id")),
    responses(
        (status = 200, description = "HTML fragment", body = String, content_type = "text/html"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn payment_details(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Html<String>, ServiceError> {
    let order_id = OrderId(id);
    let order = state
        .services
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or(ServiceError::OrderNotFound(order_id))?;

    let config = state.settings.snapshot().await;
    let days = days_remaining(order.created_at, config.expiration_days, Utc::now());
    let mut render_state = AdminRenderState::new();
    Ok(Html(presentation::admin_panel(
        &order,
        days,
        config.show_days,
        &mut render_state,
    )))
}

/// Current gateway settings, with the API token redacted
#[utoipa::path(
    get,
    path = "/api/v1/admin/settings",
    responses(
        (status = 200, description = "Gateway settings", body = ApiResponse<GatewayConfig>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<ApiResponse<GatewayConfig>> {
    Json(ApiResponse::success(state.settings.snapshot().await.redacted()))
}

/// Replace gateway settings
#[utoipa::path(
    put,
    path = "/api/v1/admin/settings",
    request_body = GatewayConfig,
    responses(
        (status = 200, description = "Settings saved", body = ApiResponse<GatewayConfig>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(next): Json<GatewayConfig>,
) -> ApiResult<GatewayConfig> {
    let saved = state.settings.save(next).await?;
    Ok(Json(ApiResponse::success(saved.redacted())))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct EmailInstructionsQuery {
    /// The platform is rendering the copy sent to the store administrator
    #[serde(default)]
    pub sent_to_admin: bool,
}

/// Payment block the platform appends to its customer order emails
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}/email-instructions",
    params(("id" = u64, Path, description = "Order id"), EmailInstructionsQuery),
    responses(
        (status = 200, description = "HTML fragment, empty for admin copies or other payment methods", body = String, content_type = "text/html"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn email_instructions(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<EmailInstructionsQuery>,
) -> Result<Html<String>, ServiceError> {
    let order_id = OrderId(id);
    let order = state
        .services
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or(ServiceError::OrderNotFound(order_id))?;

    let config = state.settings.snapshot().await;
    let days = days_remaining(order.created_at, config.expiration_days, Utc::now());
    Ok(Html(presentation::email_instructions(
        &order,
        days,
        query.sent_to_admin,
    )))
}
