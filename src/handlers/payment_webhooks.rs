use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::{ServiceError, WebhookErrorResponse};
use crate::services::payment_confirmation::{ConfirmationOutcome, PaymentConfirmation};
use crate::AppState;

/// Error wrapper rendering the webhook's `{code, message, data: {status}}` body.
#[derive(Debug)]
pub struct WebhookError(pub ServiceError);

impl From<ServiceError> for WebhookError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (status, Json(WebhookErrorResponse::from(&self.0))).into_response()
    }
}

// POST /payment-confirmation
#[utoipa::path(
    post,
    path = "/payment-confirmation",
    summary = "Confirm a bank transfer",
    description = "Marks an order paid with this method as processing when the issuer reports status `paid`. Requests must be signed unless unsigned webhooks are explicitly allowed.",
    request_body = PaymentConfirmation,
    params(
        ("x-timestamp" = Option<String>, Header, description = "Unix timestamp used in the signature"),
        ("x-signature" = Option<String>, Header, description = "hex(HMAC-SHA256(secret, \"<timestamp>.<body>\"))"),
    ),
    responses(
        (status = 200, description = "Payment recorded", body = ConfirmationOutcome),
        (status = 400, description = "missing_data, invalid_payment_method or invalid_status", body = WebhookErrorResponse),
        (status = 401, description = "invalid_signature", body = WebhookErrorResponse),
        (status = 404, description = "invalid_order", body = WebhookErrorResponse),
    ),
    tag = "Payments"
)]
pub async fn payment_confirmation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ConfirmationOutcome>, WebhookError> {
    match &state.webhook_verifier {
        Some(verifier) => {
            if !verifier.verify(&headers, &body, chrono::Utc::now().timestamp()) {
                warn!("Payment confirmation signature verification failed");
                return Err(ServiceError::InvalidSignature.into());
            }
        }
        None if state.config.allow_unsigned_webhooks => {}
        None => {
            warn!("Payment confirmation rejected: no webhook secret configured");
            return Err(ServiceError::InvalidSignature.into());
        }
    }

    let payload: PaymentConfirmation = serde_json::from_slice(&body).map_err(|e| {
        info!(error = %e, "unparseable payment confirmation body");
        ServiceError::MissingParameters("invalid json body".to_string())
    })?;

    let outcome = state.services.confirmations.confirm(payload).await?;
    Ok(Json(outcome))
}
