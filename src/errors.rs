use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::OrderId;
use crate::notifications::NotificationError;

fn current_request_id() -> Option<String> {
    crate::telemetry::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error body for the JSON API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Order 42 not found",
    "details": null,
    "request_id": "req-abc123xyz",
    "timestamp": "2026-03-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Order 42 not found")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

/// Error body returned by the payment confirmation webhook.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "code": "invalid_order",
    "message": "Order not found",
    "data": { "status": 404 }
}))]
pub struct WebhookErrorResponse {
    #[schema(example = "invalid_order")]
    pub code: String,
    pub message: String,
    pub data: WebhookErrorData,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookErrorData {
    pub status: u16,
}

impl From<&ServiceError> for WebhookErrorResponse {
    fn from(error: &ServiceError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.webhook_message(),
            data: WebhookErrorData {
                status: error.status_code().as_u16(),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("External identifier API is disabled")]
    ApiDisabled,

    #[error("Could not obtain a CVU/Alias, please try again")]
    NoIdentifierAvailable,

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Order {0} can no longer be finalized")]
    OrderNotFinalizable(OrderId),

    #[error("Order {0} has no CVU/Alias assigned")]
    IdentifierMissing(OrderId),

    #[error("No backup CVU/Alias is configured")]
    NoBackupConfigured,

    #[error("Missing parameters: {0}")]
    MissingParameters(String),

    #[error("Order {0} was not paid with this payment method")]
    WrongPaymentMethod(OrderId),

    #[error("Unrecognized status: {0}")]
    UnrecognizedStatus(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::EmptyCart
            | Self::MissingParameters(_)
            | Self::WrongPaymentMethod(_)
            | Self::UnrecognizedStatus(_)
            | Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::ApiDisabled | Self::IdentifierMissing(_) | Self::OrderNotFinalizable(_) => {
                StatusCode::CONFLICT
            }
            Self::NoIdentifierAvailable => StatusCode::BAD_GATEWAY,
            Self::NoBackupConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidSignature | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotificationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code, used by the webhook error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameters(_) => "missing_data",
            Self::OrderNotFound(_) => "invalid_order",
            Self::WrongPaymentMethod(_) => "invalid_payment_method",
            Self::UnrecognizedStatus(_) => "invalid_status",
            Self::InvalidSignature => "invalid_signature",
            Self::EmptyCart => "empty_cart",
            Self::ApiDisabled => "api_disabled",
            Self::NoIdentifierAvailable => "no_identifier_available",
            Self::IdentifierMissing(_) => "identifier_missing",
            Self::OrderNotFinalizable(_) => "order_not_finalizable",
            Self::NoBackupConfigured => "no_backup_configured",
            Self::ValidationError(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotificationError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::NotificationError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn webhook_message(&self) -> String {
        match self {
            Self::MissingParameters(_) => "Missing parameters".to_string(),
            Self::OrderNotFound(_) => "Order not found".to_string(),
            Self::WrongPaymentMethod(_) => {
                "The order was not paid with this payment method".to_string()
            }
            Self::UnrecognizedStatus(_) => "Unrecognized status".to_string(),
            Self::InvalidSignature => "Invalid signature".to_string(),
            _ => self.response_message(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();

        let request_id = current_request_id();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            details: None,
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response = crate::telemetry::scope_request_id(
            crate::telemetry::RequestId::new("req-123"),
            async { ServiceError::OrderNotFound(OrderId(9)).into_response() },
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.message, "Order 9 not found");
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(ServiceError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::ApiDisabled.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::NoIdentifierAvailable.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::OrderNotFound(OrderId(1)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::NoBackupConfigured.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::InvalidSignature.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::OrderNotFinalizable(OrderId(1)).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::NotificationError(NotificationError::Delivery("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn webhook_codes_match_status() {
        let cases = [
            (ServiceError::MissingParameters("order_id".into()), "missing_data", 400),
            (ServiceError::OrderNotFound(OrderId(3)), "invalid_order", 404),
            (
                ServiceError::WrongPaymentMethod(OrderId(3)),
                "invalid_payment_method",
                400,
            ),
            (
                ServiceError::UnrecognizedStatus("pending".into()),
                "invalid_status",
                400,
            ),
            (ServiceError::InvalidSignature, "invalid_signature", 401),
        ];

        for (error, code, status) in cases {
            let body = WebhookErrorResponse::from(&error);
            assert_eq!(body.code, code);
            assert_eq!(body.data.status, status);
        }
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::NotificationError(NotificationError::Delivery(
                "smtp 10.0.0.3 refused".into()
            ))
            .response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::EmptyCart.response_message(),
            "Cart is empty"
        );
    }
}
