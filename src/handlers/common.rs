use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServiceError;
use crate::models::SessionId;
use crate::services::reservations::Reservation;

/// Header identifying the shopper session
pub const SESSION_HEADER: &str = "x-session-id";

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ShopperError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(SessionId::new)
            .ok_or_else(|| {
                ShopperError(ServiceError::MissingParameters(SESSION_HEADER.to_string()))
            })
    }
}

/// Body of a successful reservation call.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationData {
    pub order_id: u64,
    pub cvu: String,
    pub alias: String,
    pub days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub is_backup: bool,
}

impl From<Reservation> for ReservationData {
    fn from(reservation: Reservation) -> Self {
        Self {
            order_id: reservation.order_id.0,
            message: reservation.message().map(str::to_string),
            is_backup: reservation.is_backup(),
            cvu: reservation.cvu,
            alias: reservation.alias,
            days: reservation.days,
        }
    }
}

/// `{ "success": bool, "data": ... }` envelope used by the checkout script.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShopperEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ShopperEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

impl ShopperEnvelope<()> {
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

/// Error rendered as `{ "success": false, "data": "<message>" }`.
#[derive(Debug)]
pub struct ShopperError(pub ServiceError);

impl From<ServiceError> for ShopperError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ShopperError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "shopper request failed");
        }
        let body = ShopperEnvelope {
            success: false,
            data: Some(self.0.response_message()),
        };
        (status, Json(body)).into_response()
    }
}
