use axum::{extract::State, Json};
use tracing::{error, instrument};

use super::common::{ReservationData, ShopperEnvelope, ShopperError};
use crate::models::SessionId;
use crate::AppState;

/// Create or reuse the session's provisional order
#[utoipa::path(
    post,
    path = "/api/v1/checkout/cvu/reservation",
    summary = "Reserve a CVU/Alias",
    description = "Creates a provisional order for the session's cart and assigns it a CVU/Alias, or returns the existing reservation",
    params(("x-session-id" = String, Header, description = "Shopper session id")),
    responses(
        (status = 200, description = "Reservation ready", body = ShopperEnvelope<ReservationData>),
        (status = 400, description = "Empty cart or missing session", body = ShopperEnvelope<String>),
        (status = 409, description = "External API disabled", body = ShopperEnvelope<String>),
        (status = 502, description = "No CVU/Alias available", body = ShopperEnvelope<String>),
    ),
    tag = "Checkout"
)]
#[instrument(skip(state))]
pub async fn create_reservation(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Json<ShopperEnvelope<ReservationData>>, ShopperError> {
    let cart = state.services.carts.cart(&session).await?;
    let reservation = state
        .services
        .reservations
        .create_or_reuse(&session, &cart)
        .await?;
    Ok(Json(ShopperEnvelope::success(reservation.into())))
}

/// Drop the session's provisional order. Always succeeds.
#[utoipa::path(
    delete,
    path = "/api/v1/checkout/cvu/reservation",
    summary = "Release the reservation",
    params(("x-session-id" = String, Header, description = "Shopper session id")),
    responses(
        (status = 200, description = "Reservation released (or nothing to release)", body = ShopperEnvelope<String>),
    ),
    tag = "Checkout"
)]
#[instrument(skip(state))]
pub async fn delete_reservation(
    State(state): State<AppState>,
    session: SessionId,
) -> Json<ShopperEnvelope<()>> {
    if let Err(err) = state.services.reservations.release(&session).await {
        error!(error = %err, "failed to release reservation");
    }
    Json(ShopperEnvelope::empty())
}
