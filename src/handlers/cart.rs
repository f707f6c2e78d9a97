use axum::{extract::State, Json};

use super::common::{validate_input, ShopperEnvelope, ShopperError};
use crate::models::{Cart, SessionId};
use crate::AppState;

/// Replace the session cart (in-memory platform adapter)
#[utoipa::path(
    put,
    path = "/api/v1/cart",
    params(("x-session-id" = String, Header, description = "Shopper session id")),
    request_body = Cart,
    responses(
        (status = 200, description = "Cart stored", body = ShopperEnvelope<Cart>),
        (status = 400, description = "Invalid cart", body = ShopperEnvelope<String>),
    ),
    tag = "Cart"
)]
pub async fn replace_cart(
    State(state): State<AppState>,
    session: SessionId,
    Json(cart): Json<Cart>,
) -> Result<Json<ShopperEnvelope<Cart>>, ShopperError> {
    validate_input(&cart)?;
    state.services.carts.replace(&session, cart.clone()).await?;
    Ok(Json(ShopperEnvelope::success(cart)))
}
