use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CVU Gateway API",
        version = "1.0.0",
        description = r#"
# CVU/Alias bank transfer gateway

Reserves a CVU/Alias for a shopper before checkout, reconciles the reservation
into the submitted order and records payment confirmations from the issuer.

## Authentication

Admin endpoints require a bearer token:

```
Authorization: Bearer <admin-token>
```

Payment confirmations are signed with HMAC-SHA256 over `"<x-timestamp>.<body>"`.

## Error Handling

Checkout endpoints answer with `{"success": false, "data": "<message>"}` on failure.
The payment confirmation endpoint answers with `{"code", "message", "data": {"status"}}`.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "Checkout", description = "Reservation and checkout endpoints"),
        (name = "Cart", description = "Session cart"),
        (name = "Payments", description = "Issuer callbacks"),
        (name = "Admin", description = "Administrative endpoints")
    ),
    paths(
        // Checkout
        crate::handlers::reservations::create_reservation,
        crate::handlers::reservations::delete_reservation,
        crate::handlers::checkout::finalize_checkout,
        crate::handlers::checkout::payment_fields,
        crate::handlers::cart::replace_cart,

        // Webhooks
        crate::handlers::payment_webhooks::payment_confirmation,

        // Admin
        crate::handlers::admin::send_reminder,
        crate::handlers::admin::payment_details,
        crate::handlers::admin::email_instructions,
        crate::handlers::admin::get_settings,
        crate::handlers::admin::update_settings,
    ),
    components(
        schemas(
            crate::models::Order,
            crate::models::OrderStatus,
            crate::models::IdentifierPair,
            crate::models::IdentifierAssignment,
            crate::models::Address,
            crate::models::Cart,
            crate::models::CartItem,
            crate::config::GatewayConfig,
            crate::handlers::common::ReservationData,
            crate::handlers::checkout::FinalizeRequest,
            crate::handlers::checkout::FinalizeResponse,
            crate::handlers::admin::ReminderResult,
            crate::services::payment_confirmation::PaymentConfirmation,
            crate::services::payment_confirmation::ConfirmationOutcome,

            // Error types
            crate::errors::ErrorResponse,
            crate::errors::WebhookErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_gateway_routes() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("CVU Gateway API"));
        assert!(json.contains("/api/v1/checkout/cvu/reservation"));
        assert!(json.contains("/payment-confirmation"));
        assert!(json.contains("/api/v1/admin/settings"));
        assert!(json.contains("\"Bearer\""));
    }
}
