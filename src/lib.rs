//! CVU/Alias bank transfer gateway
//!
//! Reserves a CVU/Alias pair for a shopper session before checkout, reconciles the
//! reservation into the submitted order, expires abandoned reservations and records
//! payment confirmations reported by the issuer.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod presentation;
pub mod repositories;
pub mod services;
pub mod telemetry;
pub mod webhooks;

use std::{sync::Arc, time::Duration};

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::info;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::services::identifier_source::IdentifierApi;
use crate::services::settings::GatewaySettings;
use crate::services::{GatewayServices, PlatformPorts};
use crate::webhooks::SignatureVerifier;

/// Upper bound for a whole request; the identifier call has its own, shorter timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub settings: GatewaySettings,
    pub services: GatewayServices,
    /// `None` only when unsigned webhooks were explicitly allowed
    pub webhook_verifier: Option<SignatureVerifier>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        ports: PlatformPorts,
        identifier_api: Arc<dyn IdentifierApi>,
    ) -> Self {
        let settings = GatewaySettings::new(config.gateway.clone());
        let services =
            GatewayServices::new(ports, identifier_api, settings.clone(), &config.store_name);
        let webhook_verifier = config
            .webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
            .map(|secret| SignatureVerifier::new(secret, config.webhook_tolerance_secs));

        Self {
            config: Arc::new(config),
            settings,
            services,
            webhook_verifier,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let mut config = AppConfig::new("127.0.0.1".into(), 0, "test".into());
        config.webhook_secret = Some("test-secret".into());
        config.admin_token = Some("admin-token".into());
        Self::new(
            config,
            PlatformPorts::in_memory(),
            Arc::new(services::identifier_source::HttpIdentifierApi::default()),
        )
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: telemetry::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/orders/:id/reminder",
            post(handlers::admin::send_reminder),
        )
        .route(
            "/orders/:id/payment-details",
            get(handlers::admin::payment_details),
        )
        .route(
            "/orders/:id/email-instructions",
            get(handlers::admin::email_instructions),
        )
        .route(
            "/settings",
            get(handlers::admin::get_settings).put(handlers::admin::update_settings),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_helpers::require_admin,
        ))
}

/// Routes mounted under `/api/v1`
pub fn api_v1_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/checkout/cvu/reservation",
            post(handlers::reservations::create_reservation)
                .delete(handlers::reservations::delete_reservation),
        )
        .route(
            "/checkout/cvu/finalize",
            post(handlers::checkout::finalize_checkout),
        )
        .route(
            "/checkout/cvu/payment-fields",
            get(handlers::checkout::payment_fields),
        )
        .route("/cart", put(handlers::cart::replace_cart))
        .nest("/admin", admin_routes(state))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if config.is_development() {
        info!("Using permissive CORS in the development environment");
        CorsLayer::permissive()
    } else {
        // Same-origin only
        CorsLayer::new()
    }
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/payment-confirmation",
            post(handlers::payment_webhooks::payment_confirmation),
        )
        .nest("/api/v1", api_v1_routes(&state))
        .merge(openapi::openapi_routes())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(telemetry::configure_http_tracing())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors_layer(&state.config))
        // Ensure every request carries a request id for traceability
        .layer(from_fn(middleware_helpers::request_id_middleware))
        .with_state(state)
}
