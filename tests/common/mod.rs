#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use cvu_gateway::{
    config::AppConfig,
    models::{Cart, CartItem, NewOrder, Order, OrderId},
    notifications::InMemoryMailer,
    repositories::{InMemoryCartStore, InMemoryOrderRepository, InMemorySessionStore},
    services::{identifier_source::HttpIdentifierApi, PlatformPorts},
    webhooks::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const ADMIN_TOKEN: &str = "admin-test-token";
pub const WEBHOOK_SECRET: &str = "whsec-test";
pub const BACKUP_CVU: &str = "0000003100099999999999";
pub const BACKUP_ALIAS: &str = "tienda.respaldo";

/// Router plus in-memory platform, with the identifier API served by wiremock.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub orders: Arc<InMemoryOrderRepository>,
    pub sessions: Arc<InMemorySessionStore>,
    pub mailer: Arc<InMemoryMailer>,
    pub identifier_server: MockServer,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the test adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let identifier_server = MockServer::start().await;

        let mut cfg = AppConfig::new("127.0.0.1".to_string(), 0, "test".to_string());
        cfg.admin_token = Some(ADMIN_TOKEN.to_string());
        cfg.webhook_secret = Some(WEBHOOK_SECRET.to_string());
        cfg.store_name = "Tienda Test".to_string();
        cfg.gateway.api_url = format!("{}/issue", identifier_server.uri());
        cfg.gateway.api_token = "issuer-token".to_string();
        cfg.gateway.api_timeout_secs = 2;
        adjust(&mut cfg);

        let orders = Arc::new(InMemoryOrderRepository::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let mailer = Arc::new(InMemoryMailer::new());
        let ports = PlatformPorts {
            orders: orders.clone(),
            sessions: sessions.clone(),
            carts: Arc::new(InMemoryCartStore::new()),
            mailer: mailer.clone(),
        };

        let state = AppState::new(cfg, ports, Arc::new(HttpIdentifierApi::default()));
        let router = cvu_gateway::app(state.clone());

        Self {
            router,
            state,
            orders,
            sessions,
            mailer,
            identifier_server,
        }
    }

    /// Answers every identifier request with the given pair.
    pub async fn issue_pair(&self, cvu: &str, alias: &str) {
        Mock::given(method("POST"))
            .and(path("/issue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cvu": cvu,
                "alias": alias,
            })))
            .mount(&self.identifier_server)
            .await;
    }

    pub async fn identifier_failing_with(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/issue"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.identifier_server)
            .await;
    }

    pub async fn identifier_calls(&self) -> usize {
        self.identifier_server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn shopper(
        &self,
        method: Method,
        uri: &str,
        session: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, &[("x-session-id", session)])
            .await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let auth = format!("Bearer {}", ADMIN_TOKEN);
        self.request(method, uri, body, &[("authorization", auth.as_str())])
            .await
    }

    /// Posts a raw webhook body signed with the test secret.
    pub async fn signed_webhook(&self, body: &Value) -> Response {
        let raw = serde_json::to_vec(body).expect("serialize webhook body");
        let timestamp = Utc::now().timestamp().to_string();
        let signature = SignatureVerifier::new(WEBHOOK_SECRET, 300)
            .sign(&timestamp, &raw)
            .expect("sign webhook body");

        let request = Request::builder()
            .method(Method::POST)
            .uri("/payment-confirmation")
            .header("content-type", "application/json")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(raw))
            .expect("failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn put_cart(&self, session: &str, cart: &Cart) -> Response {
        self.shopper(
            Method::PUT,
            "/api/v1/cart",
            session,
            Some(serde_json::to_value(cart).expect("serialize cart")),
        )
        .await
    }

    /// Creates the pending order the platform would create on checkout submission.
    pub async fn submit_order(&self, cart: &Cart) -> Order {
        self.state
            .services
            .orders
            .create(NewOrder::pending(cart.to_line_items(), Utc::now()))
            .await
            .expect("create submitted order")
    }

    pub async fn order(&self, id: u64) -> Option<Order> {
        self.state
            .services
            .orders
            .find_by_id(OrderId(id))
            .await
            .expect("order lookup")
    }
}

pub fn sample_cart() -> Cart {
    Cart::new(vec![
        CartItem {
            product_id: "yerba-1kg".to_string(),
            name: "Yerba mate 1kg".to_string(),
            quantity: 2,
            unit_price: Decimal::new(450000, 2),
        },
        CartItem {
            product_id: "mate-calabaza".to_string(),
            name: "Mate de calabaza".to_string(),
            quantity: 1,
            unit_price: Decimal::new(1200000, 2),
        },
    ])
}

pub fn finalize_body(order_id: u64) -> Value {
    json!({
        "order_id": order_id,
        "billing": {
            "first_name": "Ana",
            "last_name": "Pérez",
            "address_1": "Av. Corrientes 1234",
            "city": "CABA",
            "postcode": "C1043",
            "country": "AR",
            "email": "ana@example.com"
        }
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    String::from_utf8(bytes.to_vec()).expect("utf-8 response")
}
