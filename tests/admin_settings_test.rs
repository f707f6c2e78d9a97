//! Admin surface: settings, manual reminders and the order panel.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    finalize_body, response_json, response_text, sample_cart, TestApp, BACKUP_ALIAS, BACKUP_CVU,
};
use serde_json::json;

#[tokio::test]
async fn admin_routes_require_the_bearer_token() {
    let app = TestApp::new().await;

    let anonymous = app
        .request(Method::GET, "/api/v1/admin/settings", None, &[])
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let wrong = app
        .request(
            Method::GET,
            "/api/v1/admin/settings",
            None,
            &[("authorization", "Bearer not-the-token")],
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = app.admin(Method::GET, "/api/v1/admin/settings", None).await;
    assert_eq!(ok.status(), StatusCode::OK);
}

#[tokio::test]
async fn settings_hide_the_api_token() {
    let app = TestApp::new().await;

    let body = response_json(app.admin(Method::GET, "/api/v1/admin/settings", None).await).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["api_token"], "********");
    assert_eq!(body["data"]["use_api"], true);
}

#[tokio::test]
async fn backup_only_mode_needs_a_backup_pair() {
    let app = TestApp::new().await;
    let mut settings =
        response_json(app.admin(Method::GET, "/api/v1/admin/settings", None).await).await["data"]
            .clone();
    settings["use_api"] = json!(false);
    settings["backup_cvu"] = json!("");
    settings["backup_alias"] = json!("");

    let rejected = app
        .admin(Method::PUT, "/api/v1/admin/settings", Some(settings.clone()))
        .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert!(app.state.settings.snapshot().await.use_api);

    settings["backup_cvu"] = json!(BACKUP_CVU);
    settings["backup_alias"] = json!(BACKUP_ALIAS);
    let accepted = app
        .admin(Method::PUT, "/api/v1/admin/settings", Some(settings))
        .await;
    assert_eq!(accepted.status(), StatusCode::OK);

    let current = app.state.settings.snapshot().await;
    assert!(!current.use_api);
    assert_eq!(current.backup_alias, BACKUP_ALIAS);
    // Sending the redaction marker back keeps the stored token
    assert_eq!(current.api_token, "issuer-token");
}

#[tokio::test]
async fn manual_reminder_emails_the_shopper() {
    let app = TestApp::new().await;
    app.issue_pair("0000003100012345678901", "tienda.pagos.uno").await;
    let cart = sample_cart();
    app.put_cart("sess-admin", &cart).await;
    let created = response_json(
        app.shopper(Method::POST, "/api/v1/checkout/cvu/reservation", "sess-admin", None)
            .await,
    )
    .await;
    let order_id = created["data"]["order_id"].as_u64().unwrap();
    let submitted = app.submit_order(&cart).await;
    app.shopper(
        Method::POST,
        "/api/v1/checkout/cvu/finalize",
        "sess-admin",
        Some(finalize_body(submitted.id.0)),
    )
    .await;

    let response = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/orders/{}/reminder", order_id),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["sent"], true);

    let sent = app.mailer.sent().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].subject, "Pending payment reminder");
    assert!(sent[1].html_body.contains("tienda.pagos.uno"));
}

#[tokio::test]
async fn reminder_for_unknown_or_foreign_order_fails() {
    let app = TestApp::new().await;
    let foreign = app.submit_order(&sample_cart()).await;

    let missing = app
        .admin(Method::POST, "/api/v1/admin/orders/4242/reminder", None)
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let wrong_method = app
        .admin(
            Method::POST,
            &format!("/api/v1/admin/orders/{}/reminder", foreign.id.0),
            None,
        )
        .await;
    assert_eq!(wrong_method.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payment_details_panel_renders_pair() {
    let app = TestApp::with_config(|cfg| {
        cfg.gateway.use_api = false;
        cfg.gateway.backup_cvu = BACKUP_CVU.to_string();
        cfg.gateway.backup_alias = BACKUP_ALIAS.to_string();
    })
    .await;
    let submitted = app.submit_order(&sample_cart()).await;
    app.shopper(
        Method::POST,
        "/api/v1/checkout/cvu/finalize",
        "sess-panel",
        Some(finalize_body(submitted.id.0)),
    )
    .await;

    let response = app
        .admin(
            Method::GET,
            &format!("/api/v1/admin/orders/{}/payment-details", submitted.id.0),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = response_text(response).await;
    assert!(html.contains(BACKUP_CVU));
    assert!(html.contains(BACKUP_ALIAS));
    assert!(html.contains(&format!(
        "/api/v1/admin/orders/{}/reminder",
        submitted.id.0
    )));
}

#[tokio::test]
async fn email_instructions_skip_admin_copies() {
    let app = TestApp::with_config(|cfg| {
        cfg.gateway.use_api = false;
        cfg.gateway.backup_cvu = BACKUP_CVU.to_string();
        cfg.gateway.backup_alias = BACKUP_ALIAS.to_string();
    })
    .await;
    let submitted = app.submit_order(&sample_cart()).await;
    app.shopper(
        Method::POST,
        "/api/v1/checkout/cvu/finalize",
        "sess-mail",
        Some(finalize_body(submitted.id.0)),
    )
    .await;
    let uri = format!("/api/v1/admin/orders/{}/email-instructions", submitted.id.0);

    let customer = response_text(app.admin(Method::GET, &uri, None).await).await;
    assert!(customer.contains(BACKUP_ALIAS));

    let admin_copy = response_text(
        app.admin(Method::GET, &format!("{}?sent_to_admin=true", uri), None)
            .await,
    )
    .await;
    assert!(admin_copy.is_empty());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, &[])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/payment-confirmation"].is_object());
}
