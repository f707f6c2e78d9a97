use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness probe with the active identifier mode
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.settings.snapshot().await;
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "gateway": {
            "enabled": config.enabled,
            "use_api": config.use_api,
            "backup_configured": config.backup_pair().is_some(),
        }
    }))
}
