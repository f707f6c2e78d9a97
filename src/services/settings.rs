use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use validator::Validate;

use crate::config::GatewayConfig;
use crate::errors::ServiceError;

/// Shared, runtime-editable gateway settings.
///
/// Services take a snapshot per operation so a concurrent save never changes
/// the configuration in the middle of a reservation or finalize.
#[derive(Clone, Debug)]
pub struct GatewaySettings {
    inner: Arc<RwLock<GatewayConfig>>,
}

impl GatewaySettings {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub async fn snapshot(&self) -> GatewayConfig {
        self.inner.read().await.clone()
    }

    /// Validates and stores new settings. A redacted token keeps the stored one.
    pub async fn save(&self, mut next: GatewayConfig) -> Result<GatewayConfig, ServiceError> {
        let mut guard = self.inner.write().await;
        next.merge_secret_from(&guard);
        next.validate()?;

        info!(
            use_api = next.use_api,
            enabled = next.enabled,
            expiration_days = next.expiration_days,
            "gateway settings updated"
        );
        *guard = next.clone();
        Ok(next)
    }
}
