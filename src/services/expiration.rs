//! Expiration Sweeper
//!
//! Periodically deletes provisional orders that were abandoned before checkout.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::ServiceError;
use crate::repositories::OrderRepository;

/// Age after which a provisional draft is reaped, independent of the sweep cadence.
pub const PROVISIONAL_ORDER_TTL_MINUTES: i64 = 20;

/// Result of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Provisional drafts inspected.
    pub scanned: u64,
    /// Drafts deleted because they outlived the TTL.
    pub deleted: u64,
    pub swept_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ExpirationSweeper {
    orders: Arc<dyn OrderRepository>,
    ttl: Duration,
}

impl ExpirationSweeper {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self {
            orders,
            ttl: Duration::minutes(PROVISIONAL_ORDER_TTL_MINUTES),
        }
    }

    /// Deletes provisional drafts strictly older than the TTL at `now`.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepSummary, ServiceError> {
        let drafts = self.orders.find_provisional_drafts().await?;
        let scanned = drafts.len() as u64;
        let mut deleted = 0u64;

        for order in drafts {
            if now - order.created_at <= self.ttl {
                continue;
            }
            match self.orders.delete(order.id).await {
                Ok(true) => {
                    deleted += 1;
                    debug!(order_id = %order.id, "expired provisional order deleted");
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        order_id = %order.id,
                        error = %e,
                        "Failed to delete expired provisional order"
                    );
                }
            }
        }

        if deleted > 0 {
            info!(scanned, deleted, "Completed provisional order sweep");
        }

        Ok(SweepSummary {
            scanned,
            deleted,
            swept_at: now,
        })
    }

    /// Spawns the periodic sweep. The first sweep runs immediately.
    pub fn start_worker(self, interval: std::time::Duration) -> JoinHandle<()> {
        info!(interval_secs = interval.as_secs(), "starting provisional order sweeper");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    error!("provisional order sweep failed: {}", e);
                }
            }
        })
    }
}
