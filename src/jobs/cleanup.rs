//! Background job: purge long-expired action tokens.
//!
//! Runs hourly. Expired tokens are inert (redemption reports them as
//! expired) but they accumulate; this deletes tokens a full day past their
//! expiry. The grace period keeps recently-expired links answering
//! "token expired" instead of "invalid token".

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;

use crate::store::Store;

/// Spawn the background cleanup task. Call this once at startup.
pub fn spawn(store: Arc<dyn Store>) {
    tokio::spawn(async move {
        let grace = chrono::Duration::hours(24);
        let mut interval = time::interval(Duration::from_secs(3600)); // every hour
        loop {
            interval.tick().await;
            match store.purge_expired_tokens(Utc::now() - grace).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "removed long-expired action tokens"),
                Err(e) => tracing::error!("token cleanup job failed: {}", e),
            }
        }
    });
}
