//! Background purge of abandoned session values.
//!
//! Drafts are cleared on commit, but a merchant who never reaches the
//! review page leaves one behind. This loop drops anything not written for
//! longer than the configured age. Runs on startup and then hourly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::SessionStore;

/// Purge interval: 1 hour.
const PURGE_INTERVAL_SECS: u64 = 3600;

/// Spawn the purge loop. The first cycle runs immediately.
pub fn spawn_purge_loop(store: Arc<dyn SessionStore>, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            max_age_secs = max_age.as_secs(),
            "Session purge loop started (interval: {}s)", PURGE_INTERVAL_SECS
        );
        let mut tick = tokio::time::interval(Duration::from_secs(PURGE_INTERVAL_SECS));
        loop {
            tick.tick().await;
            run_purge_cycle(store.as_ref(), max_age).await;
        }
    })
}

/// One purge pass. Returns how many values were removed.
pub async fn run_purge_cycle(store: &dyn SessionStore, max_age: Duration) -> u64 {
    let Some(cutoff) = TimeDelta::from_std(max_age)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
    else {
        debug!("Session max age reaches past the epoch, nothing to purge");
        return 0;
    };

    match store.purge_older_than(cutoff).await {
        Ok(0) => 0,
        Ok(removed) => {
            info!(removed = removed, cutoff = %cutoff, "Purged stale session values");
            removed
        }
        Err(e) => {
            warn!(error = %e, "Session purge failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;

    #[tokio::test]
    async fn cycle_removes_values_past_max_age() {
        let store = MemorySessionStore::new();
        store.set("a", "draft", &serde_json::json!(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(run_purge_cycle(store.as_ref(), Duration::from_secs(3600)).await, 0);
        assert!(store.get("a", "draft").await.unwrap().is_some());

        assert_eq!(run_purge_cycle(store.as_ref(), Duration::ZERO).await, 1);
        assert!(store.get("a", "draft").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unbounded_age_purges_nothing() {
        let store = MemorySessionStore::new();
        store.set("a", "draft", &serde_json::json!(1)).await.unwrap();
        assert_eq!(run_purge_cycle(store.as_ref(), Duration::MAX).await, 0);
        assert!(store.get("a", "draft").await.unwrap().is_some());
    }
}
