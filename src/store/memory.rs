//! In-memory session store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::SessionStore;
use crate::error::DatabaseError;

/// Session store held in process memory. Lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<(String, String), (serde_json::Value, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(
        &self,
        actor_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let values = self.values.read().await;
        Ok(values
            .get(&(actor_id.to_string(), key.to_string()))
            .map(|(value, _)| value.clone()))
    }

    async fn set(
        &self,
        actor_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let mut values = self.values.write().await;
        values.insert(
            (actor_id.to_string(), key.to_string()),
            (value.clone(), Utc::now()),
        );
        Ok(())
    }

    async fn delete(&self, actor_id: &str, key: &str) -> Result<bool, DatabaseError> {
        let mut values = self.values.write().await;
        Ok(values
            .remove(&(actor_id.to_string(), key.to_string()))
            .is_some())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut values = self.values.write().await;
        let before = values.len();
        values.retain(|_, (_, updated_at)| *updated_at >= cutoff);
        Ok((before - values.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_are_scoped_per_actor() {
        let store = MemorySessionStore::new();
        store.set("a", "k", &serde_json::json!(1)).await.unwrap();
        store.set("b", "k", &serde_json::json!(2)).await.unwrap();

        assert_eq!(store.get("a", "k").await.unwrap(), Some(serde_json::json!(1)));
        assert_eq!(store.get("b", "k").await.unwrap(), Some(serde_json::json!(2)));

        assert!(store.delete("a", "k").await.unwrap());
        assert!(!store.delete("a", "k").await.unwrap());
        assert!(store.get("a", "k").await.unwrap().is_none());
        assert!(store.get("b", "k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_removes_only_values_written_before_cutoff() {
        let store = MemorySessionStore::new();
        store.set("a", "draft", &serde_json::json!(1)).await.unwrap();
        store.set("b", "draft", &serde_json::json!(2)).await.unwrap();

        let an_hour_ago = Utc::now() - chrono::TimeDelta::hours(1);
        assert_eq!(store.purge_older_than(an_hour_ago).await.unwrap(), 0);
        assert!(store.get("a", "draft").await.unwrap().is_some());

        let later = Utc::now() + chrono::TimeDelta::seconds(1);
        assert_eq!(store.purge_older_than(later).await.unwrap(), 2);
        assert!(store.get("a", "draft").await.unwrap().is_none());
        assert!(store.get("b", "draft").await.unwrap().is_none());
    }
}
