//! Session store: per-actor key/value state that survives across requests.
//!
//! The onboarding flow keeps its drafts here. Values are JSON so callers
//! choose their own shapes.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod purge;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

pub use libsql_backend::LibSqlBackend;
pub use memory::MemorySessionStore;
pub use purge::spawn_purge_loop;

/// Backend-agnostic session store scoped per actor.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value, `None` if never set or deleted.
    async fn get(&self, actor_id: &str, key: &str)
    -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or overwrite a value.
    async fn set(
        &self,
        actor_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Remove a value. Returns whether anything was removed.
    async fn delete(&self, actor_id: &str, key: &str) -> Result<bool, DatabaseError>;

    /// Remove every value last written before `cutoff`, across all actors.
    /// Returns how many were removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError>;
}
