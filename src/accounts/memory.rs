//! In-memory account service for local development and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::AccountService;
use crate::error::AccountError;
use crate::onboarding::projector::RawProgressMap;
use crate::onboarding::registry::{TaskName, TaskRegistry};

#[derive(Debug, Clone)]
struct AccountRecord {
    psp_account_id: String,
    progress: Option<RawProgressMap>,
}

#[derive(Default)]
pub struct InMemoryAccountService {
    accounts: RwLock<HashMap<String, AccountRecord>>,
}

impl InMemoryAccountService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an account whose onboarding has not started.
    pub async fn insert_account(&self, account_id: &str) -> String {
        let psp_account_id = format!("acct_{}", Uuid::new_v4().simple());
        self.accounts.write().await.insert(
            account_id.to_string(),
            AccountRecord {
                psp_account_id: psp_account_id.clone(),
                progress: None,
            },
        );
        psp_account_id
    }

    /// Start onboarding: every registry task present and incomplete.
    pub async fn start_onboarding(&self, account_id: &str, registry: &TaskRegistry) {
        let progress = registry
            .iter()
            .map(|task| (task.name.as_str().to_string(), false))
            .collect();
        self.set_progress(account_id, progress).await;
    }

    /// Replace the raw progress map, creating the account if needed.
    pub async fn set_progress(&self, account_id: &str, progress: RawProgressMap) {
        let mut accounts = self.accounts.write().await;
        let record = accounts
            .entry(account_id.to_string())
            .or_insert_with(|| AccountRecord {
                psp_account_id: format!("acct_{}", Uuid::new_v4().simple()),
                progress: None,
            });
        record.progress = Some(progress);
    }
}

#[async_trait]
impl AccountService for InMemoryAccountService {
    async fn onboarding_progress(
        &self,
        account_id: &str,
    ) -> Result<Option<RawProgressMap>, AccountError> {
        let accounts = self.accounts.read().await;
        accounts
            .get(account_id)
            .map(|record| record.progress.clone())
            .ok_or_else(|| AccountError::NotFound {
                account_id: account_id.to_string(),
            })
    }

    async fn psp_account_id(&self, account_id: &str) -> Result<String, AccountError> {
        let accounts = self.accounts.read().await;
        accounts
            .get(account_id)
            .map(|record| record.psp_account_id.clone())
            .ok_or_else(|| AccountError::NotFound {
                account_id: account_id.to_string(),
            })
    }

    async fn mark_task_complete(
        &self,
        account_id: &str,
        task: TaskName,
    ) -> Result<(), AccountError> {
        let mut accounts = self.accounts.write().await;
        let record = accounts
            .get_mut(account_id)
            .ok_or_else(|| AccountError::NotFound {
                account_id: account_id.to_string(),
            })?;
        record
            .progress
            .get_or_insert_with(RawProgressMap::new)
            .insert(task.as_str().to_string(), true);
        info!(account_id = %account_id, task = %task, "Task marked complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_account_has_no_progress() {
        let svc = InMemoryAccountService::new();
        svc.insert_account("1").await;
        assert!(svc.onboarding_progress("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let svc = InMemoryAccountService::new();
        let err = svc.onboarding_progress("missing").await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound { .. }));
    }

    #[tokio::test]
    async fn mark_complete_flips_flag() {
        let svc = InMemoryAccountService::new();
        svc.insert_account("1").await;
        svc.start_onboarding("1", TaskRegistry::standard()).await;

        svc.mark_task_complete("1", TaskName::Director).await.unwrap();

        let progress = svc.onboarding_progress("1").await.unwrap().unwrap();
        assert_eq!(progress["director"], true);
        assert_eq!(progress["bank_account"], false);
        assert_eq!(progress.len(), 7);
    }

    #[tokio::test]
    async fn psp_account_id_is_stable() {
        let svc = InMemoryAccountService::new();
        let id = svc.insert_account("1").await;
        assert!(id.starts_with("acct_"));
        assert_eq!(svc.psp_account_id("1").await.unwrap(), id);
    }
}
