//! Account service: the system of record for onboarding progress.
//!
//! The portal only reads the raw progress map and, after a successful
//! provider commit, asks the service to mark a task complete.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::AccountError;
use crate::onboarding::projector::RawProgressMap;
use crate::onboarding::registry::TaskName;

pub use http::HttpAccountService;
pub use memory::InMemoryAccountService;

#[async_trait]
pub trait AccountService: Send + Sync {
    /// Current onboarding progress, or `None` if onboarding has not started.
    async fn onboarding_progress(
        &self,
        account_id: &str,
    ) -> Result<Option<RawProgressMap>, AccountError>;

    /// Identifier of the account's connected PSP account.
    async fn psp_account_id(&self, account_id: &str) -> Result<String, AccountError>;

    /// Record that `task` has been accepted by the provider.
    async fn mark_task_complete(&self, account_id: &str, task: TaskName)
    -> Result<(), AccountError>;
}
