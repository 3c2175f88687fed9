//! reqwest client for the account service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use super::AccountService;
use crate::endpoint;
use crate::error::AccountError;
use crate::onboarding::projector::RawProgressMap;
use crate::onboarding::registry::TaskName;

#[derive(Debug, Deserialize)]
struct AccountResponse {
    psp_account_id: String,
}

pub struct HttpAccountService {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpAccountService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AccountError> {
        let base_url = endpoint::parse_base(base_url).map_err(AccountError::Request)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AccountError::Request(e.to_string()))?;
        Ok(Self {
            base_url,
            client,
        })
    }

    fn url(&self, account_id: &str, resource: &str) -> Result<Url, AccountError> {
        endpoint::account_url(&self.base_url, account_id, resource)
            .ok_or_else(|| AccountError::InvalidAccountId(account_id.to_string()))
    }

    async fn get(&self, account_id: &str, resource: &str) -> Result<reqwest::Response, AccountError> {
        let resp = self
            .client
            .get(self.url(account_id, resource)?)
            .send()
            .await
            .map_err(|e| AccountError::Request(e.to_string()))?;
        check_status(resp, account_id).await
    }
}

async fn check_status(
    resp: reqwest::Response,
    account_id: &str,
) -> Result<reqwest::Response, AccountError> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AccountError::NotFound {
            account_id: account_id.to_string(),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(AccountError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl AccountService for HttpAccountService {
    async fn onboarding_progress(
        &self,
        account_id: &str,
    ) -> Result<Option<RawProgressMap>, AccountError> {
        let resp = match self.get(account_id, "onboarding-progress").await {
            Ok(resp) => resp,
            // No progress record yet: onboarding not started.
            Err(AccountError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let progress: RawProgressMap = resp
            .json()
            .await
            .map_err(|e| AccountError::Request(format!("invalid progress body: {e}")))?;
        debug!(account_id = %account_id, tasks = progress.len(), "Fetched onboarding progress");
        Ok(Some(progress))
    }

    async fn psp_account_id(&self, account_id: &str) -> Result<String, AccountError> {
        let account: AccountResponse = self
            .get(account_id, "")
            .await?
            .json()
            .await
            .map_err(|e| AccountError::Request(format!("invalid account body: {e}")))?;
        Ok(account.psp_account_id)
    }

    async fn mark_task_complete(
        &self,
        account_id: &str,
        task: TaskName,
    ) -> Result<(), AccountError> {
        let body = serde_json::json!({
            "op": "replace",
            "path": task.as_str(),
            "value": true,
        });
        let resp = self
            .client
            .patch(self.url(account_id, "onboarding-progress")?)
            .json(&body)
            .send()
            .await
            .map_err(|e| AccountError::Request(e.to_string()))?;
        check_status(resp, account_id).await?;
        Ok(())
    }
}
