//! reqwest client for the PSP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    BankAccountPayload, CompanyNumberPayload, DirectorPayload, EntityDocument,
    OrganisationDetailsPayload, PspProvider, ResponsiblePersonPayload, VatNumberPayload,
};
use crate::endpoint;
use crate::error::{ProviderError, ProviderRejection};

/// Error envelope returned by the provider on 4xx responses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Classify a non-success response body.
///
/// Only a well-formed provider error envelope is a rejection; anything else
/// (HTML error pages, gateway timeouts, empty bodies) is a transport failure.
fn classify_failure(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if (400..500).contains(&status) => {
            ProviderError::Rejected(ProviderRejection {
                code: envelope.error.code,
                param: envelope.error.param,
                message: envelope.error.message,
            })
        }
        _ => ProviderError::Transport(format!("provider returned {status}")),
    }
}

pub struct HttpPspProvider {
    base_url: Url,
    api_key: SecretString,
    client: reqwest::Client,
}

impl HttpPspProvider {
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = endpoint::parse_base(base_url).map_err(ProviderError::Transport)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn url(&self, psp_account_id: &str, resource: &str) -> Result<Url, ProviderError> {
        endpoint::account_url(&self.base_url, psp_account_id, resource).ok_or_else(|| {
            ProviderError::Transport(format!("unusable PSP account id {psp_account_id:?}"))
        })
    }

    /// POST a JSON body once. The idempotency key stops the provider from
    /// applying a retried request twice.
    async fn post<T: Serialize + ?Sized>(
        &self,
        psp_account_id: &str,
        resource: &str,
        body: &T,
    ) -> Result<(), ProviderError> {
        let resp = self
            .client
            .post(self.url(psp_account_id, resource)?)
            .bearer_auth(self.api_key.expose_secret())
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        finish(resp, resource).await
    }
}

async fn finish(resp: reqwest::Response, resource: &str) -> Result<(), ProviderError> {
    let status = resp.status();
    if status.is_success() {
        debug!(resource = resource, "Provider accepted update");
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    let err = classify_failure(status.as_u16(), &body);
    warn!(resource = resource, status = %status, error = %err, "Provider call failed");
    Err(err)
}

#[async_trait]
impl PspProvider for HttpPspProvider {
    async fn update_bank_account(
        &self,
        psp_account_id: &str,
        payload: &BankAccountPayload,
    ) -> Result<(), ProviderError> {
        self.post(psp_account_id, "bank_account", payload).await
    }

    async fn update_company_number(
        &self,
        psp_account_id: &str,
        payload: &CompanyNumberPayload,
    ) -> Result<(), ProviderError> {
        self.post(psp_account_id, "company", payload).await
    }

    async fn update_vat_number(
        &self,
        psp_account_id: &str,
        payload: &VatNumberPayload,
    ) -> Result<(), ProviderError> {
        self.post(psp_account_id, "company", payload).await
    }

    async fn update_responsible_person(
        &self,
        psp_account_id: &str,
        payload: &ResponsiblePersonPayload,
    ) -> Result<(), ProviderError> {
        self.post(psp_account_id, "persons/representative", payload)
            .await
    }

    async fn update_director(
        &self,
        psp_account_id: &str,
        payload: &DirectorPayload,
    ) -> Result<(), ProviderError> {
        self.post(psp_account_id, "persons/director", payload).await
    }

    async fn update_organisation_details(
        &self,
        psp_account_id: &str,
        payload: &OrganisationDetailsPayload,
    ) -> Result<(), ProviderError> {
        self.post(psp_account_id, "organisation", payload).await
    }

    async fn upload_entity_document(
        &self,
        psp_account_id: &str,
        document: &EntityDocument,
    ) -> Result<(), ProviderError> {
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.content_type)
            .map_err(|e| ProviderError::Transport(format!("invalid content type: {e}")))?;
        let form = Form::new()
            .text("purpose", "account_requirement")
            .part("file", part);

        let resp = self
            .client
            .post(self.url(psp_account_id, "documents")?)
            .bearer_auth(self.api_key.expose_secret())
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        finish(resp, "documents").await
    }
}
