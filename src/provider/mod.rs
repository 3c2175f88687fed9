//! External PSP verification provider.
//!
//! Every call either succeeds or fails with a [`ProviderError`]: a typed
//! rejection carrying the provider's `code`/`param`, or a transport failure.

pub mod http;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ProviderError;

pub use http::HttpPspProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccountPayload {
    pub sort_code: String,
    pub account_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyNumberPayload {
    /// `None` when the organisation has no company registration number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VatNumberPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
}

/// Flattened responsible-person record in the provider's shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponsiblePersonPayload {
    pub first_name: String,
    pub last_name: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub address_city: String,
    pub address_postcode: String,
    pub dob_day: u32,
    pub dob_month: u32,
    pub dob_year: i32,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectorPayload {
    pub first_name: String,
    pub last_name: String,
    pub dob_day: u32,
    pub dob_month: u32,
    pub dob_year: i32,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganisationDetailsPayload {
    pub name: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub address_city: String,
    pub address_postcode: String,
}

/// A verification document uploaded by the merchant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Outbound calls to the PSP, scoped to the merchant's connected account.
#[async_trait]
pub trait PspProvider: Send + Sync {
    async fn update_bank_account(
        &self,
        psp_account_id: &str,
        payload: &BankAccountPayload,
    ) -> Result<(), ProviderError>;

    async fn update_company_number(
        &self,
        psp_account_id: &str,
        payload: &CompanyNumberPayload,
    ) -> Result<(), ProviderError>;

    async fn update_vat_number(
        &self,
        psp_account_id: &str,
        payload: &VatNumberPayload,
    ) -> Result<(), ProviderError>;

    async fn update_responsible_person(
        &self,
        psp_account_id: &str,
        payload: &ResponsiblePersonPayload,
    ) -> Result<(), ProviderError>;

    async fn update_director(
        &self,
        psp_account_id: &str,
        payload: &DirectorPayload,
    ) -> Result<(), ProviderError>;

    async fn update_organisation_details(
        &self,
        psp_account_id: &str,
        payload: &OrganisationDetailsPayload,
    ) -> Result<(), ProviderError>;

    async fn upload_entity_document(
        &self,
        psp_account_id: &str,
        document: &EntityDocument,
    ) -> Result<(), ProviderError>;
}
