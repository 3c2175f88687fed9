//! PSP onboarding portal: the merchant-facing task workflow that collects
//! verification data for a payment service provider.

pub mod accounts;
pub mod config;
mod endpoint;
pub mod error;
pub mod onboarding;
pub mod provider;
pub mod store;
pub mod validation;
