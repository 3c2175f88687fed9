//! Error types for the onboarding portal.

use crate::onboarding::registry::TaskName;

/// Top-level error type for the portal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Account service error: {0}")]
    Account(#[from] AccountError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    TaskAlreadyCompleted(#[from] TaskAlreadyCompletedError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors talking to the account (system of record) service.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Account {account_id} not found")]
    NotFound { account_id: String },

    #[error("Account id {0:?} cannot be addressed")]
    InvalidAccountId(String),

    #[error("Account service request failed: {0}")]
    Request(String),

    #[error("Account service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// A provider-defined validation failure.
///
/// `code` and `param` are copied verbatim from the provider's error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRejection {
    pub code: Option<String>,
    pub param: Option<String>,
    pub message: Option<String>,
}

impl std::fmt::Display for ProviderRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "code={} param={}",
            self.code.as_deref().unwrap_or("-"),
            self.param.as_deref().unwrap_or("-")
        )
    }
}

/// Outcome of a failed call to the external PSP.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider understood the request and refused it.
    #[error("Provider rejected request ({0})")]
    Rejected(ProviderRejection),

    /// Network failure, timeout or a response that is not a provider error body.
    #[error("Provider transport failure: {0}")]
    Transport(String),
}

/// Task registry construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Task {0} is declared more than once")]
    DuplicateTask(TaskName),

    #[error("Terminal task {0} is not part of the registry")]
    UnknownTerminal(TaskName),
}

/// Raised by the access gate when a task's input page is re-entered after
/// the system of record marked it complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Task {task} has already been completed")]
pub struct TaskAlreadyCompletedError {
    pub task: TaskName,
}

/// Result type alias for the portal.
pub type Result<T> = std::result::Result<T, Error>;
