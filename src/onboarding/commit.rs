//! Commit coordinator: the single provider submission that finalizes a task.
//!
//! A recognised provider rejection is resolved here: the page is shown again
//! with a field-scoped or summary error and the draft is left untouched.
//! Transport failures are returned as errors for the platform handler.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::draft::{DraftAccumulator, DraftKey};
use super::registry::TaskName;
use super::responsible_person::{self, ResponsiblePersonPage};
use crate::accounts::AccountService;
use crate::error::{Error, ProviderError, ProviderRejection};
use crate::provider::PspProvider;
use crate::validation::FieldErrors;

/// Message shown when the provider refused the data without naming a field
/// we can point the user at.
pub const GENERIC_FAILURE: &str = "We could not save these details. Contact support for help.";

/// Provider signals that map onto a single form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCode {
    Phone,
    DobYear,
    RoutingNumber,
    AccountNumber,
}

impl FieldCode {
    /// Look up a provider `param` or `code`.
    pub fn from_signal(signal: &str) -> Option<Self> {
        match signal {
            "phone" => Some(Self::Phone),
            "dob[year]" => Some(Self::DobYear),
            "routing_number_invalid" => Some(Self::RoutingNumber),
            "account_number_invalid" => Some(Self::AccountNumber),
            _ => None,
        }
    }

    /// Form field the error is attached to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Phone => "telephone_number",
            Self::DobYear => "dob_year",
            Self::RoutingNumber => "sort_code",
            Self::AccountNumber => "account_number",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Phone => {
                "Invalid work telephone number. Enter a telephone number, like 01632 960 001, 07700 900 982 or +44 808 157 0192"
            }
            Self::DobYear => "Enter a valid year of birth",
            Self::RoutingNumber => "Enter a valid sort code like 309430",
            Self::AccountNumber => "Enter a valid account number like 00733445",
        }
    }
}

/// A provider rejection, translated for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFailure {
    Field(FieldCode),
    Generic,
}

impl CommitFailure {
    /// `param` is checked before `code`; unknown signals (including
    /// `bank_account_unusable`) fall back to the generic summary.
    pub fn from_rejection(rejection: &ProviderRejection) -> Self {
        [rejection.param.as_deref(), rejection.code.as_deref()]
            .into_iter()
            .flatten()
            .find_map(FieldCode::from_signal)
            .map_or(Self::Generic, Self::Field)
    }

    /// Errors for a page that owns `fields`. A field error for an input the
    /// page does not show becomes the generic summary.
    pub fn page_errors(&self, fields: &[&str]) -> PageErrors {
        match self {
            Self::Field(code) if fields.contains(&code.field()) => {
                let mut errors = FieldErrors::new();
                errors.add(code.field(), code.message());
                PageErrors {
                    fields: errors,
                    summary: None,
                }
            }
            _ => PageErrors {
                fields: FieldErrors::new(),
                summary: Some(GENERIC_FAILURE),
            },
        }
    }
}

/// Error context for re-rendering a page after a failed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageErrors {
    pub fields: FieldErrors,
    pub summary: Option<&'static str>,
}

/// Result of committing the responsible-person draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Accepted; draft cleared and task marked complete.
    Committed,
    /// Refused by the provider; draft kept.
    Rejected(CommitFailure),
    /// The draft is missing a section; the user must revisit this page.
    Incomplete(ResponsiblePersonPage),
}

/// Submits finished tasks to the provider and records completion.
#[derive(Clone)]
pub struct CommitCoordinator {
    drafts: DraftAccumulator,
    provider: Arc<dyn PspProvider>,
    accounts: Arc<dyn AccountService>,
}

impl CommitCoordinator {
    pub fn new(
        drafts: DraftAccumulator,
        provider: Arc<dyn PspProvider>,
        accounts: Arc<dyn AccountService>,
    ) -> Self {
        Self {
            drafts,
            provider,
            accounts,
        }
    }

    /// Commit the responsible-person draft held under `key`.
    pub async fn commit(&self, key: &DraftKey) -> Result<CommitOutcome, Error> {
        let draft = self.drafts.read(key).await?;
        let payload = match responsible_person::build_payload(&draft) {
            Ok(payload) => payload,
            Err(page) => return Ok(CommitOutcome::Incomplete(page)),
        };

        let account_id = &key.instance.account_id;
        let psp_account_id = self.accounts.psp_account_id(account_id).await?;
        let result = self
            .provider
            .update_responsible_person(&psp_account_id, &payload)
            .await;

        match self.settle(account_id, key.instance.task, result).await? {
            Ok(()) => {
                self.drafts.clear(key).await?;
                Ok(CommitOutcome::Committed)
            }
            Err(failure) => Ok(CommitOutcome::Rejected(failure)),
        }
    }

    /// Submit a single-page task. `call` receives the provider and the PSP
    /// account id and performs exactly one provider request.
    pub async fn submit<F, Fut>(
        &self,
        account_id: &str,
        task: TaskName,
        call: F,
    ) -> Result<Result<(), CommitFailure>, Error>
    where
        F: FnOnce(Arc<dyn PspProvider>, String) -> Fut,
        Fut: Future<Output = Result<(), ProviderError>>,
    {
        let psp_account_id = self.accounts.psp_account_id(account_id).await?;
        let result = call(Arc::clone(&self.provider), psp_account_id).await;
        self.settle(account_id, task, result).await
    }

    async fn settle(
        &self,
        account_id: &str,
        task: TaskName,
        result: Result<(), ProviderError>,
    ) -> Result<Result<(), CommitFailure>, Error> {
        match result {
            Ok(()) => {
                self.accounts.mark_task_complete(account_id, task).await?;
                info!(account_id = %account_id, task = %task, "Task committed to provider");
                Ok(Ok(()))
            }
            Err(ProviderError::Rejected(rejection)) => {
                let failure = CommitFailure::from_rejection(&rejection);
                warn!(
                    account_id = %account_id,
                    task = %task,
                    rejection = %rejection,
                    failure = ?failure,
                    "Provider rejected task data"
                );
                Ok(Err(failure))
            }
            Err(transport @ ProviderError::Transport(_)) => Err(transport.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(code: Option<&str>, param: Option<&str>) -> ProviderRejection {
        ProviderRejection {
            code: code.map(str::to_string),
            param: param.map(str::to_string),
            message: None,
        }
    }

    #[test]
    fn known_params_map_to_fields() {
        assert_eq!(
            CommitFailure::from_rejection(&rejection(Some("invalid_value"), Some("phone"))),
            CommitFailure::Field(FieldCode::Phone)
        );
        assert_eq!(
            CommitFailure::from_rejection(&rejection(None, Some("dob[year]"))),
            CommitFailure::Field(FieldCode::DobYear)
        );
        assert_eq!(
            CommitFailure::from_rejection(&rejection(Some("routing_number_invalid"), None)),
            CommitFailure::Field(FieldCode::RoutingNumber)
        );
        assert_eq!(
            CommitFailure::from_rejection(&rejection(None, Some("account_number_invalid"))),
            CommitFailure::Field(FieldCode::AccountNumber)
        );
    }

    #[test]
    fn unusable_account_and_unknown_signals_are_generic() {
        assert_eq!(
            CommitFailure::from_rejection(&rejection(Some("bank_account_unusable"), None)),
            CommitFailure::Generic
        );
        assert_eq!(
            CommitFailure::from_rejection(&rejection(Some("something_new"), Some("tos"))),
            CommitFailure::Generic
        );
        assert_eq!(
            CommitFailure::from_rejection(&rejection(None, None)),
            CommitFailure::Generic
        );
    }

    #[test]
    fn page_errors_scope_to_owned_fields() {
        let failure = CommitFailure::Field(FieldCode::Phone);
        let errors = failure.page_errors(&["telephone_number", "email"]);
        assert!(errors.summary.is_none());
        assert!(errors
            .fields
            .get("telephone_number")
            .unwrap()
            .starts_with("Invalid work telephone number"));

        let elsewhere = failure.page_errors(&["sort_code"]);
        assert!(elsewhere.fields.is_empty());
        assert_eq!(elsewhere.summary, Some(GENERIC_FAILURE));

        let generic = CommitFailure::Generic.page_errors(&["telephone_number"]);
        assert_eq!(generic.summary, Some(GENERIC_FAILURE));
    }
}
