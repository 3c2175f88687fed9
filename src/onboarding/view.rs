//! Render contexts handed to the page-rendering layer, and the error type
//! every onboarding handler returns.
//!
//! The portal never produces markup. A handler answers with a [`PageView`]
//! (template identifier plus context), a redirect, or a [`PortalError`].

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

use super::registry::{TaskName, onboarding_root};
use crate::error::{
    AccountError, DatabaseError, Error, ProviderError, TaskAlreadyCompletedError,
};

/// Template identifier plus context for the rendering layer.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub template: &'static str,
    pub context: Map<String, Value>,
    #[serde(skip)]
    pub status: StatusCode,
    /// Context keys whose values failed to serialize.
    #[serde(skip)]
    render_errors: Vec<String>,
}

impl PageView {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            context: Map::new(),
            status: StatusCode::OK,
            render_errors: Vec::new(),
        }
    }

    /// Add a context entry.
    ///
    /// A value that fails to serialize is logged and turns the response into
    /// the generic error page.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.context.insert(key.to_string(), value);
            }
            Err(e) => {
                warn!(
                    template = self.template,
                    key = key,
                    error = %e,
                    "Render context value failed to serialize"
                );
                self.render_errors.push(key.to_string());
            }
        }
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for PageView {
    fn into_response(self) -> Response {
        if !self.render_errors.is_empty() {
            error!(
                template = self.template,
                keys = ?self.render_errors,
                "Refusing to render page with broken context"
            );
            return generic_error_page();
        }
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Failure leaving an onboarding handler.
#[derive(Debug)]
pub enum PortalError {
    /// The access gate refused entry. User-facing, never a fault.
    AlreadyCompleted {
        task: TaskName,
        account_id: Option<String>,
    },
    /// No session identifier on the request.
    MissingSession,
    /// Anything else; escalated to the generic error page and logged.
    Internal(Error),
}

impl PortalError {
    /// Attach the account so the blocked page can link back to the task list.
    pub fn for_account(self, account_id: &str) -> Self {
        match self {
            Self::AlreadyCompleted { task, .. } => Self::AlreadyCompleted {
                task,
                account_id: Some(account_id.to_string()),
            },
            other => other,
        }
    }
}

impl From<Error> for PortalError {
    fn from(err: Error) -> Self {
        match err {
            Error::TaskAlreadyCompleted(TaskAlreadyCompletedError { task }) => {
                Self::AlreadyCompleted {
                    task,
                    account_id: None,
                }
            }
            other => Self::Internal(other),
        }
    }
}

impl From<TaskAlreadyCompletedError> for PortalError {
    fn from(err: TaskAlreadyCompletedError) -> Self {
        Error::from(err).into()
    }
}

impl From<AccountError> for PortalError {
    fn from(err: AccountError) -> Self {
        Error::from(err).into()
    }
}

impl From<ProviderError> for PortalError {
    fn from(err: ProviderError) -> Self {
        Error::from(err).into()
    }
}

impl From<DatabaseError> for PortalError {
    fn from(err: DatabaseError) -> Self {
        Error::from(err).into()
    }
}

fn generic_error_page() -> Response {
    PageView::new("error/generic")
        .with("message", "There is a problem with the service")
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        match self {
            Self::AlreadyCompleted { task, account_id } => PageView::new("error/task-already-completed")
                .with("task", task)
                .with("message", "You've already completed this task")
                .with("tasksHref", account_id.as_deref().map(onboarding_root))
                .with_status(StatusCode::FORBIDDEN)
                .into_response(),
            Self::MissingSession => PageView::new("error/session-expired")
                .with("message", "Your session has expired, sign in again")
                .with_status(StatusCode::UNAUTHORIZED)
                .into_response(),
            Self::Internal(err) => {
                error!(error = %err, "Unhandled error in onboarding flow");
                generic_error_page()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_view_collects_context() {
        let view = PageView::new("onboarding/tasks")
            .with("count", 3)
            .with("name", "Alice");
        assert_eq!(view.context["count"], 3);
        assert_eq!(view.context["name"], "Alice");
        assert_eq!(view.status, StatusCode::OK);
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    #[test]
    fn broken_context_value_fails_the_page() {
        let view = PageView::new("onboarding/tasks")
            .with("count", 3)
            .with("tasks", Unserializable);
        assert!(!view.context.contains_key("tasks"));
        assert_eq!(view.render_errors, vec!["tasks".to_string()]);
        assert_eq!(
            view.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn already_completed_is_forbidden() {
        let err = PortalError::from(TaskAlreadyCompletedError {
            task: TaskName::BankAccount,
        })
        .for_account("9");
        match &err {
            PortalError::AlreadyCompleted { task, account_id } => {
                assert_eq!(*task, TaskName::BankAccount);
                assert_eq!(account_id.as_deref(), Some("9"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn transport_failure_is_internal() {
        let err = PortalError::from(ProviderError::Transport("connection reset".into()));
        assert!(matches!(err, PortalError::Internal(Error::Provider(_))));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
