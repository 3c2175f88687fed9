//! Access gate: refuses entry to a task's input page once the system of
//! record reports the task complete.
//!
//! Per task the gate is a one-way switch: `Incomplete → Complete`. Nothing in
//! the portal can flip a task back; only the account service can.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use super::projector::RawProgressMap;
use super::registry::TaskName;
use super::routes::AccountPath;
use super::view::PortalError;
use crate::accounts::AccountService;
use crate::error::TaskAlreadyCompletedError;

/// Completion check for a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessGate {
    task: TaskName,
}

/// Build the gate for `task`.
pub fn guard(task: TaskName) -> AccessGate {
    AccessGate { task }
}

impl AccessGate {
    pub fn task(&self) -> TaskName {
        self.task
    }

    /// Proceed unless `progress` marks the task complete.
    pub fn check(&self, progress: Option<&RawProgressMap>) -> Result<(), TaskAlreadyCompletedError> {
        let done = progress
            .and_then(|p| p.get(self.task.as_str()))
            .copied()
            .unwrap_or(false);
        if done {
            Err(TaskAlreadyCompletedError { task: self.task })
        } else {
            Ok(())
        }
    }
}

/// State for the gate middleware.
#[derive(Clone)]
pub struct GateState {
    pub gate: AccessGate,
    pub accounts: Arc<dyn AccountService>,
}

/// axum middleware: reads the account's current progress on every request
/// and short-circuits with the "already completed" page when the gate refuses.
pub async fn enforce(
    State(state): State<GateState>,
    Path(path): Path<AccountPath>,
    request: Request,
    next: Next,
) -> Result<Response, PortalError> {
    let progress = state.accounts.onboarding_progress(&path.account_id).await?;
    if let Err(rejection) = state.gate.check(progress.as_ref()) {
        info!(
            account_id = %path.account_id,
            task = %rejection.task,
            "Refusing entry to completed task"
        );
        return Err(PortalError::from(rejection).for_account(&path.account_id));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(entries: &[(&str, bool)]) -> RawProgressMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn completed_task_is_rejected() {
        let raw = progress(&[("bank_account", true)]);
        let err = guard(TaskName::BankAccount).check(Some(&raw)).unwrap_err();
        assert_eq!(err.task, TaskName::BankAccount);
        assert_eq!(err.to_string(), "Task bank_account has already been completed");
    }

    #[test]
    fn incomplete_task_proceeds() {
        let raw = progress(&[("bank_account", false)]);
        assert!(guard(TaskName::BankAccount).check(Some(&raw)).is_ok());
    }

    #[test]
    fn missing_progress_proceeds() {
        assert!(guard(TaskName::Director).check(None).is_ok());
        let raw = progress(&[("bank_account", true)]);
        assert!(guard(TaskName::Director).check(Some(&raw)).is_ok());
    }

    #[test]
    fn rejection_is_stable_across_calls() {
        let raw = progress(&[("vat_number", true)]);
        let gate = guard(TaskName::VatNumber);
        for _ in 0..5 {
            assert!(gate.check(Some(&raw)).is_err());
        }
    }

    #[test]
    fn other_tasks_do_not_affect_gate() {
        let raw = progress(&[("vat_number", true), ("director", false)]);
        assert!(guard(TaskName::Director).check(Some(&raw)).is_ok());
    }
}
