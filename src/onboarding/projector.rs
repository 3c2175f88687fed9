//! Completion projector: turns the raw progress map from the system of
//! record into the ordered, display-ready task list.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use super::registry::{TaskName, TaskRegistry};

/// Task name → completed flag, as reported by the account service.
pub type RawProgressMap = HashMap<String, bool>;

/// Projected status of a task.
///
/// Serializes as `true`, `false` or `"disabled"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Complete,
    Incomplete,
    Disabled,
}

impl From<bool> for TaskStatus {
    fn from(done: bool) -> Self {
        if done { Self::Complete } else { Self::Incomplete }
    }
}

impl Serialize for TaskStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Complete => serializer.serialize_bool(true),
            Self::Incomplete => serializer.serialize_bool(false),
            Self::Disabled => serializer.serialize_str("disabled"),
        }
    }
}

/// One row of the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendlyTaskView {
    pub friendly_name: &'static str,
    pub href: String,
    pub status: TaskStatus,
    pub id: TaskName,
}

/// Projected task list keyed by friendly name, in registry order.
pub type TaskList = IndexMap<&'static str, FriendlyTaskView>;

/// Project `raw` onto `registry` for the given account.
///
/// An absent map means onboarding has not started and yields an empty list.
/// Tasks missing from the map have not been reached and are omitted. Keys the
/// registry does not know are logged and dropped.
pub fn project(registry: &TaskRegistry, raw: Option<&RawProgressMap>, account_id: &str) -> TaskList {
    let Some(raw) = raw else {
        return TaskList::new();
    };

    for key in raw.keys().filter(|key| !registry.contains(key)) {
        warn!(task = %key, account_id = %account_id, "Unexpected task encountered");
    }

    let kept: Vec<_> = registry
        .iter()
        .filter_map(|task| raw.get(task.name.as_str()).map(|&done| (task, done)))
        .collect();

    let terminal = registry.terminal();
    let any_other_incomplete = kept
        .iter()
        .any(|(task, done)| task.name != terminal && !done);

    kept.into_iter()
        .map(|(task, done)| {
            let status = if task.name == terminal && any_other_incomplete {
                TaskStatus::Disabled
            } else {
                TaskStatus::from(done)
            };
            let view = FriendlyTaskView {
                friendly_name: task.friendly_name,
                href: task.href(account_id),
                status,
                id: task.name,
            };
            (task.friendly_name, view)
        })
        .collect()
}

/// Whether the terminal task is currently actionable for `raw`.
pub fn prerequisites_complete(registry: &TaskRegistry, raw: Option<&RawProgressMap>) -> bool {
    let Some(raw) = raw else {
        return false;
    };
    let terminal = registry.terminal();
    raw.contains_key(terminal.as_str())
        && registry
            .iter()
            .filter(|task| task.name != terminal)
            .all(|task| raw.get(task.name.as_str()).copied().unwrap_or(true))
}
