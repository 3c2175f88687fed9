//! Task registry: the fixed, ordered catalogue of onboarding tasks.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Identifier of an onboarding task, as used by the system of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    BankAccount,
    ResponsiblePerson,
    Director,
    VatNumber,
    CompanyNumber,
    OrganisationDetails,
    GovernmentEntityDocument,
}

impl TaskName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankAccount => "bank_account",
            Self::ResponsiblePerson => "responsible_person",
            Self::Director => "director",
            Self::VatNumber => "vat_number",
            Self::CompanyNumber => "company_number",
            Self::OrganisationDetails => "organisation_details",
            Self::GovernmentEntityDocument => "government_entity_document",
        }
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_account" => Ok(Self::BankAccount),
            "responsible_person" => Ok(Self::ResponsiblePerson),
            "director" => Ok(Self::Director),
            "vat_number" => Ok(Self::VatNumber),
            "company_number" => Ok(Self::CompanyNumber),
            "organisation_details" => Ok(Self::OrganisationDetails),
            "government_entity_document" => Ok(Self::GovernmentEntityDocument),
            other => Err(format!("unknown task: {other}")),
        }
    }
}

/// One onboarding step with a dedicated input page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    pub friendly_name: &'static str,
    /// Locator relative to the account's onboarding root. Not interpreted here.
    pub page_path: &'static str,
}

impl Task {
    pub const fn new(name: TaskName, friendly_name: &'static str, page_path: &'static str) -> Self {
        Self {
            name,
            friendly_name,
            page_path,
        }
    }

    /// Link to the task's input page for the given account.
    pub fn href(&self, account_id: &str) -> String {
        format!("{}/{}", onboarding_root(account_id), self.page_path)
    }
}

/// Root of every onboarding page for an account; also the task list page.
pub fn onboarding_root(account_id: &str) -> String {
    format!("/accounts/{account_id}/onboarding")
}

/// Ordered task list plus a name index. Immutable once built.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<&'static str, usize>,
    terminal: TaskName,
}

impl TaskRegistry {
    /// Build a registry. Order of `tasks` is the completion order.
    ///
    /// `terminal` is the task that stays disabled until every other reached
    /// task is complete.
    pub fn new(tasks: Vec<Task>, terminal: TaskName) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (position, task) in tasks.iter().enumerate() {
            if index.insert(task.name.as_str(), position).is_some() {
                return Err(RegistryError::DuplicateTask(task.name));
            }
        }
        if !index.contains_key(terminal.as_str()) {
            return Err(RegistryError::UnknownTerminal(terminal));
        }
        Ok(Self {
            tasks,
            index,
            terminal,
        })
    }

    /// The registry every account is onboarded against.
    pub fn standard() -> &'static TaskRegistry {
        &STANDARD
    }

    /// Tasks in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn by_name(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&position| &self.tasks[position])
    }

    pub fn get(&self, name: TaskName) -> Option<&Task> {
        self.by_name(name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn terminal(&self) -> TaskName {
        self.terminal
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

static STANDARD: LazyLock<TaskRegistry> = LazyLock::new(|| {
    TaskRegistry::new(STANDARD_TASKS.to_vec(), TaskName::GovernmentEntityDocument)
        .expect("standard task list has unique names and includes its terminal task")
});

const STANDARD_TASKS: [Task; 7] = [
    Task::new(TaskName::BankAccount, "Bank details", "bank-details"),
    Task::new(TaskName::ResponsiblePerson, "Responsible person", "responsible-person"),
    Task::new(TaskName::Director, "Director", "director"),
    Task::new(TaskName::VatNumber, "VAT registration number", "vat-number"),
    Task::new(TaskName::CompanyNumber, "Company registration number", "company-number"),
    Task::new(
        TaskName::OrganisationDetails,
        "Organisation name and address",
        "organisation-details",
    ),
    Task::new(
        TaskName::GovernmentEntityDocument,
        "Government entity document",
        "government-entity-document",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_order_is_declared_order() {
        let names: Vec<TaskName> = TaskRegistry::standard().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                TaskName::BankAccount,
                TaskName::ResponsiblePerson,
                TaskName::Director,
                TaskName::VatNumber,
                TaskName::CompanyNumber,
                TaskName::OrganisationDetails,
                TaskName::GovernmentEntityDocument,
            ]
        );
    }

    #[test]
    fn standard_registry_is_fully_indexed() {
        let registry = TaskRegistry::standard();
        assert_eq!(registry.len(), 7);
        for task in STANDARD_TASKS.iter() {
            assert_eq!(registry.get(task.name), Some(task));
        }
        assert_eq!(
            TaskRegistry::standard().terminal(),
            TaskName::GovernmentEntityDocument
        );
    }

    #[test]
    fn lookup_by_name() {
        let registry = TaskRegistry::standard();
        let task = registry.by_name("vat_number").unwrap();
        assert_eq!(task.friendly_name, "VAT registration number");
        assert!(registry.by_name("not_a_task").is_none());
        assert!(registry.contains("director"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let tasks = vec![
            Task::new(TaskName::BankAccount, "Bank", "bank"),
            Task::new(TaskName::BankAccount, "Bank again", "bank-2"),
        ];
        let err = TaskRegistry::new(tasks, TaskName::BankAccount).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTask(TaskName::BankAccount)));
    }

    #[test]
    fn terminal_must_be_registered() {
        let tasks = vec![Task::new(TaskName::BankAccount, "Bank", "bank")];
        let err = TaskRegistry::new(tasks, TaskName::GovernmentEntityDocument).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTerminal(_)));
    }

    #[test]
    fn display_matches_serde() {
        for task in TaskRegistry::standard().iter() {
            let json = serde_json::to_string(&task.name).unwrap();
            assert_eq!(json, format!("\"{}\"", task.name));
            assert_eq!(task.name.as_str().parse::<TaskName>().unwrap(), task.name);
        }
    }

    #[test]
    fn href_is_scoped_to_account() {
        let task = TaskRegistry::standard().get(TaskName::Director).unwrap();
        assert_eq!(task.href("42"), "/accounts/42/onboarding/director");
    }
}
