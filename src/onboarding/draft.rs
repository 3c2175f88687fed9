//! Draft accumulator: the partial record a compound task builds up across
//! several page submissions before its single commit.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::registry::TaskName;
use crate::error::DatabaseError;
use crate::store::SessionStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first_name: String,
    pub last_name: String,
}

/// Date parts exactly as submitted; coerced to numbers only at commit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOfBirth {
    pub day: String,
    pub month: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeAddress {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub postcode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub telephone_number: String,
    pub email: String,
}

/// Partial record for one compound task instance.
///
/// Each section is owned by exactly one page; writing a section never
/// touches its siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<PersonName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<DateOfBirth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<HomeAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactDetails>,
}

/// Replacement of one draft section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftUpdate {
    Name(PersonName),
    Dob(DateOfBirth),
    Address(HomeAddress),
    Contact(ContactDetails),
}

impl Draft {
    /// Shallow-replace the section named by `update`.
    pub fn apply(&mut self, update: DraftUpdate) {
        match update {
            DraftUpdate::Name(name) => self.name = Some(name),
            DraftUpdate::Dob(dob) => self.dob = Some(dob),
            DraftUpdate::Address(address) => self.address = Some(address),
            DraftUpdate::Contact(contact) => self.contact = Some(contact),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One compound task for one account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskInstance {
    pub account_id: String,
    pub task: TaskName,
}

/// Where a draft lives: one actor's session, one task instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey {
    pub actor_id: String,
    pub instance: TaskInstance,
}

impl DraftKey {
    pub fn new(actor_id: impl Into<String>, account_id: impl Into<String>, task: TaskName) -> Self {
        Self {
            actor_id: actor_id.into(),
            instance: TaskInstance {
                account_id: account_id.into(),
                task,
            },
        }
    }

    /// Session key, namespaced to the task instance.
    fn session_key(&self) -> String {
        format!(
            "onboarding:{}:{}:draft",
            self.instance.account_id, self.instance.task
        )
    }
}

/// Reads, merges and clears drafts in the session store.
#[derive(Clone)]
pub struct DraftAccumulator {
    store: Arc<dyn SessionStore>,
}

impl DraftAccumulator {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The stored draft, or an empty one.
    pub async fn read(&self, key: &DraftKey) -> Result<Draft, DatabaseError> {
        match self.store.get(&key.actor_id, &key.session_key()).await? {
            Some(value) => {
                serde_json::from_value(value).map_err(|e| DatabaseError::Serialization(e.to_string()))
            }
            None => Ok(Draft::default()),
        }
    }

    /// Apply `updates` to the stored draft and persist the result.
    pub async fn merge(
        &self,
        key: &DraftKey,
        updates: impl IntoIterator<Item = DraftUpdate>,
    ) -> Result<Draft, DatabaseError> {
        let mut draft = self.read(key).await?;
        for update in updates {
            draft.apply(update);
        }
        let value =
            serde_json::to_value(&draft).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        self.store.set(&key.actor_id, &key.session_key(), &value).await?;
        debug!(
            account_id = %key.instance.account_id,
            task = %key.instance.task,
            "Draft updated"
        );
        Ok(draft)
    }

    /// Drop everything accumulated for the task instance.
    pub async fn clear(&self, key: &DraftKey) -> Result<(), DatabaseError> {
        self.store.delete(&key.actor_id, &key.session_key()).await?;
        debug!(
            account_id = %key.instance.account_id,
            task = %key.instance.task,
            "Draft cleared"
        );
        Ok(())
    }
}
