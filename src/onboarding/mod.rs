//! Onboarding workflow: the task list a merchant completes before the PSP
//! will verify their account.
//!
//! Tasks are independent except for the terminal document upload, which
//! unlocks only when every other task is done. Most tasks are a single page;
//! the responsible person is collected over several pages into a draft and
//! committed once.

pub mod commit;
pub mod draft;
pub mod gate;
pub mod projector;
pub mod registry;
pub mod responsible_person;
pub mod routes;
pub mod simple_tasks;
pub mod view;

pub use commit::{CommitCoordinator, CommitFailure, CommitOutcome, FieldCode};
pub use draft::{Draft, DraftAccumulator, DraftKey, DraftUpdate};
pub use gate::{AccessGate, guard};
pub use projector::{FriendlyTaskView, RawProgressMap, TaskList, TaskStatus, project};
pub use registry::{Task, TaskName, TaskRegistry};
pub use routes::{AppState, onboarding_routes};
pub use view::{PageView, PortalError};
