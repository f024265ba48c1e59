//! Task tracking: the task record, its lifecycle and the JSON-backed repository.
//!
//! A task starts `active` and moves at most once to `done` and at most once to
//! `deleted`. Deletion is logical: deleted tasks stay in the list for history.

use crate::storage::PersistenceError;
use thiserror::Error;

pub mod due_date;
pub mod id;
mod repository;
mod task;
mod timestamp;

pub use repository::{NewTask, TaskDocument, TaskEdit, TaskRepository};
pub use task::{Lifecycle, Task, TaskStatus};

/// Errors returned by task operations.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task {0} not found")]
    NotFound(String),
    #[error("Task {0} is already done")]
    AlreadyDone(String),
    #[error("Task {0} is already deleted")]
    AlreadyDeleted(String),
    /// The due date was not a valid `YYYY-MM-DD` date
    #[error("Invalid due date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Failed to save tasks")]
    Persistence(#[from] PersistenceError),
}
