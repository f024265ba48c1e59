use crate::tasks::{TaskError, due_date, timestamp};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Status as written to the task file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Done,
    Deleted,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskStatus::Active => "active",
            TaskStatus::Done => "done",
            TaskStatus::Deleted => "deleted",
        };
        write!(f, "{}", name)
    }
}

/// Where a task is in its lifecycle, together with the time of each transition.
///
/// A deleted task remembers whether it had been completed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Done {
        completed_at: DateTime<Utc>,
    },
    Deleted {
        completed_at: Option<DateTime<Utc>>,
        deleted_at: DateTime<Utc>,
    },
}

/// A tracked task.
///
/// Identity, creator and creation time are fixed at construction. The remaining
/// fields change only through [`crate::tasks::TaskRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) due_date: Option<NaiveDate>,
    pub(crate) assignee_id: Option<u64>,
    creator_id: u64,
    created_at: DateTime<Utc>,
    lifecycle: Lifecycle,
}

impl Task {
    pub(crate) fn new(
        id: String,
        title: String,
        creator_id: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            due_date: None,
            assignee_id: None,
            creator_id,
            created_at,
            lifecycle: Lifecycle::Active,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn assignee_id(&self) -> Option<u64> {
        self.assignee_id
    }

    pub fn creator_id(&self) -> u64 {
        self.creator_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn status(&self) -> TaskStatus {
        match self.lifecycle {
            Lifecycle::Active => TaskStatus::Active,
            Lifecycle::Done { .. } => TaskStatus::Done,
            Lifecycle::Deleted { .. } => TaskStatus::Deleted,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            Lifecycle::Active => None,
            Lifecycle::Done { completed_at } => Some(completed_at),
            Lifecycle::Deleted { completed_at, .. } => completed_at,
        }
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            Lifecycle::Deleted { deleted_at, .. } => Some(deleted_at),
            _ => None,
        }
    }

    /// Marks an active task as done.
    pub(crate) fn complete(&mut self, now: DateTime<Utc>) -> Result<(), TaskError> {
        match self.lifecycle {
            Lifecycle::Active => {
                self.lifecycle = Lifecycle::Done { completed_at: now };
                Ok(())
            }
            Lifecycle::Done { .. } => Err(TaskError::AlreadyDone(self.id.clone())),
            Lifecycle::Deleted { .. } => Err(TaskError::AlreadyDeleted(self.id.clone())),
        }
    }

    /// Soft-deletes an active or done task.
    pub(crate) fn delete(&mut self, now: DateTime<Utc>) -> Result<(), TaskError> {
        let completed_at = match self.lifecycle {
            Lifecycle::Active => None,
            Lifecycle::Done { completed_at } => Some(completed_at),
            Lifecycle::Deleted { .. } => return Err(TaskError::AlreadyDeleted(self.id.clone())),
        };
        self.lifecycle = Lifecycle::Deleted {
            completed_at,
            deleted_at: now,
        };
        Ok(())
    }
}

/// Flat JSON shape of a task.
#[derive(Debug, Serialize, Deserialize)]
struct TaskRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "due_date::deserialize_option")]
    due_date: Option<NaiveDate>,
    #[serde(default)]
    assignee_id: Option<u64>,
    creator_id: u64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    created_at: DateTime<Utc>,
    status: TaskStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize_option"
    )]
    completed_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize_option"
    )]
    deleted_at: Option<DateTime<Utc>>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        // A record missing its transition time falls back to the creation time.
        let lifecycle = match record.status {
            TaskStatus::Active => Lifecycle::Active,
            TaskStatus::Done => Lifecycle::Done {
                completed_at: record.completed_at.unwrap_or(record.created_at),
            },
            TaskStatus::Deleted => Lifecycle::Deleted {
                completed_at: record.completed_at,
                deleted_at: record.deleted_at.unwrap_or(record.created_at),
            },
        };
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            due_date: record.due_date,
            assignee_id: record.assignee_id,
            creator_id: record.creator_id,
            created_at: record.created_at,
            lifecycle,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            status: task.status(),
            completed_at: task.completed_at(),
            deleted_at: task.deleted_at(),
            id: task.id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            assignee_id: task.assignee_id,
            creator_id: task.creator_id,
            created_at: task.created_at,
        }
    }
}
