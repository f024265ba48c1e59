use crate::storage::{self, PersistenceError};
use crate::tasks::due_date::{self, DueDateChange};
use crate::tasks::{Task, TaskError, id};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Contents of the task file.
///
/// Records are read one by one. A record that is not a valid task is kept in
/// `unreadable` and written back unchanged after the valid tasks, so a single
/// bad entry never costs the rest of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawTaskDocument")]
pub struct TaskDocument {
    pub tasks: Vec<Task>,
    pub unreadable: Vec<Value>,
}

impl TaskDocument {
    fn unreadable_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.unreadable
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_str))
    }
}

#[derive(Deserialize)]
struct RawTaskDocument {
    #[serde(default)]
    tasks: Vec<Value>,
}

impl From<RawTaskDocument> for TaskDocument {
    fn from(raw: RawTaskDocument) -> Self {
        let mut document = TaskDocument::default();
        for (index, record) in raw.tasks.into_iter().enumerate() {
            match Task::deserialize(&record) {
                Ok(task) => document.tasks.push(task),
                Err(e) => {
                    warn!("Skipping unreadable task record #{}: {}", index, e);
                    document.unreadable.push(record);
                }
            }
        }
        document
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum StoredRecord<'a> {
    Task(&'a Task),
    Unreadable(&'a Value),
}

#[derive(Serialize)]
struct StoredDocument<'a> {
    tasks: Vec<StoredRecord<'a>>,
}

impl Serialize for TaskDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tasks = self
            .tasks
            .iter()
            .map(StoredRecord::Task)
            .chain(self.unreadable.iter().map(StoredRecord::Unreadable))
            .collect();
        StoredDocument { tasks }.serialize(serializer)
    }
}

/// Input for [`TaskRepository::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub due_date: Option<String>,
    pub assignee_id: Option<u64>,
    pub creator_id: u64,
}

/// Fields to change in [`TaskRepository::edit`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD`, or `"none"` to clear the due date
    pub due_date: Option<String>,
    pub assignee_id: Option<u64>,
}

/// The ordered list of all tasks, backed by a JSON file.
///
/// Every successful mutation rewrites the file. When the write fails, the
/// in-memory list is restored to its state before the mutation and the error
/// is returned.
#[derive(Debug)]
pub struct TaskRepository {
    path: PathBuf,
    document: TaskDocument,
}

impl TaskRepository {
    /// Loads the repository from `path`. A missing or unreadable file gives an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document: TaskDocument = storage::load(&path);
        info!("Loaded {} tasks from {}", document.tasks.len(), path.display());
        if !document.unreadable.is_empty() {
            warn!(
                "{} unreadable task records in {} are kept as they are",
                document.unreadable.len(),
                path.display()
            );
        }
        Self { path, document }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All tasks in creation order, including done and deleted ones.
    pub fn tasks(&self) -> &[Task] {
        &self.document.tasks
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.document.tasks.iter().find(|task| task.id() == id)
    }

    /// Active tasks in creation order.
    pub fn list_active(&self) -> impl Iterator<Item = &Task> + '_ {
        self.document.tasks.iter().filter(|task| task.is_active())
    }

    pub fn create(&mut self, new_task: NewTask) -> Result<Task, TaskError> {
        let due_date = new_task
            .due_date
            .as_deref()
            .map(due_date::parse)
            .transpose()?;

        let id = id::unique_id(
            |candidate| {
                self.find(candidate).is_some()
                    || self.document.unreadable_ids().any(|taken| taken == candidate)
            },
            id::random_short_id,
        );
        let mut task = Task::new(id, new_task.title, new_task.creator_id, Utc::now());
        task.description = new_task.description.unwrap_or_default();
        task.due_date = due_date;
        task.assignee_id = new_task.assignee_id;

        self.document.tasks.push(task.clone());
        if let Err(e) = self.persist() {
            self.document.tasks.pop();
            return Err(e.into());
        }
        info!("Created task {} '{}'", task.id(), task.title());
        Ok(task)
    }

    pub fn complete(&mut self, id: &str) -> Result<Task, TaskError> {
        let task = self.update(id, |task| task.complete(Utc::now()))?;
        info!("Completed task {}", id);
        Ok(task)
    }

    /// Soft-deletes a task; it stays in the list with status `deleted`.
    pub fn delete(&mut self, id: &str) -> Result<Task, TaskError> {
        let task = self.update(id, |task| task.delete(Utc::now()))?;
        info!("Deleted task {}", id);
        Ok(task)
    }

    /// Applies every provided field of `edit`, regardless of the task's status.
    ///
    /// An invalid due date rejects the whole edit before any field changes.
    pub fn edit(&mut self, id: &str, edit: TaskEdit) -> Result<Task, TaskError> {
        let task = self.update(id, |task| {
            let due_date = edit
                .due_date
                .as_deref()
                .map(due_date::parse_change)
                .transpose()?;

            if let Some(title) = edit.title {
                task.title = title;
            }
            if let Some(description) = edit.description {
                task.description = description;
            }
            if let Some(assignee_id) = edit.assignee_id {
                task.assignee_id = Some(assignee_id);
            }
            match due_date {
                Some(DueDateChange::Clear) => task.due_date = None,
                Some(DueDateChange::Set(date)) => task.due_date = Some(date),
                None => {}
            }
            Ok(())
        })?;
        info!("Edited task {}", id);
        Ok(task)
    }

    /// Writes the whole list to the backing file.
    pub fn persist(&self) -> Result<(), PersistenceError> {
        storage::save(&self.path, &self.document).inspect_err(|e| {
            error!("Failed to save tasks to {}: {}", self.path.display(), e);
        })
    }

    fn update(
        &mut self,
        id: &str,
        apply: impl FnOnce(&mut Task) -> Result<(), TaskError>,
    ) -> Result<Task, TaskError> {
        let index = self
            .document
            .tasks
            .iter()
            .position(|task| task.id() == id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        let previous = self.document.tasks[index].clone();
        apply(&mut self.document.tasks[index])?;
        if let Err(e) = self.persist() {
            self.document.tasks[index] = previous;
            return Err(e.into());
        }
        Ok(self.document.tasks[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskStatus;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TaskRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repository = TaskRepository::load(dir.path().join("tasks.json"));
        (dir, repository)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            creator_id: 1,
            ..Default::default()
        }
    }

    /// A repository whose backing path cannot be written because its parent is a file.
    fn unwritable(dir: &TempDir, document: TaskDocument) -> TaskRepository {
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        TaskRepository {
            path: blocker.join("tasks.json"),
            document,
        }
    }

    mod load_tests {
        use super::*;

        const MIXED_FILE: &str = r#"{
  "tasks": [
    {
      "id": "aaaa1111",
      "title": "Good",
      "description": "",
      "due_date": "2024-01-15",
      "assignee_id": null,
      "creator_id": 1,
      "created_at": "2024-01-01T09:00:00Z",
      "status": "active"
    },
    {
      "id": "bbbb2222",
      "title": "Hand edited",
      "due_date": "2024-1-5x",
      "creator_id": 1,
      "created_at": "2024-01-01T09:00:00Z",
      "status": "active"
    },
    {
      "id": "cccc3333",
      "title": "Unknown status",
      "creator_id": 1,
      "created_at": "2024-01-01T09:00:00Z",
      "status": "archived"
    }
  ]
}
"#;

        #[test]
        fn bad_records_do_not_hide_good_ones() {
            // Arrange
            let (_dir, repository) = setup();
            std::fs::write(repository.path(), MIXED_FILE).unwrap();

            // Act
            let reloaded = TaskRepository::load(repository.path());

            // Assert
            let ids: Vec<&str> = reloaded.tasks().iter().map(|task| task.id()).collect();
            assert_eq!(ids, vec!["aaaa1111"]);
        }

        #[test]
        fn bad_records_are_written_back_after_a_create() {
            // Arrange
            let (_dir, repository) = setup();
            std::fs::write(repository.path(), MIXED_FILE).unwrap();
            let mut repository = TaskRepository::load(repository.path());

            // Act
            let created = repository.create(new_task("New")).unwrap();

            // Assert
            let written: Value =
                serde_json::from_str(&std::fs::read_to_string(repository.path()).unwrap())
                    .unwrap();
            let ids: Vec<&str> = written["tasks"]
                .as_array()
                .unwrap()
                .iter()
                .map(|record| record["id"].as_str().unwrap())
                .collect();
            assert_eq!(ids, vec!["aaaa1111", created.id(), "bbbb2222", "cccc3333"]);
            assert_eq!(written["tasks"][2]["due_date"], "2024-1-5x");
            assert_eq!(written["tasks"][3]["status"], "archived");
        }

        #[test]
        fn unreadable_record_ids_are_not_reused() {
            let mut document = TaskDocument::default();
            document
                .unreadable
                .push(serde_json::json!({ "id": "bbbb2222", "status": "archived" }));

            let taken: Vec<&str> = document.unreadable_ids().collect();

            assert_eq!(taken, vec!["bbbb2222"]);
        }
    }

    mod create_tests {
        use super::*;

        #[test]
        fn create_fills_defaults_and_persists() {
            // Arrange
            let (_dir, mut repository) = setup();

            // Act
            let task = repository.create(new_task("Write report")).unwrap();

            // Assert
            assert_eq!(task.title(), "Write report");
            assert_eq!(task.description(), "");
            assert_eq!(task.due_date(), None);
            assert_eq!(task.assignee_id(), None);
            assert_eq!(task.creator_id(), 1);
            assert_eq!(task.status(), TaskStatus::Active);
            assert!(task.created_at() <= Utc::now());

            let reloaded = TaskRepository::load(repository.path());
            assert_eq!(reloaded.tasks(), &[task]);
        }

        #[test]
        fn create_with_all_fields() {
            let (_dir, mut repository) = setup();

            let task = repository
                .create(NewTask {
                    title: "Plan sprint".to_string(),
                    description: Some("Next two weeks".to_string()),
                    due_date: Some("2024-01-15".to_string()),
                    assignee_id: Some(99),
                    creator_id: 5,
                })
                .unwrap();

            assert_eq!(task.description(), "Next two weeks");
            assert_eq!(task.due_date(), NaiveDate::from_ymd_opt(2024, 1, 15));
            assert_eq!(task.assignee_id(), Some(99));
            assert_eq!(task.creator_id(), 5);
        }

        #[test]
        fn create_with_invalid_date_adds_nothing() {
            // Arrange
            let (_dir, mut repository) = setup();
            repository.create(new_task("Existing")).unwrap();

            // Act
            let result = repository.create(NewTask {
                due_date: Some("2024-13-40".to_string()),
                ..new_task("Broken")
            });

            // Assert
            assert!(matches!(result, Err(TaskError::InvalidDate(_))));
            assert_eq!(repository.tasks().len(), 1);
            assert_eq!(TaskRepository::load(repository.path()).tasks().len(), 1);
        }

        #[test]
        fn create_rolls_back_when_save_fails() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();
            let mut repository = unwritable(&dir, TaskDocument::default());

            // Act
            let result = repository.create(new_task("Unsaved"));

            // Assert
            assert!(matches!(result, Err(TaskError::Persistence(_))));
            assert!(repository.tasks().is_empty());
        }
    }

    mod transition_tests {
        use super::*;

        #[test]
        fn complete_unknown_id_is_not_found() {
            let (_dir, mut repository) = setup();

            let result = repository.complete("deadbeef");

            assert!(matches!(result, Err(TaskError::NotFound(id)) if id == "deadbeef"));
        }

        #[test]
        fn delete_unknown_id_is_not_found() {
            let (_dir, mut repository) = setup();

            assert!(matches!(
                repository.delete("deadbeef"),
                Err(TaskError::NotFound(_))
            ));
        }

        #[test]
        fn complete_persists_new_status() {
            // Arrange
            let (_dir, mut repository) = setup();
            let task = repository.create(new_task("Ship it")).unwrap();

            // Act
            let done = repository.complete(task.id()).unwrap();

            // Assert
            assert_eq!(done.status(), TaskStatus::Done);
            assert!(done.completed_at().is_some());
            let reloaded = TaskRepository::load(repository.path());
            assert_eq!(reloaded.find(task.id()), Some(&done));
        }

        #[test]
        fn complete_rolls_back_when_save_fails() {
            // Arrange
            let dir = tempfile::tempdir().unwrap();
            let mut seeded = TaskRepository::load(dir.path().join("seed.json"));
            let task = seeded.create(new_task("Keep active")).unwrap();
            let mut repository = unwritable(
                &dir,
                TaskDocument {
                    tasks: vec![task.clone()],
                    ..Default::default()
                },
            );

            // Act
            let result = repository.complete(task.id());

            // Assert
            assert!(matches!(result, Err(TaskError::Persistence(_))));
            assert_eq!(repository.find(task.id()), Some(&task));
        }

        #[test]
        fn deleted_task_stays_in_list() {
            let (_dir, mut repository) = setup();
            let task = repository.create(new_task("Obsolete")).unwrap();

            let deleted = repository.delete(task.id()).unwrap();

            assert_eq!(deleted.status(), TaskStatus::Deleted);
            assert_eq!(repository.tasks().len(), 1);
            assert_eq!(repository.list_active().count(), 0);
        }
    }

    mod edit_tests {
        use super::*;

        #[test]
        fn edit_applies_only_provided_fields() {
            // Arrange
            let (_dir, mut repository) = setup();
            let task = repository
                .create(NewTask {
                    description: Some("Original".to_string()),
                    due_date: Some("2024-01-15".to_string()),
                    ..new_task("Original title")
                })
                .unwrap();

            // Act
            let edited = repository
                .edit(
                    task.id(),
                    TaskEdit {
                        title: Some("New title".to_string()),
                        assignee_id: Some(7),
                        ..Default::default()
                    },
                )
                .unwrap();

            // Assert
            assert_eq!(edited.title(), "New title");
            assert_eq!(edited.description(), "Original");
            assert_eq!(edited.due_date(), NaiveDate::from_ymd_opt(2024, 1, 15));
            assert_eq!(edited.assignee_id(), Some(7));
            assert_eq!(edited.created_at(), task.created_at());
        }

        #[test]
        fn edit_with_invalid_date_changes_nothing() {
            // Arrange
            let (_dir, mut repository) = setup();
            let task = repository.create(new_task("Untouched")).unwrap();

            // Act
            let result = repository.edit(
                task.id(),
                TaskEdit {
                    title: Some("Should not apply".to_string()),
                    due_date: Some("soon".to_string()),
                    ..Default::default()
                },
            );

            // Assert
            assert!(matches!(result, Err(TaskError::InvalidDate(raw)) if raw == "soon"));
            assert_eq!(repository.find(task.id()), Some(&task));
        }

        #[test]
        fn edit_unknown_id_is_not_found() {
            let (_dir, mut repository) = setup();

            let result = repository.edit("deadbeef", TaskEdit::default());

            assert!(matches!(result, Err(TaskError::NotFound(_))));
        }

        #[test]
        fn edit_is_allowed_on_done_task() {
            let (_dir, mut repository) = setup();
            let task = repository.create(new_task("Finished")).unwrap();
            repository.complete(task.id()).unwrap();

            let edited = repository
                .edit(
                    task.id(),
                    TaskEdit {
                        description: Some("Postmortem notes".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();

            assert_eq!(edited.status(), TaskStatus::Done);
            assert_eq!(edited.description(), "Postmortem notes");
        }
    }
}
