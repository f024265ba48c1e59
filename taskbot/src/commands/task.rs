use crate::commands::{Error, capitalize};
use crate::connectors::discord::{Colour, DiscordConnector, Embed, Reply};
use crate::tasks::{NewTask, Task, TaskEdit, TaskError, TaskRepository, TaskStatus};
use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::Mutex;

/// Tasks shown by `/task_list` before the list is cut short.
pub const MAX_LISTED_TASKS: usize = 10;

const FOOTER: &str = "Task manager bot";
const UNASSIGNED: &str = "Unassigned";
const UNKNOWN_USER: &str = "Unknown user";
const NOT_SET: &str = "None";
const DATE_HINT: &str = "Use the YYYY-MM-DD format (e.g. 2023-12-31).";
const EDIT_DATE_HINT: &str = "Use the YYYY-MM-DD format, or 'none' to clear the due date.";

/// Handlers for the `/task_*` commands.
pub struct TaskCommands<'a, DISCORD: DiscordConnector> {
    tasks: &'a Mutex<TaskRepository>,
    discord_connector: &'a DISCORD,
}

impl<'a, DISCORD: DiscordConnector> TaskCommands<'a, DISCORD> {
    pub fn new(tasks: &'a Mutex<TaskRepository>, discord_connector: &'a DISCORD) -> Self {
        Self {
            tasks,
            discord_connector,
        }
    }

    /// `/task_add`: creates a task owned by the invoking user.
    pub async fn add(
        &self,
        title: String,
        description: Option<String>,
        due_date: Option<String>,
        assignee_id: Option<u64>,
    ) -> Result<(), Error> {
        let new_task = NewTask {
            title,
            description,
            due_date,
            assignee_id,
            creator_id: self.discord_connector.invoker_id(),
        };
        let created = self.tasks.lock().await.create(new_task);
        let task = match created {
            Ok(task) => task,
            Err(e) => return self.send_failure(&e, Some(DATE_HINT)).await,
        };

        let mut embed = Embed::new("✅ Task created!", Colour::Green)
            .description(id_line(&task))
            .field("Title", task.title(), false);
        if !task.description().is_empty() {
            embed = embed.field("Description", task.description(), false);
        }
        if let Some(due_date) = task.due_date() {
            embed = embed.field("Due date", due_date.to_string(), true);
        }
        if task.assignee_id().is_some() {
            embed = embed.field("Assignee", self.assignee_mention(&task).await, true);
        }
        let creator = self.user_mention(task.creator_id(), UNKNOWN_USER).await;
        let embed = embed
            .field("Creator", creator, true)
            .field("Status", task.status().to_string(), true)
            .footer(FOOTER);

        self.send(Reply::embed(embed)).await
    }

    /// `/task_list`: shows active tasks, at most [`MAX_LISTED_TASKS`] of them.
    pub async fn list(&self) -> Result<(), Error> {
        let active: Vec<Task> = self.tasks.lock().await.list_active().cloned().collect();
        if active.is_empty() {
            return self
                .send(Reply::text("There are no active tasks right now.").ephemeral())
                .await;
        }

        let mut embed = Embed::new("📋 Active tasks", Colour::Blue)
            .description("Tasks currently in progress.")
            .footer(format!("{} tasks in total", active.len()));
        for (index, task) in active.iter().enumerate() {
            if index >= MAX_LISTED_TASKS {
                embed = embed.field("...", "There are more tasks.", false);
                break;
            }
            let due_date = match task.due_date() {
                Some(due_date) => format!("Due: {}", due_date),
                None => "No due date".to_string(),
            };
            embed = embed.field(
                format!("ID: {} | {}", task.id(), task.title()),
                format!("Assignee: {} | {}", self.assignee_mention(task).await, due_date),
                false,
            );
        }

        self.send(Reply::embed(embed)).await
    }

    /// `/task_done`
    pub async fn done(&self, task_id: &str) -> Result<(), Error> {
        let completed = self.tasks.lock().await.complete(task_id);
        match completed {
            Ok(task) => {
                let embed = Embed::new("✅ Task completed!", Colour::Green)
                    .description(id_line(&task))
                    .field("Title", task.title(), false)
                    .field("New status", "Done", true)
                    .footer(FOOTER);
                self.send(Reply::embed(embed).ephemeral()).await
            }
            Err(e) => self.send_failure(&e, None).await,
        }
    }

    /// `/task_delete`
    pub async fn delete(&self, task_id: &str) -> Result<(), Error> {
        let deleted = self.tasks.lock().await.delete(task_id);
        match deleted {
            Ok(task) => {
                let embed = Embed::new("🗑️ Task deleted!", Colour::Red)
                    .description(id_line(&task))
                    .field("Title", task.title(), false)
                    .field("New status", "Deleted", true)
                    .footer(FOOTER);
                self.send(Reply::embed(embed).ephemeral()).await
            }
            Err(e) => self.send_failure(&e, None).await,
        }
    }

    /// `/task_edit`
    pub async fn edit(&self, task_id: &str, edit: TaskEdit) -> Result<(), Error> {
        let edited = self.tasks.lock().await.edit(task_id, edit);
        let task = match edited {
            Ok(task) => task,
            Err(e) => return self.send_failure(&e, Some(EDIT_DATE_HINT)).await,
        };

        let embed = Embed::new("✏️ Task updated!", Colour::Blue)
            .description(id_line(&task))
            .field("Title", task.title(), false)
            .field("Description", or_not_set(task.description()), false)
            .field("Due date", due_date_or_not_set(&task), true)
            .field("Assignee", self.assignee_mention(&task).await, true)
            .field("Status", task.status().to_string(), true)
            .footer(FOOTER);
        self.send(Reply::embed(embed).ephemeral()).await
    }

    /// `/task_detail`: shows every field of a task, whatever its status.
    pub async fn detail(&self, task_id: &str) -> Result<(), Error> {
        let found = self.tasks.lock().await.find(task_id).cloned();
        let Some(task) = found else {
            return self
                .send_failure(&TaskError::NotFound(task_id.to_string()), None)
                .await;
        };

        let colour = match task.status() {
            TaskStatus::Active => Colour::Green,
            TaskStatus::Done => Colour::LightGrey,
            TaskStatus::Deleted => Colour::Red,
        };
        let creator = self.user_mention(task.creator_id(), UNKNOWN_USER).await;
        let mut embed = Embed::new(format!("🔍 Task details: {}", task.title()), colour)
            .description(id_line(&task))
            .field("Title", task.title(), false)
            .field("Description", or_not_set(task.description()), false)
            .field("Status", capitalize(&task.status().to_string()), true)
            .field("Due date", due_date_or_not_set(&task), true)
            .field("Assignee", self.assignee_mention(&task).await, true)
            .field("Creator", creator, true)
            .field("Created at", format_timestamp(task.created_at()), false);
        if let Some(completed_at) = task.completed_at() {
            embed = embed.field("Completed at", format_timestamp(completed_at), false);
        }
        if let Some(deleted_at) = task.deleted_at() {
            embed = embed.field("Deleted at", format_timestamp(deleted_at), false);
        }

        self.send(Reply::embed(embed.footer(FOOTER))).await
    }

    async fn send(&self, reply: Reply) -> Result<(), Error> {
        self.discord_connector.send_reply(reply).await?;
        Ok(())
    }

    async fn send_failure(&self, error: &TaskError, date_hint: Option<&str>) -> Result<(), Error> {
        debug!("Task command failed: {}", error);
        self.send(Reply::text(failure_message(error, date_hint)).ephemeral())
            .await
    }

    async fn assignee_mention(&self, task: &Task) -> String {
        match task.assignee_id() {
            Some(assignee_id) => self.user_mention(assignee_id, UNASSIGNED).await,
            None => UNASSIGNED.to_string(),
        }
    }

    async fn user_mention(&self, user_id: u64, fallback: &str) -> String {
        self.discord_connector
            .user_mention(user_id)
            .await
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// User-facing text for a failed task command. `date_hint` follows an invalid due date.
fn failure_message(error: &TaskError, date_hint: Option<&str>) -> String {
    match error {
        TaskError::NotFound(_) => "Error: the specified task was not found.".to_string(),
        TaskError::AlreadyDone(_) => "Error: this task is already done.".to_string(),
        TaskError::AlreadyDeleted(_) => "Error: this task has already been deleted.".to_string(),
        TaskError::InvalidDate(_) => match date_hint {
            Some(hint) => format!("Error: invalid due date. {}", hint),
            None => "Error: invalid due date.".to_string(),
        },
        TaskError::Persistence(e) => {
            format!("Error: something went wrong while saving the task. {}", e)
        }
    }
}

fn id_line(task: &Task) -> String {
    format!("Task ID: `{}`", task.id())
}

fn or_not_set(value: &str) -> String {
    if value.is_empty() {
        NOT_SET.to_string()
    } else {
        value.to_string()
    }
}

fn due_date_or_not_set(task: &Task) -> String {
    task.due_date()
        .map(|due_date| due_date.to_string())
        .unwrap_or_else(|| NOT_SET.to_string())
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
