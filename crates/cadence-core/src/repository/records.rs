//! Row-level helpers shared by the domain repositories. Nothing here checks
//! ownership; callers do that first.

use crate::error::CoreError;
use crate::models::{Todo, TodoRow, UpdateTodoData};
use crate::recurrence::RecurrenceRule;
use crate::repository::SqliteRepository;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

/// Keeps `IN (...)` lists well under SQLite's bind parameter limit.
const TAG_LOOKUP_CHUNK: usize = 500;

/// A column-level update of one todo row. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub(crate) struct TodoPatch {
    pub fields: UpdateTodoData,
    pub completed_at: Option<Option<DateTime<Utc>>>,
    pub is_recurring: Option<bool>,
    pub recurrence: Option<Option<RecurrenceRule>>,
    pub parent_template_id: Option<Option<Uuid>>,
}

impl TodoPatch {
    pub(crate) fn fields(fields: UpdateTodoData) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Turns an instance into a standalone task.
    pub(crate) fn detach() -> Self {
        Self {
            is_recurring: Some(false),
            parent_template_id: Some(None),
            ..Default::default()
        }
    }
}

impl SqliteRepository {
    pub(crate) async fn insert_todo(&self, todo: &Todo) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO todos (id, user_id, title, description, completed, priority, due_date, due_time, project_id, \
             is_recurring, recurrence, parent_template_id, original_due_date, completed_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(todo.id)
        .bind(todo.user_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.priority)
        .bind(todo.due_date)
        .bind(&todo.due_time)
        .bind(todo.project_id)
        .bind(todo.is_recurring)
        .bind(todo.recurrence.clone().map(Json))
        .bind(todo.parent_template_id)
        .bind(todo.original_due_date)
        .bind(todo.completed_at)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::write_tag_links(&mut tx, todo.id, &todo.tag_ids).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn write_tag_links(
        tx: &mut Transaction<'_, Sqlite>,
        todo_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), CoreError> {
        for (position, tag_id) in tag_ids.iter().enumerate() {
            sqlx::query("INSERT OR IGNORE INTO todo_tags (todo_id, tag_id, position) VALUES (?, ?, ?)")
                .bind(todo_id)
                .bind(tag_id)
                .bind(position as i64)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Applies a patch and bumps `updated_at`. Returns false when the row is gone.
    pub(crate) async fn patch_todo(&self, id: Uuid, patch: TodoPatch, now: DateTime<Utc>) -> Result<bool, CoreError> {
        let TodoPatch {
            fields,
            completed_at,
            is_recurring,
            recurrence,
            parent_template_id,
        } = patch;

        let mut tx = self.pool().begin().await?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE todos SET ");
        let mut set = qb.separated(", ");
        set.push("updated_at = ").push_bind_unseparated(now);

        if let Some(title) = fields.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(description) = fields.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(completed) = fields.completed {
            set.push("completed = ").push_bind_unseparated(completed);
        }
        if let Some(priority) = fields.priority {
            set.push("priority = ").push_bind_unseparated(priority);
        }
        if let Some(due_date) = fields.due_date {
            set.push("due_date = ").push_bind_unseparated(due_date);
        }
        if let Some(due_time) = fields.due_time {
            set.push("due_time = ").push_bind_unseparated(due_time);
        }
        if let Some(project_id) = fields.project_id {
            set.push("project_id = ").push_bind_unseparated(project_id);
        }
        if let Some(completed_at) = completed_at {
            set.push("completed_at = ").push_bind_unseparated(completed_at);
        }
        if let Some(is_recurring) = is_recurring {
            set.push("is_recurring = ").push_bind_unseparated(is_recurring);
        }
        if let Some(recurrence) = recurrence {
            set.push("recurrence = ").push_bind_unseparated(recurrence.map(Json));
        }
        if let Some(parent_template_id) = parent_template_id {
            set.push("parent_template_id = ").push_bind_unseparated(parent_template_id);
        }

        qb.push(" WHERE id = ").push_bind(id);
        let result = qb.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(tag_ids) = fields.tag_ids {
            sqlx::query("DELETE FROM todo_tags WHERE todo_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::write_tag_links(&mut tx, id, &tag_ids).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    pub(crate) async fn delete_todo_record(&self, id: Uuid) -> Result<bool, CoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Loads a todo regardless of owner.
    pub(crate) async fn fetch_todo(&self, id: Uuid) -> Result<Option<Todo>, CoreError> {
        let row: Option<TodoRow> = sqlx::query_as("SELECT * FROM todos WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Loads a todo owned by `user_id`.
    pub(crate) async fn fetch_owned_todo(&self, id: Uuid, user_id: Uuid) -> Result<Todo, CoreError> {
        match self.fetch_todo(id).await? {
            Some(todo) if todo.user_id == user_id => Ok(todo),
            _ => Err(CoreError::NotFound("Todo".to_string())),
        }
    }

    /// Loads a recurring template owned by `user_id`.
    pub(crate) async fn fetch_owned_template(&self, id: Uuid, user_id: Uuid) -> Result<Todo, CoreError> {
        match self.fetch_todo(id).await? {
            Some(todo) if todo.user_id == user_id && todo.is_template() => Ok(todo),
            _ => Err(CoreError::NotFound("Recurring task template".to_string())),
        }
    }

    /// Every instance generated from `template_id`, in creation order.
    pub(crate) async fn fetch_instances(&self, template_id: Uuid) -> Result<Vec<Todo>, CoreError> {
        let rows: Vec<TodoRow> =
            sqlx::query_as("SELECT * FROM todos WHERE parent_template_id = ? ORDER BY created_at, id")
                .bind(template_id)
                .fetch_all(self.pool())
                .await?;
        self.attach_tags(rows).await
    }

    /// Joins tag ids onto rows, preserving row order and tag positions.
    pub(crate) async fn attach_tags(&self, rows: Vec<TodoRow>) -> Result<Vec<Todo>, CoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for chunk in rows.chunks(TAG_LOOKUP_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT todo_id, tag_id FROM todo_tags WHERE todo_id IN (");
            let mut ids = qb.separated(", ");
            for row in chunk {
                ids.push_bind(row.id);
            }
            ids.push_unseparated(") ORDER BY todo_id, position");

            let pairs: Vec<(Uuid, Uuid)> = qb.build_query_as().fetch_all(self.pool()).await?;
            for (todo_id, tag_id) in pairs {
                links.entry(todo_id).or_default().push(tag_id);
            }
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tag_ids = links.remove(&row.id).unwrap_or_default();
                row.into_todo(tag_ids)
            })
            .collect())
    }

    /// Fails with `NotFound` unless the project exists and belongs to `user_id`.
    pub(crate) async fn ensure_project_owned(&self, project_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        let owned: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM projects WHERE id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        owned
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound("Project".to_string()))
    }

    pub(crate) async fn ensure_tags_owned(&self, tag_ids: &[Uuid], user_id: Uuid) -> Result<(), CoreError> {
        for tag_id in tag_ids {
            let owned: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ? AND user_id = ?")
                .bind(tag_id)
                .bind(user_id)
                .fetch_optional(self.pool())
                .await?;
            if owned.is_none() {
                return Err(CoreError::NotFound("Tag".to_string()));
            }
        }
        Ok(())
    }

    /// Shared checks for the editable task fields.
    pub(crate) async fn validate_fields(&self, fields: &UpdateTodoData, user_id: Uuid) -> Result<(), CoreError> {
        if let Some(title) = &fields.title {
            validate_title(title)?;
        }
        if let Some(Some(due_time)) = &fields.due_time {
            validate_due_time(due_time)?;
        }
        if let Some(Some(project_id)) = fields.project_id {
            self.ensure_project_owned(project_id, user_id).await?;
        }
        if let Some(tag_ids) = &fields.tag_ids {
            self.ensure_tags_owned(tag_ids, user_id).await?;
        }
        Ok(())
    }
}

pub(crate) fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::InvalidInput("Title cannot be empty".to_string()));
    }
    Ok(())
}

/// Due times are 24-hour `HH:MM`.
pub(crate) fn validate_due_time(due_time: &str) -> Result<(), CoreError> {
    chrono::NaiveTime::parse_from_str(due_time, "%H:%M")
        .ok()
        .filter(|_| due_time.len() == 5)
        .map(|_| ())
        .ok_or_else(|| CoreError::InvalidInput(format!("Invalid due time '{}', expected HH:MM", due_time)))
}
