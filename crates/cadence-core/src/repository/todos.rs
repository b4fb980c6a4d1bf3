use crate::error::CoreError;
use crate::models::{NewTodoData, Todo, TodoFilter, TodoRow, UpdateTodoData};
use crate::repository::records::{validate_due_time, validate_title, TodoPatch};
use crate::repository::{MaterializationRepository, SqliteRepository};
use crate::timezone::{day_bounds, local_date};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[async_trait]
impl super::TodoRepository for SqliteRepository {
    async fn add_todo(&self, data: NewTodoData) -> Result<Todo, CoreError> {
        let user_id = self.require_user()?;
        validate_title(&data.title)?;
        if let Some(due_time) = &data.due_time {
            validate_due_time(due_time)?;
        }
        if let Some(project_id) = data.project_id {
            self.ensure_project_owned(project_id, user_id).await?;
        }
        self.ensure_tags_owned(&data.tag_ids, user_id).await?;

        let now = self.now();
        let todo = Todo {
            id: Uuid::now_v7(),
            user_id,
            title: data.title,
            description: data.description,
            completed: false,
            priority: data.priority.unwrap_or_default(),
            due_date: data.due_date,
            due_time: data.due_time,
            project_id: data.project_id,
            tag_ids: data.tag_ids,
            is_recurring: data.recurrence.is_some(),
            recurrence: data.recurrence,
            parent_template_id: None,
            original_due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.insert_todo(&todo).await?;

        if let (Some(rule), Some(due)) = (&todo.recurrence, todo.due_date) {
            if rule.paused {
                tracing::debug!(template_id = %todo.id, "recurrence paused, skipping materialization");
            } else {
                let max_count = rule
                    .max_occurrences
                    .map_or(self.config().default_max_instances, |max| max.get());
                let created = self
                    .materialize_instances(todo.id, due, rule, user_id, max_count, now)
                    .await?;
                tracing::info!(template_id = %todo.id, created, "materialized recurring instances");
            }
        }

        Ok(todo)
    }

    async fn find_todo_by_id(&self, id: Uuid) -> Result<Option<Todo>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(None);
        };
        Ok(self.fetch_todo(id).await?.filter(|todo| todo.user_id == user_id))
    }

    async fn find_todos_by_short_id(&self, short_id: &str) -> Result<Vec<Todo>, CoreError> {
        // Ids are stored as blobs, so matching happens on the hyphenated form.
        // The leading characters of a v7 id are a timestamp; tables show the tail.
        let needle = short_id.to_lowercase();
        let todos = self.find_todos(&TodoFilter::default()).await?;
        Ok(todos
            .into_iter()
            .filter(|todo| {
                let id = todo.id.to_string();
                id.starts_with(&needle) || id.ends_with(&needle)
            })
            .collect())
    }

    async fn find_todos(&self, filter: &TodoFilter) -> Result<Vec<Todo>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM todos WHERE user_id = ");
        qb.push_bind(user_id);
        if let Some(project_id) = filter.project_id {
            qb.push(" AND project_id = ").push_bind(project_id);
        }
        if let Some(completed) = filter.completed {
            qb.push(" AND completed = ").push_bind(completed);
        }
        if let Some(tag_id) = filter.tag_id {
            qb.push(" AND id IN (SELECT todo_id FROM todo_tags WHERE tag_id = ")
                .push_bind(tag_id)
                .push(")");
        }
        if filter.today {
            let tz = self.config().timezone;
            let (_, end_of_today) = day_bounds(&tz, local_date(&tz, self.now()));
            qb.push(" AND (due_date IS NULL OR due_date < ")
                .push_bind(end_of_today)
                .push(")");
        }
        qb.push(" ORDER BY created_at, id");

        let rows: Vec<TodoRow> = qb.build_query_as().fetch_all(self.pool()).await?;
        self.attach_tags(rows).await
    }

    async fn find_todos_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Todo>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };
        let rows: Vec<TodoRow> = sqlx::query_as(
            "SELECT * FROM todos WHERE user_id = ? AND due_date >= ? AND due_date <= ? ORDER BY due_date, id",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;
        self.attach_tags(rows).await
    }

    async fn update_todo(&self, id: Uuid, data: UpdateTodoData) -> Result<Todo, CoreError> {
        let user_id = self.require_user()?;
        let todo = self.fetch_owned_todo(id, user_id).await?;
        self.validate_fields(&data, user_id).await?;

        let now = self.now();
        let completed_at = match data.completed {
            Some(true) if !todo.completed => Some(Some(now)),
            Some(false) if todo.completed => Some(None),
            _ => None,
        };

        let patch = TodoPatch {
            completed_at,
            ..TodoPatch::fields(data)
        };
        if !self.patch_todo(id, patch, now).await? {
            return Err(CoreError::NotFound("Todo".to_string()));
        }

        self.fetch_owned_todo(id, user_id).await
    }

    async fn delete_todo(&self, id: Uuid) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        let todo = self.fetch_owned_todo(id, user_id).await?;

        if todo.is_template() {
            let removed = sqlx::query("DELETE FROM todos WHERE parent_template_id = ?")
                .bind(id)
                .execute(self.pool())
                .await?
                .rows_affected();
            tracing::debug!(template_id = %id, removed, "deleted instances with their template");
        }

        self.delete_todo_record(id).await?;
        Ok(())
    }
}
