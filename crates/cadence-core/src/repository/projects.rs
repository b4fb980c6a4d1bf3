use crate::error::CoreError;
use crate::models::{NewProjectData, Project, UpdateProjectData};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

impl SqliteRepository {
    async fn fetch_owned_project(&self, id: Uuid, user_id: Uuid) -> Result<Project, CoreError> {
        let project: Option<Project> = sqlx::query_as("SELECT * FROM projects WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        project.ok_or_else(|| CoreError::NotFound("Project".to_string()))
    }

    /// Archived projects still hold their name.
    async fn project_name_taken(&self, user_id: Uuid, name: &str, except: Option<Uuid>) -> Result<bool, CoreError> {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM projects WHERE user_id = ? AND name = ?")
            .bind(user_id)
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        Ok(existing.map_or(false, |(id,)| Some(id) != except))
    }
}

#[async_trait]
impl super::ProjectRepository for SqliteRepository {
    async fn add_project(&self, data: NewProjectData) -> Result<Project, CoreError> {
        let user_id = self.require_user()?;
        let name = data.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("Project name cannot be empty".to_string()));
        }
        if self.project_name_taken(user_id, &name, None).await? {
            return Err(CoreError::DuplicateName { kind: "Project", name });
        }

        let project = sqlx::query_as(
            r#"INSERT INTO projects (id, user_id, name, color, description, is_archived, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(name)
        .bind(data.color)
        .bind(data.description)
        .bind(self.now())
        .fetch_one(self.pool())
        .await?;

        Ok(project)
    }

    async fn find_projects(&self) -> Result<Vec<Project>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };
        let projects = sqlx::query_as(
            "SELECT * FROM projects WHERE user_id = ? AND is_archived = 0 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(projects)
    }

    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(None);
        };
        let project = sqlx::query_as("SELECT * FROM projects WHERE user_id = ? AND name = ? AND is_archived = 0")
            .bind(user_id)
            .bind(name.trim())
            .fetch_optional(self.pool())
            .await?;
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, data: UpdateProjectData) -> Result<Project, CoreError> {
        let user_id = self.require_user()?;
        self.fetch_owned_project(id, user_id).await?;

        let name = data.name.map(|name| name.trim().to_string());
        if let Some(name) = &name {
            if name.is_empty() {
                return Err(CoreError::InvalidInput("Project name cannot be empty".to_string()));
            }
            if self.project_name_taken(user_id, name, Some(id)).await? {
                return Err(CoreError::DuplicateName { kind: "Project", name: name.clone() });
            }
        }

        if name.is_some() || data.color.is_some() || data.description.is_some() {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE projects SET ");
            let mut set = qb.separated(", ");
            if let Some(name) = name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(color) = data.color {
                set.push("color = ").push_bind_unseparated(color);
            }
            if let Some(description) = data.description {
                set.push("description = ").push_bind_unseparated(description);
            }
            qb.push(" WHERE id = ").push_bind(id);
            qb.build().execute(self.pool()).await?;
        }

        self.fetch_owned_project(id, user_id).await
    }

    async fn archive_project(&self, id: Uuid) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        self.fetch_owned_project(id, user_id).await?;

        sqlx::query("UPDATE projects SET is_archived = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
