use crate::error::CoreError;
use crate::models::{NewTagData, Tag, UpdateTagData};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

impl SqliteRepository {
    async fn fetch_owned_tag(&self, id: Uuid, user_id: Uuid) -> Result<Tag, CoreError> {
        let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        tag.ok_or_else(|| CoreError::NotFound("Tag".to_string()))
    }

    async fn tag_name_taken(&self, user_id: Uuid, name: &str, except: Option<Uuid>) -> Result<bool, CoreError> {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE user_id = ? AND name = ?")
            .bind(user_id)
            .bind(name)
            .fetch_optional(self.pool())
            .await?;
        Ok(existing.map_or(false, |(id,)| Some(id) != except))
    }
}

#[async_trait]
impl super::TagRepository for SqliteRepository {
    async fn add_tag(&self, data: NewTagData) -> Result<Tag, CoreError> {
        let user_id = self.require_user()?;
        let name = data.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("Tag name cannot be empty".to_string()));
        }
        if self.tag_name_taken(user_id, &name, None).await? {
            return Err(CoreError::DuplicateName { kind: "Tag", name });
        }

        let tag = sqlx::query_as(
            r#"INSERT INTO tags (id, user_id, name, color, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(name)
        .bind(data.color)
        .bind(self.now())
        .fetch_one(self.pool())
        .await?;

        Ok(tag)
    }

    async fn find_tags(&self) -> Result<Vec<Tag>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };
        let tags = sqlx::query_as("SELECT * FROM tags WHERE user_id = ? ORDER BY name")
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(tags)
    }

    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(None);
        };
        let tag = sqlx::query_as("SELECT * FROM tags WHERE user_id = ? AND name = ?")
            .bind(user_id)
            .bind(name.trim())
            .fetch_optional(self.pool())
            .await?;
        Ok(tag)
    }

    async fn update_tag(&self, id: Uuid, data: UpdateTagData) -> Result<Tag, CoreError> {
        let user_id = self.require_user()?;
        self.fetch_owned_tag(id, user_id).await?;

        let name = data.name.map(|name| name.trim().to_string());
        if let Some(name) = &name {
            if name.is_empty() {
                return Err(CoreError::InvalidInput("Tag name cannot be empty".to_string()));
            }
            if self.tag_name_taken(user_id, name, Some(id)).await? {
                return Err(CoreError::DuplicateName { kind: "Tag", name: name.clone() });
            }
        }

        if name.is_some() || data.color.is_some() {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tags SET ");
            let mut set = qb.separated(", ");
            if let Some(name) = name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(color) = data.color {
                set.push("color = ").push_bind_unseparated(color);
            }
            qb.push(" WHERE id = ").push_bind(id);
            qb.build().execute(self.pool()).await?;
        }

        self.fetch_owned_tag(id, user_id).await
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), CoreError> {
        let user_id = self.require_user()?;
        self.fetch_owned_tag(id, user_id).await?;

        // todo_tags rows go with it
        sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
