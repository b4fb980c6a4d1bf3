use crate::error::CoreError;
use crate::models::User;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl super::UserRepository for SqliteRepository {
    async fn add_user(&self, name: &str) -> Result<User, CoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::InvalidInput("User name cannot be empty".to_string()));
        }
        if self.find_user_by_name(name).await?.is_some() {
            return Err(CoreError::DuplicateName {
                kind: "User",
                name: name.to_string(),
            });
        }

        let user = sqlx::query_as("INSERT INTO users (id, name, created_at) VALUES (?, ?, ?) RETURNING *")
            .bind(Uuid::now_v7())
            .bind(name)
            .bind(self.now())
            .fetch_one(self.pool())
            .await?;
        tracing::debug!(name, "user created");
        Ok(user)
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, CoreError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE name = ?")
            .bind(name.trim())
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }
}
