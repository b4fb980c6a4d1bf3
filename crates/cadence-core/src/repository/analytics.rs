use crate::analytics::{self, Analytics};
use crate::error::CoreError;
use crate::models::{Project, TodoFilter};
use crate::repository::{SqliteRepository, TodoRepository};
use async_trait::async_trait;

#[async_trait]
impl super::AnalyticsRepository for SqliteRepository {
    /// `None` for anonymous callers.
    async fn analytics(&self) -> Result<Option<Analytics>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(None);
        };

        let todos = self.find_todos(&TodoFilter::default()).await?;
        // Archived projects keep their statistics
        let projects: Vec<Project> = sqlx::query_as("SELECT * FROM projects WHERE user_id = ? ORDER BY created_at, id")
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;

        Ok(Some(analytics::compute(&todos, &projects, self.now(), &self.config().timezone)))
    }
}
