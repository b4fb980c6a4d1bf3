use anyhow::{anyhow, Result};
use cadence_core::db::DbPool;
use cadence_core::error::CoreError;
use cadence_core::identity::StaticIdentity;
use cadence_core::models::NewTagData;
use cadence_core::recurrence::MaterializationConfig;
use cadence_core::repository::{Repository, SqliteRepository, UserRepository};
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_TAG_COLOR: &str = "#6b7280";

/// Repository acting as `user_name`, creating the user on first use.
pub async fn open_session(pool: DbPool, user_name: &str, config: MaterializationConfig) -> Result<SqliteRepository> {
    let setup = SqliteRepository::new(pool, Arc::new(StaticIdentity::anonymous()), config);
    let user = match setup.find_user_by_name(user_name).await? {
        Some(user) => user,
        None => {
            tracing::info!(user = user_name, "creating user");
            setup.add_user(user_name).await?
        }
    };
    Ok(setup.for_identity(Arc::new(StaticIdentity::user(user.id))))
}

pub async fn resolve_todo_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let todos = repo.find_todos_by_short_id(short_id).await?;
    if todos.len() == 1 {
        Ok(todos[0].id)
    } else if todos.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "Task with ID '{}'",
            short_id
        ))))
    } else {
        let todo_info: Vec<(String, String)> = todos
            .into_iter()
            .map(|t| (t.id.to_string(), t.title))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(todo_info)))
    }
}

pub async fn resolve_project_id(repo: &impl Repository, name: &str) -> Result<Uuid> {
    repo.find_project_by_name(name)
        .await?
        .map(|project| project.id)
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Project '{}'", name))))
}

/// Tag ids for `names`, creating tags that do not exist yet.
pub async fn resolve_or_create_tags(repo: &impl Repository, names: &[String]) -> Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let tag = match repo.find_tag_by_name(name).await? {
            Some(tag) => tag,
            None => {
                repo.add_tag(NewTagData {
                    name: name.clone(),
                    color: DEFAULT_TAG_COLOR.to_string(),
                })
                .await?
            }
        };
        if !ids.contains(&tag.id) {
            ids.push(tag.id);
        }
    }
    Ok(ids)
}

pub async fn resolve_tag_id(repo: &impl Repository, name: &str) -> Result<Uuid> {
    repo.find_tag_by_name(name)
        .await?
        .map(|tag| tag.id)
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Tag '{}'", name))))
}

/// The random tail of an id, as shown in tables.
pub fn short_id(id: Uuid) -> String {
    let id = id.to_string();
    id[id.len() - 8..].to_string()
}
