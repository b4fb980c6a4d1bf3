use anyhow::Result;
use cadence_core::models::{Todo, TodoFilter};
use cadence_core::repository::Repository;
use chrono_tz::Tz;

use crate::cli::ListCommand;
use crate::util::{resolve_project_id, resolve_tag_id};
use crate::views::table::{display_todos, ViewTodo};

pub async fn list_todos(repo: &impl Repository, command: ListCommand, timezone: &Tz) -> Result<()> {
    let project_id = match &command.project {
        Some(name) => Some(resolve_project_id(repo, name).await?),
        None => None,
    };
    let tag_id = match &command.tag {
        Some(name) => Some(resolve_tag_id(repo, name).await?),
        None => None,
    };
    let completed = if command.completed {
        Some(true)
    } else if command.pending {
        Some(false)
    } else {
        None
    };

    let filter = TodoFilter {
        project_id,
        tag_id,
        completed,
        today: command.today,
    };
    let todos = repo.find_todos(&filter).await?;
    display_todos(&view_todos(repo, todos).await?, timezone);
    Ok(())
}

/// Attach project and tag names for display.
pub async fn view_todos(repo: &impl Repository, todos: Vec<Todo>) -> Result<Vec<ViewTodo>> {
    let projects = repo.find_projects().await?;
    let tags = repo.find_tags().await?;
    Ok(todos
        .into_iter()
        .map(|todo| ViewTodo::new(todo, &projects, &tags))
        .collect())
}
