use anyhow::Result;
use cadence_core::models::UpdateTodoData;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::DoCommand;
use crate::util::resolve_todo_id;

pub async fn do_todo(repo: &impl Repository, command: DoCommand) -> Result<()> {
    let todo_id = resolve_todo_id(repo, &command.id).await?;
    let todo = repo
        .update_todo(
            todo_id,
            UpdateTodoData {
                completed: Some(true),
                ..Default::default()
            },
        )
        .await?;

    println!("{} Completed task: '{}'", "✓".green().bold(), todo.title);
    Ok(())
}
