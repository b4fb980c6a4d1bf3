use anyhow::{anyhow, Result};
use cadence_core::repository::Repository;
use dialoguer::Confirm;

use crate::cli::DeleteCommand;
use crate::util::resolve_todo_id;

pub async fn delete_todo(repo: &impl Repository, command: DeleteCommand) -> Result<()> {
    let todo_id = resolve_todo_id(repo, &command.id).await?;
    let todo = repo
        .find_todo_by_id(todo_id)
        .await?
        .ok_or_else(|| anyhow!("Task not found"))?;

    if !command.force {
        let prompt = if todo.is_template() {
            format!(
                "Are you sure you want to delete recurring task '{}' and all its instances?",
                todo.title
            )
        } else {
            format!("Are you sure you want to delete task '{}'?", todo.title)
        };
        let confirmation = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    repo.delete_todo(todo_id).await?;
    println!("Deleted task: '{}'", todo.title);
    Ok(())
}
