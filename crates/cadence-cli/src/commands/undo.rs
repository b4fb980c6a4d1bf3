use anyhow::Result;
use cadence_core::models::UpdateTodoData;
use cadence_core::repository::Repository;

use crate::cli::UndoCommand;
use crate::util::resolve_todo_id;

pub async fn undo_todo(repo: &impl Repository, command: UndoCommand) -> Result<()> {
    let todo_id = resolve_todo_id(repo, &command.id).await?;
    let todo = repo
        .update_todo(
            todo_id,
            UpdateTodoData {
                completed: Some(false),
                ..Default::default()
            },
        )
        .await?;

    println!("Reopened task: '{}'", todo.title);
    Ok(())
}
