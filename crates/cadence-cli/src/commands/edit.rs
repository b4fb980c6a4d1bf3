use anyhow::{anyhow, Result};
use cadence_core::models::UpdateTodoData;
use cadence_core::repository::Repository;
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::cli::EditCommand;
use crate::parser::{apply_time_of_day, parse_due_date, parse_time_of_day};
use crate::util::{resolve_or_create_tags, resolve_project_id, resolve_tag_id, resolve_todo_id};

pub async fn edit_todo(repo: &impl Repository, command: EditCommand, timezone: &Tz) -> Result<()> {
    let todo_id = resolve_todo_id(repo, &command.id).await?;
    let todo = repo
        .find_todo_by_id(todo_id)
        .await?
        .ok_or_else(|| anyhow!("Task not found"))?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.map(Some)
    };

    let due_time = if command.at_clear {
        Some(None)
    } else {
        command.at.as_deref().map(parse_time_of_day).transpose()?.map(Some)
    };

    let mut due_date = if command.due_clear {
        Some(None)
    } else {
        command
            .due
            .as_deref()
            .map(|due| parse_due_date(due, timezone))
            .transpose()?
            .map(Some)
    };
    // A new time of day moves the (new or current) due date onto it.
    if let Some(Some(time)) = &due_time {
        let base = match due_date {
            Some(due) => due,
            None => todo.due_date,
        };
        if let Some(due) = base {
            due_date = Some(Some(apply_time_of_day(due, time, timezone)?));
        }
    }

    let project_id = if command.project_clear {
        Some(None)
    } else {
        match &command.project {
            Some(name) => Some(Some(resolve_project_id(repo, name).await?)),
            None => None,
        }
    };

    let tag_ids = if command.add_tag.is_empty() && command.remove_tag.is_empty() {
        None
    } else {
        let mut tag_ids = todo.tag_ids.clone();
        for id in resolve_or_create_tags(repo, &command.add_tag).await? {
            if !tag_ids.contains(&id) {
                tag_ids.push(id);
            }
        }
        for name in &command.remove_tag {
            let id = resolve_tag_id(repo, name).await?;
            tag_ids.retain(|tag_id| *tag_id != id);
        }
        Some(tag_ids)
    };

    let update = UpdateTodoData {
        title: command.title,
        description,
        priority: command.priority,
        due_date,
        due_time,
        project_id,
        tag_ids,
        ..Default::default()
    };
    if update.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }

    let updated = repo.update_todo(todo_id, update).await?;
    println!("Updated task: '{}'", updated.title);
    if updated.is_template() {
        println!(
            "{}",
            "Only the template changed. Use 'cadence recur edit --update-future' to update its instances.".bright_black()
        );
    }
    Ok(())
}
