use anyhow::Result;
use cadence_core::models::NewTodoData;
use cadence_core::repository::Repository;
use chrono::Utc;
use chrono_tz::Tz;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::parser::{apply_time_of_day, build_rule, describe_rule, parse_due_date, parse_time_of_day};
use crate::timezone::format_local;
use crate::util::{resolve_or_create_tags, resolve_project_id, short_id};

pub async fn add_todo(repo: &impl Repository, command: AddCommand, timezone: &Tz) -> Result<()> {
    let rule = build_rule(&command.recurrence, timezone)?.map(|rule| rule.with_paused(command.paused));
    let due_time = command.at.as_deref().map(parse_time_of_day).transpose()?;

    let mut due_date = command.due.as_deref().map(|due| parse_due_date(due, timezone)).transpose()?;
    if due_date.is_none() && (rule.is_some() || due_time.is_some()) {
        // Recurring tasks and timed tasks start today.
        due_date = Some(Utc::now());
    }
    if let (Some(due), Some(time)) = (due_date, &due_time) {
        due_date = Some(apply_time_of_day(due, time, timezone)?);
    }

    let project_id = match &command.project {
        Some(name) => Some(resolve_project_id(repo, name).await?),
        None => None,
    };
    let tag_ids = resolve_or_create_tags(repo, &command.tag).await?;

    let todo = repo
        .add_todo(NewTodoData {
            title: command.title,
            description: command.description,
            priority: command.priority,
            due_date,
            due_time,
            project_id,
            tag_ids,
            recurrence: rule,
        })
        .await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();

    match &todo.recurrence {
        Some(rule) => {
            let instances = repo.find_template_instances(todo.id).await?;
            println!(
                "{} Created recurring task: {}",
                "✓".style(success_style),
                todo.title.bright_white().bold()
            );
            println!("  {} Task ID: {}", "→".style(info_style), short_id(todo.id).yellow());
            println!("  {} Repeats {}", "→".style(info_style), describe_rule(rule).cyan());
            if rule.paused {
                println!("  {} Paused, no instances generated", "→".style(info_style));
            } else {
                println!("  {} Generated {} instances", "→".style(info_style), instances.len());
            }
            if let Some(first) = instances.first().and_then(|instance| instance.due_date) {
                println!("  {} First due: {}", "→".style(info_style), format_local(first, timezone).cyan());
            }
        }
        None => {
            println!(
                "{} Created task: {}",
                "✓".style(success_style),
                todo.title.bright_white().bold()
            );
            println!("  {} Task ID: {}", "→".style(info_style), short_id(todo.id).yellow());
            if let Some(due) = todo.due_date {
                println!("  {} Due: {}", "→".style(info_style), format_local(due, timezone).cyan());
            }
        }
    }
    Ok(())
}
