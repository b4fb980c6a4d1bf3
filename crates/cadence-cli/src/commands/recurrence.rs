use anyhow::Result;
use cadence_core::models::TemplateUpdate;
use cadence_core::recurrence::{ReconcileFlags, ReconcilePlan};
use cadence_core::repository::Repository;
use chrono_tz::Tz;
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use uuid::Uuid;

use crate::cli::{
    RecurrenceCommand, RecurrenceDeleteCommand, RecurrenceEditCommand, RecurrenceIdCommand, RecurrenceMoreCommand,
    RecurrenceSubcommand,
};
use crate::commands::list::view_todos;
use crate::parser::{build_rule, describe_rule, parse_time_of_day};
use crate::util::{resolve_or_create_tags, resolve_project_id, resolve_todo_id};
use crate::views::table::{display_templates, display_todos};

pub async fn recurrence_command<R: Repository>(
    repository: &R,
    command: RecurrenceCommand,
    timezone: &Tz,
) -> Result<()> {
    match command.command {
        RecurrenceSubcommand::List => list_command(repository, timezone).await,
        RecurrenceSubcommand::Instances(cmd) => instances_command(repository, cmd, timezone).await,
        RecurrenceSubcommand::Edit(cmd) => edit_command(repository, cmd, timezone).await,
        RecurrenceSubcommand::Delete(cmd) => delete_command(repository, cmd).await,
        RecurrenceSubcommand::Pause(cmd) => pause_command(repository, cmd, true).await,
        RecurrenceSubcommand::Resume(cmd) => pause_command(repository, cmd, false).await,
        RecurrenceSubcommand::More(cmd) => more_command(repository, cmd).await,
    }
}

/// Template id for a short id; an instance id resolves to its template.
async fn resolve_template_id<R: Repository>(repository: &R, short_id: &str) -> Result<Uuid> {
    let id = resolve_todo_id(repository, short_id).await?;
    let parent = repository
        .find_todo_by_id(id)
        .await?
        .and_then(|todo| todo.parent_template_id);
    Ok(parent.unwrap_or(id))
}

async fn list_command<R: Repository>(repository: &R, timezone: &Tz) -> Result<()> {
    let summaries = repository.list_recurring_templates().await?;
    display_templates(&summaries, timezone);
    Ok(())
}

async fn instances_command<R: Repository>(repository: &R, command: RecurrenceIdCommand, timezone: &Tz) -> Result<()> {
    let template_id = resolve_template_id(repository, &command.id).await?;
    let instances = repository.find_template_instances(template_id).await?;
    display_todos(&view_todos(repository, instances).await?, timezone);
    Ok(())
}

async fn edit_command<R: Repository>(repository: &R, command: RecurrenceEditCommand, timezone: &Tz) -> Result<()> {
    let template_id = resolve_template_id(repository, &command.id).await?;

    let description = if command.description_clear {
        Some(None)
    } else {
        command.description.map(Some)
    };
    let project_id = if command.project_clear {
        Some(None)
    } else {
        match &command.project {
            Some(name) => Some(Some(resolve_project_id(repository, name).await?)),
            None => None,
        }
    };
    let tag_ids = if command.tag.is_empty() {
        None
    } else {
        Some(resolve_or_create_tags(repository, &command.tag).await?)
    };

    let update = TemplateUpdate {
        title: command.title,
        description,
        priority: command.priority,
        due_time: command.at.as_deref().map(parse_time_of_day).transpose()?.map(Some),
        project_id,
        tag_ids,
        recurrence: build_rule(&command.recurrence, timezone)?,
    };
    let flags = ReconcileFlags {
        update_future_instances: command.update_future,
        regenerate_instances: command.regenerate,
    };

    let outcome = repository
        .update_recurring_template(template_id, update, flags)
        .await?;

    println!("{} Updated recurring task", "✓".green().bold());
    match outcome.plan {
        ReconcilePlan::Regenerate => println!(
            "  Replaced {} future instances with {} new ones",
            outcome.deleted, outcome.generated
        ),
        ReconcilePlan::PatchFuture => println!("  Updated {} future instances", outcome.patched),
        ReconcilePlan::TemplateOnly if outcome.pattern_changed => println!(
            "  {}",
            "Schedule changed; existing instances were kept. Pass --regenerate to replace them.".yellow()
        ),
        ReconcilePlan::TemplateOnly => println!("  Existing instances were left unchanged"),
    }
    Ok(())
}

async fn delete_command<R: Repository>(repository: &R, command: RecurrenceDeleteCommand) -> Result<()> {
    let template_id = resolve_template_id(repository, &command.id).await?;

    if !command.force {
        let prompt = if command.all {
            "Delete this recurring task and all of its instances?"
        } else {
            "Delete this recurring task and its future instances? Past instances are kept."
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

    let outcome = repository
        .delete_recurring_template(template_id, command.all)
        .await?;
    println!(
        "Deleted recurring task ({} instances removed, {} kept as standalone tasks)",
        outcome.deleted_instances, outcome.detached_instances
    );
    Ok(())
}

async fn pause_command<R: Repository>(repository: &R, command: RecurrenceIdCommand, paused: bool) -> Result<()> {
    let template_id = resolve_template_id(repository, &command.id).await?;
    let template = repository.set_template_paused(template_id, paused).await?;
    let verb = if paused { "Paused" } else { "Resumed" };
    match &template.recurrence {
        Some(rule) => println!("{} '{}': {}", verb, template.title, describe_rule(rule)),
        None => println!("{} '{}'", verb, template.title),
    }
    Ok(())
}

async fn more_command<R: Repository>(repository: &R, command: RecurrenceMoreCommand) -> Result<()> {
    let template_id = resolve_template_id(repository, &command.id).await?;
    let created = repository
        .generate_more_instances(template_id, command.count)
        .await?;
    println!("Generated {} more instances", created);
    Ok(())
}
