use anyhow::{anyhow, Result};
use cadence_core::repository::Repository;
use cadence_core::timezone::{day_bounds, local_date};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::cli::CalendarCommand;
use crate::parser::parse_due_date;
use crate::util::short_id;

pub async fn show_calendar(repo: &impl Repository, command: CalendarCommand, timezone: &Tz) -> Result<()> {
    if command.days == 0 {
        return Err(anyhow!("--days must be at least 1"));
    }
    let from = match &command.from {
        Some(from) => parse_due_date(from, timezone)?,
        None => Utc::now(),
    };
    let first_day = local_date(timezone, from);
    let last_day = first_day + Duration::days(i64::from(command.days) - 1);

    let (start, _) = day_bounds(timezone, first_day);
    let (_, end) = day_bounds(timezone, last_day);
    let todos = repo.find_todos_in_range(start, end - Duration::seconds(1)).await?;

    let today = local_date(timezone, Utc::now());
    for day in first_day.iter_days().take(command.days as usize) {
        let heading = day.format("%a %Y-%m-%d").to_string();
        if day == today {
            println!("{} {}", heading.bold().yellow(), "(today)".yellow());
        } else {
            println!("{}", heading.bold());
        }

        let mut any = false;
        for todo in todos
            .iter()
            .filter(|todo| todo.due_date.map(|due| local_date(timezone, due)) == Some(day))
        {
            any = true;
            let time = todo
                .due_date
                .map(|due| due.with_timezone(timezone).format("%H:%M").to_string())
                .unwrap_or_default();
            let marker = if todo.completed { "[x]" } else { "[ ]" };
            let line = format!("{} {} {}", marker, time, todo.title);
            if todo.completed {
                println!("  {} {}", line.bright_black(), short_id(todo.id).bright_black());
            } else if todo.is_instance() {
                println!("  {} {} {}", line, "↻".cyan(), short_id(todo.id).yellow());
            } else {
                println!("  {} {}", line, short_id(todo.id).yellow());
            }
        }
        if !any {
            println!("  {}", "-".bright_black());
        }
    }
    Ok(())
}
