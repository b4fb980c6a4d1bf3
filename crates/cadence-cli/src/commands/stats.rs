use anyhow::Result;
use cadence_core::repository::Repository;
use comfy_table::{Cell, Color, Table};
use owo_colors::OwoColorize;

pub async fn show_stats(repo: &impl Repository) -> Result<()> {
    let Some(analytics) = repo.analytics().await? else {
        println!("No statistics available.");
        return Ok(());
    };

    println!("{}", "Overview".blue().bold());
    let mut overview = Table::new();
    overview.set_header(vec!["Total", "Completed", "Active", "Completion", "Overdue", "Due Today"]);
    overview.add_row(vec![
        Cell::new(analytics.total_todos),
        Cell::new(analytics.completed_todos).fg(Color::Green),
        Cell::new(analytics.active_todos),
        Cell::new(format!("{}%", analytics.completion_rate)),
        Cell::new(analytics.overdue_todos).fg(Color::Red),
        Cell::new(analytics.today_todos).fg(Color::Yellow),
    ]);
    println!("{overview}");

    println!("{}", "By priority".blue().bold());
    let mut priorities = Table::new();
    priorities.set_header(vec!["High", "Medium", "Low"]);
    priorities.add_row(vec![
        Cell::new(analytics.priority_stats.high).fg(Color::Red),
        Cell::new(analytics.priority_stats.medium).fg(Color::Yellow),
        Cell::new(analytics.priority_stats.low).fg(Color::Green),
    ]);
    println!("{priorities}");

    if !analytics.project_stats.is_empty() {
        println!("{}", "Projects".blue().bold());
        let mut projects = Table::new();
        projects.set_header(vec!["Project", "Tasks", "Completed", "Completion"]);
        for stats in &analytics.project_stats {
            projects.add_row(vec![
                Cell::new(&stats.project_name),
                Cell::new(stats.total_todos),
                Cell::new(stats.completed_todos),
                Cell::new(format!("{:.0}%", stats.completion_rate)),
            ]);
        }
        println!("{projects}");
    }

    println!("{}", "Completed in the last week".blue().bold());
    for day in &analytics.weekly_trend {
        println!(
            "  {}  {:>3} {}",
            day.date.format("%a %m-%d"),
            day.completions,
            "■".repeat(day.completions).green()
        );
    }
    Ok(())
}
