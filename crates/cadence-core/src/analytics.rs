//! Dashboard statistics over a user's tasks.

use crate::models::{Project, Todo, TodoPriority};
use crate::timezone::{day_bounds, local_date};
use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

/// Days covered by the completion trend, today included.
pub const TREND_DAYS: u64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityStats {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStats {
    pub project_id: Uuid,
    pub project_name: String,
    pub project_color: String,
    pub total_todos: usize,
    pub completed_todos: usize,
    /// Percentage, unrounded
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCompletions {
    pub date: NaiveDate,
    pub completions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub total_todos: usize,
    pub completed_todos: usize,
    pub active_todos: usize,
    /// Percentage rounded to the nearest integer
    pub completion_rate: u32,
    pub priority_stats: PriorityStats,
    pub project_stats: Vec<ProjectStats>,
    /// Oldest day first
    pub weekly_trend: Vec<DailyCompletions>,
    pub overdue_todos: usize,
    pub today_todos: usize,
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Computes statistics for `todos` as of `now`, with day boundaries taken
/// in `timezone`.
pub fn compute(todos: &[Todo], projects: &[Project], now: DateTime<Utc>, timezone: &Tz) -> Analytics {
    let total_todos = todos.len();
    let completed_todos = todos.iter().filter(|t| t.completed).count();

    let mut priority_stats = PriorityStats::default();
    for todo in todos {
        match todo.priority {
            TodoPriority::High => priority_stats.high += 1,
            TodoPriority::Medium => priority_stats.medium += 1,
            TodoPriority::Low => priority_stats.low += 1,
        }
    }

    let project_stats = projects
        .iter()
        .map(|project| {
            let in_project: Vec<&Todo> = todos.iter().filter(|t| t.project_id == Some(project.id)).collect();
            let completed = in_project.iter().filter(|t| t.completed).count();
            ProjectStats {
                project_id: project.id,
                project_name: project.name.clone(),
                project_color: project.color.clone(),
                total_todos: in_project.len(),
                completed_todos: completed,
                completion_rate: percentage(completed, in_project.len()),
            }
        })
        .collect();

    let today = local_date(timezone, now);
    let weekly_trend = (0..TREND_DAYS)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|date| {
            let (start, end) = day_bounds(timezone, date);
            let completions = todos
                .iter()
                .filter(|t| t.completed)
                .filter(|t| t.completed_at.map_or(false, |at| at >= start && at < end))
                .count();
            DailyCompletions { date, completions }
        })
        .collect();

    let (today_start, today_end) = day_bounds(timezone, today);
    let overdue_todos = todos
        .iter()
        .filter(|t| !t.completed && t.due_date.map_or(false, |due| due < now))
        .count();
    let today_todos = todos
        .iter()
        .filter(|t| t.due_date.map_or(false, |due| due >= today_start && due < today_end))
        .count();

    Analytics {
        total_todos,
        completed_todos,
        active_todos: total_todos - completed_todos,
        completion_rate: percentage(completed_todos, total_todos).round() as u32,
        priority_stats,
        project_stats,
        weekly_trend,
        overdue_todos,
        today_todos,
    }
}
