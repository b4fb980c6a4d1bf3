use cadence_core::models::{Project, Tag, TemplateSummary, Todo, TodoPriority};
use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use std::collections::HashMap;
use uuid::Uuid;

use crate::parser::describe_rule;
use crate::timezone::format_local;
use crate::util::short_id;

#[derive(Debug, Clone)]
pub struct ViewTodo {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_name: Option<String>,
    pub tags: Vec<String>,
    pub is_template: bool,
    pub is_instance: bool,
}

impl ViewTodo {
    /// Resolves project and tag names from the given lookups.
    pub fn new(todo: Todo, projects: &[Project], tags: &[Tag]) -> Self {
        let tag_names: HashMap<Uuid, &str> = tags.iter().map(|tag| (tag.id, tag.name.as_str())).collect();
        Self {
            id: todo.id,
            is_template: todo.is_template(),
            is_instance: todo.is_instance(),
            project_name: todo.project_id.and_then(|project_id| {
                projects
                    .iter()
                    .find(|project| project.id == project_id)
                    .map(|project| project.name.clone())
            }),
            tags: todo
                .tag_ids
                .iter()
                .filter_map(|id| tag_names.get(id).map(|name| name.to_string()))
                .collect(),
            title: todo.title,
            completed: todo.completed,
            priority: todo.priority,
            due_date: todo.due_date,
        }
    }
}

pub fn display_todos(todos: &[ViewTodo], timezone: &Tz) {
    if todos.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Status", "Priority", "Due", "Project", "Tags"]);

    let now = Utc::now();
    for todo in todos {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(todo.id)));

        let mut display_title = String::new();
        if todo.is_template || todo.is_instance {
            display_title.push_str("↻ ");
        }
        display_title.push_str(&todo.title);
        if todo.is_template {
            display_title.push_str(" (Template)");
        }

        let title_cell = if todo.completed {
            Cell::new(display_title)
                .add_attribute(Attribute::CrossedOut)
                .fg(Color::DarkGrey)
        } else {
            match todo.priority {
                TodoPriority::High => Cell::new(display_title).fg(Color::Red).add_attribute(Attribute::Bold),
                TodoPriority::Medium => Cell::new(display_title),
                TodoPriority::Low => Cell::new(display_title).fg(Color::DarkGrey),
            }
        };
        row.add_cell(title_cell);

        row.add_cell(if todo.completed {
            Cell::new("Done").fg(Color::Green)
        } else {
            Cell::new("Pending")
        });

        row.add_cell(match todo.priority {
            TodoPriority::High => Cell::new("high").fg(Color::Red),
            TodoPriority::Medium => Cell::new("medium").fg(Color::Yellow),
            TodoPriority::Low => Cell::new("low").fg(Color::Green),
        });

        let due_cell = match todo.due_date {
            Some(due) => {
                let text = format!("{} ({})", format_local(due, timezone), due.humanize());
                if todo.completed {
                    Cell::new(text)
                } else if due < now {
                    Cell::new(text).fg(Color::Red)
                } else if due.with_timezone(timezone).date_naive() == now.with_timezone(timezone).date_naive() {
                    Cell::new(text).fg(Color::Yellow)
                } else {
                    Cell::new(text)
                }
            }
            None => Cell::new("-"),
        };
        row.add_cell(due_cell);

        row.add_cell(Cell::new(todo.project_name.as_deref().unwrap_or("-")));
        row.add_cell(Cell::new(if todo.tags.is_empty() {
            "-".to_string()
        } else {
            todo.tags.join(", ")
        }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("No projects found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Color", "Description", "Created"]);

    for project in projects {
        let mut row = Row::new();
        row.add_cell(Cell::new(&project.name).add_attribute(Attribute::Bold));
        row.add_cell(Cell::new(&project.color));
        row.add_cell(Cell::new(project.description.as_deref().unwrap_or("-")));
        row.add_cell(Cell::new(project.created_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_tags(tags: &[Tag]) {
    if tags.is_empty() {
        println!("No tags found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Color", "Created"]);

    for tag in tags {
        let mut row = Row::new();
        row.add_cell(Cell::new(&tag.name));
        row.add_cell(Cell::new(&tag.color));
        row.add_cell(Cell::new(tag.created_at.humanize()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_templates(summaries: &[TemplateSummary], timezone: &Tz) {
    if summaries.is_empty() {
        println!("No recurring tasks found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Repeats", "Instances", "Completed", "Next Due"]);

    for summary in summaries {
        let template = &summary.template;
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(template.id)));
        row.add_cell(Cell::new(&template.title).add_attribute(Attribute::Bold));

        let repeats = template
            .recurrence
            .as_ref()
            .map_or_else(|| "-".to_string(), describe_rule);
        let paused = template.recurrence.as_ref().map_or(false, |rule| rule.paused);
        row.add_cell(if paused {
            Cell::new(repeats).fg(Color::DarkGrey)
        } else {
            Cell::new(repeats).fg(Color::Cyan)
        });

        row.add_cell(Cell::new(summary.instance_count));
        row.add_cell(Cell::new(summary.completed_instances));
        row.add_cell(Cell::new(
            summary
                .next_due_date
                .map_or_else(|| "-".to_string(), |due| format_local(due, timezone)),
        ));
        table.add_row(row);
    }

    println!("{table}");
}
