use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::recurrence::{ReconcilePlan, RecurrenceRule};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Project {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Tag {
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid priority: {0} (expected low, medium or high)")]
pub struct ParseTodoPriorityError(String);

impl FromStr for TodoPriority {
    type Err = ParseTodoPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TodoPriority::Low),
            "medium" => Ok(TodoPriority::Medium),
            "high" => Ok(TodoPriority::High),
            _ => Err(ParseTodoPriorityError(s.to_string())),
        }
    }
}

impl std::fmt::Display for TodoPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TodoPriority::Low => write!(f, "low"),
            TodoPriority::Medium => write!(f, "medium"),
            TodoPriority::High => write!(f, "high"),
        }
    }
}

/// A task record. Plain tasks, recurring templates and their generated
/// instances all share this shape.
///
/// Template tasks: `is_recurring = true`, `recurrence` set, no parent.
/// Instance tasks: `parent_template_id` and `original_due_date` set, no recurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    /// Time of day, `HH:MM`
    pub due_time: Option<String>,
    pub project_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub is_recurring: bool,
    pub recurrence: Option<RecurrenceRule>,
    pub parent_template_id: Option<Uuid>,
    /// The date this occurrence was scheduled for, independent of later edits
    pub original_due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn is_template(&self) -> bool {
        self.is_recurring && self.parent_template_id.is_none()
    }

    pub fn is_instance(&self) -> bool {
        self.parent_template_id.is_some()
    }
}

/// Row shape of the `todos` table; tags live in `todo_tags`.
#[derive(Debug, FromRow)]
pub(crate) struct TodoRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_recurring: bool,
    pub recurrence: Option<Json<RecurrenceRule>>,
    pub parent_template_id: Option<Uuid>,
    pub original_due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoRow {
    pub(crate) fn into_todo(self, tag_ids: Vec<Uuid>) -> Todo {
        Todo {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority: self.priority,
            due_date: self.due_date,
            due_time: self.due_time,
            project_id: self.project_id,
            tag_ids,
            is_recurring: self.is_recurring,
            recurrence: self.recurrence.map(|Json(rule)| rule),
            parent_template_id: self.parent_template_id,
            original_due_date: self.original_due_date,
            completed_at: self.completed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// ============================================================================
// Data Transfer Objects
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NewTodoData {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_time: Option<String>,
    pub project_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    /// When present the task becomes a recurring template and its first
    /// batch of instances is materialized from `due_date`.
    pub recurrence: Option<RecurrenceRule>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTodoData {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub due_time: Option<Option<String>>,
    pub project_id: Option<Option<Uuid>>,
    pub tag_ids: Option<Vec<Uuid>>,
}

/// Filters for listing tasks. All set filters must match.
#[derive(Debug, Clone, Default)]
pub struct TodoFilter {
    pub project_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    pub completed: Option<bool>,
    /// Only tasks due today or overdue, plus tasks without a due date
    pub today: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewProjectData {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProjectData {
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTagData {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTagData {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Edits to a recurring template. Every field except `recurrence` is also
/// eligible for propagation to future instances.
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TodoPriority>,
    pub due_time: Option<Option<String>>,
    pub project_id: Option<Option<Uuid>>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub recurrence: Option<RecurrenceRule>,
}

impl TemplateUpdate {
    /// The subset of this update that applies to instances.
    pub fn instance_fields(&self) -> UpdateTodoData {
        UpdateTodoData {
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            due_time: self.due_time.clone(),
            project_id: self.project_id,
            tag_ids: self.tag_ids.clone(),
            ..Default::default()
        }
    }
}

impl UpdateTodoData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.due_time.is_none()
            && self.project_id.is_none()
            && self.tag_ids.is_none()
    }
}

/// A recurring template annotated with statistics over its instances.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub template: Todo,
    pub instance_count: usize,
    pub completed_instances: usize,
    /// Earliest due date among incomplete instances
    pub next_due_date: Option<DateTime<Utc>>,
}

/// What a template update did to the instance set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub plan: ReconcilePlan,
    pub pattern_changed: bool,
    pub deleted: usize,
    pub generated: usize,
    pub patched: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub deleted_instances: usize,
    pub detached_instances: usize,
}
