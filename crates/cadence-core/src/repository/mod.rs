use crate::analytics::Analytics;
use crate::clock::{Clock, SystemClock};
use crate::db::DbPool;
use crate::error::CoreError;
use crate::identity::IdentityProvider;
use crate::models::{
    DeletionOutcome, NewProjectData, NewTagData, NewTodoData, Project, ReconcileOutcome, Tag,
    TemplateSummary, TemplateUpdate, Todo, TodoFilter, UpdateProjectData, UpdateTagData,
    UpdateTodoData, User,
};
use crate::recurrence::{MaterializationConfig, ReconcileFlags, RecurrenceRule};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

// Domain modules
pub mod analytics;
pub mod materialization;
pub mod projects;
pub(crate) mod records;
pub mod recurring;
pub mod tags;
pub mod todos;
pub mod users;

/// Domain-specific trait for user accounts. Not scoped to the current user.
#[async_trait]
pub trait UserRepository {
    async fn add_user(&self, name: &str) -> Result<User, CoreError>;
    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>, CoreError>;
}

/// Domain-specific trait for task operations
#[async_trait]
pub trait TodoRepository {
    async fn add_todo(&self, data: NewTodoData) -> Result<Todo, CoreError>;
    async fn find_todo_by_id(&self, id: Uuid) -> Result<Option<Todo>, CoreError>;
    /// Todos whose id starts or ends with `short_id`.
    async fn find_todos_by_short_id(&self, short_id: &str) -> Result<Vec<Todo>, CoreError>;
    async fn find_todos(&self, filter: &TodoFilter) -> Result<Vec<Todo>, CoreError>;
    async fn find_todos_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Todo>, CoreError>;
    async fn update_todo(&self, id: Uuid, data: UpdateTodoData) -> Result<Todo, CoreError>;
    async fn delete_todo(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for project operations
#[async_trait]
pub trait ProjectRepository {
    async fn add_project(&self, data: NewProjectData) -> Result<Project, CoreError>;
    async fn find_projects(&self) -> Result<Vec<Project>, CoreError>;
    async fn find_project_by_name(&self, name: &str) -> Result<Option<Project>, CoreError>;
    async fn update_project(&self, id: Uuid, data: UpdateProjectData) -> Result<Project, CoreError>;
    async fn archive_project(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for tag operations
#[async_trait]
pub trait TagRepository {
    async fn add_tag(&self, data: NewTagData) -> Result<Tag, CoreError>;
    async fn find_tags(&self) -> Result<Vec<Tag>, CoreError>;
    async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>, CoreError>;
    async fn update_tag(&self, id: Uuid, data: UpdateTagData) -> Result<Tag, CoreError>;
    async fn delete_tag(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Domain-specific trait for instance materialization
#[async_trait]
pub trait MaterializationRepository {
    /// Persist up to `max_count` instances of `template_id` for the occurrences
    /// following `seed`. Returns how many were created.
    async fn materialize_instances(
        &self,
        template_id: Uuid,
        seed: DateTime<Utc>,
        rule: &RecurrenceRule,
        user_id: Uuid,
        max_count: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, CoreError>;
}

/// Domain-specific trait for recurring templates and their instances
#[async_trait]
pub trait RecurringRepository {
    async fn list_recurring_templates(&self) -> Result<Vec<TemplateSummary>, CoreError>;
    async fn find_template_instances(&self, template_id: Uuid) -> Result<Vec<Todo>, CoreError>;
    async fn update_recurring_template(
        &self,
        id: Uuid,
        update: TemplateUpdate,
        flags: ReconcileFlags,
    ) -> Result<ReconcileOutcome, CoreError>;
    async fn delete_recurring_template(&self, id: Uuid, delete_all_instances: bool) -> Result<DeletionOutcome, CoreError>;
    async fn set_template_paused(&self, id: Uuid, paused: bool) -> Result<Todo, CoreError>;
    async fn generate_more_instances(&self, id: Uuid, count: Option<u32>) -> Result<usize, CoreError>;
}

/// Domain-specific trait for dashboard statistics
#[async_trait]
pub trait AnalyticsRepository {
    async fn analytics(&self) -> Result<Option<Analytics>, CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository:
    UserRepository
    + TodoRepository
    + ProjectRepository
    + TagRepository
    + MaterializationRepository
    + RecurringRepository
    + AnalyticsRepository
{
}

/// SQLite implementation of the repository pattern
#[derive(Clone)]
pub struct SqliteRepository {
    pool: DbPool,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    config: MaterializationConfig,
}

impl SqliteRepository {
    pub fn new(pool: DbPool, identity: Arc<dyn IdentityProvider>, config: MaterializationConfig) -> Self {
        Self {
            pool,
            identity,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The same database seen as another user.
    pub fn for_identity(&self, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn current_user(&self) -> Option<Uuid> {
        self.identity.current_user_id()
    }

    /// The signed-in user, required by every mutation.
    pub(crate) fn require_user(&self) -> Result<Uuid, CoreError> {
        self.current_user().ok_or(CoreError::NotAuthenticated)
    }
}

impl Repository for SqliteRepository {}
