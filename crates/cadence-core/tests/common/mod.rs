#![allow(dead_code)]

use cadence_core::clock::FixedClock;
use cadence_core::db::establish_connection;
use cadence_core::identity::StaticIdentity;
use cadence_core::models::{NewTodoData, Todo, User};
use cadence_core::recurrence::{MaterializationConfig, Pattern, RecurrenceRule};
use cadence_core::repository::{SqliteRepository, TodoRepository, UserRepository};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestEnv {
    pub repo: SqliteRepository,
    pub clock: Arc<FixedClock>,
    pub user: User,
    _dir: TempDir,
}

impl TestEnv {
    /// A repository signed in as a freshly created user named `name`.
    pub async fn add_user(&self, name: &str) -> SqliteRepository {
        let user = self.repo.add_user(name).await.expect("Failed to create user");
        self.repo.for_identity(Arc::new(StaticIdentity::user(user.id)))
    }

    pub fn anonymous(&self) -> SqliteRepository {
        self.repo.for_identity(Arc::new(StaticIdentity::anonymous()))
    }
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

/// Fresh database with the clock at 2025-01-01 00:00 UTC.
pub async fn setup() -> TestEnv {
    setup_with_config(MaterializationConfig::default()).await
}

pub async fn setup_with_config(config: MaterializationConfig) -> TestEnv {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let clock = Arc::new(FixedClock::new(at(2025, 1, 1, 0, 0)));
    let setup = SqliteRepository::new(pool, Arc::new(StaticIdentity::anonymous()), config)
        .with_clock(clock.clone());
    let user = setup.add_user("alice").await.expect("Failed to create user");
    let repo = setup.for_identity(Arc::new(StaticIdentity::user(user.id)));

    TestEnv {
        repo,
        clock,
        user,
        _dir: dir,
    }
}

pub fn daily(max: Option<u32>) -> RecurrenceRule {
    let rule = RecurrenceRule::new(Pattern::daily(1).unwrap());
    match max {
        Some(max) => rule.with_max_occurrences(max).unwrap(),
        None => rule,
    }
}

pub async fn add_template(repo: &SqliteRepository, title: &str, due: DateTime<Utc>, rule: RecurrenceRule) -> Todo {
    repo.add_todo(NewTodoData {
        title: title.to_string(),
        due_date: Some(due),
        recurrence: Some(rule),
        ..Default::default()
    })
    .await
    .expect("Failed to create recurring template")
}

pub fn due_dates(todos: &[Todo]) -> Vec<DateTime<Utc>> {
    todos.iter().filter_map(|t| t.due_date).collect()
}
