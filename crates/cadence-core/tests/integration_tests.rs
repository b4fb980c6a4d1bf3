mod common;

use cadence_core::error::CoreError;
use cadence_core::models::*;
use cadence_core::repository::{
    AnalyticsRepository, ProjectRepository, TagRepository, TodoRepository, UserRepository,
};
use chrono::Duration;
use common::{add_template, at, daily, setup};

async fn create_test_project(repo: &impl ProjectRepository, name: &str) -> Project {
    repo.add_project(NewProjectData {
        name: name.to_string(),
        color: "#3366ff".to_string(),
        description: Some(format!("Test project: {}", name)),
    })
    .await
    .expect("Failed to create test project")
}

async fn create_test_tag(repo: &impl TagRepository, name: &str) -> Tag {
    repo.add_tag(NewTagData {
        name: name.to_string(),
        color: "#ff9900".to_string(),
    })
    .await
    .expect("Failed to create test tag")
}

fn new_todo(title: &str) -> NewTodoData {
    NewTodoData {
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_duplicate_user_names_rejected() {
    let env = setup().await;
    let result = env.repo.add_user("alice").await;
    assert!(matches!(result, Err(CoreError::DuplicateName { kind: "User", .. })));

    let found = env.repo.find_user_by_name("alice").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(env.user.id));
}

#[tokio::test]
async fn test_basic_todo_crud_workflow() {
    let env = setup().await;
    let project = create_test_project(&env.repo, "Home").await;
    let tag = create_test_tag(&env.repo, "errand").await;

    let todo = env
        .repo
        .add_todo(NewTodoData {
            title: "Buy milk".to_string(),
            priority: Some(TodoPriority::High),
            due_date: Some(at(2025, 1, 2, 17, 0)),
            due_time: Some("17:00".to_string()),
            project_id: Some(project.id),
            tag_ids: vec![tag.id],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.priority, TodoPriority::High);
    assert_eq!(todo.user_id, env.user.id);
    assert!(!todo.is_recurring);

    let fetched = env.repo.find_todo_by_id(todo.id).await.unwrap().unwrap();
    assert_eq!(fetched, todo);

    let updated = env
        .repo
        .update_todo(
            todo.id,
            UpdateTodoData {
                title: Some("Buy oat milk".to_string()),
                description: Some(Some("the barista kind".to_string())),
                tag_ids: Some(Vec::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Buy oat milk");
    assert_eq!(updated.description.as_deref(), Some("the barista kind"));
    assert!(updated.tag_ids.is_empty());
    assert_eq!(updated.project_id, Some(project.id));

    env.repo.delete_todo(todo.id).await.unwrap();
    assert!(env.repo.find_todo_by_id(todo.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_completion_stamps_completed_at() {
    let env = setup().await;
    let todo = env.repo.add_todo(new_todo("Call mom")).await.unwrap();
    assert!(todo.completed_at.is_none());

    env.clock.set(at(2025, 1, 3, 8, 0));
    let done = env
        .repo
        .update_todo(todo.id, UpdateTodoData { completed: Some(true), ..Default::default() })
        .await
        .unwrap();
    assert!(done.completed);
    assert_eq!(done.completed_at, Some(at(2025, 1, 3, 8, 0)));

    // Completing again keeps the original stamp
    env.clock.advance(Duration::hours(1));
    let again = env
        .repo
        .update_todo(todo.id, UpdateTodoData { completed: Some(true), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(again.completed_at, Some(at(2025, 1, 3, 8, 0)));

    let undone = env
        .repo
        .update_todo(todo.id, UpdateTodoData { completed: Some(false), ..Default::default() })
        .await
        .unwrap();
    assert!(!undone.completed);
    assert!(undone.completed_at.is_none());
}

#[tokio::test]
async fn test_todo_validation() {
    let env = setup().await;

    let blank = env.repo.add_todo(new_todo("   ")).await;
    assert!(matches!(blank, Err(CoreError::InvalidInput(_))));

    let bad_time = env
        .repo
        .add_todo(NewTodoData {
            due_time: Some("25:00".to_string()),
            ..new_todo("Late")
        })
        .await;
    assert!(matches!(bad_time, Err(CoreError::InvalidInput(_))));

    let missing_project = env
        .repo
        .add_todo(NewTodoData {
            project_id: Some(uuid::Uuid::now_v7()),
            ..new_todo("Orphan")
        })
        .await;
    assert!(matches!(missing_project, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_todos_are_scoped_to_their_owner() {
    let env = setup().await;
    let todo = env.repo.add_todo(new_todo("Private")).await.unwrap();
    let project = create_test_project(&env.repo, "Secret").await;
    let bob = env.add_user("bob").await;

    assert!(bob.find_todo_by_id(todo.id).await.unwrap().is_none());
    assert!(bob.find_todos(&TodoFilter::default()).await.unwrap().is_empty());
    assert!(matches!(
        bob.update_todo(todo.id, UpdateTodoData { completed: Some(true), ..Default::default() })
            .await,
        Err(CoreError::NotFound(_))
    ));
    assert!(matches!(bob.delete_todo(todo.id).await, Err(CoreError::NotFound(_))));

    // Another user's project cannot be borrowed
    let borrowed = bob
        .add_todo(NewTodoData {
            project_id: Some(project.id),
            ..new_todo("Sneaky")
        })
        .await;
    assert!(matches!(borrowed, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_anonymous_caller_sees_nothing() {
    let env = setup().await;
    env.repo.add_todo(new_todo("Mine")).await.unwrap();
    let anonymous = env.anonymous();

    assert!(anonymous.find_todos(&TodoFilter::default()).await.unwrap().is_empty());
    assert!(anonymous.find_projects().await.unwrap().is_empty());
    assert!(anonymous.analytics().await.unwrap().is_none());
    assert!(matches!(
        anonymous.add_todo(new_todo("Nope")).await,
        Err(CoreError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_list_filters() {
    let env = setup().await;
    let work = create_test_project(&env.repo, "Work").await;
    let urgent = create_test_tag(&env.repo, "urgent").await;

    let report = env
        .repo
        .add_todo(NewTodoData {
            project_id: Some(work.id),
            tag_ids: vec![urgent.id],
            due_date: Some(at(2025, 1, 1, 15, 0)),
            ..new_todo("Report")
        })
        .await
        .unwrap();
    let slides = env
        .repo
        .add_todo(NewTodoData {
            project_id: Some(work.id),
            due_date: Some(at(2025, 1, 9, 9, 0)),
            ..new_todo("Slides")
        })
        .await
        .unwrap();
    let laundry = env.repo.add_todo(new_todo("Laundry")).await.unwrap();
    env.repo
        .update_todo(laundry.id, UpdateTodoData { completed: Some(true), ..Default::default() })
        .await
        .unwrap();

    // Rows created within one clock tick have no defined order
    let ids = |todos: Vec<Todo>| {
        let mut ids: Vec<_> = todos.into_iter().map(|t| t.id).collect();
        ids.sort();
        ids
    };
    let sorted = |mut expected: Vec<uuid::Uuid>| {
        expected.sort();
        expected
    };

    let by_project = TodoFilter { project_id: Some(work.id), ..Default::default() };
    assert_eq!(ids(env.repo.find_todos(&by_project).await.unwrap()), sorted(vec![report.id, slides.id]));

    let by_tag = TodoFilter { tag_id: Some(urgent.id), ..Default::default() };
    assert_eq!(ids(env.repo.find_todos(&by_tag).await.unwrap()), vec![report.id]);

    let done = TodoFilter { completed: Some(true), ..Default::default() };
    assert_eq!(ids(env.repo.find_todos(&done).await.unwrap()), vec![laundry.id]);

    // Today: due before tomorrow, or undated
    let today = TodoFilter { today: true, ..Default::default() };
    assert_eq!(ids(env.repo.find_todos(&today).await.unwrap()), sorted(vec![report.id, laundry.id]));
}

#[tokio::test]
async fn test_range_query_includes_instances() {
    let env = setup().await;
    add_template(&env.repo, "Standup", at(2025, 1, 2, 9, 0), daily(Some(10))).await;

    let week = env
        .repo
        .find_todos_in_range(at(2025, 1, 2, 0, 0), at(2025, 1, 5, 23, 59))
        .await
        .unwrap();
    let dates: Vec<_> = week.iter().filter_map(|t| t.due_date).collect();
    assert_eq!(
        dates,
        vec![at(2025, 1, 2, 9, 0), at(2025, 1, 3, 9, 0), at(2025, 1, 4, 9, 0), at(2025, 1, 5, 9, 0)]
    );
}

#[tokio::test]
async fn test_short_id_lookup() {
    let env = setup().await;
    let todo = env.repo.add_todo(new_todo("Find me")).await.unwrap();
    env.repo.add_todo(new_todo("Someone else")).await.unwrap();

    let full = todo.id.to_string();
    // The leading characters of a v7 id are its timestamp, so include some random bits
    let by_prefix = env.repo.find_todos_by_short_id(&full[..30]).await.unwrap();
    assert_eq!(by_prefix.len(), 1);
    assert_eq!(by_prefix[0].id, todo.id);

    let tail = &full[full.len() - 8..];
    let by_tail = env.repo.find_todos_by_short_id(&tail.to_uppercase()).await.unwrap();
    assert_eq!(by_tail.len(), 1);
    assert_eq!(by_tail[0].id, todo.id);

    assert!(env.repo.find_todos_by_short_id("zzzz").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_project_lifecycle() {
    let env = setup().await;
    let project = create_test_project(&env.repo, "Garden").await;

    let duplicate = env
        .repo
        .add_project(NewProjectData {
            name: "Garden".to_string(),
            color: "#000000".to_string(),
            description: None,
        })
        .await;
    assert!(matches!(duplicate, Err(CoreError::DuplicateName { kind: "Project", .. })));

    let renamed = env
        .repo
        .update_project(
            project.id,
            UpdateProjectData {
                name: Some("Allotment".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Allotment");
    assert_eq!(renamed.color, project.color);

    env.repo.archive_project(project.id).await.unwrap();
    assert!(env.repo.find_projects().await.unwrap().is_empty());
    assert!(env.repo.find_project_by_name("Allotment").await.unwrap().is_none());

    // Other users may reuse the name
    let bob = env.add_user("bob").await;
    assert!(create_test_project(&bob, "Garden").await.user_id != env.user.id);
}

#[tokio::test]
async fn test_tag_lifecycle() {
    let env = setup().await;
    let tag = create_test_tag(&env.repo, "home").await;

    let duplicate = env
        .repo
        .add_tag(NewTagData {
            name: "home".to_string(),
            color: "#111111".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(CoreError::DuplicateName { kind: "Tag", .. })));

    let todo = env
        .repo
        .add_todo(NewTodoData {
            tag_ids: vec![tag.id],
            ..new_todo("Vacuum")
        })
        .await
        .unwrap();
    assert_eq!(todo.tag_ids, vec![tag.id]);

    let recolored = env
        .repo
        .update_tag(tag.id, UpdateTagData { color: Some("#abcdef".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(recolored.color, "#abcdef");
    assert_eq!(env.repo.find_tag_by_name("home").await.unwrap().map(|t| t.id), Some(tag.id));

    env.repo.delete_tag(tag.id).await.unwrap();
    assert!(env.repo.find_tags().await.unwrap().is_empty());
    let untagged = env.repo.find_todo_by_id(todo.id).await.unwrap().unwrap();
    assert!(untagged.tag_ids.is_empty());
}

#[tokio::test]
async fn test_analytics_summary() {
    let env = setup().await;
    let project = create_test_project(&env.repo, "Chores").await;

    env.clock.set(at(2025, 1, 10, 12, 0));
    let dishes = env
        .repo
        .add_todo(NewTodoData {
            project_id: Some(project.id),
            priority: Some(TodoPriority::High),
            ..new_todo("Dishes")
        })
        .await
        .unwrap();
    env.repo
        .add_todo(NewTodoData {
            project_id: Some(project.id),
            due_date: Some(at(2025, 1, 9, 9, 0)),
            ..new_todo("Overdue bins")
        })
        .await
        .unwrap();
    env.repo
        .add_todo(NewTodoData {
            due_date: Some(at(2025, 1, 10, 18, 0)),
            priority: Some(TodoPriority::Low),
            ..new_todo("Evening walk")
        })
        .await
        .unwrap();
    env.repo
        .update_todo(dishes.id, UpdateTodoData { completed: Some(true), ..Default::default() })
        .await
        .unwrap();

    let stats = env.repo.analytics().await.unwrap().unwrap();
    assert_eq!(stats.total_todos, 3);
    assert_eq!(stats.completed_todos, 1);
    assert_eq!(stats.active_todos, 2);
    assert_eq!(stats.completion_rate, 33);
    assert_eq!(stats.priority_stats.high, 1);
    assert_eq!(stats.priority_stats.medium, 1);
    assert_eq!(stats.priority_stats.low, 1);
    assert_eq!(stats.overdue_todos, 1);
    assert_eq!(stats.today_todos, 1);
    assert_eq!(stats.weekly_trend.last().map(|d| d.completions), Some(1));

    assert_eq!(stats.project_stats.len(), 1);
    assert_eq!(stats.project_stats[0].total_todos, 2);
    assert_eq!(stats.project_stats[0].completed_todos, 1);
}
