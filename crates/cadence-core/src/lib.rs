//! # Cadence Core Library
//!
//! Task storage with recurring templates. A template carries a recurrence
//! rule; the engine materializes concrete instances from it and keeps them
//! consistent when the template is edited, paused, extended or deleted.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Data access layer with Repository pattern
//! - [`recurrence`]: Rules, next-occurrence calculation and reconciliation decisions
//! - [`analytics`]: Dashboard statistics
//! - [`identity`]: Who the repository acts for
//! - [`clock`]: Injectable time source
//! - [`timezone`]: Timezone utilities and validation
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     identity::StaticIdentity,
//!     models::NewTodoData,
//!     recurrence::{MaterializationConfig, Pattern, RecurrenceRule},
//!     repository::{SqliteRepository, TodoRepository, UserRepository},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cadence_core::error::CoreError> {
//!     let pool = db::establish_connection("cadence.db").await?;
//!     let config = MaterializationConfig::default();
//!
//!     let setup = SqliteRepository::new(pool, Arc::new(StaticIdentity::anonymous()), config);
//!     let user = setup.add_user("ada").await?;
//!     let repo = setup.for_identity(Arc::new(StaticIdentity::user(user.id)));
//!
//!     let todo = repo
//!         .add_todo(NewTodoData {
//!             title: "Water plants".to_string(),
//!             due_date: Some(chrono::Utc::now()),
//!             recurrence: Some(RecurrenceRule::new(Pattern::weekly(1, None)?)),
//!             ..Default::default()
//!         })
//!         .await?;
//!     println!("Created template: {}", todo.title);
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod clock;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod timezone;
