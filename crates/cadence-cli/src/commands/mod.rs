pub mod add;
pub mod calendar;
pub mod delete;
pub mod r#do;
pub mod edit;
pub mod list;
pub mod project;
pub mod recurrence;
pub mod stats;
pub mod tag;
pub mod undo;
