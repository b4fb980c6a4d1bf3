use crate::error::CoreError;
use crate::models::Todo;
use crate::recurrence::RecurrenceRule;
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds an instance record for the occurrence at `due`.
///
/// Instances copy the template's content. They never carry a rule of their
/// own and remember the originally scheduled date in `original_due_date`.
pub(crate) fn instance_of(template: &Todo, user_id: Uuid, due: DateTime<Utc>, now: DateTime<Utc>) -> Todo {
    Todo {
        id: Uuid::now_v7(),
        user_id,
        title: template.title.clone(),
        description: template.description.clone(),
        completed: false,
        priority: template.priority,
        due_date: Some(due),
        due_time: template.due_time.clone(),
        project_id: template.project_id,
        tag_ids: template.tag_ids.clone(),
        is_recurring: false,
        recurrence: None,
        parent_template_id: Some(template.id),
        original_due_date: Some(due),
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl super::MaterializationRepository for SqliteRepository {
    async fn materialize_instances(
        &self,
        template_id: Uuid,
        seed: DateTime<Utc>,
        rule: &RecurrenceRule,
        user_id: Uuid,
        max_count: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        let config = self.config();
        let end = rule.effective_end(now, config.horizon_days);

        let mut created = 0;
        for due in rule.occurrences(seed, end, max_count, config.timezone) {
            // Re-read every step so edits and deletions made meanwhile are honored
            let Some(template) = self.fetch_todo(template_id).await? else {
                tracing::warn!(%template_id, created, "template disappeared during materialization, stopping");
                break;
            };

            self.insert_todo(&instance_of(&template, user_id, due, now)).await?;
            created += 1;
        }

        tracing::debug!(%template_id, %seed, %end, created, "materialization finished");
        Ok(created)
    }
}
