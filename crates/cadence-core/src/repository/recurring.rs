use crate::error::CoreError;
use crate::models::{DeletionOutcome, ReconcileOutcome, TemplateSummary, TemplateUpdate, Todo, TodoRow};
use crate::recurrence::{
    continuation_seed, partition_instances, pattern_changed, plan_reconciliation, regeneration_seed, ReconcileFlags,
    ReconcilePlan,
};
use crate::repository::records::TodoPatch;
use crate::repository::{MaterializationRepository, SqliteRepository};
use async_trait::async_trait;
use uuid::Uuid;

fn summarize(template: Todo, instances: &[Todo]) -> TemplateSummary {
    TemplateSummary {
        instance_count: instances.len(),
        completed_instances: instances.iter().filter(|i| i.completed).count(),
        next_due_date: instances
            .iter()
            .filter(|i| !i.completed)
            .filter_map(|i| i.due_date)
            .min(),
        template,
    }
}

#[async_trait]
impl super::RecurringRepository for SqliteRepository {
    async fn list_recurring_templates(&self) -> Result<Vec<TemplateSummary>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };

        let rows: Vec<TodoRow> = sqlx::query_as(
            "SELECT * FROM todos WHERE user_id = ? AND is_recurring = 1 AND parent_template_id IS NULL \
             ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for template in self.attach_tags(rows).await? {
            let instances = self.fetch_instances(template.id).await?;
            summaries.push(summarize(template, &instances));
        }
        Ok(summaries)
    }

    async fn find_template_instances(&self, template_id: Uuid) -> Result<Vec<Todo>, CoreError> {
        let Some(user_id) = self.current_user() else {
            return Ok(Vec::new());
        };
        self.fetch_owned_template(template_id, user_id).await?;

        let mut instances = self.fetch_instances(template_id).await?;
        // Undated instances sort first
        instances.sort_by_key(|instance| instance.due_date);
        Ok(instances)
    }

    async fn update_recurring_template(
        &self,
        id: Uuid,
        update: TemplateUpdate,
        flags: ReconcileFlags,
    ) -> Result<ReconcileOutcome, CoreError> {
        let user_id = self.require_user()?;
        let template = self.fetch_owned_template(id, user_id).await?;
        let fields = update.instance_fields();
        self.validate_fields(&fields, user_id).await?;

        let now = self.now();
        let stored = template.recurrence.as_ref();
        // Pausing has its own operation; an edit keeps the stored flag
        let incoming = update
            .recurrence
            .map(|rule| rule.with_paused(stored.map_or(false, |r| r.paused)));
        let changed = pattern_changed(stored, incoming.as_ref());
        let plan = plan_reconciliation(changed, flags);

        let patch = TodoPatch {
            recurrence: incoming.clone().map(Some),
            ..TodoPatch::fields(fields.clone())
        };
        if !self.patch_todo(id, patch, now).await? {
            return Err(CoreError::NotFound("Recurring task template".to_string()));
        }

        let mut outcome = ReconcileOutcome {
            plan,
            pattern_changed: changed,
            deleted: 0,
            generated: 0,
            patched: 0,
        };

        let (future, past) = partition_instances(self.fetch_instances(id).await?, now);
        match plan {
            ReconcilePlan::Regenerate => {
                for instance in &future {
                    if self.delete_todo_record(instance.id).await? {
                        outcome.deleted += 1;
                    }
                }
                match (incoming.as_ref(), regeneration_seed(&past, template.due_date)) {
                    (Some(rule), Some(seed)) => {
                        outcome.generated = self
                            .materialize_instances(id, seed, rule, template.user_id, self.config().regenerate_count, now)
                            .await?;
                    }
                    _ => tracing::debug!(template_id = %id, "template has no due date, nothing to regenerate"),
                }
            }
            ReconcilePlan::PatchFuture => {
                if !fields.is_empty() {
                    for instance in &future {
                        if self.patch_todo(instance.id, TodoPatch::fields(fields.clone()), now).await? {
                            outcome.patched += 1;
                        }
                    }
                }
            }
            ReconcilePlan::TemplateOnly => {}
        }

        tracing::info!(
            template_id = %id,
            ?plan,
            deleted = outcome.deleted,
            generated = outcome.generated,
            patched = outcome.patched,
            "recurring template updated"
        );
        Ok(outcome)
    }

    async fn delete_recurring_template(&self, id: Uuid, delete_all_instances: bool) -> Result<DeletionOutcome, CoreError> {
        let user_id = self.require_user()?;
        self.fetch_owned_template(id, user_id).await?;

        let instances = self.fetch_instances(id).await?;
        let mut outcome = DeletionOutcome::default();

        if delete_all_instances {
            for instance in &instances {
                if self.delete_todo_record(instance.id).await? {
                    outcome.deleted_instances += 1;
                }
            }
        } else {
            let now = self.now();
            let (future, past) = partition_instances(instances, now);
            for instance in &future {
                if self.delete_todo_record(instance.id).await? {
                    outcome.deleted_instances += 1;
                }
            }
            for instance in &past {
                if self.patch_todo(instance.id, TodoPatch::detach(), now).await? {
                    outcome.detached_instances += 1;
                }
            }
        }

        self.delete_todo_record(id).await?;
        tracing::info!(
            template_id = %id,
            deleted = outcome.deleted_instances,
            detached = outcome.detached_instances,
            "recurring template deleted"
        );
        Ok(outcome)
    }

    async fn set_template_paused(&self, id: Uuid, paused: bool) -> Result<Todo, CoreError> {
        let user_id = self.require_user()?;
        let template = self.fetch_owned_template(id, user_id).await?;
        let rule = template
            .recurrence
            .ok_or_else(|| CoreError::InvalidInput("Template has no recurrence rule".to_string()))?;

        let patch = TodoPatch {
            recurrence: Some(Some(rule.with_paused(paused))),
            ..Default::default()
        };
        self.patch_todo(id, patch, self.now()).await?;
        self.fetch_owned_template(id, user_id).await
    }

    async fn generate_more_instances(&self, id: Uuid, count: Option<u32>) -> Result<usize, CoreError> {
        let user_id = self.require_user()?;
        let template = self.fetch_owned_template(id, user_id).await?;
        let (Some(rule), Some(template_due)) = (template.recurrence.as_ref(), template.due_date) else {
            return Err(CoreError::InvalidInput("Invalid recurring pattern".to_string()));
        };

        let instances = self.fetch_instances(id).await?;
        let seed = continuation_seed(&instances, template_due);
        let count = count
            .filter(|count| *count > 0)
            .unwrap_or(self.config().generate_more_count);

        // Pausing only stops automatic generation
        self.materialize_instances(id, seed, rule, template.user_id, count, self.now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoPriority;
    use chrono::{TimeZone, Utc};

    fn todo(due_day: Option<u32>, completed: bool) -> Todo {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Todo {
            id: Uuid::now_v7(),
            user_id: Uuid::nil(),
            title: "t".to_string(),
            description: None,
            completed,
            priority: TodoPriority::Medium,
            due_date: due_day.map(|d| Utc.with_ymd_and_hms(2025, 1, d, 9, 0, 0).unwrap()),
            due_time: None,
            project_id: None,
            tag_ids: Vec::new(),
            is_recurring: false,
            recurrence: None,
            parent_template_id: None,
            original_due_date: None,
            completed_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_summary_next_due_skips_completed() {
        let instances = vec![todo(Some(2), true), todo(Some(5), false), todo(Some(3), false), todo(None, false)];
        let summary = summarize(todo(Some(1), false), &instances);

        assert_eq!(summary.instance_count, 4);
        assert_eq!(summary.completed_instances, 1);
        assert_eq!(summary.next_due_date, Some(Utc.with_ymd_and_hms(2025, 1, 3, 9, 0, 0).unwrap()));
    }

    #[test]
    fn test_summary_without_instances() {
        let summary = summarize(todo(Some(1), false), &[]);
        assert_eq!(summary.instance_count, 0);
        assert_eq!(summary.next_due_date, None);
    }
}
