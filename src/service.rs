//! Scheduled task service
//!
//! CRUD, manual triggers and due-task dispatch on top of a
//! [`ScheduledTaskStore`].

use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::store::{ListQuery, ScheduledTaskStore};
use crate::task::{
    DispatchRequest, DispatchResponse, ScheduledTask, ScheduledTaskCreateInput,
    ScheduledTaskTriggerResponse, ScheduledTaskUpdateInput, RUN_STATUS_QUEUED,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Task lifecycle events for monitoring
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Created { task_id: Uuid },
    Updated { task_id: Uuid },
    Deleted { task_id: Uuid },
    /// A run was handed off, manually or by dispatch
    RunQueued {
        task_id: Uuid,
        run_id: Uuid,
        session_id: Uuid,
    },
    /// Dispatch could not reschedule the task
    DispatchFailed { task_id: Uuid, error: String },
}

pub struct ScheduledTaskService {
    store: Arc<dyn ScheduledTaskStore>,
    event_tx: broadcast::Sender<TaskEvent>,
    /// One dispatch pass at a time, so a task is never claimed twice
    dispatch_lock: Mutex<()>,
    default_timezone: String,
    dispatch_limit: usize,
}

impl ScheduledTaskService {
    pub fn new(store: Arc<dyn ScheduledTaskStore>) -> Self {
        Self::with_config(store, &ScheduleConfig::default())
    }

    pub fn with_config(store: Arc<dyn ScheduledTaskStore>, config: &ScheduleConfig) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            store,
            event_tx,
            dispatch_lock: Mutex::new(()),
            default_timezone: config.default_timezone.clone(),
            dispatch_limit: config.dispatch_limit,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: TaskEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    pub async fn create(
        &self,
        user_id: &str,
        mut input: ScheduledTaskCreateInput,
        now: DateTime<Utc>,
    ) -> Result<ScheduledTask> {
        if input.timezone.trim().is_empty() {
            input.timezone = self.default_timezone.clone();
        }

        let task = ScheduledTask::create(user_id, input, now)?;
        self.store.save(&task).await?;

        tracing::info!(
            task_id = %task.id,
            name = %task.name,
            cron = %task.cron,
            next_run_at = %task.next_run_at,
            "Created scheduled task"
        );
        self.emit(TaskEvent::Created { task_id: task.id });
        Ok(task)
    }

    /// Load a task owned by `user_id`
    pub async fn get(&self, user_id: &str, id: Uuid) -> Result<ScheduledTask> {
        self.store
            .get(id, false)
            .await?
            .filter(|task| task.user_id == user_id)
            .ok_or_else(|| ScheduleError::TaskNotFound(id.to_string()))
    }

    pub async fn list(&self, user_id: &str, query: ListQuery) -> Result<Vec<ScheduledTask>> {
        self.store.list_by_user(user_id, query).await
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: Uuid,
        input: &ScheduledTaskUpdateInput,
        now: DateTime<Utc>,
    ) -> Result<ScheduledTask> {
        let mut task = self.get(user_id, id).await?;
        task.apply_update(input, now)?;
        self.store.save(&task).await?;

        tracing::info!(task_id = %task.id, next_run_at = %task.next_run_at, "Updated scheduled task");
        self.emit(TaskEvent::Updated { task_id: task.id });
        Ok(task)
    }

    pub async fn delete(&self, user_id: &str, id: Uuid) -> Result<()> {
        let task = self.get(user_id, id).await?;
        self.store.soft_delete(task.id).await?;

        tracing::info!(task_id = %task.id, name = %task.name, "Deleted scheduled task");
        self.emit(TaskEvent::Deleted { task_id: task.id });
        Ok(())
    }

    /// Queue a run now, outside the schedule
    ///
    /// `next_run_at` is left alone. Tasks that reuse a session keep (or
    /// adopt) one session id across runs.
    pub async fn trigger(
        &self,
        user_id: &str,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ScheduledTaskTriggerResponse> {
        let mut task = self.get(user_id, id).await?;
        let response = ScheduledTaskTriggerResponse {
            session_id: session_for(&mut task),
            run_id: Uuid::new_v4(),
        };
        task.last_run_id = Some(response.run_id);
        task.last_run_status = Some(RUN_STATUS_QUEUED.to_string());
        task.updated_at = now;
        self.store.save(&task).await?;

        tracing::info!(task_id = %task.id, run_id = %response.run_id, "Triggered scheduled task");
        self.emit(TaskEvent::RunQueued {
            task_id: task.id,
            run_id: response.run_id,
            session_id: response.session_id,
        });
        Ok(response)
    }

    /// Queue a run for every task due at `now` and move each one forward
    ///
    /// A non-positive `limit` falls back to the configured dispatch limit.
    pub async fn dispatch_due(
        &self,
        request: DispatchRequest,
        now: DateTime<Utc>,
    ) -> Result<DispatchResponse> {
        let _guard = self.dispatch_lock.lock().await;
        let limit = if request.limit > 0 {
            request.limit
        } else {
            i64::try_from(self.dispatch_limit).unwrap_or(i64::MAX)
        };
        let claimed = self.store.claim_due(now, limit).await?;
        let mut response = DispatchResponse::default();

        for claimed_task in claimed {
            match self.dispatch_one(claimed_task.id, now).await {
                Ok(Dispatched::Queued(run_id)) => {
                    response.dispatched += 1;
                    response.run_ids.push(run_id);
                }
                Ok(Dispatched::NotDue) => response.skipped += 1,
                Ok(Dispatched::Failed) => response.errors += 1,
                Err(e) => {
                    tracing::error!(task_id = %claimed_task.id, error = %e, "Dispatch storage failure");
                    response.errors += 1;
                }
            }
        }

        if response.dispatched > 0 || response.errors > 0 {
            tracing::info!(
                dispatched = response.dispatched,
                skipped = response.skipped,
                errors = response.errors,
                "Dispatch pass finished"
            );
        }
        Ok(response)
    }
}

/// Outcome of dispatching one claimed task
enum Dispatched {
    Queued(Uuid),
    NotDue,
    /// The schedule could not be evaluated; the task was disabled
    Failed,
}

impl ScheduledTaskService {
    async fn dispatch_one(&self, id: Uuid, now: DateTime<Utc>) -> Result<Dispatched> {
        // Re-read: an update may have landed after the claim
        let mut task = match self.store.get(id, false).await? {
            Some(task) if task.is_due(now) => task,
            _ => {
                tracing::debug!(task_id = %id, "Task no longer due; skipping");
                return Ok(Dispatched::NotDue);
            }
        };

        let run_id = Uuid::new_v4();
        match task.record_run(run_id, now) {
            Ok(()) => {
                let session_id = session_for(&mut task);
                self.store.save(&task).await?;
                tracing::debug!(
                    task_id = %task.id,
                    %run_id,
                    next_run_at = %task.next_run_at,
                    "Dispatched scheduled task"
                );
                self.emit(TaskEvent::RunQueued {
                    task_id: task.id,
                    run_id,
                    session_id,
                });
                Ok(Dispatched::Queued(run_id))
            }
            Err(e) => {
                let error = e.to_string();
                tracing::error!(task_id = %task.id, %error, "Failed to reschedule task");
                // Keep it out of the next pass until someone fixes the schedule
                task.enabled = false;
                task.record_error(error.clone(), now);
                self.store.save(&task).await?;
                self.emit(TaskEvent::DispatchFailed {
                    task_id: task.id,
                    error,
                });
                Ok(Dispatched::Failed)
            }
        }
    }
}

/// Session for the next run: the task's own when it reuses one
fn session_for(task: &mut ScheduledTask) -> Uuid {
    if task.reuse_session {
        *task.session_id.get_or_insert_with(Uuid::new_v4)
    } else {
        Uuid::new_v4()
    }
}
