//! Scheduled task resource
//!
//! A task pairs a prompt with a cron string and timezone. The cron string is
//! the only persisted form of the schedule; presets are re-inferred from it
//! whenever the task is shown or edited.

use crate::config::parse_timezone;
use crate::cron::CronExpression;
use crate::error::{Result, ScheduleError};
use crate::i18n::Translate;
use crate::preset::{infer_schedule_from_cron, SchedulePreset};
use crate::summary::format_schedule_summary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status recorded on a task when a run is handed off
pub const RUN_STATUS_QUEUED: &str = "queued";

/// Which persisted workspace a scheduled run reuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceScope {
    #[default]
    Session,
    ScheduledTask,
    Project,
}

impl std::fmt::Display for WorkspaceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceScope::Session => write!(f, "session"),
            WorkspaceScope::ScheduledTask => write!(f, "scheduled_task"),
            WorkspaceScope::Project => write!(f, "project"),
        }
    }
}

impl WorkspaceScope {
    /// Reusing a session always means session scope
    pub fn effective(self, reuse_session: bool) -> Self {
        if reuse_session {
            WorkspaceScope::Session
        } else {
            self
        }
    }
}

/// A stored scheduled task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[serde(rename = "scheduled_task_id")]
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    /// Five-field cron expression, evaluated in `timezone`
    pub cron: String,
    /// IANA timezone name
    pub timezone: String,
    pub prompt: String,
    pub enabled: bool,
    pub reuse_session: bool,
    pub workspace_scope: WorkspaceScope,
    pub project_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub next_run_at: DateTime<Utc>,
    pub last_run_id: Option<Uuid>,
    pub last_run_status: Option<String>,
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
}

impl ScheduledTask {
    /// Validate `input` and build a new task owned by `user_id`
    pub fn create(
        user_id: impl Into<String>,
        input: ScheduledTaskCreateInput,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = required("name", &input.name)?;
        let prompt = required("prompt", &input.prompt)?;
        let cron = required("cron", &input.cron)?;
        let timezone = input.timezone.trim().to_string();
        let next_run_at = next_run(&cron, &timezone, now)?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            name,
            cron,
            timezone,
            prompt,
            enabled: input.enabled,
            reuse_session: input.reuse_session,
            workspace_scope: input.workspace_scope.effective(input.reuse_session),
            project_id: input.project_id,
            session_id: None,
            next_run_at,
            last_run_id: None,
            last_run_status: None,
            last_error: None,
            config_snapshot: input.config,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        })
    }

    /// Apply a partial update; on error the task is left untouched
    pub fn apply_update(&mut self, input: &ScheduledTaskUpdateInput, now: DateTime<Utc>) -> Result<()> {
        let mut next = self.clone();

        if let Some(name) = &input.name {
            next.name = required("name", name)?;
        }
        if let Some(prompt) = &input.prompt {
            next.prompt = required("prompt", prompt)?;
        }
        if let Some(cron) = &input.cron {
            next.cron = required("cron", cron)?;
        }
        if let Some(timezone) = &input.timezone {
            next.timezone = timezone.trim().to_string();
        }
        if let Some(enabled) = input.enabled {
            next.enabled = enabled;
        }
        if let Some(reuse_session) = input.reuse_session {
            next.reuse_session = reuse_session;
        }
        if let Some(scope) = input.workspace_scope {
            next.workspace_scope = scope;
        }
        next.workspace_scope = next.workspace_scope.effective(next.reuse_session);

        let reschedule = next.cron != self.cron
            || next.timezone != self.timezone
            || (next.enabled && !self.enabled);
        if reschedule {
            next.next_run_at = next_run(&next.cron, &next.timezone, now)?;
        }

        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Record a run handed off at `now` and move `next_run_at` forward
    ///
    /// Nothing changes if the schedule can no longer be evaluated.
    pub fn record_run(&mut self, run_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        self.next_run_at = next_run(&self.cron, &self.timezone, now)?;
        self.last_run_id = Some(run_id);
        self.last_run_status = Some(RUN_STATUS_QUEUED.to_string());
        self.last_error = None;
        self.updated_at = now;
        Ok(())
    }

    /// Record a failed dispatch attempt without moving the schedule
    pub fn record_error(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.last_error = Some(error.into());
        self.updated_at = now;
    }

    /// Whether the task should be dispatched at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && !self.is_deleted && self.next_run_at <= now
    }

    pub fn preset(&self) -> SchedulePreset {
        infer_schedule_from_cron(&self.cron)
    }

    pub fn summary<T: Translate + ?Sized>(&self, t: &T) -> String {
        format_schedule_summary(&self.preset(), t)
    }
}

/// Next run strictly after `after` for `cron` in `timezone`
pub fn next_run(cron: &str, timezone: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let expr = CronExpression::parse(cron)?;
    let tz = parse_timezone(timezone)?;
    expr.next_after_tz(after, tz).ok_or_else(|| {
        ScheduleError::validation("cron", format!("'{}' never matches a calendar date", cron))
    })
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ScheduleError::validation(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn default_timezone() -> String {
    "UTC".into()
}

fn default_true() -> bool {
    true
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskCreateInput {
    pub name: String,
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub prompt: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub reuse_session: bool,
    #[serde(default)]
    pub workspace_scope: WorkspaceScope,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    /// Opaque task configuration captured at creation
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

impl ScheduledTaskCreateInput {
    /// Input with every optional field at its default
    pub fn new(name: impl Into<String>, cron: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cron: cron.into(),
            timezone: default_timezone(),
            prompt: prompt.into(),
            enabled: true,
            reuse_session: false,
            workspace_scope: WorkspaceScope::default(),
            project_id: None,
            config: None,
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }
}

/// Body of an update request; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskUpdateInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cron: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub reuse_session: Option<bool>,
    #[serde(default)]
    pub workspace_scope: Option<WorkspaceScope>,
}

/// Result of a manual trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTaskTriggerResponse {
    pub session_id: Uuid,
    pub run_id: Uuid,
}

/// Parameters of a dispatch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    #[serde(default = "default_dispatch_limit")]
    pub limit: i64,
}

fn default_dispatch_limit() -> i64 {
    50
}

impl Default for DispatchRequest {
    fn default() -> Self {
        Self {
            limit: default_dispatch_limit(),
        }
    }
}

/// Outcome of a dispatch pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub dispatched: usize,
    #[serde(default)]
    pub run_ids: Vec<Uuid>,
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub errors: usize,
}
