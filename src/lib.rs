//! # poco-schedule
//!
//! Cron schedule presets, human-readable summaries, and scheduled-task
//! plumbing for Poco.
//!
//! ## Overview
//!
//! A scheduled task stores a single five-field cron string. Settings dialogs
//! present it as one of four friendly presets (interval, daily, weekly,
//! monthly) and fall back to raw cron text for anything else. This crate
//! translates in both directions, renders localized summaries, evaluates
//! cron strings in a timezone, and manages the tasks themselves.
//!
//! ## Quick Start
//!
//! ```rust
//! use poco_schedule::{
//!     build_cron_from_preset, format_schedule_summary, infer_schedule_from_cron, Catalog,
//!     PresetDraft, PresetKind, TimeDraft,
//! };
//!
//! let preset = infer_schedule_from_cron("0 9 * * 1,3,5");
//! assert_eq!(
//!     format_schedule_summary(&preset, &Catalog::english()),
//!     "every Mon, Wed, Fri at 09:00"
//! );
//!
//! let draft = PresetDraft {
//!     preset: PresetKind::Daily,
//!     time: Some(TimeDraft { hour: Some(18), minute: Some(30) }),
//!     ..PresetDraft::default()
//! };
//! assert_eq!(build_cron_from_preset(&draft), "30 18 * * *");
//! ```
//!
//! ## Modules
//!
//! - **preset**: cron ⇄ preset translation
//! - **summary** / **i18n**: localized summaries with pluggable translators
//! - **cron**: timezone-aware next-run evaluation
//! - **task** / **store** / **service**: scheduled task CRUD and dispatch
//! - **editor**: headless settings form
//! - **sequence** / **optimistic**: client-side consistency helpers

pub mod config;
pub mod cron;
pub mod editor;
pub mod error;
pub mod i18n;
pub mod optimistic;
pub mod preset;
pub mod sequence;
pub mod service;
pub mod store;
pub mod summary;
pub mod task;

// Re-export core types
pub use config::{parse_timezone, ScheduleConfig};
pub use cron::CronExpression;
pub use editor::{ScheduleEditor, ScheduledTaskSettingsValue};
pub use error::{Result, ScheduleError};
pub use i18n::{Catalog, Translate};
pub use optimistic::{Rollback, Staged};
pub use preset::{
    build_cron_from_preset, infer_schedule_from_cron, Interval, IntervalDraft, IntervalUnit,
    PresetDraft, PresetKind, SchedulePreset, TimeDraft, TimeOfDay, WeekdaySet,
};
pub use sequence::{RequestSequence, RequestTicket};
pub use service::{ScheduledTaskService, TaskEvent};
pub use store::{FileTaskStore, ListQuery, MemoryTaskStore, ScheduledTaskStore};
pub use summary::{format_schedule_preview, format_schedule_summary};
pub use task::{
    DispatchRequest, DispatchResponse, ScheduledTask, ScheduledTaskCreateInput,
    ScheduledTaskTriggerResponse, ScheduledTaskUpdateInput, WorkspaceScope,
};
