//! Scheduling integration tests
//!
//! End-to-end tests across the public API: preset translation, summaries,
//! the settings editor, and the task service over both stores.

use chrono::{DateTime, Duration, TimeZone, Utc};
use poco_schedule::{
    build_cron_from_preset, format_schedule_summary, infer_schedule_from_cron, Catalog,
    CronExpression, DispatchRequest, FileTaskStore, ListQuery, MemoryTaskStore, PresetDraft,
    ScheduleEditor, ScheduleError, ScheduledTaskCreateInput, ScheduledTaskService,
    ScheduledTaskSettingsValue, ScheduledTaskUpdateInput, SchedulePreset,
};
use std::sync::Arc;

fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
}

// ─── Presets & Summaries ─────────────────────────────────────────

#[test]
fn test_every_preset_survives_a_round_trip() {
    let crons = [
        "*/5 * * * *",
        "*/1 * * * *",
        "0 */2 * * *",
        "15 */6 * * *",
        "0 9 * * *",
        "30 18 * * 1,3,5",
        "0 7 * * 0,6",
        "45 23 31 * *",
    ];
    for cron in crons {
        let preset = infer_schedule_from_cron(cron);
        assert!(!preset.is_cron(), "{cron} should map to a preset");
        let draft = PresetDraft::from_preset(&preset).unwrap();
        assert_eq!(build_cron_from_preset(&draft), cron);
    }
}

#[test]
fn test_unrepresentable_crons_pass_through() {
    for cron in ["0 9-17 * * 1-5", "0 0 1 1 *", "5 4 * * sun", "* * * * *", "0 9 1,15 * *"] {
        let preset = infer_schedule_from_cron(cron);
        assert_eq!(preset, SchedulePreset::Cron(cron.to_string()));
        assert_eq!(format_schedule_summary(&preset, &Catalog::english()), cron);
    }
}

#[test]
fn test_draft_json_from_a_dialog() {
    let draft: PresetDraft = serde_json::from_str(
        r#"{"preset":"weekly","weekDays":[5,1],"time":{"hour":8,"minute":30}}"#,
    )
    .unwrap();
    let cron = build_cron_from_preset(&draft);
    assert_eq!(cron, "30 8 * * 1,5");
    assert_eq!(
        format_schedule_summary(&infer_schedule_from_cron(&cron), &Catalog::english()),
        "every Mon, Fri at 08:30"
    );
}

#[test]
fn test_custom_translations_override_builtins() {
    let mut catalog = Catalog::english();
    catalog
        .merge_json(
            r#"{"library":{"scheduledTasks":{"schedule":{"summary":{"daily":"each day, {{time}}"}}}}}"#,
        )
        .unwrap();
    let preset = infer_schedule_from_cron("0 9 * * *");
    assert_eq!(format_schedule_summary(&preset, &catalog), "each day, 09:00");
}

// ─── Evaluation ──────────────────────────────────────────────────

#[test]
fn test_built_cron_evaluates_as_expected() {
    let draft: PresetDraft = serde_json::from_str(r#"{"preset":"monthly","dayOfMonth":15}"#).unwrap();
    let cron = build_cron_from_preset(&draft);
    assert_eq!(cron, "0 9 15 * *");

    let expr = CronExpression::parse(&cron).unwrap();
    let next = expr.next_after(morning()).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap());
}

// ─── Editor → Service ────────────────────────────────────────────

#[tokio::test]
async fn test_edit_dialog_updates_task() {
    let service = ScheduledTaskService::new(Arc::new(MemoryTaskStore::new()));
    let task = service
        .create(
            "u1",
            ScheduledTaskCreateInput::new("standup notes", "0 9 * * *", "Summarize yesterday"),
            morning(),
        )
        .await
        .unwrap();

    let mut editor = ScheduleEditor::open(ScheduledTaskSettingsValue::from(&task));
    editor.set_preset(poco_schedule::PresetKind::Weekly);
    assert!(editor.toggle_weekday(3));
    assert!(editor.set_time("10:15"));
    let saved = editor.save().unwrap();
    assert_eq!(saved.cron, "15 10 * * 1,3");

    let updated = service
        .update("u1", task.id, &ScheduledTaskUpdateInput::from(saved), morning())
        .await
        .unwrap();
    assert_eq!(updated.cron, "15 10 * * 1,3");
    // 2026-03-02 is a Monday
    assert_eq!(updated.next_run_at, Utc.with_ymd_and_hms(2026, 3, 2, 10, 15, 0).unwrap());
    assert_eq!(updated.summary(&Catalog::english()), "every Mon, Wed at 10:15");
}

#[tokio::test]
async fn test_invalid_cron_is_rejected_on_create() {
    let service = ScheduledTaskService::new(Arc::new(MemoryTaskStore::new()));
    let result = service
        .create("u1", ScheduledTaskCreateInput::new("bad", "61 * * * *", "p"), morning())
        .await;
    assert!(matches!(result, Err(ScheduleError::InvalidExpression(_))));

    let never = service
        .create("u1", ScheduledTaskCreateInput::new("never", "0 0 30 2 *", "p"), morning())
        .await;
    assert!(matches!(never, Err(ScheduleError::Validation { field: "cron", .. })));
}

// ─── File store lifecycle ────────────────────────────────────────

#[tokio::test]
async fn test_file_store_dispatch_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let task_id = {
        let store = FileTaskStore::new(&path).await.unwrap();
        let service = ScheduledTaskService::new(Arc::new(store));
        let input = ScheduledTaskCreateInput::new("tz digest", "0 9 * * *", "Digest")
            .with_timezone("Asia/Shanghai");
        let task = service.create("u1", input, morning()).await.unwrap();
        // 09:00 Shanghai is 01:00 UTC; already past at 06:00 UTC
        assert_eq!(task.next_run_at, Utc.with_ymd_and_hms(2026, 3, 3, 1, 0, 0).unwrap());
        task.id
    };

    // Reopen from disk
    let store = FileTaskStore::new(&path).await.unwrap();
    let service = ScheduledTaskService::new(Arc::new(store));

    let at = morning() + Duration::hours(20);
    let response = service.dispatch_due(DispatchRequest::default(), at).await.unwrap();
    assert_eq!(response.dispatched, 1);

    let task = service.get("u1", task_id).await.unwrap();
    assert_eq!(task.next_run_at, Utc.with_ymd_and_hms(2026, 3, 4, 1, 0, 0).unwrap());
    assert_eq!(task.last_run_id, Some(response.run_ids[0]));

    service.delete("u1", task_id).await.unwrap();
    let listed = service.list("u1", ListQuery::default()).await.unwrap();
    assert!(listed.is_empty());

    let response = service
        .dispatch_due(DispatchRequest::default(), at + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(response.dispatched, 0);
}
