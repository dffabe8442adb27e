//! Scheduled task persistence
//!
//! Provides pluggable storage backends for scheduled tasks.

use crate::error::Result;
use crate::task::ScheduledTask;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Claim size used when a caller passes a non-positive limit
pub const DEFAULT_CLAIM_LIMIT: usize = 50;

/// Paging for [`ScheduledTaskStore::list_by_user`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
    pub include_deleted: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            include_deleted: false,
        }
    }
}

/// Scheduled task storage trait
#[async_trait]
pub trait ScheduledTaskStore: Send + Sync {
    /// Insert or replace a task
    async fn save(&self, task: &ScheduledTask) -> Result<()>;

    /// Load a task by ID
    async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<ScheduledTask>>;

    /// A user's tasks, newest first
    async fn list_by_user(&self, user_id: &str, query: ListQuery) -> Result<Vec<ScheduledTask>>;

    /// Mark a task deleted; returns false if it does not exist
    async fn soft_delete(&self, id: Uuid) -> Result<bool>;

    /// Enabled, live tasks whose `next_run_at` has passed, oldest first
    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledTask>>;
}

fn claim_limit(limit: i64) -> usize {
    usize::try_from(limit)
        .ok()
        .filter(|&limit| limit > 0)
        .unwrap_or(DEFAULT_CLAIM_LIMIT)
}

fn select_due<'a>(
    tasks: impl Iterator<Item = &'a ScheduledTask>,
    now: DateTime<Utc>,
    limit: i64,
) -> Vec<ScheduledTask> {
    let mut due: Vec<ScheduledTask> = tasks.filter(|t| t.is_due(now)).cloned().collect();
    due.sort_by(|a, b| a.next_run_at.cmp(&b.next_run_at).then(a.created_at.cmp(&b.created_at)));
    due.truncate(claim_limit(limit));
    due
}

fn select_by_user<'a>(
    tasks: impl Iterator<Item = &'a ScheduledTask>,
    user_id: &str,
    query: ListQuery,
) -> Vec<ScheduledTask> {
    let mut matching: Vec<ScheduledTask> = tasks
        .filter(|t| t.user_id == user_id && (query.include_deleted || !t.is_deleted))
        .cloned()
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect()
}

// ============================================================================
// File-based Store
// ============================================================================

/// JSON file store
///
/// All tasks live in one file, rewritten through a temp file and rename.
pub struct FileTaskStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTaskStore {
    /// Open (or create) the store file at `path`
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if !fs::try_exists(&path).await? {
            fs::write(&path, "[]").await?;
        }
        tracing::debug!(path = %path.display(), "Opened scheduled task store");

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_all(&self) -> Result<Vec<ScheduledTask>> {
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_all(&self, tasks: &[ScheduledTask]) -> Result<()> {
        let json = serde_json::to_string_pretty(tasks)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl ScheduledTaskStore for FileTaskStore {
    async fn save(&self, task: &ScheduledTask) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load_all().await?;

        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => tasks.push(task.clone()),
        }

        self.save_all(&tasks).await
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<ScheduledTask>> {
        let tasks = self.load_all().await?;
        Ok(tasks
            .into_iter()
            .find(|t| t.id == id && (include_deleted || !t.is_deleted)))
    }

    async fn list_by_user(&self, user_id: &str, query: ListQuery) -> Result<Vec<ScheduledTask>> {
        let tasks = self.load_all().await?;
        Ok(select_by_user(tasks.iter(), user_id, query))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut tasks = self.load_all().await?;

        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };
        task.is_deleted = true;

        self.save_all(&tasks).await?;
        Ok(true)
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledTask>> {
        let tasks = self.load_all().await?;
        Ok(select_due(tasks.iter(), now, limit))
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// In-memory scheduled task store
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, ScheduledTask>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduledTaskStore for MemoryTaskStore {
    async fn save(&self, task: &ScheduledTask) -> Result<()> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid, include_deleted: bool) -> Result<Option<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .get(&id)
            .filter(|t| include_deleted || !t.is_deleted)
            .cloned())
    }

    async fn list_by_user(&self, user_id: &str, query: ListQuery) -> Result<Vec<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        Ok(select_by_user(tasks.values(), user_id, query))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(task) => {
                task.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        Ok(select_due(tasks.values(), now, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ScheduledTaskCreateInput;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    fn task(user: &str, name: &str, cron: &str, created: DateTime<Utc>) -> ScheduledTask {
        ScheduledTask::create(user, ScheduledTaskCreateInput::new(name, cron, "prompt"), created)
            .unwrap()
    }

    // ========================================================================
    // MemoryTaskStore Tests
    // ========================================================================

    #[tokio::test]
    async fn test_memory_save_and_get() {
        let store = MemoryTaskStore::new();
        let t = task("u1", "a", "0 9 * * *", base());
        store.save(&t).await.unwrap();

        let loaded = store.get(t.id, false).await.unwrap().unwrap();
        assert_eq!(loaded, t);
        assert!(store.get(Uuid::new_v4(), false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_soft_delete_hides_task() {
        let store = MemoryTaskStore::new();
        let t = task("u1", "a", "0 9 * * *", base());
        store.save(&t).await.unwrap();

        assert!(store.soft_delete(t.id).await.unwrap());
        assert!(!store.soft_delete(Uuid::new_v4()).await.unwrap());

        assert!(store.get(t.id, false).await.unwrap().is_none());
        assert!(store.get(t.id, true).await.unwrap().unwrap().is_deleted);
        assert!(store
            .list_by_user("u1", ListQuery::default())
            .await
            .unwrap()
            .is_empty());
        assert!(store.claim_due(base() + Duration::days(2), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_list_by_user_newest_first() {
        let store = MemoryTaskStore::new();
        for i in 0..5 {
            let t = task("u1", &format!("t{}", i), "0 9 * * *", base() + Duration::minutes(i));
            store.save(&t).await.unwrap();
        }
        store.save(&task("u2", "other", "0 9 * * *", base())).await.unwrap();

        let all = store.list_by_user("u1", ListQuery::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["t4", "t3", "t2", "t1", "t0"]);

        let page = store
            .list_by_user(
                "u1",
                ListQuery {
                    limit: 2,
                    offset: 1,
                    include_deleted: false,
                },
            )
            .await
            .unwrap();
        let names: Vec<&str> = page.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["t3", "t2"]);
    }

    #[tokio::test]
    async fn test_memory_claim_due_order_and_limit() {
        let store = MemoryTaskStore::new();
        let late = task("u1", "late", "30 8 * * *", base());
        let early = task("u1", "early", "10 8 * * *", base());
        let future = task("u1", "future", "0 12 * * *", base());
        let mut disabled = task("u1", "disabled", "5 8 * * *", base());
        disabled.enabled = false;
        for t in [&late, &early, &future, &disabled] {
            store.save(t).await.unwrap();
        }

        let now = base() + Duration::hours(1);
        let due = store.claim_due(now, 0).await.unwrap();
        let names: Vec<&str> = due.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);

        let limited = store.claim_due(now, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].name, "early");
    }

    #[test]
    fn test_claim_limit() {
        assert_eq!(claim_limit(0), DEFAULT_CLAIM_LIMIT);
        assert_eq!(claim_limit(-3), DEFAULT_CLAIM_LIMIT);
        assert_eq!(claim_limit(7), 7);
    }

    // ========================================================================
    // FileTaskStore Tests
    // ========================================================================

    #[tokio::test]
    async fn test_file_store_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let t = task("u1", "persistent", "0 9 * * *", base());

        {
            let store = FileTaskStore::new(&path).await.unwrap();
            store.save(&t).await.unwrap();
        }

        let store = FileTaskStore::new(&path).await.unwrap();
        let tasks = store.list_by_user("u1", ListQuery::default()).await.unwrap();
        assert_eq!(tasks, vec![t]);
    }

    #[tokio::test]
    async fn test_file_store_update_in_place() {
        let dir = tempdir().unwrap();
        let store = FileTaskStore::new(dir.path().join("tasks.json")).await.unwrap();

        let mut t = task("u1", "v1", "0 9 * * *", base());
        store.save(&t).await.unwrap();
        t.name = "v2".to_string();
        store.save(&t).await.unwrap();

        let tasks = store.list_by_user("u1", ListQuery::default()).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "v2");
    }

    #[tokio::test]
    async fn test_file_store_delete_and_claim() {
        let dir = tempdir().unwrap();
        let store = FileTaskStore::new(dir.path().join("tasks.json")).await.unwrap();

        let keep = task("u1", "keep", "15 8 * * *", base());
        let removed = task("u1", "removed", "20 8 * * *", base());
        store.save(&keep).await.unwrap();
        store.save(&removed).await.unwrap();
        assert!(store.soft_delete(removed.id).await.unwrap());

        let due = store.claim_due(base() + Duration::hours(1), 50).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, keep.id);
        assert!(store.get(removed.id, true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileTaskStore::new(&path).await.unwrap();
        assert!(store.list_by_user("u1", ListQuery::default()).await.is_err());
    }

    #[test]
    fn test_memory_store_from_sync_code() {
        let store = MemoryTaskStore::new();
        let first = task("u1", "first", "0 9 * * *", base());
        tokio_test::block_on(store.save(&first)).unwrap();

        let listed = tokio_test::block_on(store.list_by_user("u1", ListQuery::default())).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!tokio_test::block_on(store.soft_delete(uuid::Uuid::new_v4())).unwrap());
    }
}
