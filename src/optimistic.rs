//! Optimistic local updates with explicit rollback
//!
//! A mutation is staged against a snapshot, shown immediately, and then
//! committed with the outcome of the remote call. A failed commit hands the
//! snapshot back as [`Rollback`]; restoring it is the caller's job.

use crate::task::ScheduledTask;
use uuid::Uuid;

/// A mutation applied locally but not yet confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct Staged<T> {
    previous: T,
    next: T,
}

/// A rejected mutation: the state to restore and why
#[derive(Debug, Clone, PartialEq)]
pub struct Rollback<T> {
    pub previous: T,
    pub reason: String,
}

impl<T: Clone> Staged<T> {
    /// Snapshot `current` and apply `mutate` to a copy
    pub fn stage(current: &T, mutate: impl FnOnce(&mut T)) -> Self {
        let mut next = current.clone();
        mutate(&mut next);
        Self {
            previous: current.clone(),
            next,
        }
    }

    /// State to display while the remote call is in flight
    pub fn next(&self) -> &T {
        &self.next
    }

    pub fn previous(&self) -> &T {
        &self.previous
    }

    /// Settle with the remote outcome
    pub fn commit<R, E: std::fmt::Display>(
        self,
        remote: std::result::Result<R, E>,
    ) -> std::result::Result<T, Rollback<T>> {
        match remote {
            Ok(_) => Ok(self.next),
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(%reason, "Optimistic update rejected; rolling back");
                Err(Rollback {
                    previous: self.previous,
                    reason,
                })
            }
        }
    }
}

/// Stage enabling/disabling one task in a list; `None` if the task is absent
pub fn stage_set_enabled(
    tasks: &[ScheduledTask],
    id: Uuid,
    enabled: bool,
) -> Option<Staged<Vec<ScheduledTask>>> {
    tasks.iter().any(|t| t.id == id).then(|| {
        Staged::stage(&tasks.to_vec(), |tasks| {
            for task in tasks.iter_mut().filter(|t| t.id == id) {
                task.enabled = enabled;
            }
        })
    })
}

/// Stage removing one task from a list; `None` if the task is absent
pub fn stage_remove(tasks: &[ScheduledTask], id: Uuid) -> Option<Staged<Vec<ScheduledTask>>> {
    tasks
        .iter()
        .any(|t| t.id == id)
        .then(|| Staged::stage(&tasks.to_vec(), |tasks| tasks.retain(|t| t.id != id)))
}
