use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Progress of an asynchronous content-generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Completed,
    Failed,
}

/// Status record of one generation job.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    /// Only this user may poll the task.
    pub requester: Uuid,
    pub status: GenerationStatus,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub created_at: SystemTime,
}

/// How long a task stays pollable after it was started.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Process-local registry of generation jobs keyed by task id.
///
/// The spawning request writes `pending`; the background job writes the terminal
/// state once. Terminal records are never overwritten. Tasks older than the
/// retention are dropped whenever a new one starts.
pub struct GenerationRegistry {
    tasks: DashMap<Uuid, GenerationTask>,
    retention: Duration,
}

impl Default for GenerationRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            tasks: DashMap::new(),
            retention,
        }
    }

    /// Register a new pending task and return its id.
    pub fn start(&self, requester: Uuid) -> Uuid {
        self.prune_expired(SystemTime::now());
        let id = Uuid::new_v4();
        self.tasks.insert(
            id,
            GenerationTask {
                requester,
                status: GenerationStatus::Pending,
                data: None,
                error: None,
                created_at: SystemTime::now(),
            },
        );
        id
    }

    /// Record a successful result. Returns `false` if the task was unknown or already terminal.
    pub fn complete(&self, id: Uuid, data: Value) -> bool {
        self.finish(id, |task| {
            task.status = GenerationStatus::Completed;
            task.data = Some(data);
        })
    }

    /// Record a failure. Returns `false` if the task was unknown or already terminal.
    pub fn fail(&self, id: Uuid, error: String) -> bool {
        self.finish(id, |task| {
            task.status = GenerationStatus::Failed;
            task.error = Some(error);
        })
    }

    fn finish(&self, id: Uuid, apply: impl FnOnce(&mut GenerationTask)) -> bool {
        match self.tasks.get_mut(&id) {
            Some(mut task) if task.status == GenerationStatus::Pending => {
                apply(&mut task);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<GenerationTask> {
        self.tasks.get(&id).map(|task| task.clone())
    }

    /// Drop tasks started more than the retention before `now`; returns how many.
    ///
    /// A job still running when its task expires finds it gone and its result is discarded.
    pub fn prune_expired(&self, now: SystemTime) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| {
            now.duration_since(task.created_at)
                .map_or(true, |age| age <= self.retention)
        });
        before.saturating_sub(self.tasks.len())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terminal_state_is_written_once() {
        let registry = GenerationRegistry::new();
        let requester = Uuid::new_v4();
        let id = registry.start(requester);

        let task = registry.get(id).unwrap();
        assert_eq!(task.status, GenerationStatus::Pending);
        assert_eq!(task.requester, requester);

        assert!(registry.complete(id, json!({"ok": true})));
        assert!(!registry.fail(id, "late failure".into()));

        let task = registry.get(id).unwrap();
        assert_eq!(task.status, GenerationStatus::Completed);
        assert!(task.error.is_none());
    }

    #[test]
    fn unknown_task_cannot_be_finished() {
        let registry = GenerationRegistry::new();
        assert!(!registry.fail(Uuid::new_v4(), "boom".into()));
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn expired_tasks_are_pruned_when_a_new_one_starts() {
        let registry = GenerationRegistry::with_retention(Duration::from_secs(60));
        let old = registry.start(Uuid::new_v4());
        assert!(registry.complete(old, json!({"ok": true})));

        assert_eq!(registry.prune_expired(SystemTime::now()), 0);
        assert!(registry.get(old).is_some());

        let later = SystemTime::now() + Duration::from_secs(120);
        assert_eq!(registry.prune_expired(later), 1);
        assert!(registry.get(old).is_none());
        assert!(registry.is_empty());

        let fresh = registry.start(Uuid::new_v4());
        assert!(!registry.complete(old, json!({"late": true})));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(fresh).is_some());
    }
}
