//! Background task registry.
//!
//! Records live for the lifetime of the process; nothing is evicted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::ScrapeResult;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Lifecycle of a background task. Variants are declared in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Scraping,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Transitions only move forward and never leave a terminal state.
    /// Skipping ahead is allowed: a cache hit completes a pending task
    /// directly, and a rate-limited one fails straight from pending.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        !self.is_terminal() && next > self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Scraping => "scraping",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub url: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub result: Option<ScrapeResult>,
    pub error: Option<String>,
}

/// Count of tasks per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub scraping: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending task and return its id.
    pub async fn create(&self, url: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let record = TaskRecord {
            id: id.clone(),
            url: url.to_string(),
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            result: None,
            error: None,
        };
        self.tasks.write().await.insert(id.clone(), record);
        id
    }

    pub async fn get(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(id).cloned()
    }

    /// Move a task to a non-terminal status.
    pub async fn advance(&self, id: &str, status: TaskStatus) -> Result<(), TaskError> {
        self.update(id, status, |_| {}).await
    }

    pub async fn complete(&self, id: &str, result: ScrapeResult) -> Result<(), TaskError> {
        self.update(id, TaskStatus::Completed, |record| {
            record.result = Some(result);
        })
        .await
    }

    pub async fn fail(&self, id: &str, error: impl Into<String>) -> Result<(), TaskError> {
        let error = error.into();
        self.update(id, TaskStatus::Failed, |record| {
            record.error = Some(error);
        })
        .await
    }

    pub async fn counts(&self) -> TaskCounts {
        let tasks = self.tasks.read().await;
        let mut counts = TaskCounts::default();
        for record in tasks.values() {
            match record.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Scraping => counts.scraping += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn update(
        &self,
        id: &str,
        status: TaskStatus,
        apply: impl FnOnce(&mut TaskRecord),
    ) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        if !record.status.can_transition_to(status) {
            return Err(TaskError::InvalidTransition {
                id: id.to_string(),
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        apply(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_rules() {
        use TaskStatus::*;

        assert!(Pending.can_transition_to(Scraping));
        assert!(Scraping.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Scraping.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));

        assert!(!Processing.can_transition_to(Scraping));
        assert!(!Scraping.can_transition_to(Scraping));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        assert_eq!(TaskStatus::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = TaskRegistry::new();
        let id = registry.create("https://example.com/").await;

        assert_eq!(id.len(), 32);
        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.url, "https://example.com/");
        assert!(record.result.is_none());
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = TaskRegistry::new();
        let a = registry.create("https://a.test/").await;
        let b = registry.create("https://a.test/").await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_forward_path_and_failure() {
        let registry = TaskRegistry::new();
        let id = registry.create("https://example.com/").await;

        registry.advance(&id, TaskStatus::Scraping).await.unwrap();
        registry.fail(&id, "boom").await.unwrap();

        let record = registry.get(&id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));

        let err = registry
            .advance(&id, TaskStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidTransition { .. }));
        assert_eq!(registry.get(&id).await.unwrap().status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let registry = TaskRegistry::new();
        assert!(registry.get("nope").await.is_none());
        assert_eq!(
            registry.advance("nope", TaskStatus::Scraping).await,
            Err(TaskError::NotFound("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_counts() {
        let registry = TaskRegistry::new();
        let a = registry.create("https://a.test/").await;
        let _b = registry.create("https://b.test/").await;
        registry.advance(&a, TaskStatus::Scraping).await.unwrap();

        let counts = registry.counts().await;
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.scraping, 1);
        assert_eq!(counts.completed, 0);
    }
}
