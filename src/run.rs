use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::webhook::Commit;

/// Maximum commit message length kept on a run before truncation
pub const MAX_COMMIT_MSG_LEN: usize = 500;

/// Represents the status of one accepted delivery
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Skipped,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Failed,
}

/// Outcome of a single configured task
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    /// 1-based position in the configured task list
    pub ordinal: usize,
    pub command: String,
    pub status: TaskStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// One authenticated push delivery and what was done about it
#[derive(Debug, Clone, Serialize)]
pub struct Run {
    pub id: String,
    pub commit_id: String,
    pub commit_message: String,
    pub commit_author: String,
    pub status: RunStatus,
    pub received_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub matched_paths: Vec<String>,
    pub results: Vec<TaskResult>,
}

impl Run {
    /// Create a new run for the delivered head commit
    pub fn from_commit(commit: &Commit) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            commit_id: commit.id.clone(),
            commit_message: truncate_message(&commit.message),
            commit_author: commit.author.name.clone(),
            status: RunStatus::Running,
            received_at: Utc::now(),
            completed_at: None,
            matched_paths: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Mark run as skipped: nothing in the trigger paths changed
    pub fn mark_skipped(&mut self) {
        self.status = RunStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }

    /// Record task results. The run fails if any task failed.
    pub fn mark_finished(&mut self, results: Vec<TaskResult>) {
        self.status = if results.iter().all(TaskResult::is_success) {
            RunStatus::Success
        } else {
            RunStatus::Failed
        };
        self.completed_at = Some(Utc::now());
        self.results = results;
    }

    pub fn failed_tasks(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }
}

fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_COMMIT_MSG_LEN) {
        Some((cut, _)) => format!("{}... (truncated)", &message[..cut]),
        None => message.to_string(),
    }
}
