//! Push event payload structures

use serde::Deserialize;

/// The part of a push delivery that litepipe cares about.
///
/// `head_commit` is required; a delivery without it (branch deletion, for
/// instance) is rejected as a decode error.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    pub head_commit: Commit,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Commit {
    pub id: String,
    pub message: String,
    pub timestamp: String,
    pub author: CommitAuthor,
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl PushEvent {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

impl Commit {
    /// Every touched path: added, then modified, then removed.
    pub fn changed_paths(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(&self.modified)
            .chain(&self.removed)
            .map(String::as_str)
    }

    /// First line of the commit message, as shown in logs.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}
