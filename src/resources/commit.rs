// Commit resource.
// Commits come back from paginated listings; statuses hang off each
// commit's own URL.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CachingClient;
use crate::error::Result;
use crate::pager::{Items, List};

use super::{User, login_or_na};

/// A repository commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoCommit {
    pub sha: String,
    pub url: String,
    pub html_url: Option<String>,
    pub author: Option<User>,
    pub committer: Option<User>,
    pub commit: Option<InnerCommit>,
    pub stats: Option<CommitStats>,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

/// The git-level commit data nested inside the API commit object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerCommit {
    #[serde(default)]
    pub message: String,
    pub committer: Option<CommitterBrief>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitterBrief {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "date")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Line-change statistics for a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub total: u64,
}

/// A file touched by a commit or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    #[serde(rename = "filename")]
    pub name: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
}

impl RepoCommit {
    /// The commit message.
    pub fn message(&self) -> &str {
        self.commit.as_ref().map(|c| c.message.as_str()).unwrap_or_default()
    }

    fn to_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.url, suffix)
    }

    /// Lazy listing of the statuses attached to this commit.
    pub fn statuses<'a>(&self, client: &'a CachingClient) -> List<'a, CommitStatus> {
        Items::new(self.to_url("statuses"), client)
    }

    /// Whether a status equal to the given one is already attached.
    pub async fn has_status(
        &self,
        client: &CachingClient,
        status: &CommitStatus,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let mut statuses = self.statuses(client);
        while let Some(existing) = statuses.next(cancel).await {
            if existing == *status {
                return Ok(true);
            }
        }
        match statuses.error() {
            Some(err) => Err(err.clone()),
            None => Ok(false),
        }
    }

    /// Create the given status on this commit, returning the raw HTTP
    /// status code.
    pub async fn set_status(
        &self,
        client: &CachingClient,
        status: &CommitStatus,
        cancel: &CancellationToken,
    ) -> Result<StatusCode> {
        let url = self.to_url("statuses");
        client.post(&url, true, status, cancel).await
    }
}

impl fmt::Display for RepoCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}",
            self.sha,
            login_or_na(self.author.as_ref()),
            self.message()
        )
    }
}

/// A commit status, as listed and as posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub target_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: String,
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}] {}", self.context, self.state, self.description)
    }
}
