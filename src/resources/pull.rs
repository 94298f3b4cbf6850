// Pull request resource.
// Pull requests come back from paginated listings; their commits and
// changed files are paginated listings of their own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CachingClient;
use crate::error::Result;
use crate::pager::{Items, List};

use super::commit::{CommitFile, RepoCommit};
use super::{User, login_or_na};

/// Pull request states accepted by the listing endpoint.
pub const PULL_STATES: [&str; 3] = ["open", "closed", "all"];

/// A pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub html_url: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    #[serde(rename = "user")]
    pub author: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    fn to_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.url, suffix)
    }

    /// Lazy listing of the commits on this pull request.
    pub fn commits<'a>(&self, client: &'a CachingClient) -> List<'a, RepoCommit> {
        Items::new(self.to_url("commits"), client)
    }

    /// Lazy listing of the files changed by this pull request.
    pub fn files<'a>(&self, client: &'a CachingClient) -> List<'a, CommitFile> {
        Items::new(self.to_url("files"), client)
    }

    /// The most recent commit on the pull request, or `None` when it has
    /// no commits. Walks the commit listing; the API orders it oldest
    /// first.
    pub async fn head_commit(
        &self,
        client: &CachingClient,
        cancel: &CancellationToken,
    ) -> Result<Option<RepoCommit>> {
        let mut commits = self.commits(client);
        let mut last = None;
        while let Some(commit) = commits.next(cancel).await {
            last = Some(commit);
        }
        match commits.error() {
            Some(err) => Err(err.clone()),
            None => Ok(last),
        }
    }
}

impl fmt::Display for PullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}:{}] {}",
            self.number,
            login_or_na(self.author.as_ref()),
            self.state,
            self.title
        )
    }
}
