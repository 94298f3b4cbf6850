// Issue resource.
// Issues come back from paginated listings; comments hang off each
// issue's own URL.

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CachingClient;
use crate::error::Result;
use crate::pager::{Items, List};

use super::{User, login_or_na};

/// A repository issue. Every pull request is also an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoIssue {
    pub number: u64,
    pub url: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    pub assignee: Option<User>,
    #[serde(default)]
    pub assignees: Vec<User>,
    #[serde(rename = "user")]
    pub author: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl RepoIssue {
    fn to_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.url, suffix)
    }

    /// Lazy listing of the comments on this issue.
    pub fn comments<'a>(&self, client: &'a CachingClient) -> List<'a, IssueComment> {
        Items::new(self.to_url("comments"), client)
    }

    /// Post a new comment with the given body, returning the raw HTTP
    /// status code.
    pub async fn post_comment(
        &self,
        client: &CachingClient,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<StatusCode> {
        let url = self.to_url("comments");
        let payload = serde_json::json!({ "body": body });
        client.post(&url, true, &payload, cancel).await
    }
}

impl fmt::Display for RepoIssue {
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

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "user")]
    pub author: Option<User>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IssueComment {
    /// Replace the comment's body, returning the raw HTTP status code.
    pub async fn update(
        &self,
        client: &CachingClient,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<StatusCode> {
        let payload = serde_json::json!({ "body": body });
        client.patch(&self.url, true, &payload, cancel).await
    }
}
