// Typed GitHub resources.
// Thin factories over the generic pagination layer, one module per
// resource family.

pub mod commit;
pub mod issue;
pub mod org;
pub mod pull;
pub mod repo;

pub use commit::{CommitFile, CommitStats, CommitStatus, RepoCommit};
pub use issue::{IssueComment, RepoIssue};
pub use org::{Organisation, Team, TeamMember};
pub use pull::PullRequest;
pub use repo::{BranchRef, RepoBranch, Repository};

use serde::{Deserialize, Serialize};

/// Placeholder for fields GitHub may omit.
pub const NOT_AVAILABLE: &str = "<n/a>";

/// A GitHub user account, as embedded in commits, issues, and pull
/// requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    pub id: Option<u64>,
    pub url: Option<String>,
    pub html_url: Option<String>,
}

/// Login of an optional user, or the not-available placeholder.
pub(crate) fn login_or_na(user: Option<&User>) -> &str {
    user.map(|u| u.login.as_str()).unwrap_or(NOT_AVAILABLE)
}
