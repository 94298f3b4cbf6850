// Repository resource.
// Listings (branches, commits, issues, pulls) are lazy paginated
// sequences; single-object fetches decode one page.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::{API_BASE, CachingClient};
use crate::error::{Error, Result};
use crate::pager::{Items, List};

use super::commit::RepoCommit;
use super::issue::RepoIssue;
use super::pull::PullRequest;

/// A repository handle: owner and name. Carries no fetched state; all
/// data access goes through the client passed to each method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    owner: String,
    name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an `owner/name` path. Anything else yields `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.split('/').collect::<Vec<_>>()[..] {
            [owner, name] if !owner.is_empty() && !name.is_empty() => {
                Some(Self::new(owner, name))
            }
            _ => None,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name` path fragment.
    pub fn path(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Full API URL of the repository.
    pub fn full_path(&self) -> String {
        format!("{}/repos/{}", API_BASE, self.path())
    }

    fn to_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.full_path(), suffix)
    }

    /// Lazy listing of the repository's branches.
    pub fn branches<'a>(&self, client: &'a CachingClient) -> List<'a, RepoBranch> {
        Items::new(self.to_url("branches"), client)
    }

    /// Lazy listing of the commits reachable from the given branch.
    /// A blank branch lists the default branch's history.
    pub fn commits<'a>(&self, client: &'a CachingClient, branch: &str) -> List<'a, RepoCommit> {
        Items::new(self.commits_url(branch), client)
    }

    fn commits_url(&self, branch: &str) -> String {
        let branch = branch.trim();
        if branch.is_empty() {
            self.to_url("commits")
        } else {
            self.to_url(&format!("commits?sha={}", branch))
        }
    }

    /// Lazy listing of issues with the given state, author, and assignee.
    ///
    /// A blank assignee selects unassigned issues; a blank author applies
    /// no creator filter. Note that the API counts every pull request as
    /// an issue.
    pub fn issues<'a>(
        &self,
        client: &'a CachingClient,
        state: &str,
        author: &str,
        assignee: &str,
    ) -> List<'a, RepoIssue> {
        let mut params = vec![format!("state={}", state)];

        let assignee = assignee.trim();
        params.push(format!(
            "assignee={}",
            if assignee.is_empty() { "none" } else { assignee }
        ));

        if !author.trim().is_empty() {
            params.push(format!("creator={}", author.trim()));
        }

        Items::new(self.to_url(&format!("issues?{}", params.join("&"))), client)
    }

    /// Lazy listing of pull requests against the given base branch and in
    /// the given state.
    pub fn pulls<'a>(
        &self,
        client: &'a CachingClient,
        base: &str,
        state: &str,
    ) -> List<'a, PullRequest> {
        let url = self.to_url(&format!("pulls?base={}&state={}", base, state));
        Items::new(url, client)
    }

    /// Fetch a single branch by name.
    pub async fn branch(
        &self,
        client: &CachingClient,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<RepoBranch> {
        let url = self.to_url(&format!("branches/{}", name));
        client.get(&url, true, cancel).await.decode()
    }

    /// Whether a branch with the given name exists.
    pub async fn branch_exists(
        &self,
        client: &CachingClient,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        match self.branch(client, name, cancel).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetch a single commit by SHA.
    pub async fn commit(
        &self,
        client: &CachingClient,
        sha: &str,
        cancel: &CancellationToken,
    ) -> Result<RepoCommit> {
        let url = self.to_url(&format!("commits/{}", sha));
        client.get(&url, true, cancel).await.decode()
    }

    /// Fetch a single issue by number.
    pub async fn issue(
        &self,
        client: &CachingClient,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<RepoIssue> {
        let url = self.to_url(&format!("issues/{}", number));
        client.get(&url, true, cancel).await.decode()
    }

    /// Fetch a single pull request by number.
    pub async fn pull(
        &self,
        client: &CachingClient,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<PullRequest> {
        let url = self.to_url(&format!("pulls/{}", number));
        client.get(&url, true, cancel).await.decode()
    }

    /// Whether the given login is a collaborator on the repository.
    /// The API answers 204 for collaborators and 404 otherwise.
    pub async fn is_collaborator(
        &self,
        client: &CachingClient,
        login: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let url = self.to_url(&format!("collaborators/{}", login));
        let page = client.get(&url, true, cancel).await;
        match page.error {
            None => Ok(true),
            Some(Error::NotFound(_)) => Ok(false),
            Some(e) => Err(e),
        }
    }
}

/// A repository branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoBranch {
    pub name: String,
    pub commit: Option<BranchRef>,
    #[serde(default)]
    pub protected: bool,
}

impl RepoBranch {
    /// The commit ref the branch currently points at, if the listing
    /// included one.
    pub fn head_commit(&self) -> Option<&BranchRef> {
        self.commit.as_ref()
    }
}

/// The commit a branch points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRef {
    pub sha: String,
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_urls() {
        let repo = Repository::new("brinick", "widgets");
        assert_eq!(repo.path(), "brinick/widgets");
        assert_eq!(
            repo.full_path(),
            "https://api.github.com/repos/brinick/widgets"
        );
        assert_eq!(
            repo.to_url("branches/main"),
            "https://api.github.com/repos/brinick/widgets/branches/main"
        );
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            Repository::from_path("a/b"),
            Some(Repository::new("a", "b"))
        );
        assert_eq!(Repository::from_path("a"), None);
        assert_eq!(Repository::from_path("a/b/c"), None);
        assert_eq!(Repository::from_path("/b"), None);
    }

    #[test]
    fn test_branch_decodes() {
        let json = r#"{"name":"main","commit":{"sha":"abc123","url":"u"},"protected":true}"#;
        let branch: RepoBranch = serde_json::from_str(json).unwrap();
        assert_eq!(branch.name, "main");
        assert_eq!(branch.head_commit().unwrap().sha, "abc123");
        assert!(branch.protected);
    }

    #[test]
    fn test_branch_without_commit_has_no_head() {
        let branch: RepoBranch = serde_json::from_str(r#"{"name":"orphan"}"#).unwrap();
        assert!(branch.head_commit().is_none());
    }

    #[test]
    fn test_commits_url_filters_by_branch() {
        let repo = Repository::new("a", "b");
        assert_eq!(
            repo.commits_url("dev"),
            "https://api.github.com/repos/a/b/commits?sha=dev"
        );
        // blank branch applies no filter
        assert_eq!(
            repo.commits_url(""),
            "https://api.github.com/repos/a/b/commits"
        );
        assert_eq!(
            repo.commits_url("  "),
            "https://api.github.com/repos/a/b/commits"
        );
    }
}
