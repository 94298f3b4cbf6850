// Organisation, team, and team-member resources.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::{API_BASE, CachingClient};
use crate::error::{Error, Result};
use crate::pager::{Items, List};

/// A GitHub organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organisation {
    pub login: String,
    pub url: String,
    pub html_url: Option<String>,
    pub description: Option<String>,
}

impl Organisation {
    /// Fetch an organisation by name.
    pub async fn fetch(
        client: &CachingClient,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let url = format!("{}/orgs/{}", API_BASE, name);
        client.get(&url, true, cancel).await.decode()
    }

    /// Lazy listing of the organisation's teams.
    pub fn teams<'a>(&self, client: &'a CachingClient) -> List<'a, Team> {
        Items::new(format!("{}/teams", self.url), client)
    }
}

/// A team within an organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl Team {
    /// Lazy listing of the team's members.
    pub fn members<'a>(&self, client: &'a CachingClient) -> List<'a, TeamMember> {
        Items::new(format!("{}/members", self.url), client)
    }

    /// Whether the given login holds a membership of this team.
    /// The API answers 200 with the membership for members and 404
    /// otherwise.
    pub async fn is_member(
        &self,
        client: &CachingClient,
        login: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let url = format!("{}/memberships/{}", self.url, login);
        let page = client.get(&url, true, cancel).await;
        match page.error {
            None => Ok(page.status == Some(StatusCode::OK)),
            Some(Error::NotFound(_)) => Ok(false),
            Some(e) => Err(e),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.name)
    }
}

/// A member of a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub login: String,
    pub id: Option<u64>,
    pub url: Option<String>,
}

impl fmt::Display for TeamMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.login)
    }
}
