// hubcache: GitHub REST client with conditional-request caching and
// transparent pagination.
//
// GET responses are cached on disk keyed by a fingerprint of the request
// and revalidated with If-None-Match / If-Modified-Since, so unchanged
// listings cost a 304 instead of a full transfer. Multi-page results are
// consumed through lazy pull iterators that follow Link continuations one
// page at a time.

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod pager;
pub mod resources;

pub use auth::{ApiCalls, AuthHeaders, TokenAuth};
pub use cache::{CacheEntry, CacheStore};
pub use client::{API_BASE, CachingClient, FetchPage, Page};
pub use error::{Error, Result};
pub use pager::{Items, List, PageIterator};
pub use resources::{
    CommitStatus, IssueComment, Organisation, PullRequest, RepoBranch, RepoCommit, RepoIssue,
    Repository, Team, TeamMember, User,
};
