// Caching HTTP client for the GitHub REST API.
// Performs conditional GETs revalidated against the cache store, and
// uncached POST/PATCH writes.

use std::future::Future;
use std::sync::{Arc, Mutex};

use reqwest::header::{HeaderMap, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{ApiCalls, AuthHeaders, TokenAuth};
use crate::cache::{CacheEntry, CacheStore, fingerprint};
use crate::error::{Error, Result};

/// Base URL of the GitHub REST API.
pub const API_BASE: &str = "https://api.github.com";

/// Result of one GET against a paginated listing: the request URL, the
/// response status, the cached-or-fresh content, and any classification
/// error. Transient; consumed immediately by the iterator layer.
#[derive(Debug)]
pub struct Page {
    /// URL the page was requested from.
    pub url: String,
    /// HTTP status of the response, absent when the request never
    /// produced one (transport failure, cancellation).
    pub status: Option<StatusCode>,
    /// The page content. On a 304 this is the previously cached entry.
    pub content: Option<CacheEntry>,
    /// Classification error, if any. The page is still returned so the
    /// caller can inspect the status code.
    pub error: Option<Error>,
}

impl Page {
    fn ok(url: impl Into<String>, status: StatusCode, entry: CacheEntry) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            content: Some(entry),
            error: None,
        }
    }

    fn failed(url: impl Into<String>, status: Option<StatusCode>, error: Error) -> Self {
        Self {
            url: url.into(),
            status,
            content: None,
            error: Some(error),
        }
    }

    /// Whether there is no page after this one.
    pub fn is_last(&self) -> bool {
        !self.content.as_ref().is_some_and(CacheEntry::has_next)
    }

    /// Whether the page carried no usable content (no entry, an empty
    /// body, or an empty JSON array).
    pub fn no_content(&self) -> bool {
        self.content.as_ref().is_none_or(CacheEntry::is_empty)
    }

    /// Decode the page body into a single value. Fails with the page's
    /// own error when it carries one.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let body = self.content.map(|c| c.body).unwrap_or_default();
        serde_json::from_str(&body).map_err(|e| Error::Json(e.to_string()))
    }
}

/// Capability of fetching one results page by URL. The pagination layer
/// consumes this rather than the concrete client so alternate transports
/// can be substituted.
pub trait FetchPage {
    fn fetch_page(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Page> + Send;
}

impl<F: FetchPage + Sync> FetchPage for &F {
    async fn fetch_page(&self, url: &str, cancel: &CancellationToken) -> Page {
        (**self).fetch_page(url, cancel).await
    }
}

/// GitHub client that caches GET responses and revalidates them with
/// conditional requests.
///
/// Construct one explicitly and share it by reference; there is no
/// process-wide instance. The cache store sits behind a mutex so that
/// independent page iterators may run concurrently against one client;
/// the lock is never held across an await.
pub struct CachingClient {
    http: Client,
    auth: Arc<dyn AuthHeaders>,
    store: Mutex<CacheStore>,
}

impl CachingClient {
    pub fn new(auth: Arc<dyn AuthHeaders>, store: CacheStore) -> Self {
        Self {
            http: Client::new(),
            auth,
            store: Mutex::new(store),
        }
    }

    /// Client using the `GITHUB_TOKEN` environment variable and the
    /// default cache file location.
    pub fn from_env() -> Result<Self> {
        let auth = TokenAuth::from_env()?;
        let store = CacheStore::open_default()?;
        Ok(Self::new(Arc::new(auth), store))
    }

    /// Perform a conditional GET.
    ///
    /// A cached entry for the URL contributes `If-None-Match` /
    /// `If-Modified-Since` headers; a 304 answer is served from the cache
    /// without touching the store, while any other status first evicts the
    /// stale entry. Fresh 200/204 responses are cached and persisted
    /// before the page is returned. Errors are carried on the page rather
    /// than returned, so callers can still inspect the status code.
    pub async fn get(&self, url: &str, stable: bool, cancel: &CancellationToken) -> Page {
        debug!(url, "GET");

        let key = fingerprint(&[("url", url)]);
        let cached = self.locked_store().get(&key).cloned();

        let mut headers = match self.auth.headers(stable) {
            Ok(h) => h,
            Err(e) => return Page::failed(url, None, e),
        };
        if let Some(entry) = &cached {
            if !entry.etag.is_empty()
                && let Ok(v) = HeaderValue::from_str(&entry.etag)
            {
                headers.insert(IF_NONE_MATCH, v);
            }
            if !entry.last_modified.is_empty()
                && let Ok(v) = HeaderValue::from_str(&entry.last_modified)
            {
                headers.insert(IF_MODIFIED_SINCE, v);
            }
        }

        let request = self.http.get(url).headers(headers);
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(url, "cancelled in-flight GET");
                return Page::failed(url, None, Error::Cancelled);
            }
            result = request.send() => match result {
                Ok(r) => r,
                Err(e) => {
                    let error = if cancel.is_cancelled() {
                        Error::Cancelled
                    } else {
                        e.into()
                    };
                    return Page::failed(url, None, error);
                }
            },
        };

        let status = response.status();

        // Still valid remotely: serve the cached entry untouched.
        if status == StatusCode::NOT_MODIFIED {
            return Page::ok(url, status, cached.unwrap_or_default());
        }

        // Any other status is a cache miss: the old entry no longer
        // reflects remote state, so it goes before anything else happens.
        self.evict(&key);

        match status {
            StatusCode::NOT_FOUND => {
                Page::failed(url, Some(status), Error::NotFound(url.to_string()))
            }
            StatusCode::FORBIDDEN => {
                Page::failed(url, Some(status), Error::Forbidden(url.to_string()))
            }
            StatusCode::OK => {
                let etag = header_str(response.headers(), "etag");
                let last_modified = header_str(response.headers(), "last-modified");
                let next_link = parse_next_link(&header_str(response.headers(), "link"))
                    .unwrap_or_default();

                let body = match response.text().await {
                    Ok(b) => b,
                    Err(e) => return Page::failed(url, Some(status), e.into()),
                };

                let entry = CacheEntry {
                    body,
                    etag,
                    last_modified,
                    next_link,
                };
                self.put_entry(&key, entry.clone());
                Page::ok(url, status, entry)
            }
            StatusCode::NO_CONTENT => {
                let entry = CacheEntry {
                    body: String::new(),
                    etag: header_str(response.headers(), "etag"),
                    last_modified: header_str(response.headers(), "last-modified"),
                    next_link: String::new(),
                };
                self.put_entry(&key, entry.clone());
                Page::ok(url, status, entry)
            }
            other => Page::failed(url, Some(other), Error::UnexpectedStatus(other.as_u16())),
        }
    }

    /// Uncached POST of a JSON body, returning the raw status code.
    /// Encode failures are fatal to the call; nothing is sent.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        stable: bool,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<StatusCode> {
        self.send_uncached(Method::POST, url, stable, body, cancel)
            .await
    }

    /// Uncached PATCH of a JSON body, returning the raw status code.
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        stable: bool,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<StatusCode> {
        self.send_uncached(Method::PATCH, url, stable, body, cancel)
            .await
    }

    /// Remaining/limit API call counters for the configured token.
    /// Counters missing or unparseable in the response default to -1.
    pub async fn rate_limit(&self, cancel: &CancellationToken) -> Result<ApiCalls> {
        let url = format!("{}/rate_limit", API_BASE);
        let headers = self.auth.headers(true)?;

        let request = self.http.get(&url).headers(headers);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = request.send() => result?,
        };

        let mut calls = ApiCalls::default();
        if response.status() == StatusCode::OK {
            calls.remaining = header_i64(response.headers(), "x-ratelimit-remaining");
            calls.limit = header_i64(response.headers(), "x-ratelimit-limit");
        }
        Ok(calls)
    }

    async fn send_uncached<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        stable: bool,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<StatusCode> {
        debug!(url, %method, "uncached request");

        let bytes = serde_json::to_vec(body).map_err(|e| Error::Json(e.to_string()))?;
        let headers = self.auth.headers(stable)?;

        let request = self
            .http
            .request(method, url)
            .headers(headers)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(bytes);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = request.send() => match result {
                Ok(r) => r,
                Err(_) if cancel.is_cancelled() => return Err(Error::Cancelled),
                Err(e) => return Err(e.into()),
            },
        };
        Ok(response.status())
    }

    fn locked_store(&self) -> std::sync::MutexGuard<'_, CacheStore> {
        self.store.lock().expect("cache store lock poisoned")
    }

    fn evict(&self, key: &str) {
        let mut store = self.locked_store();
        if store.remove(key)
            && let Err(e) = store.persist()
        {
            warn!(error = %e, "failed to persist cache after eviction");
        }
    }

    fn put_entry(&self, key: &str, entry: CacheEntry) {
        let mut store = self.locked_store();
        store.put(key, entry);
        if let Err(e) = store.persist() {
            warn!(error = %e, "failed to persist cache after update");
        }
    }
}

impl FetchPage for CachingClient {
    async fn fetch_page(&self, url: &str, cancel: &CancellationToken) -> Page {
        self.get(url, true, cancel).await
    }
}

/// Extract the `rel="next"` continuation URL from a `Link` header value.
///
/// The value is a comma-separated list of `<url>; rel="relation"`
/// descriptors. Only the descriptor whose relation is exactly `next`
/// counts; malformed descriptors are skipped. A single-page result has no
/// `Link` header at all, which yields `None`.
pub fn parse_next_link(header: &str) -> Option<String> {
    if header.is_empty() {
        return None;
    }

    for descriptor in header.split(',') {
        let mut parts = descriptor.splitn(2, ';');
        let (url, relation) = match (parts.next(), parts.next()) {
            (Some(u), Some(r)) => (u, r),
            _ => {
                warn!(descriptor, "skipping malformed link descriptor");
                continue;
            }
        };

        if relation.trim().starts_with("rel=\"next\"") {
            let url = url.trim().trim_matches(|c| c == '<' || c == '>');
            return Some(url.to_string());
        }
    }

    None
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn header_i64(headers: &HeaderMap, name: &str) -> i64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_link_single() {
        let header = r#"<https://api.github.com/user/repos?page=3&per_page=100>; rel="next""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/user/repos?page=3&per_page=100")
        );
    }

    #[test]
    fn test_parse_next_link_among_others() {
        let header = concat!(
            r#"<https://api.github.com/x?page=1>; rel="prev", "#,
            r#"<https://api.github.com/x?page=3>; rel="next", "#,
            r#"<https://api.github.com/x?page=9>; rel="last""#,
        );
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/x?page=3")
        );
    }

    #[test]
    fn test_parse_next_link_absent() {
        assert_eq!(parse_next_link(""), None);
        let header = r#"<https://api.github.com/x?page=9>; rel="last""#;
        assert_eq!(parse_next_link(header), None);
    }

    #[test]
    fn test_parse_next_link_skips_malformed() {
        let header = r#"garbage-without-semicolon, <https://api.github.com/x?page=2>; rel="next""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.github.com/x?page=2")
        );
    }

    #[test]
    fn test_parse_next_link_relation_is_exact() {
        // rel="nexty" must not match
        let header = r#"<https://api.github.com/x?page=2>; rel="nexty""#;
        assert_eq!(parse_next_link(header), None);
    }

    #[test]
    fn test_page_last_and_content_flags() {
        let page = Page::ok(
            "u",
            StatusCode::OK,
            CacheEntry {
                body: "[]".to_string(),
                ..Default::default()
            },
        );
        assert!(page.is_last());
        assert!(page.no_content());

        let page = Page::ok(
            "u",
            StatusCode::OK,
            CacheEntry {
                body: r#"[{"n":1}]"#.to_string(),
                next_link: "https://api.github.com/x?page=2".to_string(),
                ..Default::default()
            },
        );
        assert!(!page.is_last());
        assert!(!page.no_content());
    }

    #[test]
    fn test_page_decode_propagates_error() {
        let page = Page::failed("u", Some(StatusCode::NOT_FOUND), Error::NotFound("u".into()));
        match page.decode::<serde_json::Value>() {
            Err(Error::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_header_i64_sentinel() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("5000"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("oops"));

        assert_eq!(header_i64(&headers, "x-ratelimit-limit"), 5000);
        assert_eq!(header_i64(&headers, "x-ratelimit-remaining"), -1);
        assert_eq!(header_i64(&headers, "x-ratelimit-reset"), -1);
    }
}
