// Pagination over multi-page GET results.
// PageIterator walks raw pages following Link continuations; Items decodes
// each page body into typed elements and hides the page boundaries.

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{CachingClient, FetchPage, Page};
use crate::error::{Error, Result};

/// Cursor position within a paginated listing.
#[derive(Debug)]
enum Cursor {
    /// No page fetched yet; the next fetch hits the start URL.
    Unstarted,
    /// Holds the continuation of the last fetched page, if any.
    Current { next: Option<String> },
    /// Terminal: no further pages.
    Done,
}

/// Forward-only pull cursor over the pages of one paginated listing.
///
/// Each call to [`next`](Self::next) performs at most one GET. A fetch
/// error is sticky: the iterator returns no further pages and replays the
/// error from [`error`](Self::error) until a fresh iterator is built.
pub struct PageIterator<F> {
    fetcher: F,
    start_url: String,
    cursor: Cursor,
    error: Option<Error>,
}

impl<F: FetchPage> PageIterator<F> {
    pub fn new(start_url: impl Into<String>, fetcher: F) -> Self {
        Self {
            fetcher,
            start_url: start_url.into(),
            cursor: Cursor::Unstarted,
            error: None,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted or
    /// the iterator has failed.
    ///
    /// A page is last when it carries no content or no continuation link;
    /// neither is an error. A page that carries an error is still returned
    /// so the caller can inspect its status code, but the iterator
    /// remembers the failure and will not issue further requests.
    pub async fn next(&mut self, cancel: &CancellationToken) -> Option<Page> {
        if self.error.is_some() {
            return None;
        }

        let url = match &self.cursor {
            Cursor::Unstarted => self.start_url.clone(),
            Cursor::Current { next: Some(next) } => next.clone(),
            Cursor::Current { next: None } | Cursor::Done => {
                self.cursor = Cursor::Done;
                return None;
            }
        };

        let page = self.fetcher.fetch_page(&url, cancel).await;

        if let Some(err) = &page.error {
            debug!(url, error = %err, "page fetch failed");
            self.error = Some(err.clone());
            self.cursor = Cursor::Done;
        } else if page.no_content() || page.is_last() {
            self.cursor = Cursor::Current { next: None };
        } else {
            let next = page.content.as_ref().map(|c| c.next_link.clone());
            self.cursor = Cursor::Current { next };
        }

        Some(page)
    }

    /// The sticky error from the last failed fetch, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}

/// Lazy sequence of typed elements drawn from a paginated listing.
///
/// Each page body is decoded as a JSON array of `T`; a new page is fetched
/// only once the current batch is consumed. The sequence is not
/// restartable: once exhausted or failed, build a fresh one to
/// re-enumerate.
pub struct Items<T, F> {
    pages: PageIterator<F>,
    batch: std::vec::IntoIter<T>,
    done: bool,
    error: Option<Error>,
}

/// Typed listing bound to a shared [`CachingClient`].
pub type List<'a, T> = Items<T, &'a CachingClient>;

impl<T: DeserializeOwned, F: FetchPage> Items<T, F> {
    pub fn new(start_url: impl Into<String>, fetcher: F) -> Self {
        Self {
            pages: PageIterator::new(start_url, fetcher),
            batch: Vec::new().into_iter(),
            done: false,
            error: None,
        }
    }

    /// Pull the next element, fetching a further page when the current
    /// batch is exhausted. `None` means the sequence is exhausted, failed,
    /// or cancelled; [`error`](Self::error) distinguishes the cases.
    pub async fn next(&mut self, cancel: &CancellationToken) -> Option<T> {
        if self.error.is_some() || self.done {
            return None;
        }
        if cancel.is_cancelled() {
            self.error = Some(Error::Cancelled);
            return None;
        }

        loop {
            if let Some(item) = self.batch.next() {
                return Some(item);
            }

            let page = match self.pages.next(cancel).await {
                Some(page) => page,
                None => {
                    // Distinguish plain exhaustion from an earlier failure.
                    match self.pages.error() {
                        Some(err) => self.error = Some(err.clone()),
                        None => self.done = true,
                    }
                    return None;
                }
            };

            if let Some(err) = page.error {
                self.error = Some(err);
                return None;
            }
            if page.no_content() {
                self.done = true;
                return None;
            }

            let body = page.content.map(|c| c.body).unwrap_or_default();
            match serde_json::from_str::<Vec<T>>(&body) {
                Ok(items) => self.batch = items.into_iter(),
                Err(e) => {
                    self.error = Some(Error::Json(e.to_string()));
                    return None;
                }
            }
        }
    }

    /// The sticky error, if the sequence has failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Drain the remaining elements into a vector, failing if the
    /// sequence ends with an error rather than exhaustion.
    pub async fn collect(mut self, cancel: &CancellationToken) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(item) = self.next(cancel).await {
            out.push(item);
        }
        match self.error {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves pages out of an in-memory map and records every URL hit.
    struct MockFetcher {
        pages: HashMap<String, CacheEntry>,
        errors: HashMap<String, Error>,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                errors: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn page(mut self, url: &str, body: &str, next: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                CacheEntry {
                    body: body.to_string(),
                    next_link: next.to_string(),
                    ..Default::default()
                },
            );
            self
        }

        fn error(mut self, url: &str, err: Error) -> Self {
            self.errors.insert(url.to_string(), err);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl FetchPage for MockFetcher {
        async fn fetch_page(&self, url: &str, _cancel: &CancellationToken) -> Page {
            self.calls.lock().unwrap().push(url.to_string());

            if let Some(err) = self.errors.get(url) {
                return Page {
                    url: url.to_string(),
                    status: Some(StatusCode::FORBIDDEN),
                    content: None,
                    error: Some(err.clone()),
                };
            }
            match self.pages.get(url) {
                Some(entry) => Page {
                    url: url.to_string(),
                    status: Some(StatusCode::OK),
                    content: Some(entry.clone()),
                    error: None,
                },
                None => Page {
                    url: url.to_string(),
                    status: Some(StatusCode::NOT_FOUND),
                    content: None,
                    error: Some(Error::NotFound(url.to_string())),
                },
            }
        }
    }

    #[tokio::test]
    async fn test_enumerates_all_pages_in_order() {
        let fetcher = MockFetcher::new()
            .page("p1", "[1,2]", "p2")
            .page("p2", "[3]", "p3")
            .page("p3", "[4,5]", "");
        let cancel = CancellationToken::new();

        let items: Items<i32, _> = Items::new("p1", &fetcher);
        let all = items.collect(&cancel).await.unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
        // pages 1..3 fetched exactly once, nothing beyond the last page
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_exhaustion() {
        let fetcher = MockFetcher::new().page("p1", "[]", "");
        let cancel = CancellationToken::new();

        let mut items: Items<i32, _> = Items::new("p1", &fetcher);
        assert!(items.next(&cancel).await.is_none());
        assert!(items.error().is_none());

        // exhausted, not restartable: no further fetches
        assert!(items.next(&cancel).await.is_none());
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_error_is_sticky() {
        let fetcher = MockFetcher::new()
            .page("p1", "[1]", "p2")
            .error("p2", Error::Forbidden("p2".to_string()));
        let cancel = CancellationToken::new();

        let mut items: Items<i32, _> = Items::new("p1", &fetcher);
        assert_eq!(items.next(&cancel).await, Some(1));
        assert!(items.next(&cancel).await.is_none());
        assert_eq!(items.error(), Some(&Error::Forbidden("p2".to_string())));

        // a failed sequence never self-heals or re-fetches
        assert!(items.next(&cancel).await.is_none());
        assert_eq!(items.error(), Some(&Error::Forbidden("p2".to_string())));
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cancellation_mid_enumeration() {
        let fetcher = MockFetcher::new()
            .page("p1", "[1]", "p2")
            .page("p2", "[2]", "p3")
            .page("p3", "[3]", "");
        let cancel = CancellationToken::new();

        let mut items: Items<i32, _> = Items::new("p1", &fetcher);
        assert_eq!(items.next(&cancel).await, Some(1));

        cancel.cancel();
        assert!(items.next(&cancel).await.is_none());
        assert_eq!(items.error(), Some(&Error::Cancelled));

        // failed state persists even with a fresh token
        let fresh = CancellationToken::new();
        assert!(items.next(&fresh).await.is_none());
        assert_eq!(items.error(), Some(&Error::Cancelled));
    }

    #[tokio::test]
    async fn test_decode_failure_is_sticky_error() {
        let fetcher = MockFetcher::new().page("p1", r#"{"not":"an array"}"#, "");
        let cancel = CancellationToken::new();

        let mut items: Items<i32, _> = Items::new("p1", &fetcher);
        assert!(items.next(&cancel).await.is_none());
        match items.error() {
            Some(Error::Json(_)) => {}
            other => panic!("expected Json error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_page_iterator_termination() {
        let fetcher = MockFetcher::new()
            .page("p1", "[1]", "p2")
            .page("p2", "[2]", "");
        let cancel = CancellationToken::new();

        let mut pages = PageIterator::new("p1", &fetcher);
        assert!(pages.next(&cancel).await.is_some());
        assert!(pages.next(&cancel).await.is_some());
        assert!(pages.next(&cancel).await.is_none());
        assert!(pages.error().is_none());
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_page_iterator_failed_does_not_reissue() {
        let fetcher = MockFetcher::new().error("p1", Error::Forbidden("p1".to_string()));
        let cancel = CancellationToken::new();

        let mut pages = PageIterator::new("p1", &fetcher);
        let page = pages.next(&cancel).await.unwrap();
        assert_eq!(page.status, Some(StatusCode::FORBIDDEN));
        assert!(page.error.is_some());

        assert!(pages.next(&cancel).await.is_none());
        assert_eq!(pages.error(), Some(&Error::Forbidden("p1".to_string())));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_content_page_mid_sequence_terminates() {
        // a 204-style page carries no body and no continuation
        let fetcher = MockFetcher::new()
            .page("p1", "[1]", "p2")
            .page("p2", "", "");
        let cancel = CancellationToken::new();

        let items: Items<i32, _> = Items::new("p1", &fetcher);
        let all = items.collect(&cancel).await.unwrap();
        assert_eq!(all, vec![1]);
    }
}
