// Authorization header construction.
// Supplies the Accept/Authorization headers every request carries, from a
// pluggable token source.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::{Error, Result};

/// Accept header value selecting the stable REST API.
pub const ACCEPT_STABLE: &str = "application/vnd.github.v3+json";

/// Accept header value selecting the preview REST API.
pub const ACCEPT_PREVIEW: &str = "application/vnd.github.korra-preview";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

const USER_AGENT_VALUE: &str = "hubcache";

/// Supplies the headers that authorize a request.
///
/// Implementations must include an `Accept` header selecting the stable or
/// preview API version and an `Authorization` header. The client treats
/// this as an opaque capability.
pub trait AuthHeaders: Send + Sync {
    /// Headers for a request against the stable (`true`) or preview
    /// (`false`) API version.
    fn headers(&self, stable: bool) -> Result<HeaderMap>;
}

/// Token-based auth using a personal access token.
#[derive(Debug, Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_string(),
        }
    }

    /// Read the token from the `GITHUB_TOKEN` environment variable.
    /// Fails with [`Error::MissingToken`] when unset, letting the caller
    /// decide whether absence is fatal.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).map_err(|_| Error::MissingToken)?;
        Ok(Self::new(token))
    }
}

impl AuthHeaders for TokenAuth {
    fn headers(&self, stable: bool) -> Result<HeaderMap> {
        let accept = if stable { ACCEPT_STABLE } else { ACCEPT_PREVIEW };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}", self.token))
                .map_err(|e| Error::Transport(e.to_string()))?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }
}

/// Remaining/limit API call counters for the current token, as reported
/// by the rate-limit endpoint. Unparseable headers leave the counter at -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiCalls {
    pub remaining: i64,
    pub limit: i64,
}

impl Default for ApiCalls {
    fn default() -> Self {
        Self {
            remaining: -1,
            limit: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_headers() {
        let auth = TokenAuth::new("  abc123  ");
        let headers = auth.headers(true).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), ACCEPT_STABLE);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "token abc123");
        assert!(headers.get(USER_AGENT).is_some());
    }

    #[test]
    fn test_preview_headers() {
        let auth = TokenAuth::new("abc123");
        let headers = auth.headers(false).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), ACCEPT_PREVIEW);
    }

    #[test]
    fn test_api_calls_default_sentinels() {
        let calls = ApiCalls::default();
        assert_eq!(calls.remaining, -1);
        assert_eq!(calls.limit, -1);
    }
}
