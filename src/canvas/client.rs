use std::collections::HashSet;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, LINK};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::error::ApiError;
use crate::retry::{self, RetryAction, RetryConfig};

/// Canvas caps `per_page` at 100 on most instances.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const API_PREFIX: &str = "api/v1/";
const TOKEN_PARAM: &str = "access_token";

/// Transport settings for [`CanvasClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub page_size: u32,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// Authenticated client for the Canvas REST API.
///
/// List calls follow `Link: <...>; rel="next"` headers until the last page.
/// Every request is retried with backoff on 429, 5xx and transport errors.
#[derive(Clone)]
pub struct CanvasClient {
    http: Client,
    base_url: Url,
    token: String,
    page_size: u32,
    retry: RetryConfig,
}

impl std::fmt::Debug for CanvasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl CanvasClient {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        config: &ClientConfig,
    ) -> Result<Self, ApiError> {
        // Url::join drops the last path segment unless it ends with '/',
        // which would break instances hosted under a sub-path.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("canvas-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
            token: token.into(),
            page_size: config.page_size.max(1),
            retry: config.retry,
        })
    }

    /// `GET /api/v1/courses`, all pages.
    pub async fn list_courses(&self) -> Result<Vec<Value>, ApiError> {
        self.get_all_pages("courses").await
    }

    /// `GET /api/v1/courses/:id/folders`, all pages.
    pub async fn list_folders(&self, course_id: u64) -> Result<Vec<Value>, ApiError> {
        self.get_all_pages(&format!("courses/{course_id}/folders"))
            .await
    }

    /// `GET /api/v1/folders/:id/files`, all pages.
    pub async fn list_files(&self, folder_id: u64) -> Result<Vec<Value>, ApiError> {
        self.get_all_pages(&format!("folders/{folder_id}/files"))
            .await
    }

    /// Fetch a file's content. Canvas file URLs carry their own verifier, so
    /// no token is attached. An empty body is treated as a failure.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let url = Url::parse(url)?;
        retry::retry_with_backoff(&self.retry, url.path(), classify, || {
            self.attempt_download(&url)
        })
        .await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(API_PREFIX)?.join(path)?;
        url.query_pairs_mut()
            .append_pair("per_page", &self.page_size.to_string())
            .append_pair(TOKEN_PARAM, &self.token);
        Ok(url)
    }

    /// Canvas usually echoes query parameters into its `Link` URLs, but not
    /// always; make sure every page is authenticated.
    fn with_token(&self, mut url: Url) -> Url {
        if !url.query_pairs().any(|(k, _)| k == TOKEN_PARAM) {
            url.query_pairs_mut().append_pair(TOKEN_PARAM, &self.token);
        }
        url
    }

    async fn get_all_pages(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        let mut url = self.endpoint(path)?;
        let mut visited = HashSet::from([url.clone()]);
        let mut records = Vec::new();
        let mut pages = 0u32;
        loop {
            pages += 1;
            let (page, next) = retry::retry_with_backoff(&self.retry, url.path(), classify, || {
                self.attempt_page(&url)
            })
            .await?;
            records.extend(page);
            // A next link back to any page already fetched ends the walk.
            match next.map(|next| self.with_token(next)) {
                Some(next) if visited.insert(next.clone()) => url = next,
                _ => break,
            }
        }
        debug!(path, pages, records = records.len(), "list complete");
        Ok(records)
    }

    async fn attempt_page(&self, url: &Url) -> Result<(Vec<Value>, Option<Url>), ApiError> {
        let path = url.path().to_string();
        debug!("GET {}", path);
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                path,
            });
        }

        let next = next_page_url(response.headers());
        let body = response.bytes().await.map_err(|source| ApiError::Transport {
            path: path.clone(),
            source,
        })?;
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Array(records)) => Ok((records, next)),
            Ok(_) => Err(ApiError::Body {
                path,
                reason: "expected a JSON array".to_string(),
            }),
            Err(e) => Err(ApiError::Body {
                path,
                reason: e.to_string(),
            }),
        }
    }

    async fn attempt_download(&self, url: &Url) -> Result<Vec<u8>, ApiError> {
        let path = url.path().to_string();
        debug!("GET {}", path);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                path,
            });
        }

        let bytes = response.bytes().await.map_err(|source| ApiError::Transport {
            path: path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyPayload { path });
        }
        Ok(bytes.to_vec())
    }
}

fn classify(e: &ApiError) -> RetryAction {
    if e.is_retryable() {
        RetryAction::Retry
    } else {
        RetryAction::Abort
    }
}

/// Extract the `rel="next"` target from RFC 8288 `Link` headers.
pub(crate) fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| {
            let mut parts = link.split(';');
            let target = parts.next()?.trim();
            let is_next = parts.any(|param| {
                let param = param.trim();
                param.eq_ignore_ascii_case("rel=\"next\"") || param.eq_ignore_ascii_case("rel=next")
            });
            if !is_next {
                return None;
            }
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            Url::parse(target).ok()
        })
}
