// Hand-crafted async HTTP client for the book-review microservice API.
//
// Base path: e.g. http://localhost:3002/api/
// Auth: bearer token + optional x-api-key header

use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::auth::Credential;
use crate::{Error, envelope, types};

// ── Error response shape from the microservice ───────────────────────

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    message: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the book-review microservice.
///
/// Credential headers are injected as defaults on every request. No
/// request timeout is configured: a hung call stays in flight until the
/// consumer supersedes or tears down the owning field.
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ServiceClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and credential material.
    pub fn new(base_url: &str, credential: &Credential) -> Result<Self, Error> {
        let headers = credential.headers()?;
        let http = build_http(headers)?;
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
        })
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"recommendations/trending"`) onto the
    /// base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        // base_url always ends with `/`, so joining relative paths works.
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn get_with_params(&self, path: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn put(&self, path: &str) -> Result<Value, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).send().await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidToken;
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            let (message, code) = match err.error {
                Some(body) => (body.message, body.code),
                None => (err.message, None),
            };
            Error::Api {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| status.to_string()),
                code,
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            }
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Health ───────────────────────────────────────────────────────

    /// Probe `/health`. The only unauthenticated endpoint.
    pub async fn health(&self) -> Result<(), Error> {
        self.get("health").await.map(|_| ())
    }

    // ── Recommendations ──────────────────────────────────────────────

    pub async fn user_recommendations(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<types::Book>, Error> {
        let path = format!("recommendations/user/{user_id}");
        let value = match limit {
            Some(n) => {
                self.get_with_params(&path, &[("limit", n.to_string())])
                    .await?
            }
            None => self.get(&path).await?,
        };
        envelope::list(&value, "recommendations")
    }

    pub async fn similar_books(&self, book_id: i64) -> Result<Vec<types::Book>, Error> {
        let value = self
            .get(&format!("recommendations/similar/{book_id}"))
            .await?;
        envelope::list(&value, "similarBooks")
    }

    pub async fn trending_books(&self) -> Result<Vec<types::Book>, Error> {
        let value = self.get("recommendations/trending").await?;
        envelope::list(&value, "trendingBooks")
    }

    // ── Analytics ────────────────────────────────────────────────────

    pub async fn popular_books(&self) -> Result<Vec<types::PopularBook>, Error> {
        let value = self.get("analytics/books/popular").await?;
        envelope::list(&value, "books")
    }

    pub async fn user_activity(&self) -> Result<types::UserActivity, Error> {
        let value = self.get("analytics/users/activity").await?;
        envelope::object(&value)
    }

    pub async fn review_stats(&self) -> Result<types::ReviewStats, Error> {
        let value = self.get("analytics/reviews/stats").await?;
        envelope::object(&value)
    }

    // ── Search ───────────────────────────────────────────────────────

    pub async fn search_books(&self, query: &str) -> Result<Vec<types::Book>, Error> {
        let value = self
            .get_with_params("search/books", &[("q", query.to_owned())])
            .await?;
        envelope::list(&value, "books")
    }

    pub async fn advanced_search(
        &self,
        filters: &types::SearchFilters,
    ) -> Result<Vec<types::Book>, Error> {
        let value = self.post("search/advanced", filters).await?;
        envelope::list(&value, "books")
    }

    // ── Notifications ────────────────────────────────────────────────

    pub async fn user_notifications(
        &self,
        user_id: &str,
    ) -> Result<Vec<types::Notification>, Error> {
        let value = self.get(&format!("notifications/user/{user_id}")).await?;
        envelope::list(&value, "notifications")
    }

    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<(), Error> {
        self.put(&format!("notifications/{notification_id}/read"))
            .await
            .map(|_| ())
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64, Error> {
        let value = self
            .get(&format!("notifications/user/{user_id}/unread-count"))
            .await?;
        Ok(envelope::count(&value))
    }

    // ── Reviews ──────────────────────────────────────────────────────

    pub async fn book_reviews(&self, book_id: i64) -> Result<Vec<types::Review>, Error> {
        let value = self.get(&format!("reviews/book/{book_id}")).await?;
        envelope::list(&value, "reviews")
    }

    /// Create a review. Returns the server's copy when the response
    /// carries one; some deployments only acknowledge.
    pub async fn create_review(
        &self,
        draft: &types::ReviewDraft,
    ) -> Result<Option<types::Review>, Error> {
        let value = self.post("reviews", draft).await?;
        envelope::named_object(&value, "review")
    }
}

// ── Construction helpers ─────────────────────────────────────────────

/// Ensure the base URL ends with `/` so relative joins append.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

/// Build the shared `reqwest::Client` with credential headers injected.
///
/// Deliberately no `.timeout(...)`: request-lifecycle policy belongs to
/// the store layer (pending until superseded or torn down).
fn build_http(headers: HeaderMap) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent("folio/0.1.0")
        .default_headers(headers)
        .build()
        .map_err(Error::Transport)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::normalize_base_url;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("http://localhost:3002/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3002/api/");

        let url = normalize_base_url("http://localhost:3002/api/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3002/api/");
    }
}
