// ── Runtime session configuration ──
//
// Describes *how* to talk to the book service for one signed-in user.
// Carries credential data and tuning knobs but never touches disk --
// the embedding application constructs a `SessionConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;

/// Configuration for one user session against the book service.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Service base URL (e.g., `https://api.example.com/api`).
    pub base_url: String,
    /// Bearer token for the signed-in user.
    pub token: SecretString,
    /// Optional service API key sent as `x-api-key`.
    pub service_key: Option<SecretString>,
    /// Id of the signed-in user; scopes recommendations and notifications.
    pub user_id: String,
    /// How many recommendations to request per fetch.
    pub recommendation_limit: u32,
    /// Unread-count polling cadence.
    pub unread_poll_interval: Duration,
}

impl SessionConfig {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: SecretString::from(token.into()),
            service_key: None,
            user_id: user_id.into(),
            recommendation_limit: 10,
            unread_poll_interval: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.service_key = Some(SecretString::from(key.into()));
        self
    }

    #[must_use]
    pub fn with_unread_poll_interval(mut self, interval: Duration) -> Self {
        self.unread_poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_recommendation_limit(mut self, limit: u32) -> Self {
        self.recommendation_limit = limit;
        self
    }
}
