// ── Wire types for the book-review microservice ──
//
// Shapes mirror the JSON payloads the service emits (camelCase keys).
// Collection payloads may arrive bare or wrapped in a `data` envelope;
// `envelope` handles the unwrapping, these types only describe elements.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Books ───────────────────────────────────────────────────────────

/// A book as returned by the recommendation and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub overall_rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
}

/// An entry from the popularity ranking (`/analytics/books/popular`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularBook {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub review_count: u64,
    #[serde(default)]
    pub average_rating: f64,
}

// ── Analytics ───────────────────────────────────────────────────────

/// Site-wide user activity summary. Zero-valued when the service omits
/// a field (never null).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserActivity {
    pub total_users: u64,
    pub active_users: u64,
    pub new_users_this_week: u64,
    pub average_session_time: f64,
}

/// Aggregate review statistics. The distribution maps rating (1–5,
/// stringly keyed on the wire) to review count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewStats {
    pub total_reviews: u64,
    pub average_rating: f64,
    pub reviews_this_week: u64,
    pub rating_distribution: HashMap<String, u64>,
}

// ── Search ──────────────────────────────────────────────────────────

/// Inclusive publication-year range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

/// Inclusive overall-rating range filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRange {
    pub min: f64,
    pub max: f64,
}

/// Filter set for `POST /search/advanced`. Absent filters are omitted
/// from the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_range: Option<YearRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_range: Option<RatingRange>,
}

impl SearchFilters {
    /// Returns `true` if no filter is set.
    pub fn is_empty(&self) -> bool {
        self.genre.is_none()
            && self.author.is_none()
            && self.year_range.is_none()
            && self.rating_range.is_none()
    }
}

// ── Notifications ───────────────────────────────────────────────────

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookRecommendation,
    NewReview,
    SystemUpdate,
}

/// A user notification. `is_read` transitions only false→true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// ── Reviews ─────────────────────────────────────────────────────────

/// A server-confirmed book review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub book_id: i64,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub rating: u8,
    #[serde(default)]
    pub review_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_date: Option<DateTime<Utc>>,
}

/// Body for `POST /reviews`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub book_id: i64,
    pub user_id: String,
    pub rating: u8,
    pub review_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_date: Option<DateTime<Utc>>,
}
