// ── Store-side domain types ──
//
// Wire types come from `folio-api`; these add what only exists locally:
// domain identifiers, optimistic-entry confirmation state, and the
// per-field payload wrappers.

use std::fmt;

use folio_api::{Book, Review, SearchFilters};
use serde::{Deserialize, Serialize};

// ── Domains ─────────────────────────────────────────────────────────

/// One independently-fetched resource category. Each owns a partition of
/// the store with its own lifecycle (fetch, error capture, teardown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDomain {
    Recommendations,
    Analytics,
    Search,
    Notifications,
    Reviews,
}

impl ResourceDomain {
    pub const ALL: [Self; 5] = [
        Self::Recommendations,
        Self::Analytics,
        Self::Search,
        Self::Notifications,
        Self::Reviews,
    ];
}

impl fmt::Display for ResourceDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Recommendations => "recommendations",
            Self::Analytics => "analytics",
            Self::Search => "search",
            Self::Notifications => "notifications",
            Self::Reviews => "reviews",
        };
        f.write_str(name)
    }
}

// ── Search payloads ─────────────────────────────────────────────────

/// Results of the last executed simple search, paired with its query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub query: String,
    pub books: Vec<Book>,
}

/// Results of the last executed advanced search, paired with its filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedResults {
    pub filters: Option<SearchFilters>,
    pub books: Vec<Book>,
}

/// Which result set is currently active for display. Advanced results
/// take precedence whenever they are non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    None,
    Simple,
    Advanced,
}

// ── Reviews ─────────────────────────────────────────────────────────

/// Server-confirmation state of a locally visible review entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// Matches a server copy.
    Confirmed,
    /// Applied optimistically; the create call has not settled yet.
    AwaitingServer,
    /// The create call failed. The entry stays visible but flagged.
    Unconfirmed { reason: String },
}

/// A review entry in the local list: the review itself plus the
/// client-generated sequence id that keys optimistic entries and the
/// confirmation state that distinguishes them from server copies.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalReview {
    pub review: Review,
    /// Client-generated sequence id; `0` for server-sourced entries.
    pub local_seq: u64,
    pub confirmation: Confirmation,
}

impl LocalReview {
    /// Wrap a server-confirmed review.
    pub fn confirmed(review: Review) -> Self {
        Self {
            review,
            local_seq: 0,
            confirmation: Confirmation::Confirmed,
        }
    }
}

/// The review list for the book currently in view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookReviews {
    pub book_id: Option<i64>,
    pub entries: Vec<LocalReview>,
}
