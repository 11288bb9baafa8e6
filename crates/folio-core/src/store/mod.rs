// ── Central reactive resource store ──
//
// One fixed partition per resource domain, one `Field` slot per named
// sub-resource. All mutation goes through the field transition functions
// (`begin`/`fulfill`/`reject`/`reset`) or the named optimistic-patch
// methods below — nothing else writes, so every state change has a
// single audit trail.

pub(crate) mod field;

use folio_api::{Book, Notification, PopularBook, Review, ReviewStats, UserActivity};
use tracing::debug;

use crate::model::{
    AdvancedResults, BookReviews, Confirmation, LocalReview, ResourceDomain, SearchResults,
    SearchSource,
};
use crate::stream::FieldStream;
use field::Field;
pub use field::{FieldStatus, RequestState};

// ── Partitions ──────────────────────────────────────────────────────

pub(crate) struct RecommendationsPartition {
    pub(crate) user_recommendations: Field<Vec<Book>>,
    pub(crate) similar_books: Field<Vec<Book>>,
    pub(crate) trending_books: Field<Vec<Book>>,
}

pub(crate) struct AnalyticsPartition {
    pub(crate) popular_books: Field<Vec<PopularBook>>,
    pub(crate) user_activity: Field<UserActivity>,
    pub(crate) review_stats: Field<ReviewStats>,
}

pub(crate) struct SearchPartition {
    pub(crate) results: Field<SearchResults>,
    pub(crate) advanced_results: Field<AdvancedResults>,
}

pub(crate) struct NotificationsPartition {
    pub(crate) notifications: Field<Vec<Notification>>,
    pub(crate) unread_count: Field<u64>,
    /// Lifecycle/error channel for the mark-as-read operation; the
    /// payload lives in `notifications`/`unread_count`.
    pub(crate) mark_read: Field<()>,
}

pub(crate) struct ReviewsPartition {
    pub(crate) book_reviews: Field<BookReviews>,
}

/// Central reactive store for every resource domain.
///
/// `DataStore::new()` is the documented initial snapshot;
/// [`reset`](Self::reset) restores a domain to exactly it.
pub struct DataStore {
    pub(crate) recommendations: RecommendationsPartition,
    pub(crate) analytics: AnalyticsPartition,
    pub(crate) search: SearchPartition,
    pub(crate) notifications: NotificationsPartition,
    pub(crate) reviews: ReviewsPartition,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            recommendations: RecommendationsPartition {
                user_recommendations: Field::new(),
                similar_books: Field::new(),
                trending_books: Field::new(),
            },
            analytics: AnalyticsPartition {
                popular_books: Field::new(),
                user_activity: Field::new(),
                review_stats: Field::new(),
            },
            search: SearchPartition {
                results: Field::new(),
                advanced_results: Field::new(),
            },
            notifications: NotificationsPartition {
                notifications: Field::new(),
                unread_count: Field::new(),
                mark_read: Field::new(),
            },
            reviews: ReviewsPartition {
                book_reviews: Field::new(),
            },
        }
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Reset every field of one domain to the initial snapshot and
    /// invalidate its outstanding operation tickets.
    pub fn reset(&self, domain: ResourceDomain) {
        debug!(%domain, "resetting domain partition");
        match domain {
            ResourceDomain::Recommendations => {
                self.recommendations.user_recommendations.reset();
                self.recommendations.similar_books.reset();
                self.recommendations.trending_books.reset();
            }
            ResourceDomain::Analytics => {
                self.analytics.popular_books.reset();
                self.analytics.user_activity.reset();
                self.analytics.review_stats.reset();
            }
            ResourceDomain::Search => {
                self.search.results.reset();
                self.search.advanced_results.reset();
            }
            ResourceDomain::Notifications => {
                self.notifications.notifications.reset();
                self.notifications.unread_count.reset();
                self.notifications.mark_read.reset();
            }
            ResourceDomain::Reviews => {
                self.reviews.book_reviews.reset();
            }
        }
    }

    /// Reset every domain (logout).
    pub fn reset_all(&self) {
        for domain in ResourceDomain::ALL {
            self.reset(domain);
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn user_recommendations_snapshot(&self) -> RequestState<Vec<Book>> {
        self.recommendations.user_recommendations.snapshot()
    }

    pub fn similar_books_snapshot(&self) -> RequestState<Vec<Book>> {
        self.recommendations.similar_books.snapshot()
    }

    pub fn trending_books_snapshot(&self) -> RequestState<Vec<Book>> {
        self.recommendations.trending_books.snapshot()
    }

    pub fn popular_books_snapshot(&self) -> RequestState<Vec<PopularBook>> {
        self.analytics.popular_books.snapshot()
    }

    pub fn user_activity_snapshot(&self) -> RequestState<UserActivity> {
        self.analytics.user_activity.snapshot()
    }

    pub fn review_stats_snapshot(&self) -> RequestState<ReviewStats> {
        self.analytics.review_stats.snapshot()
    }

    pub fn search_results_snapshot(&self) -> RequestState<SearchResults> {
        self.search.results.snapshot()
    }

    pub fn advanced_results_snapshot(&self) -> RequestState<AdvancedResults> {
        self.search.advanced_results.snapshot()
    }

    pub fn notifications_snapshot(&self) -> RequestState<Vec<Notification>> {
        self.notifications.notifications.snapshot()
    }

    pub fn unread_count_snapshot(&self) -> RequestState<u64> {
        self.notifications.unread_count.snapshot()
    }

    pub fn mark_read_snapshot(&self) -> RequestState<()> {
        self.notifications.mark_read.snapshot()
    }

    pub fn book_reviews_snapshot(&self) -> RequestState<BookReviews> {
        self.reviews.book_reviews.snapshot()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_user_recommendations(&self) -> FieldStream<Vec<Book>> {
        FieldStream::new(self.recommendations.user_recommendations.subscribe())
    }

    pub fn subscribe_similar_books(&self) -> FieldStream<Vec<Book>> {
        FieldStream::new(self.recommendations.similar_books.subscribe())
    }

    pub fn subscribe_trending_books(&self) -> FieldStream<Vec<Book>> {
        FieldStream::new(self.recommendations.trending_books.subscribe())
    }

    pub fn subscribe_popular_books(&self) -> FieldStream<Vec<PopularBook>> {
        FieldStream::new(self.analytics.popular_books.subscribe())
    }

    pub fn subscribe_user_activity(&self) -> FieldStream<UserActivity> {
        FieldStream::new(self.analytics.user_activity.subscribe())
    }

    pub fn subscribe_review_stats(&self) -> FieldStream<ReviewStats> {
        FieldStream::new(self.analytics.review_stats.subscribe())
    }

    pub fn subscribe_search_results(&self) -> FieldStream<SearchResults> {
        FieldStream::new(self.search.results.subscribe())
    }

    pub fn subscribe_advanced_results(&self) -> FieldStream<AdvancedResults> {
        FieldStream::new(self.search.advanced_results.subscribe())
    }

    pub fn subscribe_notifications(&self) -> FieldStream<Vec<Notification>> {
        FieldStream::new(self.notifications.notifications.subscribe())
    }

    pub fn subscribe_unread_count(&self) -> FieldStream<u64> {
        FieldStream::new(self.notifications.unread_count.subscribe())
    }

    pub fn subscribe_book_reviews(&self) -> FieldStream<BookReviews> {
        FieldStream::new(self.reviews.book_reviews.subscribe())
    }

    // ── Derived views ────────────────────────────────────────────────

    /// The result set currently active for display. Advanced results
    /// replace (never merge with) simple results and take precedence
    /// whenever they are non-empty.
    pub fn active_search(&self) -> (SearchSource, Vec<Book>) {
        let advanced = self.search.advanced_results.snapshot();
        if !advanced.data.books.is_empty() {
            return (SearchSource::Advanced, advanced.data.books);
        }
        let simple = self.search.results.snapshot();
        if simple.status == FieldStatus::Fulfilled || !simple.data.books.is_empty() {
            return (SearchSource::Simple, simple.data.books);
        }
        (SearchSource::None, Vec::new())
    }

    // ── Optimistic patches ───────────────────────────────────────────
    //
    // Synchronous local mutations, visually indistinguishable from
    // server-confirmed state. Only `data` is touched; field status and
    // error channels stay as they were.

    /// Mark one notification read and decrement the unread count.
    ///
    /// No-op (returns `false`) for unknown or already-read ids — the
    /// count is only ever decremented by exactly one per actual
    /// false→true transition, and never below zero.
    pub fn apply_mark_read(&self, notification_id: &str) -> bool {
        let mut transitioned = false;
        self.notifications.notifications.patch(|list| {
            if let Some(n) = list
                .iter_mut()
                .find(|n| n.id == notification_id && !n.is_read)
            {
                n.is_read = true;
                transitioned = true;
            }
        });
        if transitioned {
            self.notifications
                .unread_count
                .patch(|count| *count = count.saturating_sub(1));
        }
        transitioned
    }

    /// Mark every notification read and zero the unread count.
    pub fn apply_mark_all_read(&self) {
        self.notifications.notifications.patch(|list| {
            for n in list.iter_mut() {
                n.is_read = true;
            }
        });
        self.notifications.unread_count.patch(|count| *count = 0);
    }

    /// Append an optimistic review entry for the given book.
    pub fn append_local_review(&self, book_id: i64, entry: LocalReview) {
        self.reviews.book_reviews.patch(|reviews| {
            if reviews.book_id != Some(book_id) {
                // View switched books without a fetch; start fresh.
                reviews.book_id = Some(book_id);
                reviews.entries.clear();
            }
            reviews.entries.push(entry);
        });
    }

    /// Resolve an awaiting entry to `Confirmed`, adopting the server
    /// copy when one was returned.
    pub fn confirm_review(&self, local_seq: u64, server: Option<Review>) {
        self.reviews.book_reviews.patch(|reviews| {
            if let Some(entry) = reviews.entries.iter_mut().find(|e| e.local_seq == local_seq) {
                if let Some(review) = server {
                    entry.review = review;
                }
                entry.confirmation = Confirmation::Confirmed;
            }
        });
    }

    /// Flag an awaiting entry as visibly unconfirmed after the create
    /// call failed. The entry itself stays in place.
    pub fn flag_review_unconfirmed(&self, local_seq: u64, reason: String) {
        self.reviews.book_reviews.patch(|reviews| {
            if let Some(entry) = reviews.entries.iter_mut().find(|e| e.local_seq == local_seq) {
                entry.confirmation = Confirmation::Unconfirmed { reason };
            }
        });
    }

    /// Commit a fetched review list, reconciling optimistic entries:
    /// server copies win by id, unconfirmed/awaiting locals whose id is
    /// not yet known to the server are retained at the tail.
    pub(crate) fn reconcile_book_reviews(
        &self,
        ticket: u64,
        book_id: i64,
        fetched: Vec<Review>,
    ) -> bool {
        self.reviews.book_reviews.fulfill_with(ticket, |current| {
            let mut entries: Vec<LocalReview> =
                fetched.into_iter().map(LocalReview::confirmed).collect();
            if current.book_id == Some(book_id) {
                for local in &current.entries {
                    let known_to_server = local.confirmation == Confirmation::Confirmed
                        || entries.iter().any(|e| e.review.id == local.review.id);
                    if !known_to_server {
                        entries.push(local.clone());
                    }
                }
            }
            BookReviews {
                book_id: Some(book_id),
                entries,
            }
        })
    }
}
