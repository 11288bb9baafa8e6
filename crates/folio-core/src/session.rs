// ── Session abstraction ──
//
// Full lifecycle management for one signed-in user's view of the book
// service. Routes every fetch through the ticket protocol on the
// DataStore fields, runs the unread-count poll task, and scopes
// cancellation per resource domain so a teardown can never be undone
// by a late response.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use folio_api::{Credential, Review, ReviewDraft, SearchFilters, ServiceClient};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{AdvancedResults, Confirmation, LocalReview, ResourceDomain, SearchResults};
use crate::poll::unread_poll_task;
use crate::store::DataStore;
use crate::store::field::Field;

// ── Session ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Every operation writes
/// its lifecycle into the [`DataStore`]; the returned `Result` is a
/// convenience mirror of the same outcome.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    client: ServiceClient,
    store: Arc<DataStore>,
    /// Session root token; domain tokens are children of it.
    cancel: CancellationToken,
    domains: Mutex<DomainTokens>,
    poll: Mutex<Option<PollGuard>>,
    review_seq: AtomicU64,
}

/// One cancellation token per resource domain. A teardown rotates the
/// domain's token so in-flight responses commit against a dead token
/// and get discarded.
struct DomainTokens {
    recommendations: CancellationToken,
    analytics: CancellationToken,
    search: CancellationToken,
    notifications: CancellationToken,
    reviews: CancellationToken,
}

impl DomainTokens {
    fn new(root: &CancellationToken) -> Self {
        Self {
            recommendations: root.child_token(),
            analytics: root.child_token(),
            search: root.child_token(),
            notifications: root.child_token(),
            reviews: root.child_token(),
        }
    }

    fn get(&self, domain: ResourceDomain) -> CancellationToken {
        match domain {
            ResourceDomain::Recommendations => self.recommendations.clone(),
            ResourceDomain::Analytics => self.analytics.clone(),
            ResourceDomain::Search => self.search.clone(),
            ResourceDomain::Notifications => self.notifications.clone(),
            ResourceDomain::Reviews => self.reviews.clone(),
        }
    }

    fn rotate(&mut self, domain: ResourceDomain, root: &CancellationToken) {
        let slot = match domain {
            ResourceDomain::Recommendations => &mut self.recommendations,
            ResourceDomain::Analytics => &mut self.analytics,
            ResourceDomain::Search => &mut self.search,
            ResourceDomain::Notifications => &mut self.notifications,
            ResourceDomain::Reviews => &mut self.reviews,
        };
        slot.cancel();
        *slot = root.child_token();
    }
}

struct PollGuard {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Session {
    /// Create a new Session from configuration. Constructs the HTTP
    /// client eagerly but performs no network I/O.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let credential = Credential {
            token: config.token.clone(),
            service_key: config.service_key.clone(),
        };
        let client = ServiceClient::new(&config.base_url, &credential)?;
        let cancel = CancellationToken::new();
        let domains = Mutex::new(DomainTokens::new(&cancel));

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                client,
                store: Arc::new(DataStore::new()),
                cancel,
                domains,
                poll: Mutex::new(None),
                review_seq: AtomicU64::new(1),
            }),
        })
    }

    /// Access the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Access the underlying DataStore.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// Probe service health. Bypasses the store; nothing to cache.
    pub async fn health(&self) -> Result<(), CoreError> {
        self.inner.client.health().await?;
        Ok(())
    }

    /// Operations on a logged-out session fail fast instead of racing
    /// the root token.
    fn ensure_open(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::SessionClosed);
        }
        Ok(())
    }

    /// User-scoped calls short-circuit locally on a missing user id;
    /// they must never hit the wire with a truncated path.
    fn require_user_id(&self) -> Result<&str, CoreError> {
        let user_id = self.inner.config.user_id.as_str();
        if user_id.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "a user id is required for this operation".into(),
            });
        }
        Ok(user_id)
    }

    // ── Ticket protocol ──────────────────────────────────────────
    //
    // Every fetch follows the same shape: issue a ticket (publishing
    // Pending), await the network, then commit through the ticket so
    // only the latest request for the field ever lands. A rotated
    // domain token turns the commit into a silent discard.

    async fn run_field<T, F>(
        &self,
        domain: ResourceDomain,
        field: &Field<T>,
        fut: F,
    ) -> Result<(), CoreError>
    where
        T: Clone + Default + Send + Sync + 'static,
        F: Future<Output = Result<T, folio_api::Error>>,
    {
        self.ensure_open()?;
        let token = self.inner.domains.lock().await.get(domain);
        let ticket = field.begin();
        let result = fut.await;
        if token.is_cancelled() {
            debug!(%domain, "domain torn down mid-flight; discarding response");
            return Ok(());
        }
        match result {
            Ok(data) => {
                field.fulfill(ticket, data);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                field.reject(ticket, err.to_string());
                Err(err)
            }
        }
    }

    // ── Recommendations ──────────────────────────────────────────

    /// Fetch personalized recommendations for the signed-in user.
    pub async fn fetch_user_recommendations(&self) -> Result<(), CoreError> {
        let user_id = self.require_user_id()?;
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Recommendations,
            &store.recommendations.user_recommendations,
            self.inner
                .client
                .user_recommendations(user_id, Some(self.inner.config.recommendation_limit)),
        )
        .await
    }

    /// Fetch books similar to the given book.
    pub async fn fetch_similar_books(&self, book_id: i64) -> Result<(), CoreError> {
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Recommendations,
            &store.recommendations.similar_books,
            self.inner.client.similar_books(book_id),
        )
        .await
    }

    /// Fetch currently trending books.
    pub async fn fetch_trending_books(&self) -> Result<(), CoreError> {
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Recommendations,
            &store.recommendations.trending_books,
            self.inner.client.trending_books(),
        )
        .await
    }

    /// Refresh personalized and trending recommendations concurrently.
    /// Each field settles independently; the first error (if any) is
    /// returned after both fetches complete.
    pub async fn refresh_recommendations(&self) -> Result<(), CoreError> {
        let (user, trending) = tokio::join!(
            self.fetch_user_recommendations(),
            self.fetch_trending_books(),
        );
        user.and(trending)
    }

    // ── Analytics ────────────────────────────────────────────────

    pub async fn fetch_popular_books(&self) -> Result<(), CoreError> {
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Analytics,
            &store.analytics.popular_books,
            self.inner.client.popular_books(),
        )
        .await
    }

    pub async fn fetch_user_activity(&self) -> Result<(), CoreError> {
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Analytics,
            &store.analytics.user_activity,
            self.inner.client.user_activity(),
        )
        .await
    }

    pub async fn fetch_review_stats(&self) -> Result<(), CoreError> {
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Analytics,
            &store.analytics.review_stats,
            self.inner.client.review_stats(),
        )
        .await
    }

    /// Refresh all three analytics panels concurrently.
    pub async fn refresh_analytics(&self) -> Result<(), CoreError> {
        let (popular, activity, stats) = tokio::join!(
            self.fetch_popular_books(),
            self.fetch_user_activity(),
            self.fetch_review_stats(),
        );
        popular.and(activity).and(stats)
    }

    // ── Search ───────────────────────────────────────────────────

    /// Run a simple text search. The result set *replaces* the previous
    /// one; results from different queries are never merged.
    pub async fn search_books(&self, query: &str) -> Result<(), CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "search query must not be empty".into(),
            });
        }
        let owned = query.to_owned();
        let store = &self.inner.store;
        self.run_field(ResourceDomain::Search, &store.search.results, async {
            let books = self.inner.client.search_books(query).await?;
            Ok(SearchResults {
                query: owned,
                books,
            })
        })
        .await
    }

    /// Run a filtered search. Non-empty advanced results take display
    /// precedence over simple results.
    pub async fn advanced_search(&self, filters: SearchFilters) -> Result<(), CoreError> {
        if filters.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "at least one search filter is required".into(),
            });
        }
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Search,
            &store.search.advanced_results,
            async {
                let books = self.inner.client.advanced_search(&filters).await?;
                Ok(AdvancedResults {
                    filters: Some(filters),
                    books,
                })
            },
        )
        .await
    }

    /// Clear both result sets back to the initial snapshot.
    pub async fn clear_search(&self) {
        self.reset_domain(ResourceDomain::Search).await;
    }

    // ── Notifications ────────────────────────────────────────────

    pub async fn fetch_notifications(&self) -> Result<(), CoreError> {
        let user_id = self.require_user_id()?;
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Notifications,
            &store.notifications.notifications,
            self.inner.client.user_notifications(user_id),
        )
        .await
    }

    pub async fn fetch_unread_count(&self) -> Result<(), CoreError> {
        let user_id = self.require_user_id()?;
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Notifications,
            &store.notifications.unread_count,
            self.inner.client.unread_count(user_id),
        )
        .await
    }

    /// Mark one notification read.
    ///
    /// Applies the local patch immediately (notification flips to read,
    /// unread count drops by one), then confirms with the server. A
    /// server failure keeps the patch -- read status only ever moves
    /// false→true locally -- and surfaces the error on the `mark_read`
    /// field and in the returned `Result`.
    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<(), CoreError> {
        if !self.inner.store.apply_mark_read(notification_id) {
            // Unknown or already read; nothing to tell the server.
            debug!(notification_id, "mark-read was a local no-op");
            return Ok(());
        }
        let store = &self.inner.store;
        self.run_field(
            ResourceDomain::Notifications,
            &store.notifications.mark_read,
            async {
                self.inner
                    .client
                    .mark_notification_read(notification_id)
                    .await
            },
        )
        .await
    }

    /// Mark every notification read. Purely local: the server has no
    /// bulk endpoint, so no network call is made and no error can occur.
    pub fn mark_all_read(&self) {
        self.inner.store.apply_mark_all_read();
    }

    // ── Unread-count polling ─────────────────────────────────────

    /// Start the periodic unread-count poll. Idempotent: a second call
    /// while a poll is running is a no-op.
    pub async fn start_unread_polling(&self) -> Result<(), CoreError> {
        self.ensure_open()?;
        self.require_user_id()?;
        let mut guard = self.inner.poll.lock().await;
        if guard.is_some() {
            debug!("unread poll already running");
            return Ok(());
        }

        let cancel = self.inner.domains.lock().await.get(ResourceDomain::Notifications);
        let session = self.clone();
        let interval = self.inner.config.unread_poll_interval;
        let handle = tokio::spawn(unread_poll_task(session, interval, cancel.clone()));
        *guard = Some(PollGuard { cancel, handle });
        info!(interval_secs = interval.as_secs(), "unread poll started");
        Ok(())
    }

    /// Stop the unread-count poll, if running.
    pub async fn stop_unread_polling(&self) {
        let guard = self.inner.poll.lock().await.take();
        if let Some(PollGuard { cancel, handle }) = guard {
            cancel.cancel();
            let _ = handle.await;
            debug!("unread poll stopped");
        }
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Tear one domain down: cancel its in-flight operations, stop any
    /// background work it owns, and reset its fields to the initial
    /// snapshot.
    pub async fn reset_domain(&self, domain: ResourceDomain) {
        if domain == ResourceDomain::Notifications {
            self.stop_unread_polling().await;
        }
        self.inner
            .domains
            .lock()
            .await
            .rotate(domain, &self.inner.cancel);
        self.inner.store.reset(domain);
    }

    /// Tear the whole session down (logout). After this, every field
    /// reads as the initial snapshot and no in-flight response can land.
    pub async fn logout(&self) {
        self.stop_unread_polling().await;
        self.inner.cancel.cancel();
        self.inner.store.reset_all();
        info!("session closed");
    }

    // ── Reviews ──────────────────────────────────────────────────

    /// Fetch the reviews for one book, reconciling against any
    /// optimistic local entries already showing for it.
    pub async fn fetch_book_reviews(&self, book_id: i64) -> Result<(), CoreError> {
        self.ensure_open()?;
        let token = self.inner.domains.lock().await.get(ResourceDomain::Reviews);
        let field = &self.inner.store.reviews.book_reviews;
        let ticket = field.begin();
        let result = self.inner.client.book_reviews(book_id).await;
        if token.is_cancelled() {
            debug!("reviews domain torn down mid-flight; discarding response");
            return Ok(());
        }
        match result {
            Ok(fetched) => {
                self.inner
                    .store
                    .reconcile_book_reviews(ticket, book_id, fetched);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                field.reject(ticket, err.to_string());
                Err(err)
            }
        }
    }

    /// Submit a review optimistically.
    ///
    /// The entry appears in the store immediately as `AwaitingServer`,
    /// then resolves to `Confirmed` (adopting the server copy when one
    /// is returned) or to a visible `Unconfirmed` marker on failure.
    /// The entry is never silently rolled back.
    pub async fn submit_review(
        &self,
        book_id: i64,
        rating: u8,
        review_text: &str,
    ) -> Result<(), CoreError> {
        self.ensure_open()?;
        if !(1..=5).contains(&rating) {
            return Err(CoreError::ValidationFailed {
                message: format!("rating must be between 1 and 5, got {rating}"),
            });
        }
        let review_text = review_text.trim();
        if review_text.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "review text must not be empty".into(),
            });
        }

        let local_seq = self.inner.review_seq.fetch_add(1, Ordering::Relaxed);
        let now = chrono::Utc::now();
        let placeholder = Review {
            // Negative placeholder id; real ids from the server are positive.
            id: -i64::try_from(local_seq).unwrap_or(i64::MAX),
            book_id,
            user_id: self.inner.config.user_id.clone(),
            username: None,
            rating,
            review_text: review_text.to_owned(),
            review_date: Some(now),
        };
        self.inner.store.append_local_review(
            book_id,
            LocalReview {
                review: placeholder,
                local_seq,
                confirmation: Confirmation::AwaitingServer,
            },
        );

        let token = self.inner.domains.lock().await.get(ResourceDomain::Reviews);
        let draft = ReviewDraft {
            book_id,
            user_id: self.inner.config.user_id.clone(),
            rating,
            review_text: review_text.to_owned(),
            review_date: Some(now),
        };
        let result = self.inner.client.create_review(&draft).await;
        if token.is_cancelled() {
            debug!("reviews domain torn down mid-flight; dropping review outcome");
            return Ok(());
        }
        match result {
            Ok(server) => {
                self.inner.store.confirm_review(local_seq, server);
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(book_id, error = %err, "review submission failed; keeping unconfirmed entry");
                self.inner
                    .store
                    .flag_review_unconfirmed(local_seq, err.to_string());
                Err(err)
            }
        }
    }
}
