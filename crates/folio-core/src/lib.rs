// folio-core: Reactive resource-synchronization layer between folio-api
// and consumers (UI shells, integration harnesses).

pub mod config;
pub mod error;
pub mod model;
mod poll;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use error::CoreError;
pub use session::Session;
pub use store::{DataStore, FieldStatus, RequestState};
pub use stream::FieldStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AdvancedResults, BookReviews, Confirmation, LocalReview, ResourceDomain, SearchResults,
    SearchSource,
};

// Wire types surface unchanged in store fields; re-export so consumers
// rarely need a direct folio-api dependency.
pub use folio_api::{
    Book, Notification, NotificationKind, PopularBook, RatingRange, Review, ReviewStats,
    SearchFilters, UserActivity, YearRange,
};
