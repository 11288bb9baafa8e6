//! Async Rust client for the Folio book-review microservice API.
//!
//! One [`ServiceClient`] per session: credential headers (bearer token,
//! optional service key) are injected as request defaults, responses are
//! decoded through the tolerant [`envelope`] helpers so consumers always
//! receive the documented shapes regardless of how deeply the service
//! wrapped the payload.

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod types;

pub use auth::Credential;
pub use client::ServiceClient;
pub use error::Error;
pub use types::{
    Book, Notification, NotificationKind, PopularBook, RatingRange, Review, ReviewDraft,
    ReviewStats, SearchFilters, UserActivity, YearRange,
};
