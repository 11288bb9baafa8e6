#![allow(clippy::unwrap_used)]
// Integration tests for `Session` against a wiremock server.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_core::{
    Confirmation, CoreError, DataStore, FieldStatus, ResourceDomain, SearchSource, Session,
    SessionConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

const USER_ID: &str = "user-1";

async fn setup() -> (MockServer, Session) {
    let server = MockServer::start().await;
    let config = SessionConfig::new(server.uri(), "test-token", USER_ID)
        .with_unread_poll_interval(Duration::from_millis(50));
    let session = Session::new(config).unwrap();
    (server, session)
}

fn book(id: i64, title: &str) -> serde_json::Value {
    json!({ "id": id, "title": title, "author": "A. Author" })
}

fn notification(id: &str, is_read: bool) -> serde_json::Value {
    json!({
        "id": id,
        "userId": USER_ID,
        "type": "new_review",
        "title": "New review",
        "message": "Someone reviewed a book you follow",
        "isRead": is_read,
        "createdAt": "2026-08-30T12:00:00Z"
    })
}

async fn load_notifications(server: &MockServer, session: &Session, unread: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/notifications/user/{USER_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "notifications": [
                notification("n-1", false),
                notification("n-2", false),
                notification("n-3", true),
            ]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/notifications/user/{USER_ID}/unread-count")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": unread })))
        .mount(server)
        .await;

    session.fetch_notifications().await.unwrap();
    session.fetch_unread_count().await.unwrap();
}

// ── Fetch lifecycle ─────────────────────────────────────────────────

#[tokio::test]
async fn popular_books_envelope_lands_in_store() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/analytics/books/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "books": [
                { "id": 1, "title": "Dune", "author": "Herbert",
                  "viewCount": 90, "reviewCount": 12, "averageRating": 4.4 },
            ]}
        })))
        .mount(&server)
        .await;

    session.fetch_popular_books().await.unwrap();

    let snap = session.store().popular_books_snapshot();
    assert_eq!(snap.status, FieldStatus::Fulfilled);
    assert_eq!(snap.error, None);
    assert_eq!(snap.data.len(), 1);
    assert_eq!(snap.data[0].title, "Dune");
}

#[tokio::test]
async fn empty_envelope_fulfills_with_empty_list() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/analytics/books/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    session.fetch_popular_books().await.unwrap();

    let snap = session.store().popular_books_snapshot();
    assert_eq!(snap.status, FieldStatus::Fulfilled);
    assert!(snap.data.is_empty());
}

#[tokio::test]
async fn fetch_failure_keeps_previous_data() {
    let (server, session) = setup().await;

    let guard = Mock::given(method("GET"))
        .and(path("/recommendations/trending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "trendingBooks": [book(1, "Dune")] }
        })))
        .expect(1)
        .mount_as_scoped(&server)
        .await;
    session.fetch_trending_books().await.unwrap();
    drop(guard);

    Mock::given(method("GET"))
        .and(path("/recommendations/trending"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "boom"
        })))
        .mount(&server)
        .await;
    let err = session.fetch_trending_books().await.unwrap_err();
    assert!(matches!(err, CoreError::Api { .. }));

    let snap = session.store().trending_books_snapshot();
    assert_eq!(snap.status, FieldStatus::Rejected);
    assert!(snap.error.is_some());
    // Last known good data survives the failure.
    assert_eq!(snap.data[0].title, "Dune");
}

// ── Search ──────────────────────────────────────────────────────────

#[tokio::test]
async fn search_results_replace_not_merge() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/search/books"))
        .and(query_param("q", "dune"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "books": [book(1, "Dune"), book(2, "Dune Messiah")] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/books"))
        .and(query_param("q", "hobbit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "books": [book(3, "The Hobbit")] }
        })))
        .mount(&server)
        .await;

    session.search_books("dune").await.unwrap();
    assert_eq!(session.store().search_results_snapshot().data.books.len(), 2);

    session.search_books("hobbit").await.unwrap();
    let snap = session.store().search_results_snapshot();
    assert_eq!(snap.data.query, "hobbit");
    let titles: Vec<&str> = snap.data.books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["The Hobbit"]);
}

#[tokio::test]
async fn empty_query_is_rejected_without_touching_the_store() {
    let (_server, session) = setup().await;

    let err = session.search_books("   ").await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert_eq!(
        session.store().search_results_snapshot().status,
        FieldStatus::Idle
    );
}

#[tokio::test]
async fn empty_user_id_short_circuits_user_scoped_fetches() {
    let server = MockServer::start().await;
    let config = SessionConfig::new(server.uri(), "test-token", "");
    let session = Session::new(config).unwrap();

    let err = session.fetch_user_recommendations().await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    let err = session.fetch_notifications().await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    let err = session.fetch_unread_count().await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));

    // Nothing reached the wire and no field left Idle.
    assert!(server.received_requests().await.unwrap().is_empty());
    let store = session.store();
    assert_eq!(
        store.user_recommendations_snapshot().status,
        FieldStatus::Idle
    );
    assert_eq!(store.notifications_snapshot().status, FieldStatus::Idle);
    assert_eq!(store.unread_count_snapshot().status, FieldStatus::Idle);
}

#[tokio::test]
async fn advanced_results_take_display_precedence() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/search/books"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "books": [book(1, "Dune")] }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search/advanced"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "books": [book(9, "Ringworld")] }
        })))
        .mount(&server)
        .await;

    session.search_books("dune").await.unwrap();
    let filters = folio_core::SearchFilters {
        genre: Some("sci-fi".into()),
        ..folio_core::SearchFilters::default()
    };
    session.advanced_search(filters).await.unwrap();

    let (source, books) = session.store().active_search();
    assert_eq!(source, SearchSource::Advanced);
    assert_eq!(books[0].title, "Ringworld");
}

// ── Optimistic mark-as-read ─────────────────────────────────────────

#[tokio::test]
async fn mark_read_applies_locally_and_confirms() {
    let (server, session) = setup().await;
    load_notifications(&server, &session, 2).await;

    Mock::given(method("PUT"))
        .and(path("/notifications/n-1/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    session.mark_notification_read("n-1").await.unwrap();

    let store = session.store();
    let notifications = store.notifications_snapshot().data;
    assert!(notifications.iter().find(|n| n.id == "n-1").unwrap().is_read);
    assert_eq!(store.unread_count_snapshot().data, 1);
    assert_eq!(store.mark_read_snapshot().status, FieldStatus::Fulfilled);
}

#[tokio::test]
async fn mark_read_failure_keeps_patch_and_surfaces_error() {
    let (server, session) = setup().await;
    load_notifications(&server, &session, 2).await;

    Mock::given(method("PUT"))
        .and(path("/notifications/n-1/read"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "server exploded"
        })))
        .mount(&server)
        .await;

    let err = session.mark_notification_read("n-1").await.unwrap_err();
    assert!(matches!(err, CoreError::Api { .. }));

    // The local patch is not rolled back; the failure is visible on the
    // mark_read channel instead.
    let store = session.store();
    assert!(
        store
            .notifications_snapshot()
            .data
            .iter()
            .find(|n| n.id == "n-1")
            .unwrap()
            .is_read
    );
    assert_eq!(store.unread_count_snapshot().data, 1);
    let mark = store.mark_read_snapshot();
    assert_eq!(mark.status, FieldStatus::Rejected);
    assert!(mark.error.is_some());
}

#[tokio::test]
async fn mark_read_on_already_read_skips_the_network() {
    let (server, session) = setup().await;
    load_notifications(&server, &session, 2).await;

    // No PUT mock mounted: a network call would 404 and error.
    session.mark_notification_read("n-3").await.unwrap();
    assert_eq!(session.store().unread_count_snapshot().data, 2);
}

#[tokio::test]
async fn mark_all_read_is_local_only() {
    let (server, session) = setup().await;
    load_notifications(&server, &session, 2).await;

    session.mark_all_read();

    let store = session.store();
    assert!(store.notifications_snapshot().data.iter().all(|n| n.is_read));
    assert_eq!(store.unread_count_snapshot().data, 0);
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unread_polling_fetches_repeatedly_until_stopped() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/notifications/user/{USER_ID}/unread-count")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 7 })))
        .mount(&server)
        .await;

    session.start_unread_polling().await.unwrap();
    // Idempotent second start.
    session.start_unread_polling().await.unwrap();

    tokio::time::sleep(Duration::from_millis(180)).await;
    session.stop_unread_polling().await;

    let received = server.received_requests().await.unwrap();
    let polls = received
        .iter()
        .filter(|r| r.url.path().ends_with("/unread-count"))
        .count();
    // 50ms cadence with an immediate first tick: at least the first
    // fetch plus one interval fetch within 180ms.
    assert!(polls >= 2, "expected at least 2 polls, got {polls}");
    assert_eq!(session.store().unread_count_snapshot().data, 7);

    // No further fetches after stop.
    tokio::time::sleep(Duration::from_millis(120)).await;
    let after = server.received_requests().await.unwrap().len();
    assert_eq!(after, received.len());
}

// ── Teardown ────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_domain_restores_initial_snapshot() {
    let (server, session) = setup().await;
    load_notifications(&server, &session, 2).await;

    session.reset_domain(ResourceDomain::Notifications).await;

    let initial = DataStore::new();
    let store = session.store();
    assert_eq!(
        store.notifications_snapshot(),
        initial.notifications_snapshot()
    );
    assert_eq!(
        store.unread_count_snapshot(),
        initial.unread_count_snapshot()
    );
}

#[tokio::test]
async fn in_flight_response_is_discarded_after_reset() {
    let (server, session) = setup().await;

    Mock::given(method("GET"))
        .and(path("/recommendations/trending"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "trendingBooks": [book(1, "Dune")] } }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let racing = {
        let session = session.clone();
        tokio::spawn(async move { session.fetch_trending_books().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.reset_domain(ResourceDomain::Recommendations).await;
    racing.await.unwrap().unwrap();

    // The late response must not resurrect the torn-down field.
    let snap = session.store().trending_books_snapshot();
    assert_eq!(snap.status, FieldStatus::Idle);
    assert!(snap.data.is_empty());
}

#[tokio::test]
async fn logout_resets_every_domain_and_stops_polling() {
    let (server, session) = setup().await;
    load_notifications(&server, &session, 2).await;

    Mock::given(method("GET"))
        .and(path("/analytics/books/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "books": [{ "id": 1, "title": "Dune", "author": "H",
                "viewCount": 1, "reviewCount": 1, "averageRating": 4.0 }] }
        })))
        .mount(&server)
        .await;
    session.fetch_popular_books().await.unwrap();
    session.start_unread_polling().await.unwrap();

    session.logout().await;

    let initial = DataStore::new();
    let store = session.store();
    assert_eq!(store.popular_books_snapshot(), initial.popular_books_snapshot());
    assert_eq!(store.notifications_snapshot(), initial.notifications_snapshot());

    let before = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(120)).await;
    let after = server.received_requests().await.unwrap().len();
    assert_eq!(before, after, "poll kept running after logout");
}

#[tokio::test]
async fn operations_after_logout_fail_fast() {
    let (_server, session) = setup().await;

    session.logout().await;

    let err = session.fetch_trending_books().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionClosed));
    let err = session.start_unread_polling().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionClosed));
}

// ── Optimistic reviews ──────────────────────────────────────────────

#[tokio::test]
async fn submitted_review_confirms_with_server_copy() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/reviews"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "review": {
                "id": 101, "bookId": 42, "userId": USER_ID,
                "rating": 5, "reviewText": "Great read"
            }}
        })))
        .mount(&server)
        .await;

    session.submit_review(42, 5, "Great read").await.unwrap();

    let snap = session.store().book_reviews_snapshot().data;
    assert_eq!(snap.book_id, Some(42));
    assert_eq!(snap.entries.len(), 1);
    assert_eq!(snap.entries[0].review.id, 101);
    assert_eq!(snap.entries[0].confirmation, Confirmation::Confirmed);
}

#[tokio::test]
async fn failed_review_stays_visible_as_unconfirmed() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/reviews"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "storage offline"
        })))
        .mount(&server)
        .await;

    let err = session.submit_review(42, 4, "Solid").await.unwrap_err();
    assert!(matches!(err, CoreError::Api { .. }));

    let snap = session.store().book_reviews_snapshot().data;
    assert_eq!(snap.entries.len(), 1);
    assert!(matches!(
        snap.entries[0].confirmation,
        Confirmation::Unconfirmed { .. }
    ));
    assert_eq!(snap.entries[0].review.review_text, "Solid");
}

#[tokio::test]
async fn review_rating_out_of_range_is_rejected() {
    let (_server, session) = setup().await;

    let err = session.submit_review(42, 6, "too good").await.unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
    assert!(session.store().book_reviews_snapshot().data.entries.is_empty());
}

#[tokio::test]
async fn refetch_reconciles_confirmed_entries_by_id() {
    let (server, session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/reviews"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "review": {
                "id": 101, "bookId": 42, "userId": USER_ID,
                "rating": 5, "reviewText": "Great read"
            }}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reviews/book/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "reviews": [
                { "id": 7, "bookId": 42, "userId": "someone-else",
                  "rating": 3, "reviewText": "meh" },
                { "id": 101, "bookId": 42, "userId": USER_ID,
                  "rating": 5, "reviewText": "Great read" },
            ]}
        })))
        .mount(&server)
        .await;

    session.submit_review(42, 5, "Great read").await.unwrap();
    session.fetch_book_reviews(42).await.unwrap();

    let snap = session.store().book_reviews_snapshot().data;
    let ids: Vec<i64> = snap.entries.iter().map(|e| e.review.id).collect();
    // The confirmed local is not duplicated by the server copy.
    assert_eq!(ids, vec![7, 101]);
}
