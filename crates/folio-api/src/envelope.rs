// ── Tolerant payload-envelope extraction ──
//
// The microservice is inconsistent about response shape: a collection may
// arrive bare (`[...]`), under a `data` envelope (`{data: [...]}`), or
// under a further named key (`{data: {trendingBooks: [...]}}`). A missing
// or null payload means "empty", never an error. These helpers pin that
// behavior down in one place so callers always receive the documented
// shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Error;

fn deserialization_error(e: &serde_json::Error, value: &Value) -> Error {
    let body = value.to_string();
    let preview = body.chars().take(200).collect::<String>();
    Error::Deserialization {
        message: format!("{e} (body preview: {preview:?})"),
        body,
    }
}

/// Locate the collection payload: `value.data.{key}`, then `value.data`,
/// then `value` itself — first of those that is an array wins.
fn find_array<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let data = value.get("data");
    data.and_then(|d| d.get(key))
        .filter(|v| v.is_array())
        .or_else(|| data.filter(|v| v.is_array()))
        .or_else(|| Some(value).filter(|v| v.is_array()))
}

/// Extract a list payload, tolerating all documented envelope shapes.
///
/// A response without any array (`{}`, `null`, an envelope missing the
/// key) yields an empty `Vec`. Elements that are present but malformed
/// are a [`Error::Deserialization`].
pub fn list<T: DeserializeOwned>(value: &Value, key: &str) -> Result<Vec<T>, Error> {
    match find_array(value, key) {
        Some(arr) => {
            serde_json::from_value(arr.clone()).map_err(|e| deserialization_error(&e, value))
        }
        None => Ok(Vec::new()),
    }
}

/// Extract an object payload (`value.data` when it is an object, else
/// `value` itself). A missing/null payload yields `T::default()`.
pub fn object<T: DeserializeOwned + Default>(value: &Value) -> Result<T, Error> {
    let payload = match value.get("data") {
        Some(d) if d.is_object() => d,
        _ => value,
    };
    if payload.is_null() || payload.as_object().is_none_or(serde_json::Map::is_empty) {
        return Ok(T::default());
    }
    serde_json::from_value(payload.clone()).map_err(|e| deserialization_error(&e, value))
}

/// Extract a named object payload: `value.data.{key}`, then `value.data`,
/// then `value`, first of those that is an object. `None` when no object
/// payload is present.
///
/// Only the named key is authoritative: a malformed object under it is a
/// [`Error::Deserialization`]. The unnamed fallbacks may instead be a
/// bare acknowledgment (`{"success": true}`), so they are adopted only
/// when they actually decode as `T`.
pub fn named_object<T: DeserializeOwned>(value: &Value, key: &str) -> Result<Option<T>, Error> {
    let data = value.get("data");
    if let Some(named) = data.and_then(|d| d.get(key)).filter(|v| v.is_object()) {
        return serde_json::from_value(named.clone())
            .map(Some)
            .map_err(|e| deserialization_error(&e, value));
    }

    let fallback = data
        .filter(|v| v.is_object())
        .or_else(|| Some(value).filter(|v| v.is_object()));
    Ok(fallback.and_then(|obj| serde_json::from_value(obj.clone()).ok()))
}

/// Extract a non-negative counter: `{count}`, `{data: {count}}`, or a
/// bare number. Anything else (including negatives) clamps to 0.
pub fn count(value: &Value) -> u64 {
    value
        .get("count")
        .or_else(|| value.get("data").and_then(|d| d.get("count")))
        .or(Some(value))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Book, Review, UserActivity};
    use serde_json::json;

    fn book(id: i64) -> Value {
        json!({"id": id, "title": "T", "author": "A", "overallRating": 4.0})
    }

    #[test]
    fn list_unwraps_nested_key() {
        let v = json!({"data": {"trendingBooks": [book(1), book(2)]}});
        let books: Vec<Book> = list(&v, "trendingBooks").unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].id, 1);
    }

    #[test]
    fn list_unwraps_data_array() {
        let v = json!({"data": [book(7)]});
        let books: Vec<Book> = list(&v, "books").unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, 7);
    }

    #[test]
    fn list_accepts_bare_array() {
        let v = json!([book(3)]);
        let books: Vec<Book> = list(&v, "books").unwrap();
        assert_eq!(books[0].id, 3);
    }

    #[test]
    fn list_defaults_to_empty_on_missing_payload() {
        for v in [json!({}), json!(null), json!({"data": {}})] {
            let books: Vec<Book> = list(&v, "books").unwrap();
            assert!(books.is_empty());
        }
    }

    #[test]
    fn list_reports_malformed_elements() {
        let v = json!({"data": {"books": [{"title": 42}]}});
        let err = list::<Book>(&v, "books").unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn object_unwraps_data_envelope() {
        let v = json!({"data": {"totalUsers": 10, "activeUsers": 4}});
        let activity: UserActivity = object(&v).unwrap();
        assert_eq!(activity.total_users, 10);
        assert_eq!(activity.active_users, 4);
    }

    #[test]
    fn object_defaults_when_empty() {
        let activity: UserActivity = object(&json!({})).unwrap();
        assert_eq!(activity, UserActivity::default());

        let activity: UserActivity = object(&json!(null)).unwrap();
        assert_eq!(activity, UserActivity::default());
    }

    #[test]
    fn named_object_unwraps_named_key() {
        let v = json!({"data": {"review": {
            "id": 9, "bookId": 42, "userId": "u-1", "rating": 4
        }}});
        let review: Option<Review> = named_object(&v, "review").unwrap();
        assert_eq!(review.unwrap().id, 9);
    }

    #[test]
    fn named_object_treats_acknowledgment_as_absent() {
        // An ack-only body carries no review; it must not be forced
        // through the `Review` decoder.
        for v in [json!({"success": true}), json!({}), json!(null)] {
            let review: Option<Review> = named_object(&v, "review").unwrap();
            assert!(review.is_none(), "expected None for {v}");
        }
    }

    #[test]
    fn named_object_reports_malformed_named_payload() {
        let v = json!({"data": {"review": {"id": "not-a-number"}}});
        let err = named_object::<Review>(&v, "review").unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn count_accepts_all_shapes() {
        assert_eq!(count(&json!({"count": 5})), 5);
        assert_eq!(count(&json!({"data": {"count": 2}})), 2);
        assert_eq!(count(&json!(9)), 9);
        assert_eq!(count(&json!({})), 0);
        assert_eq!(count(&json!({"count": -3})), 0);
    }
}
