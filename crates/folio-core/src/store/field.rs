// ── Per-field request lifecycle slot ──
//
// One `Field<T>` per named sub-resource. Holds the current
// `RequestState<T>` behind a `watch` channel for push-based change
// notification, plus a ticket counter that arbitrates overlapping
// operations: a settlement commits only while its ticket is still the
// latest issued for the field.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// Lifecycle status of one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldStatus {
    /// Never fetched (or reset to the initial snapshot).
    #[default]
    Idle,
    /// An operation is in flight.
    Pending,
    /// The last settled operation succeeded.
    Fulfilled,
    /// The last settled operation failed; `data` keeps its last-known
    /// good value.
    Rejected,
}

/// Status + error + payload for one field.
///
/// Invariant: `Pending` implies `error` is `None`. On `Rejected` the
/// payload is preserved; only an explicit domain reset clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestState<T> {
    pub status: FieldStatus,
    pub error: Option<String>,
    pub data: T,
}

impl<T> RequestState<T> {
    /// True while an operation is in flight.
    pub fn is_pending(&self) -> bool {
        self.status == FieldStatus::Pending
    }
}

/// A single reactive field slot.
pub(crate) struct Field<T: Clone + Default + Send + Sync + 'static> {
    state: watch::Sender<RequestState<T>>,

    /// Latest issued ticket. Bumped by `begin()` and by `reset()` so
    /// that settlements of superseded or torn-down operations are
    /// discarded.
    latest: AtomicU64,
}

impl<T: Clone + Default + Send + Sync + 'static> Field<T> {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(RequestState::default());
        Self {
            state,
            latest: AtomicU64::new(0),
        }
    }

    /// Start an operation: publish `{Pending, error=None}` (payload
    /// untouched) and return the ticket that authorizes its settlement.
    pub(crate) fn begin(&self) -> u64 {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.status = FieldStatus::Pending;
            s.error = None;
        });
        ticket
    }

    /// Commit a successful settlement. Returns `false` (store untouched)
    /// when the ticket has been superseded.
    pub(crate) fn fulfill(&self, ticket: u64, data: T) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.state.send_modify(|s| {
            s.status = FieldStatus::Fulfilled;
            s.error = None;
            s.data = data;
        });
        true
    }

    /// Commit a successful settlement whose payload derives from the
    /// current one (optimistic-entry reconciliation).
    pub(crate) fn fulfill_with(&self, ticket: u64, f: impl FnOnce(&T) -> T) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.state.send_modify(|s| {
            s.status = FieldStatus::Fulfilled;
            s.error = None;
            s.data = f(&s.data);
        });
        true
    }

    /// Commit a failed settlement. The payload is preserved.
    pub(crate) fn reject(&self, ticket: u64, message: String) -> bool {
        if !self.is_latest(ticket) {
            return false;
        }
        self.state.send_modify(|s| {
            s.status = FieldStatus::Rejected;
            s.error = Some(message);
        });
        true
    }

    /// Apply a synchronous local patch to the payload only. Status and
    /// error are left untouched so an optimistic mutation is
    /// indistinguishable from server-confirmed data.
    pub(crate) fn patch(&self, f: impl FnOnce(&mut T)) {
        self.state.send_modify(|s| f(&mut s.data));
    }

    /// Restore the initial snapshot and invalidate every outstanding
    /// ticket.
    pub(crate) fn reset(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| *s = RequestState::default());
    }

    pub(crate) fn snapshot(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn begin_publishes_pending_with_no_error() {
        let field: Field<Vec<u32>> = Field::new();
        field.begin();

        let snap = field.snapshot();
        assert_eq!(snap.status, FieldStatus::Pending);
        assert_eq!(snap.error, None);
    }

    #[test]
    fn begin_clears_previous_error_but_keeps_data() {
        let field: Field<Vec<u32>> = Field::new();
        let t = field.begin();
        field.fulfill(t, vec![1, 2]);
        let t = field.begin();
        field.reject(t, "boom".into());

        field.begin();
        let snap = field.snapshot();
        assert_eq!(snap.status, FieldStatus::Pending);
        assert_eq!(snap.error, None);
        assert_eq!(snap.data, vec![1, 2]);
    }

    #[test]
    fn reject_preserves_last_known_good_data() {
        let field: Field<Vec<u32>> = Field::new();
        let t = field.begin();
        assert!(field.fulfill(t, vec![7]));

        let t = field.begin();
        assert!(field.reject(t, "network down".into()));

        let snap = field.snapshot();
        assert_eq!(snap.status, FieldStatus::Rejected);
        assert_eq!(snap.error.as_deref(), Some("network down"));
        assert_eq!(snap.data, vec![7]);
    }

    #[test]
    fn stale_ticket_settlement_is_discarded() {
        let field: Field<Vec<u32>> = Field::new();
        let first = field.begin();
        let second = field.begin();

        // Second (latest) settles first, then the stale first arrives.
        assert!(field.fulfill(second, vec![2]));
        assert!(!field.fulfill(first, vec![1]));
        assert!(!field.reject(first, "late failure".into()));

        let snap = field.snapshot();
        assert_eq!(snap.status, FieldStatus::Fulfilled);
        assert_eq!(snap.data, vec![2]);
    }

    #[test]
    fn reset_restores_initial_snapshot_and_invalidates_tickets() {
        let field: Field<Vec<u32>> = Field::new();
        let ticket = field.begin();
        field.reset();

        assert_eq!(field.snapshot(), RequestState::default());
        // The in-flight operation may still land afterwards: discarded.
        assert!(!field.fulfill(ticket, vec![9]));
        assert_eq!(field.snapshot(), RequestState::default());
    }

    #[test]
    fn patch_leaves_status_and_error_alone() {
        let field: Field<Vec<u32>> = Field::new();
        let t = field.begin();
        field.fulfill(t, vec![1]);

        field.patch(|data| data.push(2));

        let snap = field.snapshot();
        assert_eq!(snap.status, FieldStatus::Fulfilled);
        assert_eq!(snap.data, vec![1, 2]);
    }

    #[test]
    fn subscribers_observe_transitions() {
        let field: Field<u64> = Field::new();
        let mut rx = field.subscribe();

        let t = field.begin();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, FieldStatus::Pending);

        field.fulfill(t, 5);
        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.status, FieldStatus::Fulfilled);
        assert_eq!(state.data, 5);
    }
}
