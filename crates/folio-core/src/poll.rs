// ── Background unread-count polling ──

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::session::Session;

/// Periodically refresh the unread notification count.
///
/// Fires once immediately, then on every interval tick until the token
/// is cancelled. Fetch failures are logged and the loop keeps going;
/// the store keeps the last known count.
pub(crate) async fn unread_poll_task(
    session: Session,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = session.fetch_unread_count().await {
                    warn!(error = %e, "unread count poll failed");
                }
            }
        }
    }
}
