//! Detached notification dispatch
//!
//! Emails are never awaited by a request. [`dispatch`] hands the send to the
//! blocking pool, logs a failure, and drops the join handle.

use std::sync::Arc;

use crate::email::EmailSender;

/// Run `job` against the sender in the background.
///
/// The returned future is not awaited by anyone; an error from the sender,
/// or a panic inside it, is logged at `warn` and otherwise ignored.
pub fn dispatch<E, F>(sender: &Arc<E>, label: &'static str, job: F)
where
    E: EmailSender + 'static,
    F: FnOnce(&E) -> Result<(), String> + Send + 'static,
{
    let sender = Arc::clone(sender);
    let handle = tokio::task::spawn_blocking(move || job(sender.as_ref()));

    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(())) => tracing::debug!(notification = label, "Notification delivered"),
            Ok(Err(e)) => tracing::warn!(notification = label, error = %e, "Notification failed"),
            Err(e) => tracing::warn!(notification = label, error = %e, "Notification task aborted"),
        }
    });
}
