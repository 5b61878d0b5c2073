//! Periodic removal of expired sessions
//!
//! Expiry is always enforced at lookup time; the sweep only bounds how many
//! dead rows accumulate.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::SessionStore;

/// Handle to the background sweep task
pub struct SessionSweeper {
    shutdown: watch::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionSweeper {
    /// Start sweeping `store` every `interval`. The first sweep runs immediately.
    pub fn spawn<S>(store: Arc<S>, interval: Duration) -> Self
    where
        S: SessionStore + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep_once(store.as_ref());
                    }
                    // a send or a dropped sender both mean stop
                    _ = shutdown_rx.changed() => break,
                }
            }

            tracing::debug!("Session sweeper stopped");
        });

        tracing::info!(interval_secs = interval.as_secs(), "Session sweeper started");

        Self { shutdown, task }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Session sweeper did not shut down cleanly");
        }
    }
}

/// Delete every expired session once. Returns the number of rows removed.
pub fn sweep_once<S: SessionStore + ?Sized>(store: &S) -> u64 {
    match store.delete_expired_sessions(Utc::now()) {
        Ok(0) => 0,
        Ok(removed) => {
            tracing::info!(removed, "Swept expired sessions");
            removed
        }
        Err(e) => {
            tracing::warn!(error = %e, "Session sweep failed");
            0
        }
    }
}
