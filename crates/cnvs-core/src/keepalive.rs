//! Background keep-alive for the shared session

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::SessionManager;

/// Shortest accepted tick interval
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the recurring keep-alive task
///
/// The task calls [`SessionManager::ensure_fresh`] on every tick, so it only
/// talks to the site when the session has actually gone idle. Its requests go
/// through the same I/O guard as foreground scraping.
pub struct KeepAlive {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Start the task. It runs until `token` is cancelled.
    pub fn spawn(session: Arc<SessionManager>, interval: Duration, token: CancellationToken) -> Self {
        let period = interval.max(MIN_INTERVAL);
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = period.as_secs(), "keep-alive started");

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => session.ensure_fresh(&task_token).await,
                }
            }

            info!("keep-alive stopped");
        });

        Self { token, handle }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "keep-alive task ended abnormally");
        }
    }
}
