//! Episode enumeration for series watch pages

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::parser::parse_episodes;
use crate::session::SessionManager;
use crate::types::{episode_cap, Episode};

/// Fetches a series page and lists the episodes of its selected season
#[derive(Clone)]
pub struct EpisodeEnumerator {
    session: Arc<SessionManager>,
}

impl EpisodeEnumerator {
    /// Create an enumerator sharing `session`.
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// List the episodes of the season the page currently renders.
    ///
    /// # Arguments
    /// * `series_url` - Watch address of the series
    /// * `max_episodes` - Keep the first `n` in document order; `<= 0` keeps all
    ///
    /// # Returns
    /// The episodes, or an empty list when the page could not be fetched.
    pub async fn enumerate(
        &self,
        series_url: &str,
        max_episodes: i32,
        cancel: &CancellationToken,
    ) -> Vec<Episode> {
        let page = match self.session.fetch_page(series_url, cancel).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                warn!(url = series_url, status = page.status, "series page returned error status");
                return Vec::new();
            }
            Err(e) => {
                warn!(url = series_url, error = %e, "series page fetch failed");
                return Vec::new();
            }
        };

        let episodes = parse_episodes(&page.body, self.session.base_url(), episode_cap(max_episodes));
        debug!(url = series_url, count = episodes.len(), "episodes parsed");
        episodes
    }
}
