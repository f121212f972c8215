//! Network side of the two fallback chains
//!
//! [`PlayerResolver`] fetches a watch page and runs the player chain over it;
//! [`MediaResolver`] does the same for a player page and the media chain.
//! Fetch problems never escape: a timeout becomes [`Resolution::TimedOut`],
//! anything else is logged and becomes [`Resolution::NotFound`].

use std::fmt::Debug;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::parser::{resolve_media_in_document, resolve_player_in_document};
use crate::session::SessionManager;
use crate::types::{MediaStep, PlayerStep, Resolution};

/// Pure chain over one fetched page
type Chain<S> = fn(&str, &Url) -> Option<(S, String)>;

/// Locates the embeddable player for a watch page
#[derive(Clone)]
pub struct PlayerResolver {
    session: Arc<SessionManager>,
}

impl PlayerResolver {
    /// Create a player resolver sharing `session`.
    ///
    /// # Arguments
    /// * `session` - Session whose guard serialises the watch page fetch
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Fetch `watch_url` and run the player chain over it.
    pub async fn resolve(&self, watch_url: &str, cancel: &CancellationToken) -> Resolution<PlayerStep> {
        resolve_page(&self.session, watch_url, "player", resolve_player_in_document, cancel).await
    }
}

/// Locates the direct media asset behind a player page
#[derive(Clone)]
pub struct MediaResolver {
    session: Arc<SessionManager>,
}

impl MediaResolver {
    /// Create a media resolver sharing `session`.
    ///
    /// # Arguments
    /// * `session` - Session refreshed and used for the player page fetch
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Fetch `player_url` and run the media chain over it.
    ///
    /// The session is refreshed first if idle; the fetch itself counts as
    /// session activity.
    pub async fn resolve(&self, player_url: &str, cancel: &CancellationToken) -> Resolution<MediaStep> {
        resolve_page(&self.session, player_url, "media", resolve_media_in_document, cancel).await
    }
}

async fn resolve_page<S: Debug>(
    session: &SessionManager,
    url: &str,
    chain_name: &'static str,
    chain: Chain<S>,
    cancel: &CancellationToken,
) -> Resolution<S> {
    let page = match session.fetch_page(url, cancel).await {
        Ok(page) => page,
        Err(e) if e.is_timeout() => {
            warn!(url, chain = chain_name, error = %e, "page fetch timed out");
            return Resolution::TimedOut;
        }
        Err(e) => {
            warn!(url, chain = chain_name, error = %e, "page fetch failed");
            return Resolution::NotFound;
        }
    };

    if !page.is_success() {
        warn!(url, chain = chain_name, status = page.status, "page returned error status");
        return Resolution::NotFound;
    }

    let Ok(base) = Url::parse(&page.url).or_else(|_| Url::parse(url)) else {
        warn!(url, chain = chain_name, "page address is not absolute");
        return Resolution::NotFound;
    };

    match chain(&page.body, &base) {
        Some((step, found)) => {
            debug!(url, chain = chain_name, step = ?step, found = %found, "address resolved");
            Resolution::Found { url: found, step }
        }
        None => {
            debug!(url, chain = chain_name, "every strategy failed");
            Resolution::NotFound
        }
    }
}
