//! Main CNVS scraper API
//!
//! [`CnvsScraper`] ties the session, the listing parser, the episode
//! enumerator and the two resolvers into the four operations the facade
//! serves. Each catalog call is sequential: one request at a time, items in
//! document order.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientConfig, CnvsClient, FetchRequest, PageFetcher};
use crate::enumerator::EpisodeEnumerator;
use crate::error::Result;
use crate::parser::{parse_listing, ListingMode};
use crate::resolver::{MediaResolver, PlayerResolver};
use crate::session::{SessionConfig, SessionManager};
use crate::types::{CatalogEntry, CatalogResult, MediaKind, Resolution, ScrapeOptions};

/// Episodes per series whose media address is resolved eagerly
pub const PREVIEW_COUNT: usize = 3;

/// Path of the search results page
const SEARCH_PATH: &str = "/search.php";

/// Aggregation settings
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Pause between item resolutions when media is included (default: 500ms)
    pub item_pause: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            item_pause: Duration::from_millis(500),
        }
    }
}

/// Main scraper API for the CNVS site
///
/// # Example
/// ```no_run
/// use cnvs_core::{CnvsScraper, ScrapeOptions, SessionConfig};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scraper = CnvsScraper::new(SessionConfig::new("MEU-TOKEN"))?;
///     let cancel = CancellationToken::new();
///
///     if scraper.login(&cancel).await {
///         let result = scraper.most_watched(ScrapeOptions::default(), &cancel).await;
///         println!("Found {} titles", result.len());
///     }
///     Ok(())
/// }
/// ```
pub struct CnvsScraper {
    session: Arc<SessionManager>,
    players: PlayerResolver,
    media: MediaResolver,
    episodes: EpisodeEnumerator,
    config: ScraperConfig,
}

impl CnvsScraper {
    /// Create a scraper over the production HTTP client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(session: SessionConfig) -> Result<Self> {
        let client = CnvsClient::with_config(ClientConfig {
            timeout_secs: session.request_timeout.as_secs(),
            ..ClientConfig::default()
        })?;
        Ok(Self::with_fetcher(Arc::new(client), session, ScraperConfig::default()))
    }

    /// Create a scraper over any fetcher.
    ///
    /// This is useful for testing or when you need custom client configuration.
    pub fn with_fetcher(
        fetcher: Arc<dyn PageFetcher>,
        session: SessionConfig,
        config: ScraperConfig,
    ) -> Self {
        let session = Arc::new(SessionManager::new(fetcher, session));
        Self {
            players: PlayerResolver::new(session.clone()),
            media: MediaResolver::new(session.clone()),
            episodes: EpisodeEnumerator::new(session.clone()),
            session,
            config,
        }
    }

    /// Shared session, for readiness checks and the keep-alive task.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Log in with the configured token.
    pub async fn login(&self, cancel: &CancellationToken) -> bool {
        self.session.login(cancel).await
    }

    /// Refresh the session if it has been idle. Never fails.
    pub async fn ensure_fresh(&self, cancel: &CancellationToken) {
        self.session.ensure_fresh(cancel).await
    }

    /// Titles of the home page "Mais Visto do Dia" section.
    pub async fn most_watched(&self, options: ScrapeOptions, cancel: &CancellationToken) -> CatalogResult {
        let Some(home) = self.session.absolute_url("/") else {
            return CatalogResult::empty(options.organized);
        };

        self.scrape_listing(FetchRequest::get(home), ListingMode::Home, options, cancel)
            .await
    }

    /// Titles matching `query`.
    ///
    /// An empty or whitespace-only query returns an empty result of the
    /// requested shape.
    pub async fn search(
        &self,
        query: &str,
        options: ScrapeOptions,
        cancel: &CancellationToken,
    ) -> CatalogResult {
        let query = query.trim();
        if query.is_empty() {
            warn!("empty search query");
            return CatalogResult::empty(options.organized);
        }

        let Some(url) = self.session.absolute_url(SEARCH_PATH) else {
            return CatalogResult::empty(options.organized);
        };

        let request = FetchRequest::get(url).query("q", query);
        self.scrape_listing(request, ListingMode::Search, options, cancel)
            .await
    }

    async fn scrape_listing(
        &self,
        request: FetchRequest,
        mode: ListingMode,
        options: ScrapeOptions,
        cancel: &CancellationToken,
    ) -> CatalogResult {
        self.session.ensure_fresh(cancel).await;

        let url = request.url.clone();
        let page = match self.session.fetch(request, cancel).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => {
                warn!(url = %url, status = page.status, "listing page returned error status");
                return CatalogResult::empty(options.organized);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "listing page fetch failed");
                return CatalogResult::empty(options.organized);
            }
        };

        let mut entries = parse_listing(&page.body, mode, self.session.base_url());
        info!(mode = ?mode, count = entries.len(), "listing parsed");

        self.complete_entries(&mut entries, options, cancel).await;
        CatalogResult::from_entries(entries, options.organized)
    }

    /// Fill in episodes and, when requested, player and media addresses.
    async fn complete_entries(
        &self,
        entries: &mut [CatalogEntry],
        options: ScrapeOptions,
        cancel: &CancellationToken,
    ) {
        let total = entries.len();

        for (idx, entry) in entries.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                debug!(item = idx + 1, "scrape cancelled, returning partial entries");
                break;
            }

            if entry.watch_link.is_empty() {
                debug!(title = %entry.title, "card has no watch link, skipping");
                continue;
            }

            if entry.kind == MediaKind::Series {
                entry.episodes = self
                    .episodes
                    .enumerate(&entry.watch_link, options.max_episodes_per_series, cancel)
                    .await;
            }

            if !options.include_media {
                continue;
            }

            match entry.kind {
                MediaKind::Movie => self.resolve_movie(entry, cancel).await,
                MediaKind::Series => self.resolve_preview(entry, cancel).await,
            }

            if idx + 1 < total {
                self.pause(cancel).await;
            }
        }
    }

    async fn resolve_movie(&self, entry: &mut CatalogEntry, cancel: &CancellationToken) {
        let player = match self.players.resolve(&entry.watch_link, cancel).await {
            Resolution::Found { url, step } => {
                debug!(title = %entry.title, step = ?step, "player resolved");
                url
            }
            Resolution::NotFound => {
                debug!(title = %entry.title, "no player found");
                return;
            }
            Resolution::TimedOut => {
                warn!(title = %entry.title, "player lookup timed out");
                return;
            }
        };

        entry.media_url = self.media.resolve(&player, cancel).await.into_url();
        entry.player_url = Some(player);
    }

    /// Resolve media for the first [`PREVIEW_COUNT`] episodes only.
    async fn resolve_preview(&self, entry: &mut CatalogEntry, cancel: &CancellationToken) {
        for episode in entry.episodes.iter_mut().take(PREVIEW_COUNT) {
            let Some(player) = episode.player_url.as_deref() else {
                continue;
            };
            episode.media_url = self.media.resolve(player, cancel).await.into_url();
        }
    }

    async fn pause(&self, cancel: &CancellationToken) {
        if self.config.item_pause.is_zero() {
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.config.item_pause) => {}
        }
    }
}
