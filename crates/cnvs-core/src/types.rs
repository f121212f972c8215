//! Data types for the CNVS scraper
//!
//! Every catalog structure is built fresh per call and never persisted.
//! Field names on the wire follow the JSON the facade has always served
//! (`watch_link`, `imdb`, `video_url`, `type`).

use serde::{Deserialize, Serialize};

/// Kind of a catalog entry, derived from its duration-or-seasons text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Single title with a running time (e.g. "120 Min")
    Movie,
    /// Title with one or more seasons (e.g. "2 Temporadas")
    Series,
}

/// One title as listed on a catalog page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display title
    pub title: String,
    /// Absolute address of the watch page
    pub watch_link: String,
    /// Raw duration ("120 Min") or season count ("2 Temporadas") text
    pub duration_or_seasons: String,
    /// Release year text
    pub year: String,
    /// Rating text with the "IMDb" label removed
    #[serde(rename = "imdb")]
    pub rating: String,
    /// Background image address
    pub image_url: String,
    /// Movie or series
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Embeddable player page, when resolved
    pub player_url: Option<String>,
    /// Direct media asset, when resolved
    #[serde(rename = "video_url")]
    pub media_url: Option<String>,
    /// Episodes of the selected season; always empty for movies
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// Episode of the season currently rendered on a series page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Site identifier of the episode
    pub id: String,
    /// Season label as shown in the season selector
    pub season: String,
    /// Season identifier from the season selector
    pub season_id: String,
    /// Episode title
    pub title: String,
    /// Duration text or "N/A"
    pub duration: String,
    /// Publish date text or "N/A"
    pub published: String,
    /// Embeddable player page read from the episode's action container
    pub player_url: Option<String>,
    /// Direct media asset, only resolved for the preview episodes
    #[serde(rename = "video_url")]
    pub media_url: Option<String>,
}

/// Entry counts of an organized catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub movies: usize,
    pub series: usize,
}

/// Catalog partitioned by kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrganizedCatalog {
    pub movies: Vec<CatalogEntry>,
    pub series: Vec<CatalogEntry>,
    pub summary: Summary,
}

impl OrganizedCatalog {
    /// Partition entries by kind, keeping document order inside each list.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let total = entries.len();
        let (movies, series): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|entry| entry.kind == MediaKind::Movie);

        let summary = Summary {
            total,
            movies: movies.len(),
            series: series.len(),
        };

        Self {
            movies,
            series,
            summary,
        }
    }
}

/// Result of a catalog operation, shaped by the caller's `organized` flag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogResult {
    /// Entries in document order
    Flat(Vec<CatalogEntry>),
    /// Entries partitioned into movies and series with a summary
    Organized(OrganizedCatalog),
}

impl CatalogResult {
    /// Shape entries according to `organized`.
    pub fn from_entries(entries: Vec<CatalogEntry>, organized: bool) -> Self {
        if organized {
            CatalogResult::Organized(OrganizedCatalog::from_entries(entries))
        } else {
            CatalogResult::Flat(entries)
        }
    }

    /// Empty result of the requested shape.
    pub fn empty(organized: bool) -> Self {
        Self::from_entries(Vec::new(), organized)
    }

    /// Iterate over all entries regardless of shape.
    pub fn entries(&self) -> Box<dyn Iterator<Item = &CatalogEntry> + '_> {
        match self {
            CatalogResult::Flat(entries) => Box::new(entries.iter()),
            CatalogResult::Organized(catalog) => {
                Box::new(catalog.movies.iter().chain(catalog.series.iter()))
            }
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            CatalogResult::Flat(entries) => entries.len(),
            CatalogResult::Organized(catalog) => catalog.summary.total,
        }
    }

    /// Whether the result holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caller intent for a catalog operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeOptions {
    /// Resolve player and media addresses
    pub include_media: bool,
    /// Episodes kept per series; zero or negative means unlimited
    pub max_episodes_per_series: i32,
    /// Return the organized shape instead of the flat list
    pub organized: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            include_media: true,
            max_episodes_per_series: 5,
            organized: true,
        }
    }
}

impl ScrapeOptions {
    /// Episode cap as an optional count (`None` = unlimited).
    pub fn episode_limit(&self) -> Option<usize> {
        episode_cap(self.max_episodes_per_series)
    }
}

/// Convert a signed episode cap; zero or negative means unlimited.
pub(crate) fn episode_cap(max_episodes: i32) -> Option<usize> {
    usize::try_from(max_episodes).ok().filter(|limit| *limit > 0)
}

/// Which strategy of the player chain produced an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStep {
    /// Primary watch action already targets an absolute player address
    WatchAction,
    /// Watch action targets an in-page fragment holding a frame or data attribute
    FragmentTarget,
    /// Watch action targets a root-relative path
    RootRelative,
    /// An embedded frame whose source looks like a player
    PlayableFrame,
    /// The first embedded frame, taken as a best-effort guess
    FirstFrame,
    /// A player address found inside an inline script
    InlineScript,
}

/// Which strategy of the media chain produced an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaStep {
    /// `<video src>` or a nested `<source src>`
    NativeElement,
    /// One of the prioritized raw-text patterns
    PagePattern,
    /// URL-bearing data attribute on a player widget element
    PlayerWidget,
    /// Any media address on a known hosting domain
    HostingScan,
}

/// Outcome of a fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<S> {
    /// A strategy matched
    Found { url: String, step: S },
    /// Every strategy failed, or the page could not be fetched
    NotFound,
    /// The page fetch exceeded the request timeout
    TimedOut,
}

impl<S> Resolution<S> {
    /// The resolved address, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::Found { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Consume the resolution, keeping only the address.
    pub fn into_url(self) -> Option<String> {
        match self {
            Resolution::Found { url, .. } => Some(url),
            _ => None,
        }
    }

    /// The strategy that matched, if any.
    pub fn step(&self) -> Option<&S> {
        match self {
            Resolution::Found { step, .. } => Some(step),
            _ => None,
        }
    }
}
