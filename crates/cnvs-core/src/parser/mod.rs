//! HTML parsers for CNVS pages
//!
//! This module contains pure parsers over fetched page text:
//! - `listing`: Parse home and search listings into catalog entries
//! - `classify`: Label an entry as movie or series
//! - `episodes`: Parse the selected season of a series page
//! - `player`: Fallback chain locating the embeddable player on a watch page
//! - `media`: Fallback chain locating the media asset on a player page

pub mod classify;
pub mod episodes;
pub mod listing;
pub mod media;
pub mod player;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{CnvsError, Result};

// Re-export main parsing functions
pub use classify::{classify, SEASON_MARKER};
pub use episodes::{parse_episodes, NOT_AVAILABLE};
pub use listing::{find_section_heading, parse_listing, ListingMode, MOST_WATCHED_HEADING};
pub use media::resolve_media_in_document;
pub use player::resolve_player_in_document;

/// A fetched page prepared for the resolver chains
pub struct PageContext<'a> {
    /// Parsed document
    pub document: &'a Html,
    /// Raw page text, for pattern scans
    pub raw: &'a str,
    /// Address the page was served from
    pub base: &'a Url,
}

/// Compile a CSS selector.
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CnvsError::ParseError(format!("Invalid selector {css}: {e:?}")))
}

/// Trimmed text content of an element.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first descendant matching `css`.
pub(crate) fn first_text(element: &ElementRef, css: &str) -> Option<String> {
    let selector = selector(css).ok()?;
    element.select(&selector).next().map(|el| element_text(&el))
}

/// Resolve `href` against `base`; absolute addresses pass through.
pub(crate) fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}
