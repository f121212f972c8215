//! CNVS Scraper Core Library
//!
//! This crate provides the core scraping functionality for the CNVS
//! streaming catalog.
//!
//! # Features
//! - Authenticated session with idle refresh and a background keep-alive
//! - "Mais Visto do Dia" and search listings, classified into movies and series
//! - Episodes of the season a series page currently renders
//! - Fallback chains locating the embeddable player and the direct media address
//! - Per-request timeout and cancellation threaded through every fetch

pub mod client;
pub mod enumerator;
pub mod error;
pub mod keepalive;
pub mod parser;
pub mod resolver;
pub mod scraper;
pub mod session;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use client::{ClientConfig, CnvsClient, FetchRequest, FetchedPage, Method, PageFetcher};
pub use enumerator::EpisodeEnumerator;
pub use error::{CnvsError, Result};
pub use keepalive::KeepAlive;
pub use resolver::{MediaResolver, PlayerResolver};
pub use scraper::{CnvsScraper, ScraperConfig, PREVIEW_COUNT};
pub use session::{LoginVerification, SessionConfig, SessionManager};
pub use types::{
    CatalogEntry, CatalogResult, Episode, MediaKind, MediaStep, OrganizedCatalog, PlayerStep,
    Resolution, ScrapeOptions, Summary,
};
