//! Movie/series classification.

use crate::types::MediaKind;

/// Substring of the season-count text on series cards ("2 Temporadas")
pub const SEASON_MARKER: &str = "Temporada";

/// Classify an entry from its duration-or-seasons text.
///
/// # Examples
/// ```
/// use cnvs_core::parser::classify;
/// use cnvs_core::MediaKind;
///
/// assert_eq!(classify("2 Temporadas"), MediaKind::Series);
/// assert_eq!(classify("120 Min"), MediaKind::Movie);
/// ```
pub fn classify(duration_or_seasons: &str) -> MediaKind {
    if duration_or_seasons.contains(SEASON_MARKER) {
        MediaKind::Series
    } else {
        MediaKind::Movie
    }
}
