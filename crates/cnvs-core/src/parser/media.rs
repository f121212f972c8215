//! Media address resolution for CNVS player pages
//!
//! Same shape as the player chain: ordered strategies over one fetched page,
//! first match wins.

use regex_lite::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use super::{absolutize, selector, PageContext};
use crate::types::MediaStep;

/// A single strategy of the media chain
pub type MediaStrategy = fn(&PageContext) -> Option<(MediaStep, String)>;

/// Strategies in precedence order
pub const MEDIA_CHAIN: &[MediaStrategy] = &[
    native_element,
    page_patterns,
    player_widget,
    hosting_scan,
];

/// Marker of a playable media file
const MEDIA_FILE_MARKER: &str = ".mp4";

/// Raw-text patterns, site hosts first and the generic address last
const PAGE_PATTERNS: [&str; 8] = [
    r#"(?i)https?://server[^\s<>"']+\.mp4[^\s<>"']*"#,
    r#"(?i)https?://[^\s<>"']*playmycnvs[^\s<>"']+\.mp4[^\s<>"']*"#,
    r#"(?i)"file"\s*:\s*"([^"]+\.mp4[^"]*)""#,
    r#"(?i)"src"\s*:\s*"([^"]+\.mp4[^"]*)""#,
    r#"(?i)src\s*=\s*"([^"]+\.mp4[^"]*)""#,
    r#"(?i)src\s*=\s*'([^']+\.mp4[^']*)'"#,
    r#"(?i)"video"\s*:\s*"([^"]+\.mp4[^"]*)""#,
    r#"(?i)https?://[^\s<>"']+\.mp4[^\s<>"']*"#,
];

/// Class-name fragments of known player widgets
const WIDGET_CLASS_MARKERS: [&str; 5] = ["jwplayer", "plyr", "video-js", "vjs", "player"];

/// Widget data attributes that may carry the media address
const WIDGET_DATA_ATTRS: [&str; 5] = ["data-file", "data-src", "data-video", "data-url", "data-stream"];

/// Hosting keywords accepted by the final scan
const HOSTING_KEYWORDS: [&str; 4] = ["server", "cdn", "storage", "playmycnvs"];

/// Run the media chain over a player page.
///
/// # Arguments
/// * `html` - Raw HTML of the player page
/// * `base` - Address of the player page
///
/// # Returns
/// The matching step and the media address, or `None` when every strategy
/// failed.
pub fn resolve_media_in_document(html: &str, base: &Url) -> Option<(MediaStep, String)> {
    let document = Html::parse_document(html);
    let page = PageContext {
        document: &document,
        raw: html,
        base,
    };

    MEDIA_CHAIN.iter().find_map(|strategy| strategy(&page))
}

/// Undo JSON slash escaping (`https:\/\/...`).
fn unescape_slashes(text: &str) -> String {
    text.replace("\\/", "/")
}

fn usable_source(src: &str) -> bool {
    let src = src.trim();
    !src.is_empty() && !src.starts_with("blob:")
}

/// Step 1: `<video src>` or a nested `<source src>`.
fn native_element(page: &PageContext) -> Option<(MediaStep, String)> {
    let videos = selector("video").ok()?;
    let sources = selector("source[src]").ok()?;

    for video in page.document.select(&videos) {
        let direct = video.value().attr("src").filter(|src| usable_source(src));
        let nested = || {
            video
                .select(&sources)
                .filter_map(|s| s.value().attr("src"))
                .find(|src| usable_source(src))
        };

        if let Some(src) = direct.or_else(nested) {
            if let Some(url) = absolutize(page.base, src) {
                return Some((MediaStep::NativeElement, url));
            }
        }
    }

    None
}

/// Step 2: prioritized patterns over the raw page text.
fn page_patterns(page: &PageContext) -> Option<(MediaStep, String)> {
    PAGE_PATTERNS.iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        let caps = re.captures(page.raw)?;
        let m = caps.get(1).or_else(|| caps.get(0))?;
        let url = unescape_slashes(m.as_str().trim_matches(|c| c == '"' || c == '\''));
        absolutize(page.base, &url).map(|url| (MediaStep::PagePattern, url))
    })
}

fn is_widget(el: &ElementRef) -> bool {
    el.value().classes().any(|class| {
        let class = class.to_lowercase();
        WIDGET_CLASS_MARKERS.iter().any(|m| class.contains(m))
    })
}

/// Step 3: data attributes on player widget elements.
fn player_widget(page: &PageContext) -> Option<(MediaStep, String)> {
    let classed = selector("[class]").ok()?;

    page.document
        .select(&classed)
        .filter(is_widget)
        .find_map(|widget| {
            let value = WIDGET_DATA_ATTRS
                .iter()
                .filter_map(|attr| widget.value().attr(attr))
                .find(|v| usable_source(v))?;
            absolutize(page.base, &unescape_slashes(value)).map(|url| (MediaStep::PlayerWidget, url))
        })
}

/// Step 4: any absolute media address on a known hosting domain.
fn hosting_scan(page: &PageContext) -> Option<(MediaStep, String)> {
    let text = unescape_slashes(page.raw);
    let re = Regex::new(r#"https?://[^\s<>"'\\]+"#).ok()?;

    let found = re
        .find_iter(&text)
        .map(|m| m.as_str())
        .find(|url| {
            let lower = url.to_lowercase();
            lower.contains(MEDIA_FILE_MARKER) && HOSTING_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .map(|url| (MediaStep::HostingScan, url.to_string()));
    found
}
