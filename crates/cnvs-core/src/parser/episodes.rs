//! Episodes parser for CNVS series pages
//!
//! A series page renders the episodes of one season at a time, chosen by the
//! season selector. Only that season is parsed; other seasons would need
//! additional requests.

use regex_lite::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use super::{absolutize, element_text, first_text, selector};
use crate::types::Episode;

/// Placeholder for a missing duration or publish date
pub const NOT_AVAILABLE: &str = "N/A";

/// Stray character the site leaves at the end of episode player links
const STRAY_SUFFIX: char = '\'';

const SEASON_SELECT: &str = "select#seasons-view, select.seasons, .seasons select";

/// Episode node selectors; the first one with matches is used
const EPISODE_SELECTORS: [&str; 3] = ["div.ep", ".episodes .item", ".episodes li"];

/// Season currently selected on the page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SelectedSeason {
    label: String,
    id: String,
}

/// Parse the episodes of the selected season.
///
/// # Arguments
/// * `html` - Raw HTML of the series page
/// * `base` - Site origin used to absolutise player links
/// * `limit` - Keep only the first `n` episodes; `None` keeps all
///
/// # Returns
/// Episodes in document order. Missing fields fall back to defaults; no
/// episode is dropped for lack of a field.
pub fn parse_episodes(html: &str, base: &Url, limit: Option<usize>) -> Vec<Episode> {
    let document = Html::parse_document(html);
    let season = selected_season(&document);

    let nodes = episode_nodes(&document);
    let take = limit.unwrap_or(usize::MAX);

    nodes
        .iter()
        .take(take)
        .enumerate()
        .map(|(idx, node)| parse_episode(node, idx + 1, &season, base))
        .collect()
}

fn selected_season(document: &Html) -> SelectedSeason {
    let Ok(select_selector) = selector(SEASON_SELECT) else {
        return SelectedSeason::default();
    };
    let Some(select) = document.select(&select_selector).next() else {
        return SelectedSeason::default();
    };

    let option = selector("option[selected]")
        .ok()
        .and_then(|s| select.select(&s).next())
        .or_else(|| selector("option").ok().and_then(|s| select.select(&s).next()));

    option
        .map(|opt| SelectedSeason {
            label: element_text(&opt),
            id: opt.value().attr("value").unwrap_or_default().trim().to_string(),
        })
        .unwrap_or_default()
}

fn episode_nodes(document: &Html) -> Vec<ElementRef<'_>> {
    for css in EPISODE_SELECTORS {
        if let Ok(s) = selector(css) {
            let nodes: Vec<_> = document.select(&s).collect();
            if !nodes.is_empty() {
                return nodes;
            }
        }
    }
    Vec::new()
}

fn parse_episode(node: &ElementRef, position: usize, season: &SelectedSeason, base: &Url) -> Episode {
    let attrs = node.value();
    let id = attrs
        .attr("data-id")
        .or_else(|| attrs.attr("id"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| position.to_string());

    let title = first_text(node, "h5, h6, .title")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Episódio {position}"));

    let duration = non_empty_text(node, ".duration, .time");
    let published = non_empty_text(node, ".date, .publish");

    let player_url = extract_player_link(node)
        .map(|href| strip_stray_suffix(&href).to_string())
        .and_then(|href| absolutize(base, &href));

    Episode {
        id,
        season: season.label.clone(),
        season_id: season.id.clone(),
        title,
        duration,
        published,
        player_url,
        media_url: None,
    }
}

fn non_empty_text(node: &ElementRef, css: &str) -> String {
    first_text(node, css)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Player link from the episode's action container.
fn extract_player_link(node: &ElementRef) -> Option<String> {
    for css in [".buttons a[href]", "a[href]"] {
        let href = selector(css)
            .ok()
            .and_then(|s| node.select(&s).next())
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty() && *h != "#");
        if let Some(href) = href {
            return Some(href.to_string());
        }
    }

    // Some cards navigate from an onclick handler instead of an href
    let onclick = selector(".buttons [onclick], [onclick]")
        .ok()
        .and_then(|s| node.select(&s).next())
        .and_then(|el| el.value().attr("onclick"))?;
    let re = Regex::new(r#"location\.href\s*=\s*["']?([^"'\s;]+)"#).ok()?;
    Some(re.captures(onclick)?.get(1)?.as_str().to_string())
}

fn strip_stray_suffix(href: &str) -> &str {
    href.strip_suffix(STRAY_SUFFIX).unwrap_or(href)
}
