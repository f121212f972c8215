//! Player address resolution for CNVS watch pages
//!
//! Watch pages change markup between releases, so the embeddable player is
//! located by an ordered chain of independent strategies. The first strategy
//! returning an address wins.

use regex_lite::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use super::{absolutize, element_text, selector, PageContext};
use crate::types::PlayerStep;

/// A single strategy of the player chain
pub type PlayerStrategy = fn(&PageContext) -> Option<(PlayerStep, String)>;

/// Strategies in precedence order
pub const PLAYER_CHAIN: &[PlayerStrategy] = &[
    watch_action_absolute,
    fragment_target,
    root_relative,
    frame_scan,
    inline_script,
];

/// Class names the site has used for the main watch button
const WATCH_ACTION_STYLES: &str = "a.btn-watch, a.btn-play, a.watch-btn, a.btn-assistir";

/// Visible text of the main watch button
const WATCH_ACTION_TEXT: &str = "assistir";

const WATCH_ACTION_ATTRS: &str =
    "a[data-original-title*='Assistir'], a[data-title*='Assistir'], a[data-action='watch']";

/// Substrings that mark an address as a player
const PLAYER_MARKERS: [&str; 2] = ["play", "stream"];

/// Data attributes that may carry a player address
const URL_DATA_ATTRS: [&str; 5] = ["data-src", "data-url", "data-player", "data-link", "data-video"];

/// Script patterns, player hosts first
const SCRIPT_PATTERNS: [&str; 4] = [
    r#"(?i)https?://[^\s"']*playcnvs[^\s"']*"#,
    r#"(?i)https?://[^\s"']*player[^\s"']*"#,
    r#"(?i)"url"\s*:\s*"([^"]+)""#,
    r#"(?i)'url'\s*:\s*'([^']+)'"#,
];

/// Run the player chain over a watch page.
///
/// # Arguments
/// * `html` - Raw HTML of the watch page
/// * `base` - Address of the watch page
///
/// # Returns
/// The matching step and the absolute player address, or `None` when every
/// strategy failed.
pub fn resolve_player_in_document(html: &str, base: &Url) -> Option<(PlayerStep, String)> {
    let document = Html::parse_document(html);
    let page = PageContext {
        document: &document,
        raw: html,
        base,
    };

    PLAYER_CHAIN.iter().find_map(|strategy| strategy(&page))
}

fn has_player_marker(url: &str) -> bool {
    let lower = url.to_lowercase();
    PLAYER_MARKERS.iter().any(|m| lower.contains(m))
}

/// Locate the primary watch action: style marker, then visible text, then
/// descriptive data attribute.
fn find_watch_action<'a>(document: &'a Html) -> Option<ElementRef<'a>> {
    if let Some(el) = selector(WATCH_ACTION_STYLES)
        .ok()
        .and_then(|s| document.select(&s).next())
    {
        return Some(el);
    }

    if let Some(el) = selector("a").ok().and_then(|s| {
        document
            .select(&s)
            .find(|a| element_text(a).to_lowercase().contains(WATCH_ACTION_TEXT))
    }) {
        return Some(el);
    }

    selector(WATCH_ACTION_ATTRS)
        .ok()
        .and_then(|s| document.select(&s).next())
}

/// Target of the watch action: `href`, or `data-target` for modal buttons.
fn watch_target(document: &Html) -> Option<String> {
    let action = find_watch_action(document)?;
    let attrs = action.value();
    attrs
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty() && *h != "#")
        .or_else(|| attrs.attr("data-target").map(str::trim))
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

fn is_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Step 1: the watch action already points at an absolute player address.
fn watch_action_absolute(page: &PageContext) -> Option<(PlayerStep, String)> {
    let target = watch_target(page.document)?;
    (is_absolute(&target) && has_player_marker(&target)).then(|| (PlayerStep::WatchAction, target))
}

/// Step 2: the watch action points at an in-page fragment.
fn fragment_target(page: &PageContext) -> Option<(PlayerStep, String)> {
    let target = watch_target(page.document)?;
    let id = target.strip_prefix('#')?;
    if id.is_empty() {
        return None;
    }

    let any = selector("[id]").ok()?;
    let container = page
        .document
        .select(&any)
        .find(|el| el.value().id() == Some(id))?;

    let frame_src = selector("iframe[src]")
        .ok()
        .and_then(|s| container.select(&s).next())
        .and_then(|f| f.value().attr("src"))
        .and_then(|src| absolutize(page.base, src));
    if let Some(url) = frame_src {
        return Some((PlayerStep::FragmentTarget, url));
    }

    URL_DATA_ATTRS.iter().find_map(|attr| {
        let value = container
            .descendants()
            .filter_map(ElementRef::wrap)
            .find_map(|el| el.value().attr(attr))?;
        absolutize(page.base, value).map(|url| (PlayerStep::FragmentTarget, url))
    })
}

/// Step 3: the watch action points at a root-relative path.
fn root_relative(page: &PageContext) -> Option<(PlayerStep, String)> {
    let target = watch_target(page.document)?;
    if !target.starts_with('/') || target.starts_with("//") {
        return None;
    }
    absolutize(page.base, &target).map(|url| (PlayerStep::RootRelative, url))
}

/// Step 4: a frame that looks like a player, else the first frame.
fn frame_scan(page: &PageContext) -> Option<(PlayerStep, String)> {
    let frames = selector("iframe").ok()?;
    let sources: Vec<&str> = page
        .document
        .select(&frames)
        .filter_map(|f| f.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .collect();

    if let Some(src) = sources.iter().find(|src| has_player_marker(src)) {
        return absolutize(page.base, src).map(|url| (PlayerStep::PlayableFrame, url));
    }

    let first = sources.first()?;
    absolutize(page.base, first).map(|url| (PlayerStep::FirstFrame, url))
}

/// Step 5: a player address inside an inline script.
fn inline_script(page: &PageContext) -> Option<(PlayerStep, String)> {
    let scripts = selector("script").ok()?;
    let patterns: Vec<Regex> = SCRIPT_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

    for script in page.document.select(&scripts) {
        if script.value().attr("src").is_some() {
            continue;
        }
        let body: String = script.text().collect();
        if body.trim().is_empty() {
            continue;
        }

        for re in &patterns {
            let found = re.captures_iter(&body).find_map(|caps| {
                let m = caps.get(1).or_else(|| caps.get(0))?;
                let url = m.as_str().trim_matches(|c| matches!(c, '"' | '\'' | ';' | ','));
                has_player_marker(url).then(|| url.replace("\\/", "/"))
            });
            if let Some(url) = found {
                if let Some(url) = absolutize(page.base, &url) {
                    return Some((PlayerStep::InlineScript, url));
                }
            }
        }
    }

    None
}
