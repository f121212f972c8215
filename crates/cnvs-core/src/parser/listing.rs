//! Catalog listing parser for CNVS pages
//!
//! Parses the home page "most watched" carousel and search result grids into
//! [`CatalogEntry`] values. A card that cannot be parsed is skipped; the rest
//! of the listing is still returned.

use regex_lite::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};
use url::Url;

use super::classify::classify;
use super::{absolutize, element_text, first_text, selector};
use crate::error::{CnvsError, Result};
use crate::types::CatalogEntry;

/// Heading of the home page section holding today's most watched titles
pub const MOST_WATCHED_HEADING: &str = "Mais Visto do Dia";

/// Looser heading prefix used as the last matching attempt
const MOST_WATCHED_PREFIX: &str = "Mais Visto";

const MOST_WATCHED_PATTERN: &str = r"(?i)mais\s+visto\s+do\s+dia";

/// Title used when a card has no `h6`; an empty `h6` keeps its empty text
const UNTITLED: &str = "Sem título";

/// Which kind of page a listing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingMode {
    /// Home page; only the most-watched section is parsed
    Home,
    /// Search results page; every poster card is parsed
    Search,
}

/// Parse catalog entries from a listing page.
///
/// # Arguments
/// * `html` - Raw HTML of the page
/// * `mode` - Home section or search grid
/// * `base` - Site origin used to absolutise watch links
///
/// # Returns
/// Entries in document order. Never fails: a missing section yields an empty
/// list and malformed cards are skipped.
pub fn parse_listing(html: &str, mode: ListingMode, base: &Url) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);

    let items = match mode {
        ListingMode::Home => home_items(&document),
        ListingMode::Search => search_items(&document),
    };

    let mut entries = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        match parse_item(item, base) {
            Ok(entry) => entries.push(entry),
            Err(e) => debug!(item = idx + 1, error = %e, "skipping catalog card"),
        }
    }

    debug!(?mode, parsed = entries.len(), cards = items.len(), "parsed listing");
    entries
}

/// Locate the most-watched heading.
///
/// Tries, in order: the exact phrase, a case-insensitive pattern, then a
/// looser substring scan. Within each attempt the first heading in document order wins.
pub fn find_section_heading(document: &Html) -> Option<ElementRef<'_>> {
    let heading_selector = selector("h5").ok()?;
    let headings: Vec<(ElementRef, String)> = document
        .select(&heading_selector)
        .map(|h| {
            let text = element_text(&h);
            (h, text)
        })
        .collect();

    let pattern = Regex::new(MOST_WATCHED_PATTERN).ok();

    headings
        .iter()
        .find(|(_, text)| text.contains(MOST_WATCHED_HEADING))
        .or_else(|| {
            let pattern = pattern.as_ref()?;
            headings.iter().find(|(_, text)| pattern.is_match(text))
        })
        .or_else(|| {
            headings
                .iter()
                .find(|(_, text)| text.contains(MOST_WATCHED_PREFIX))
        })
        .map(|(heading, _)| *heading)
}

/// Cards inside the most-watched section container.
fn home_items(document: &Html) -> Vec<ElementRef<'_>> {
    let Some(heading) = find_section_heading(document) else {
        let found: Vec<String> = selector("h5")
            .map(|s| document.select(&s).map(|h| element_text(&h)).collect())
            .unwrap_or_default();
        warn!(headings = ?found, "most watched section not found");
        return Vec::new();
    };

    let container = heading
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div" && el.value().classes().any(|c| c == "col-12"));

    let Some(container) = container else {
        warn!("most watched section has no container");
        return Vec::new();
    };

    for css in ["div.swiper-slide", "div.item.poster"] {
        if let Ok(item_selector) = selector(css) {
            let items: Vec<_> = container.select(&item_selector).collect();
            if !items.is_empty() {
                return items;
            }
        }
    }

    Vec::new()
}

/// Every poster card on a search page.
fn search_items(document: &Html) -> Vec<ElementRef<'_>> {
    selector("div.item.poster")
        .map(|s| document.select(&s).collect())
        .unwrap_or_default()
}

/// Parse one card. Only a missing `div.info` is fatal for the card.
fn parse_item(item: &ElementRef, base: &Url) -> Result<CatalogEntry> {
    let info_selector = selector("div.info")?;
    let info = item
        .select(&info_selector)
        .next()
        .ok_or_else(|| CnvsError::ParseError("card has no div.info".to_string()))?;

    let title = first_text(&info, "h6").unwrap_or_else(|| UNTITLED.to_string());

    let watch_link = selector("a[href]")
        .ok()
        .and_then(|s| info.select(&s).next())
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolutize(base, href))
        .unwrap_or_default();

    let tags = extract_tags(&info);
    let duration_or_seasons = tags.first().cloned().unwrap_or_default();
    let year = tags.get(1).cloned().unwrap_or_default();
    let rating = tags
        .get(2)
        .map(|t| t.replace("IMDb", "").trim().to_string())
        .unwrap_or_default();

    let image_url = extract_background(item).unwrap_or_default();
    let kind = classify(&duration_or_seasons);

    Ok(CatalogEntry {
        title,
        watch_link,
        duration_or_seasons,
        year,
        rating,
        image_url,
        kind,
        player_url: None,
        media_url: None,
        episodes: Vec::new(),
    })
}

/// Texts of the `p.tags` spans: duration-or-seasons, year, rating.
fn extract_tags(info: &ElementRef) -> Vec<String> {
    let Ok(tags_selector) = selector("p.tags") else {
        return Vec::new();
    };
    let Some(tags) = info.select(&tags_selector).next() else {
        return Vec::new();
    };
    let Ok(span_selector) = selector("span") else {
        return Vec::new();
    };

    tags.select(&span_selector).map(|s| element_text(&s)).collect()
}

/// Background image from `div.content`'s inline `url(...)` style.
fn extract_background(item: &ElementRef) -> Option<String> {
    let content_selector = selector("div.content").ok()?;
    let style = item.select(&content_selector).next()?.value().attr("style")?;

    let re = Regex::new(r"url\((.*?)\)").ok()?;
    let raw = re.captures(style)?.get(1)?.as_str();
    let url = raw.trim().trim_matches(|c| c == '"' || c == '\'');

    (!url.is_empty()).then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaKind;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://cnvsweb.stream").unwrap()
    }

    fn card(title: &str, tags: &str, href: &str) -> String {
        format!(
            r#"<div class="swiper-slide">
                 <div class="content" style="background-image: url('https://cdn.cnvsweb.stream/{title}.jpg');"></div>
                 <div class="info">
                   <h6>{title}</h6>
                   <p class="tags">{tags}</p>
                   <a href="{href}" class="btn">Assistir</a>
                 </div>
               </div>"#
        )
    }

    fn broken_card() -> String {
        r#"<div class="swiper-slide"><div class="content"></div></div>"#.to_string()
    }

    fn home_page(heading: &str, cards: &str) -> String {
        format!(
            r#"<html><body>
                 <div class="col-12"><h5>Lançamentos</h5><div class="swiper-slide"><div class="info"><h6>Outro</h6></div></div></div>
                 <div class="col-12">
                   <h5>{heading}</h5>
                   <div class="swiper-wrapper">{cards}</div>
                 </div>
               </body></html>"#
        )
    }

    #[test]
    fn test_parse_home_section() {
        let cards = card(
            "Duna",
            "<span>120 Min</span><span>2021</span><span>IMDb 8.0</span>",
            "/watch/duna",
        ) + &card(
            "Dark",
            "<span>3 Temporadas</span><span>2017</span><span>IMDb 8.7</span>",
            "/watch/dark",
        );
        let entries = parse_listing(&home_page("Mais Visto do Dia", &cards), ListingMode::Home, &base());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Duna");
        assert_eq!(entries[0].watch_link, "https://cnvsweb.stream/watch/duna");
        assert_eq!(entries[0].duration_or_seasons, "120 Min");
        assert_eq!(entries[0].year, "2021");
        assert_eq!(entries[0].rating, "8.0");
        assert_eq!(entries[0].image_url, "https://cdn.cnvsweb.stream/Duna.jpg");
        assert_eq!(entries[0].kind, MediaKind::Movie);
        assert_eq!(entries[1].kind, MediaKind::Series);
        assert!(entries.iter().all(|e| e.player_url.is_none() && e.episodes.is_empty()));
    }

    #[test]
    fn test_heading_case_insensitive_match() {
        let cards = card("Duna", "<span>120 Min</span>", "/watch/duna");
        let entries = parse_listing(&home_page("MAIS  VISTO DO DIA", &cards), ListingMode::Home, &base());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_heading_substring_match() {
        let cards = card("Duna", "<span>120 Min</span>", "/watch/duna");
        let entries = parse_listing(&home_page("🔥 Mais Vistos Hoje", &cards), ListingMode::Home, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Duna");
    }

    #[test]
    fn test_exact_heading_beats_earlier_substring_heading() {
        let html = format!(
            r#"<div class="col-12"><h5>Mais Visto da Semana</h5>{}</div>
               <div class="col-12"><h5>Mais Visto do Dia</h5>{}</div>"#,
            card("Semana", "<span>90 Min</span>", "/watch/semana"),
            card("Dia", "<span>90 Min</span>", "/watch/dia"),
        );
        let entries = parse_listing(&html, ListingMode::Home, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Dia");
    }

    #[test]
    fn test_decorated_phrase_beats_earlier_pattern_heading() {
        let html = format!(
            r#"<div class="col-12"><h5>MAIS VISTO DO DIA (antigo)</h5>{}</div>
               <div class="col-12"><h5>🔥 Mais Visto do Dia</h5>{}</div>"#,
            card("Errado", "<span>90 Min</span>", "/watch/errado"),
            card("Certo", "<span>90 Min</span>", "/watch/certo"),
        );
        let entries = parse_listing(&html, ListingMode::Home, &base());
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Certo"]);
    }

    #[test]
    fn test_missing_section_yields_empty() {
        let cards = card("Duna", "<span>120 Min</span>", "/watch/duna");
        let entries = parse_listing(&home_page("Lançamentos", &cards), ListingMode::Home, &base());
        // "Lançamentos" appears twice and neither is the target section
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_container_yields_empty() {
        let html = format!("<section><h5>Mais Visto do Dia</h5>{}</section>", card("A", "", "/a"));
        assert!(parse_listing(&html, ListingMode::Home, &base()).is_empty());
    }

    #[test]
    fn test_home_falls_back_to_poster_items() {
        let html = r#"<div class="col-12"><h5>Mais Visto do Dia</h5>
            <div class="item poster"><div class="info"><h6>Poster</h6><p class="tags"><span>100 Min</span></p></div></div>
        </div>"#;
        let entries = parse_listing(html, ListingMode::Home, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Poster");
    }

    #[test]
    fn test_malformed_cards_are_skipped() {
        let cards = [
            broken_card(),
            card("A", "<span>90 Min</span>", "/watch/a"),
            broken_card(),
            card("B", "<span>1 Temporada</span>", "/watch/b"),
            broken_card(),
        ]
        .concat();
        let entries = parse_listing(&home_page("Mais Visto do Dia", &cards), ListingMode::Home, &base());
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_subfields_default_empty() {
        let html = r#"<div class="item poster"><div class="info"><h6>Só título</h6></div></div>"#;
        let entries = parse_listing(html, ListingMode::Search, &base());
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.title, "Só título");
        assert_eq!(entry.watch_link, "");
        assert_eq!(entry.duration_or_seasons, "");
        assert_eq!(entry.year, "");
        assert_eq!(entry.rating, "");
        assert_eq!(entry.image_url, "");
        assert_eq!(entry.kind, MediaKind::Movie);
    }

    #[test]
    fn test_untitled_card() {
        let html = r#"<div class="item poster"><div class="info"><a href="/watch/x">Ver</a></div></div>"#;
        let entries = parse_listing(html, ListingMode::Search, &base());
        assert_eq!(entries[0].title, UNTITLED);
        assert_eq!(entries[0].watch_link, "https://cnvsweb.stream/watch/x");
    }

    #[test]
    fn test_empty_title_stays_empty() {
        let html = r#"<div class="item poster"><div class="info"><h6>  </h6><a href="/watch/x">Ver</a></div></div>"#;
        let entries = parse_listing(html, ListingMode::Search, &base());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "");
    }

    #[test]
    fn test_search_mode_parses_all_posters() {
        let html = r#"
            <div class="item poster"><div class="info"><h6>Um</h6></div></div>
            <div class="row"><div class="item poster"><div class="info"><h6>Dois</h6></div></div></div>
            <div class="swiper-slide"><div class="info"><h6>Fora</h6></div></div>"#;
        let entries = parse_listing(html, ListingMode::Search, &base());
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Um", "Dois"]);
    }

    #[test]
    fn test_extract_background_double_quotes() {
        let html = Html::parse_fragment(
            r#"<div><div class="content" style="background: url(&quot;https://img/x.jpg&quot;) center"></div></div>"#,
        );
        assert_eq!(
            extract_background(&html.root_element()).as_deref(),
            Some("https://img/x.jpg")
        );
    }

    #[test]
    fn test_parse_empty_html() {
        assert!(parse_listing("<html><body></body></html>", ListingMode::Home, &base()).is_empty());
        assert!(parse_listing("", ListingMode::Search, &base()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_count_equals_well_formed_cards(layout in proptest::collection::vec(any::<bool>(), 0..12)) {
            let cards: String = layout
                .iter()
                .enumerate()
                .map(|(i, good)| {
                    if *good {
                        format!(r#"<div class="item poster"><div class="info"><h6>T{i}</h6></div></div>"#)
                    } else {
                        r#"<div class="item poster"><span>broken</span></div>"#.to_string()
                    }
                })
                .collect();
            let expected = layout.iter().filter(|g| **g).count();

            let entries = parse_listing(&cards, ListingMode::Search, &base());
            prop_assert_eq!(entries.len(), expected);
        }

        #[test]
        fn prop_never_panics(html in ".{0,300}") {
            let _ = parse_listing(&html, ListingMode::Home, &base());
            let _ = parse_listing(&html, ListingMode::Search, &base());
        }
    }
}
