use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cnvs_core::{
    CatalogResult, ClientConfig, CnvsClient, CnvsScraper, LoginVerification, ScrapeOptions,
    ScraperConfig, SessionConfig,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="row">
    <div class="col-12">
      <h5>Mais Visto do Dia</h5>
      <div class="swiper-wrapper">
        <div class="swiper-slide">
          <div class="item poster">
            <div class="content" style="background-image: url('/uploads/missao.jpg');"></div>
            <div class="info">
              <h6>Missão Impossível</h6>
              <a href="/watch/missao-impossivel">Ver</a>
              <p class="tags"><span>120 Min</span><span>2023</span><span>IMDb 7.7</span></p>
            </div>
          </div>
        </div>
        <div class="swiper-slide">
          <div class="item poster">
            <div class="content" style="background-image: url('/uploads/the-office.jpg');"></div>
            <div class="info">
              <h6>The Office</h6>
              <a href="/watch/the-office">Ver</a>
              <p class="tags"><span>2 Temporadas</span><span>2005</span><span>IMDb 9.0</span></p>
            </div>
          </div>
        </div>
      </div>
    </div>
  </div>
</body></html>"#;

const MOVIE_PAGE: &str = r#"<html><body><h1>Missão Impossível</h1><p>Indisponível no momento.</p></body></html>"#;

const SERIES_PAGE: &str = r#"<html><body>
  <select id="seasons-view"><option value="201" selected>Temporada 1</option><option value="202">Temporada 2</option></select>
  <div class="episodes">
    <div class="ep" data-id="5001">
      <h5>Piloto</h5>
      <span class="duration">22 min</span>
      <div class="buttons"><a href="/episode/5001'">Assistir</a></div>
    </div>
  </div>
</body></html>"#;

const SEARCH_PAGE: &str = r#"<html><body>
  <div class="item poster"><div class="info"><h6>Duna</h6><a href="/watch/duna">Ver</a>
    <p class="tags"><span>155 Min</span><span>2021</span><span>IMDb 8.0</span></p></div></div>
  <div class="item poster"><h6>Sem info</h6></div>
  <div class="item poster"><div class="info"><h6>Duna: Profecia</h6><a href="/watch/duna-profecia">Ver</a>
    <p class="tags"><span>1 Temporada</span><span>2024</span><span>IMDb 7.0</span></p></div></div>
</body></html>"#;

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn scraper_for(server: &MockServer, session: SessionConfig) -> CnvsScraper {
    let client = CnvsClient::with_config(ClientConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    })
    .unwrap();
    let config = ScraperConfig {
        item_pause: Duration::ZERO,
    };
    CnvsScraper::with_fetcher(Arc::new(client), session, config)
}

async fn catalog_site() -> MockServer {
    let server = MockServer::start().await;
    mount_page(&server, "/", HOME_PAGE).await;
    mount_page(&server, "/watch/missao-impossivel", MOVIE_PAGE).await;
    mount_page(&server, "/watch/the-office", SERIES_PAGE).await;
    server
}

#[tokio::test]
async fn most_watched_end_to_end() {
    let server = catalog_site().await;
    let scraper = scraper_for(&server, SessionConfig::new("token"));

    let options = ScrapeOptions {
        include_media: true,
        max_episodes_per_series: 5,
        organized: true,
    };
    let result = scraper.most_watched(options, &CancellationToken::new()).await;

    let CatalogResult::Organized(catalog) = result else {
        panic!("expected organized result");
    };
    assert_eq!(catalog.summary.total, 2);
    assert_eq!(catalog.summary.movies, 1);
    assert_eq!(catalog.summary.series, 1);

    let movie = &catalog.movies[0];
    assert_eq!(movie.title, "Missão Impossível");
    assert_eq!(movie.watch_link, format!("{}/watch/missao-impossivel", server.uri()));
    assert_eq!(movie.rating, "7.7");
    assert_eq!(movie.image_url, "/uploads/missao.jpg");
    assert!(movie.player_url.is_none());
    assert!(movie.media_url.is_none());

    let series = &catalog.series[0];
    assert_eq!(series.episodes.len(), 1);
    let episode = &series.episodes[0];
    assert_eq!(episode.id, "5001");
    assert_eq!(episode.season, "Temporada 1");
    assert_eq!(episode.duration, "22 min");
    assert_eq!(episode.published, "N/A");
    assert_eq!(
        episode.player_url.as_deref(),
        Some(format!("{}/episode/5001", server.uri()).as_str())
    );
    assert!(episode.media_url.is_none());
}

#[tokio::test]
async fn flat_and_organized_shapes_hold_same_titles() {
    let server = catalog_site().await;
    let scraper = scraper_for(&server, SessionConfig::new("token"));
    let cancel = CancellationToken::new();

    let mut options = ScrapeOptions {
        include_media: false,
        ..ScrapeOptions::default()
    };
    let organized = scraper.most_watched(options, &cancel).await;
    options.organized = false;
    let flat = scraper.most_watched(options, &cancel).await;

    assert!(matches!(flat, CatalogResult::Flat(_)));
    let titles = |result: &CatalogResult| -> HashSet<String> {
        result.entries().map(|e| e.title.clone()).collect()
    };
    assert_eq!(titles(&flat), titles(&organized));
    assert_eq!(titles(&flat).len(), 2);
}

#[tokio::test]
async fn search_skips_malformed_cards() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("q", "duna"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
        .mount(&server)
        .await;
    let scraper = scraper_for(&server, SessionConfig::new("token"));

    let options = ScrapeOptions {
        include_media: false,
        max_episodes_per_series: 5,
        organized: false,
    };
    let result = scraper.search("duna", options, &CancellationToken::new()).await;

    let CatalogResult::Flat(entries) = result else {
        panic!("expected flat result");
    };
    let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Duna", "Duna: Profecia"]);
    assert!(entries[1].episodes.is_empty());
}

#[tokio::test]
async fn login_carries_cookie_into_token_submission() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=cnvs42; Path=/")
                .set_body_string("<form method=\"post\"></form>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("cookie", "PHPSESSID=cnvs42"))
        .and(body_string_contains("token=E22PFZRX"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"<a href="/logout">Sair</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = SessionConfig::new("E22PFZRX");
    session.login_verification = LoginVerification::Strict;
    let scraper = scraper_for(&server, session);

    assert!(scraper.login(&CancellationToken::new()).await);
    assert!(scraper.session().is_authenticated());
}

#[tokio::test]
async fn rejected_login_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let scraper = scraper_for(&server, SessionConfig::new("expired"));
    assert!(!scraper.login(&CancellationToken::new()).await);
    assert!(!scraper.session().is_authenticated());
}
