//! HTTP handlers
//!
//! Each catalog route maps its query string onto [`ScrapeOptions`], calls the
//! scraper and renders the result. The `limit` parameter is applied here, not
//! in the core: it truncates the movie and series lists independently.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cnvs_core::{CatalogEntry, CatalogResult, ScrapeOptions, Summary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppContext;

/// Episodes per series when `max_episodes` is absent
const DEFAULT_MAX_EPISODES: i32 = 5;

const AVAILABLE_ENDPOINTS: [&str; 5] = [
    "/",
    "/health",
    "/api/most-watched",
    "/api/search?q=query",
    "/api/search-fast?q=query",
];

/// Query string of the catalog routes
///
/// Values are kept as text and parsed leniently: an unparsable number falls
/// back to its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub max_episodes: Option<String>,
    pub organize: Option<String>,
}

impl CatalogParams {
    /// Positive `limit`, if any.
    pub fn limit(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
    }

    pub fn max_episodes(&self) -> i32 {
        self.max_episodes
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_EPISODES)
    }

    /// `organize` is true unless given as anything other than "true".
    pub fn organize(&self) -> bool {
        self.organize
            .as_deref()
            .map_or(true, |v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn query(&self) -> Result<&str, ApiError> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ApiError::Validation("Query parameter \"q\" is required".to_string()))
    }
}

#[derive(Serialize)]
struct OrganizedBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    summary: Summary,
    movies: Vec<CatalogEntry>,
    series: Vec<CatalogEntry>,
}

#[derive(Serialize)]
struct FlatBody<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    count: usize,
    data: Vec<CatalogEntry>,
}

fn truncate(mut entries: Vec<CatalogEntry>, limit: Option<usize>) -> Vec<CatalogEntry> {
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

/// Render a catalog result with `limit` applied.
///
/// In the organized shape `summary.total` still counts every entry, while
/// `summary.movies` and `summary.series` count the truncated lists.
pub fn render_catalog(result: CatalogResult, query: Option<&str>, limit: Option<usize>) -> Response {
    match result {
        CatalogResult::Organized(catalog) => {
            let movies = truncate(catalog.movies, limit);
            let series = truncate(catalog.series, limit);
            let summary = Summary {
                total: catalog.summary.total,
                movies: movies.len(),
                series: series.len(),
            };
            Json(OrganizedBody {
                success: true,
                query,
                summary,
                movies,
                series,
            })
            .into_response()
        }
        CatalogResult::Flat(entries) => {
            let data = truncate(entries, limit);
            Json(FlatBody {
                success: true,
                query,
                count: data.len(),
                data,
            })
            .into_response()
        }
    }
}

/// `GET /` service banner.
pub async fn root(State(ctx): State<AppContext>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "scraper_ready": ctx.is_ready(),
        "message": "CNVSWeb Scraper API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "most_watched": {
                "url": "/api/most-watched",
                "method": "GET",
                "description": "Filmes/séries mais assistidos do dia, com URLs de vídeo",
                "params": {
                    "limit": "Opcional - Número máximo de resultados por lista",
                    "max_episodes": "Opcional - Máximo de episódios por série (padrão: 5)",
                    "organize": "Opcional - true/false (padrão: true)"
                },
                "example": "/api/most-watched?limit=10&max_episodes=3"
            },
            "search": {
                "url": "/api/search?q=query",
                "method": "GET",
                "description": "Busca filmes/séries com URLs de vídeo",
                "params": {
                    "q": "Obrigatório - Termo de busca",
                    "limit": "Opcional - Número máximo de resultados por lista",
                    "max_episodes": "Opcional - Máximo de episódios por série (padrão: 5)",
                    "organize": "Opcional - true/false (padrão: true)"
                },
                "example": "/api/search?q=avengers&limit=10&max_episodes=3"
            },
            "search_fast": {
                "url": "/api/search-fast?q=query",
                "method": "GET",
                "description": "Busca rápida sem URLs de vídeo",
                "params": {
                    "q": "Obrigatório - Termo de busca",
                    "limit": "Opcional - Número máximo de resultados por lista",
                    "organize": "Opcional - true/false (padrão: true)"
                },
                "example": "/api/search-fast?q=batman&limit=5"
            }
        }
    }))
}

/// `GET /health`
pub async fn health(State(ctx): State<AppContext>) -> Json<Value> {
    let ready = ctx.is_ready();
    let timestamp = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    Json(json!({
        "status": if ready { "healthy" } else { "initializing" },
        "scraper_ready": ready,
        "timestamp": timestamp,
    }))
}

/// `GET /api/most-watched`
pub async fn most_watched(
    State(ctx): State<AppContext>,
    Query(params): Query<CatalogParams>,
) -> Result<Response, ApiError> {
    ctx.ensure_ready()?;

    let options = ScrapeOptions {
        include_media: true,
        max_episodes_per_series: params.max_episodes(),
        organized: params.organize(),
    };
    info!(?options, "most watched requested");

    let result = ctx.scraper().most_watched(options, &ctx.request_token()).await;
    Ok(render_catalog(result, None, params.limit()))
}

/// `GET /api/search`
pub async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<CatalogParams>,
) -> Result<Response, ApiError> {
    ctx.ensure_ready()?;
    let query = params.query()?;

    let options = ScrapeOptions {
        include_media: true,
        max_episodes_per_series: params.max_episodes(),
        organized: params.organize(),
    };
    info!(query, ?options, "search requested");

    let result = ctx.scraper().search(query, options, &ctx.request_token()).await;
    Ok(render_catalog(result, Some(query), params.limit()))
}

/// `GET /api/search-fast`: search without player or media resolution.
///
/// Series episodes are still enumerated, and with no cap: each series page
/// is fetched and every episode of its selected season is listed. What the
/// route skips is the player and media lookups and the pause between items.
pub async fn search_fast(
    State(ctx): State<AppContext>,
    Query(params): Query<CatalogParams>,
) -> Result<Response, ApiError> {
    ctx.ensure_ready()?;
    let query = params.query()?;

    let options = ScrapeOptions {
        include_media: false,
        max_episodes_per_series: 0,
        organized: params.organize(),
    };
    info!(query, "fast search requested");

    let result = ctx.scraper().search(query, options, &ctx.request_token()).await;
    Ok(render_catalog(result, Some(query), params.limit()))
}

/// Fallback for unknown routes.
pub async fn not_found() -> Response {
    let body = json!({
        "success": false,
        "error": "Endpoint not found",
        "available_endpoints": AVAILABLE_ENDPOINTS,
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
