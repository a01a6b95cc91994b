//! API Routes module for the Drama Scraper API
//!
//! This module contains all HTTP route handlers for the public API endpoints.

use actix_web::{web, HttpResponse, Responder, ResponseError};
use serde::Deserialize;
use tracing::{error, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

use std::sync::Arc;

use crate::cache::BaseUrlCache;
use crate::client::SiteClient;
use crate::config::Config;
use crate::error::AppResult;
use crate::extractor::PatternRegistry;
use crate::models::{
    ApiError, ApiResponse, CatalogEntry, CatalogSection, EpisodeRef, PlayableLink, PlaybackLinks,
    ShowDetail, ShowStatus, ShowType, SubtitleTrack,
};
use crate::scraper::Scraper;

/// Application state shared across handlers
pub struct AppState {
    pub client: SiteClient,
    pub config: Config,
}

impl AppState {
    /// Wire the configured site to a live scraper
    pub fn from_config(config: Config) -> AppResult<Self> {
        let adapter = config.site_adapter()?;
        let cache = Arc::new(BaseUrlCache::new(config.fallback_base_url(&adapter)));
        info!("Scraping {} (fallback base URL {})", adapter.name, cache.fallback());

        let client = SiteClient::new(
            adapter,
            Arc::new(Scraper::with_config(config.scraper.clone())),
            Arc::new(PatternRegistry::with_defaults()),
            cache,
        );
        Ok(Self { client, config })
    }
}

/// GET /api/sections - List the browsable catalog sections of the site
#[utoipa::path(
    get,
    path = "/api/sections",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog sections of the configured site", body = Vec<CatalogSection>)
    )
)]
pub async fn get_sections(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::new(data.client.sections().to_vec()))
}

/// Query parameters for catalog endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CatalogQuery {
    /// Page number (default: 1)
    pub page: Option<u32>,
    /// Section key from /api/sections (default: first section)
    pub section: Option<String>,
}

/// GET /api/catalog - Get one page of a catalog section
#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Catalog page retrieved successfully", body = Vec<CatalogEntry>),
        (status = 404, description = "Unknown section", body = ApiError),
        (status = 502, description = "Site could not be reached", body = ApiError)
    )
)]
pub async fn get_catalog(
    data: web::Data<AppState>,
    query: web::Query<CatalogQuery>,
) -> impl Responder {
    let page = query.page.unwrap_or(1);

    let result = match query.section.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(section) => data.client.list_section(section, page).await,
        None => data.client.list_catalog(page).await,
    };

    match result {
        Ok(entries) => {
            info!("Parsed {} catalog entries", entries.len());
            HttpResponse::Ok().json(ApiResponse::new(entries))
        }
        Err(e) => {
            error!("Failed to list catalog: {}", e);
            e.error_response()
        }
    }
}

/// Query parameters for search endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SearchQuery {
    /// Search keyword
    pub q: Option<String>,
}

/// GET /api/search - Search the site
///
/// Query parameter: q (required) - search keyword
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "catalog",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results retrieved successfully", body = Vec<CatalogEntry>),
        (status = 400, description = "Bad request - search query is required", body = ApiError),
        (status = 502, description = "Site could not be reached", body = ApiError)
    )
)]
pub async fn search(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let keyword = query.q.as_deref().unwrap_or_default();

    match data.client.search(keyword).await {
        Ok(results) => HttpResponse::Ok().json(ApiResponse::new(results)),
        Err(e) => {
            error!("Failed to search: {}", e);
            e.error_response()
        }
    }
}

/// Query parameters for detail endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DetailQuery {
    /// Detail page URL as returned by the catalog
    pub url: Option<String>,
}

/// GET /api/detail - Get a show with its episodes
#[utoipa::path(
    get,
    path = "/api/detail",
    tag = "catalog",
    params(DetailQuery),
    responses(
        (status = 200, description = "Show detail retrieved successfully", body = ShowDetail),
        (status = 400, description = "Bad request - url is missing or not on the site", body = ApiError),
        (status = 404, description = "Show not found", body = ApiError),
        (status = 502, description = "Site could not be reached", body = ApiError)
    )
)]
pub async fn get_detail(data: web::Data<AppState>, query: web::Query<DetailQuery>) -> impl Responder {
    let url = query.url.as_deref().unwrap_or_default();

    match data.client.load_detail(url).await {
        Ok(detail) if detail.title.is_empty() && detail.episodes.is_empty() => {
            HttpResponse::NotFound().json(ApiError::new("Show not found"))
        }
        Ok(detail) => HttpResponse::Ok().json(ApiResponse::new(detail)),
        Err(e) => {
            error!("Failed to load detail {}: {}", url, e);
            e.error_response()
        }
    }
}

/// Query parameters for links endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LinksQuery {
    /// Episode source: an episode URL or an encoded source token
    pub source: Option<String>,
}

/// GET /api/links - Resolve the playable links of an episode
///
/// Broken mirrors are skipped, so the result may be partial or empty.
#[utoipa::path(
    get,
    path = "/api/links",
    tag = "playback",
    params(LinksQuery),
    responses(
        (status = 200, description = "Playable links and subtitles", body = PlaybackLinks),
        (status = 400, description = "Bad request - source is missing or not on the site", body = ApiError)
    )
)]
pub async fn get_links(data: web::Data<AppState>, query: web::Query<LinksQuery>) -> impl Responder {
    let source = match query.source.as_deref().map(str::trim) {
        Some(source) if !source.is_empty() => source,
        _ => {
            return HttpResponse::BadRequest().json(ApiError::new("Episode source is required"));
        }
    };
    if !data.client.accepts_source(source).await {
        return HttpResponse::BadRequest().json(ApiError::new(format!(
            "Episode source is not a {} page",
            data.config.site
        )));
    }

    let links = data.client.resolve_playable_links(source).await;
    HttpResponse::Ok().json(ApiResponse::new(links))
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Drama Scraper API",
        version = "0.1.0",
        description = "API for browsing Indonesian drama sites and resolving playable video links",
        license(
            name = "MIT"
        )
    ),
    paths(
        get_sections,
        get_catalog,
        search,
        get_detail,
        get_links
    ),
    components(
        schemas(
            CatalogSection,
            CatalogEntry,
            ShowDetail,
            ShowStatus,
            ShowType,
            EpisodeRef,
            PlayableLink,
            SubtitleTrack,
            PlaybackLinks,
            ApiError,
            CatalogQuery,
            SearchQuery,
            DetailQuery,
            LinksQuery
        )
    ),
    tags(
        (name = "catalog", description = "Catalog, search and detail endpoints"),
        (name = "playback", description = "Playable link resolution")
    )
)]
pub struct ApiDoc;

/// Configure API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/sections", web::get().to(get_sections))
            .route("/catalog", web::get().to(get_catalog))
            .route("/search", web::get().to(search))
            .route("/detail", web::get().to(get_detail))
            .route("/links", web::get().to(get_links)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::{http::StatusCode, test, App};

    use crate::error::AppError;
    use crate::scraper::mock::MockFetcher;
    use crate::sites::SiteAdapter;

    fn state(fetcher: MockFetcher) -> web::Data<AppState> {
        web::Data::new(AppState {
            client: SiteClient::with_default_base(
                SiteAdapter::dramaid(),
                Arc::new(fetcher),
                Arc::new(PatternRegistry::with_defaults()),
            ),
            config: Config::default(),
        })
    }

    #[actix_web::test]
    async fn test_sections_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockFetcher::new()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/sections").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["key"], "update");
    }

    #[actix_web::test]
    async fn test_missing_parameters_are_bad_requests() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockFetcher::new()))
                .configure(configure_routes),
        )
        .await;

        for uri in ["/api/search", "/api/search?q=%20", "/api/detail", "/api/links"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_catalog_endpoint() {
        let fetcher = MockFetcher::new().with_page(
            "https://dramaid.nl/series/?page=2&order=latest",
            r#"<article itemscope="itemscope"><a class="tip" href="/series/a/"><img src="/a.jpg" /></a>
               <h2 itemprop="headline">A</h2></article>"#,
        );
        let app = test::init_service(
            App::new()
                .app_data(state(fetcher))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/catalog?page=2&section=latest")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["detailUrl"], "https://dramaid.nl/series/a/");

        let req = test::TestRequest::get().uri("/api/catalog?section=nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/catalog").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_app_state_from_config() {
        let config = Config {
            site: "nodrakorid".to_string(),
            base_url: Some("https://nodrakor30.store".to_string()),
            ..Config::default()
        };
        let state = AppState::from_config(config).unwrap();
        assert_eq!(state.client.adapter().key, "nodrakorid");
        assert_eq!(state.config.site, "nodrakorid");

        let config = Config {
            site: "kissasian".to_string(),
            ..Config::default()
        };
        let err = AppState::from_config(config).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[actix_web::test]
    async fn test_foreign_urls_are_bad_requests() {
        let fetcher = MockFetcher::new();
        let app = test::init_service(
            App::new()
                .app_data(state(fetcher))
                .configure(configure_routes),
        )
        .await;

        for uri in [
            "/api/links?source=http%3A%2F%2F169.254.169.254%2F",
            "/api/detail?url=https%3A%2F%2Fevil.example%2Fseries%2Fx%2F",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[actix_web::test]
    async fn test_links_endpoint_returns_empty_on_failure() {
        let app = test::init_service(
            App::new()
                .app_data(state(MockFetcher::new()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/links?source=https%3A%2F%2Fdramaid.nl%2Fgone%2F")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["links"].as_array().map(Vec::len), Some(0));
    }
}
