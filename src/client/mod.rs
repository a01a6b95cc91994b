//! Caller-facing API for one site
//!
//! [`SiteClient`] wires the fetcher, the site adapter, the base-URL cache and
//! the extractor registry together: catalog listing, search, detail loading
//! and link resolution.

use std::sync::Arc;

use reqwest::Url;
use tracing::{info, warn};

use crate::cache::BaseUrlCache;
use crate::constants::endpoints;
use crate::error::{AppError, AppResult};
use crate::extractor::{ExtractorRegistry, PlayerExtractor};
use crate::models::{CatalogEntry, CatalogSection, PlaybackLinks, ShowDetail};
use crate::parser::{parse_catalog, parse_detail, parse_search_results};
use crate::resolver::{is_source_token, resolve_mirrors};
use crate::scraper::Fetcher;
use crate::sites::SiteAdapter;

/// Scraping client bound to one site
pub struct SiteClient {
    adapter: SiteAdapter,
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<dyn ExtractorRegistry>,
    base_url: Arc<BaseUrlCache>,
}

impl SiteClient {
    pub fn new(
        adapter: SiteAdapter,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<dyn ExtractorRegistry>,
        base_url: Arc<BaseUrlCache>,
    ) -> Self {
        Self {
            adapter,
            fetcher,
            registry,
            base_url,
        }
    }

    /// Client whose base-URL cache falls back to the adapter's static base
    pub fn with_default_base(
        adapter: SiteAdapter,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<dyn ExtractorRegistry>,
    ) -> Self {
        let cache = Arc::new(BaseUrlCache::new(adapter.default_base_url.clone()));
        Self::new(adapter, fetcher, registry, cache)
    }

    pub fn adapter(&self) -> &SiteAdapter {
        &self.adapter
    }

    /// Base URL to use for the next request
    pub async fn base_url(&self) -> String {
        match &self.adapter.base_url_probe {
            Some(probe) => {
                self.base_url
                    .ensure_current_base_url(self.fetcher.as_ref(), &probe.url, &probe.selector)
                    .await
            }
            None => self.base_url.current(),
        }
    }

    fn referer(base_url: &str) -> String {
        format!("{}/", base_url.trim_end_matches('/'))
    }

    /// Whether `url` is an http(s) page of this site
    ///
    /// The current base, the configured fallback and the adapter's static
    /// base all count, so links listed before a domain move still load.
    fn is_site_url(&self, url: &str, base_url: &str) -> bool {
        let Some(host) = site_host(url) else {
            return false;
        };
        [base_url, self.base_url.fallback(), self.adapter.default_base_url.as_str()]
            .into_iter()
            .filter_map(site_host)
            .any(|known| known == host)
    }

    /// Whether an episode source may be resolved: an encoded token, or a
    /// page of this site
    pub async fn accepts_source(&self, source: &str) -> bool {
        let source = source.trim();
        if is_source_token(source) {
            return true;
        }
        let base = self.base_url().await;
        self.is_site_url(source, &base)
    }

    pub fn sections(&self) -> &[CatalogSection] {
        &self.adapter.sections
    }

    /// First catalog section, page `page` (1-based)
    pub async fn list_catalog(&self, page: u32) -> AppResult<Vec<CatalogEntry>> {
        let section = self
            .adapter
            .sections
            .first()
            .ok_or_else(|| AppError::not_found("Site has no catalog sections"))?;
        self.fetch_section(section, page).await
    }

    /// Catalog section `key`, page `page` (1-based)
    pub async fn list_section(&self, key: &str, page: u32) -> AppResult<Vec<CatalogEntry>> {
        let section = self
            .adapter
            .sections
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| AppError::not_found(format!("Unknown section '{}'", key)))?;
        self.fetch_section(section, page).await
    }

    async fn fetch_section(&self, section: &CatalogSection, page: u32) -> AppResult<Vec<CatalogEntry>> {
        let base = self.base_url().await;
        let url = endpoints::section(&base, &section.path, page);
        info!("Listing {} page {}: {}", section.name, page.max(1), url);

        let html = self.fetcher.fetch(&url, Some(&Self::referer(&base))).await?;
        Ok(parse_catalog(&html, &self.adapter, &base))
    }

    pub async fn search(&self, query: &str) -> AppResult<Vec<CatalogEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query is required"));
        }

        let base = self.base_url().await;
        let url = endpoints::search(&base, &self.adapter.search_path, query);
        info!("Searching {} for '{}'", self.adapter.name, query);

        let html = self.fetcher.fetch(&url, Some(&Self::referer(&base))).await?;
        Ok(parse_search_results(&html, &self.adapter, &base))
    }

    pub async fn load_detail(&self, url: &str) -> AppResult<ShowDetail> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::validation("Detail URL is required"));
        }

        let base = self.base_url().await;
        if !self.is_site_url(url, &base) {
            return Err(AppError::validation(format!(
                "URL is not a {} page",
                self.adapter.name
            )));
        }
        let html = self.fetcher.fetch(url, Some(&Self::referer(&base))).await?;
        Ok(parse_detail(&html, url, &self.adapter, &base))
    }

    /// Playable links and subtitles of an episode source
    ///
    /// Mirrors are processed in DOM order and their results concatenated.
    /// Broken mirrors contribute nothing; the result may be empty. URL
    /// sources off this site are not fetched.
    pub async fn resolve_playable_links(&self, source: &str) -> PlaybackLinks {
        let source = source.trim();
        let base = self.base_url().await;
        if !is_source_token(source) && !self.is_site_url(source, &base) {
            warn!("Refusing to resolve {}: not a {} page", source, self.adapter.name);
            return PlaybackLinks::default();
        }
        let referer = Self::referer(&base);

        let mirrors = resolve_mirrors(self.fetcher.as_ref(), source, &self.adapter, &base).await;
        let extractor = PlayerExtractor::new(self.fetcher.as_ref(), self.registry.as_ref(), &self.adapter);

        let mut resolved = PlaybackLinks::default();
        for mirror in &mirrors {
            resolved.extend(extractor.extract(mirror, &referer).await);
        }

        info!(
            "Resolved {} links and {} subtitles from {} mirrors",
            resolved.links.len(),
            resolved.subtitles.len(),
            mirrors.len()
        );
        resolved
    }
}

/// Lower-cased host of an http(s) URL, without a leading `www.`
fn site_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.trim_start_matches("www.").to_string())
}
