//! Base-URL cache
//!
//! Some sites hop between domains and publish the current one on a landing
//! page. [`BaseUrlCache`] looks it up once and remembers it for the rest of
//! the process; until a lookup succeeds the static fallback is used and the
//! next call tries again.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use reqwest::Url;
use scraper::Html;
use tracing::{info, warn};

use crate::parser::selector;
use crate::scraper::Fetcher;

#[derive(Debug, Default)]
struct CacheState {
    discovered_url: Option<String>,
    last_checked_at: Option<DateTime<Utc>>,
}

/// Single-slot cache of a site's discovered base URL
///
/// Concurrent first calls may each probe and each store; every store writes
/// the same discovered value, so no lock is held across the probe.
#[derive(Debug)]
pub struct BaseUrlCache {
    fallback: String,
    state: RwLock<CacheState>,
}

impl BaseUrlCache {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into().trim_end_matches('/').to_string(),
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Static base URL used until a probe succeeds
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Discovered base URL, or the fallback
    pub fn current(&self) -> String {
        self.cached().unwrap_or_else(|| self.fallback.clone())
    }

    /// When the last probe was attempted
    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .map(|s| s.last_checked_at)
            .unwrap_or_else(|e| e.into_inner().last_checked_at)
    }

    /// Forget the discovered URL so the next call probes again
    pub fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.discovered_url = None;
    }

    fn cached(&self) -> Option<String> {
        self.state
            .read()
            .map(|s| s.discovered_url.clone())
            .unwrap_or_else(|e| e.into_inner().discovered_url.clone())
    }

    fn mark_checked(&self, discovered: Option<String>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.last_checked_at = Some(Utc::now());
        if discovered.is_some() {
            state.discovered_url = discovered;
        }
    }

    /// Current usable base URL
    ///
    /// Returns the cached value without network access once a probe has
    /// succeeded. Otherwise fetches `probe_url`, reads the `href` of the
    /// first `link_selector` match and caches it when it is an http(s) URL.
    /// Any failure is logged and answered with the fallback, uncached.
    pub async fn ensure_current_base_url(
        &self,
        fetcher: &dyn Fetcher,
        probe_url: &str,
        link_selector: &str,
    ) -> String {
        if let Some(url) = self.cached() {
            return url;
        }

        let html = match fetcher.fetch(probe_url, None).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to update base URL from {}: {}", probe_url, e);
                self.mark_checked(None);
                return self.fallback.clone();
            }
        };

        match discover_base_url(&html, link_selector) {
            Some(url) => {
                info!("Base URL updated to {}", url);
                self.mark_checked(Some(url.clone()));
                url
            }
            None => {
                warn!("No usable base URL link on {}", probe_url);
                self.mark_checked(None);
                self.fallback.clone()
            }
        }
    }
}

/// `href` of the first `link_selector` match, if it is an http(s) URL
pub fn discover_base_url(html: &str, link_selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let link = selector(link_selector)?;
    let href = document
        .select(&link)
        .next()?
        .value()
        .attr("href")?
        .trim();

    let parsed = Url::parse(href).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return None;
    }
    Some(href.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::mock::MockFetcher;

    const PROBE: &str = "https://link.nodrakorid.info/";
    const FALLBACK: &str = "https://nodrakor22.store";

    fn landing(href: &str) -> String {
        format!(r#"<html><body><a class="button" href="{}">Kunjungi</a></body></html>"#, href)
    }

    #[test]
    fn test_discover_base_url() {
        assert_eq!(
            discover_base_url(&landing("https://nodrakor23.store/"), "a.button").as_deref(),
            Some("https://nodrakor23.store")
        );
        assert_eq!(discover_base_url(&landing("/relative"), "a.button"), None);
        assert_eq!(discover_base_url(&landing("ftp://files.example"), "a.button"), None);
        assert_eq!(discover_base_url(&landing(""), "a.button"), None);
        assert_eq!(discover_base_url("<html></html>", "a.button"), None);
    }

    #[tokio::test]
    async fn test_probe_runs_once() {
        let fetcher = MockFetcher::new().with_page(PROBE, landing("https://nodrakor23.store"));
        let cache = BaseUrlCache::new(FALLBACK);

        let first = cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;
        let second = cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;

        assert_eq!(first, "https://nodrakor23.store");
        assert_eq!(first, second);
        assert_eq!(fetcher.request_count(), 1);
        assert_eq!(cache.current(), "https://nodrakor23.store");
        assert!(cache.last_checked_at().is_some());
    }

    #[tokio::test]
    async fn test_failed_probe_falls_back_and_retries() {
        let fetcher = MockFetcher::new();
        let cache = BaseUrlCache::new(format!("{}/", FALLBACK));

        let first = cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;
        let second = cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;

        assert_eq!(first, FALLBACK);
        assert_eq!(second, FALLBACK);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_scheme_is_not_cached() {
        let fetcher = MockFetcher::new().with_page(PROBE, landing("javascript:void(0)"));
        let cache = BaseUrlCache::new(FALLBACK);

        let url = cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;
        assert_eq!(url, FALLBACK);
        assert_eq!(cache.current(), FALLBACK);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_probe() {
        let fetcher = MockFetcher::new().with_page(PROBE, landing("https://nodrakor23.store"));
        let cache = BaseUrlCache::new(FALLBACK);

        cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;
        cache.invalidate();
        assert_eq!(cache.current(), FALLBACK);

        cache.ensure_current_base_url(&fetcher, PROBE, "a.button").await;
        assert_eq!(fetcher.request_count(), 2);
    }
}
