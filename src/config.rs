//! Configuration module for the Drama Scraper API
//!
//! Handles loading environment variables and application configuration.

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::scraper::ScraperConfig;
use crate::sites::SiteAdapter;

/// Errors raised while reading the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `SITE` names no known site
    #[error("unknown site '{0}', expected one of: dramaid, nodrakorid")]
    UnknownSite(String),

    /// `BASE_URL` is not an http(s) URL
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Key of the site to scrape
    pub site: String,
    /// Overrides the site's static base URL
    pub base_url: Option<String>,
    /// Fetcher politeness and retry settings
    pub scraper: ScraperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            site: "dramaid".to_string(),
            base_url: None,
            scraper: ScraperConfig::default(),
        }
    }
}

fn parsed_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` first when present. Malformed numbers fall back to their
    /// defaults; an unknown `SITE` or a malformed `BASE_URL` is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let scraper_defaults = ScraperConfig::default();

        let site = lookup("SITE")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.site);
        if SiteAdapter::by_key(&site).is_none() {
            return Err(ConfigError::UnknownSite(site));
        }

        let base_url = match lookup("BASE_URL").map(|s| s.trim().to_string()) {
            Some(url) if url.is_empty() => None,
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.trim_end_matches('/').to_string())
            }
            Some(url) => return Err(ConfigError::InvalidBaseUrl(url)),
            None => None,
        };

        let min_delay_ms = parsed_or(lookup("SCRAPER_MIN_DELAY_MS"), scraper_defaults.min_delay_ms);
        let max_delay_ms = parsed_or(lookup("SCRAPER_MAX_DELAY_MS"), scraper_defaults.max_delay_ms)
            .max(min_delay_ms);

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed_or(lookup("PORT"), defaults.port),
            site,
            base_url,
            scraper: ScraperConfig {
                min_delay_ms,
                max_delay_ms,
                max_retries: parsed_or(lookup("SCRAPER_MAX_RETRIES"), scraper_defaults.max_retries)
                    .max(1),
                ..scraper_defaults
            },
        })
    }

    /// Adapter of the configured site
    pub fn site_adapter(&self) -> Result<SiteAdapter, ConfigError> {
        SiteAdapter::by_key(&self.site).ok_or_else(|| ConfigError::UnknownSite(self.site.clone()))
    }

    /// Base URL the cache falls back to
    pub fn fallback_base_url(&self, adapter: &SiteAdapter) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| adapter.default_base_url.clone())
    }
}
