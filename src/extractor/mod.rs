//! Embedded-player extraction
//!
//! Each resolved player URL is dispatched either to the inline JavaScript
//! parser (for players that ship their `sources`/`tracks` arrays in a script
//! tag) or to an [`ExtractorRegistry`] of host-specific extractors.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{PlayableLink, PlaybackLinks, Quality, ResolvedPlayerLink, SubtitleTrack};
use crate::parser::{fix_url, selector};
use crate::scraper::{Fetcher, ScraperError};
use crate::sites::{InlinePlayer, QualityPolicy, SiteAdapter};

lazy_static! {
    static ref SOURCES_MARKER: Regex = Regex::new(r"sources\s*:\s*\[").unwrap();
    static ref TRACKS_MARKER: Regex = Regex::new(r"tracks\s*:\s*\[").unwrap();
    static ref BARE_KEY: Regex =
        Regex::new(r"([\{,]\s*)(file|label|kind|type|default)\s*:").unwrap();
    static ref QUOTED_STRING: Regex =
        Regex::new(r#""(?:[^"\\]|\\.)*"|'([^'\\]*)'"#).unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([\]\}])").unwrap();
}

/// Errors from a single extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    /// No registered extractor handles the URL
    #[error("no extractor matches {0}")]
    NoMatch(String),

    /// Fetching the player page failed
    #[error("player fetch failed: {0}")]
    Network(#[from] ScraperError),

    /// The player page did not have the expected shape
    #[error("unexpected player page: {0}")]
    Parse(String),
}

/// Extractor for one family of player hosts
#[async_trait]
pub trait HostExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this extractor handles `url`
    fn matches(&self, url: &str) -> bool;

    async fn extract(&self, url: &str, referer: Option<&str>) -> Result<PlaybackLinks, ExtractError>;
}

/// Catalog of host extractors, consulted for every non-inline player URL
#[async_trait]
pub trait ExtractorRegistry: Send + Sync {
    /// Extract `url`, or fail with [`ExtractError::NoMatch`]
    async fn resolve(&self, url: &str, referer: Option<&str>) -> Result<PlaybackLinks, ExtractError>;
}

/// Registry that picks the first extractor whose pattern matches
#[derive(Default)]
pub struct PatternRegistry {
    extractors: Vec<Box<dyn HostExtractor>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in extractors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DirectMediaExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn HostExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

#[async_trait]
impl ExtractorRegistry for PatternRegistry {
    async fn resolve(&self, url: &str, referer: Option<&str>) -> Result<PlaybackLinks, ExtractError> {
        let extractor = self
            .extractors
            .iter()
            .find(|e| e.matches(url))
            .ok_or_else(|| ExtractError::NoMatch(url.to_string()))?;
        debug!("Extracting {} with {}", url, extractor.name());
        extractor.extract(url, referer).await
    }
}

/// Player URLs that already point at an HLS playlist or an MP4 file
pub struct DirectMediaExtractor;

impl DirectMediaExtractor {
    fn extension(url: &str) -> Option<String> {
        let path = Url::parse(url).ok()?.path().to_lowercase();
        path.rsplit_once('.').map(|(_, ext)| ext.to_string())
    }
}

#[async_trait]
impl HostExtractor for DirectMediaExtractor {
    fn name(&self) -> &str {
        "Direct"
    }

    fn matches(&self, url: &str) -> bool {
        matches!(Self::extension(url).as_deref(), Some("m3u8") | Some("mp4"))
    }

    async fn extract(&self, url: &str, referer: Option<&str>) -> Result<PlaybackLinks, ExtractError> {
        let is_hls = Self::extension(url).as_deref() == Some("m3u8");
        Ok(PlaybackLinks {
            links: vec![PlayableLink {
                source_label: self.name().to_string(),
                url: url.to_string(),
                referer: referer.map(str::to_string),
                quality: Quality::Unknown,
                is_hls,
                headers: BTreeMap::new(),
            }],
            subtitles: vec![],
        })
    }
}

/// Where a player URL is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    InlineJs,
    Generic,
}

pub fn dispatch(url: &str, adapter: &SiteAdapter) -> Dispatch {
    if adapter.is_inline_player(url) {
        Dispatch::InlineJs
    } else {
        Dispatch::Generic
    }
}

#[derive(Debug, Deserialize)]
struct InlineSource {
    file: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InlineTrack {
    file: String,
    #[serde(default)]
    label: Option<String>,
}

/// Text between `marker` and the first following `],`
///
/// `None` when the marker is missing or never closed.
pub fn extract_segment<'a>(script: &'a str, marker: &Regex) -> Option<&'a str> {
    let start = marker.find(script)?.end();
    let rest = &script[start..];
    let end = rest.find("],")?;
    Some(&rest[..end])
}

/// Turn a JavaScript array body into a JSON array
///
/// Bare `file`, `label`, `kind`, `type` and `default` keys are quoted,
/// single-quoted strings become double-quoted and trailing commas go.
/// Apostrophes inside double-quoted values are left alone.
pub fn normalize_player_json(segment: &str) -> String {
    let cleaned = segment.replace("//language", "");
    let quoted = BARE_KEY.replace_all(&cleaned, r#"$1"$2":"#);
    let quoted = QUOTED_STRING.replace_all(&quoted, |caps: &Captures| match caps.get(1) {
        Some(inner) => format!("\"{}\"", inner.as_str()),
        None => caps[0].to_string(),
    });
    let trimmed = TRAILING_COMMA.replace_all(&quoted, "$1");
    format!("[{}]", trimmed.trim().trim_end_matches(','))
}

fn parse_segment<T: for<'de> Deserialize<'de>>(script: &str, marker: &Regex, what: &str) -> Vec<T> {
    let Some(segment) = extract_segment(script, marker) else {
        debug!("Player script has no closed {} array", what);
        return Vec::new();
    };
    if segment.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(&normalize_player_json(segment)) {
        Ok(items) => items,
        Err(e) => {
            warn!("Failed to parse player {}: {}", what, e);
            Vec::new()
        }
    }
}

/// Read the sources and tracks of an inline player script
///
/// Sources and tracks are recovered independently; a malformed array only
/// loses its own entries.
pub fn parse_inline_player(
    script: &str,
    page_url: &str,
    player: &InlinePlayer,
    policy: &QualityPolicy,
) -> PlaybackLinks {
    let sources: Vec<InlineSource> = parse_segment(script, &SOURCES_MARKER, "sources");
    let tracks: Vec<InlineTrack> = parse_segment(script, &TRACKS_MARKER, "tracks");

    let links = sources
        .into_iter()
        .filter_map(|source| {
            let url = fix_url(page_url, &source.file)?;
            let quality = match Quality::from_name(source.label.as_deref().unwrap_or_default()) {
                Quality::Unknown => policy.fallback,
                quality => quality,
            };
            Some(PlayableLink {
                source_label: player.source_label.clone(),
                url,
                referer: player.referer.clone(),
                quality,
                is_hls: source
                    .kind
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("hls")),
                headers: BTreeMap::new(),
            })
        })
        .collect();

    let subtitles = tracks
        .into_iter()
        .filter_map(|track| {
            Some(SubtitleTrack {
                url: fix_url(page_url, &track.file)?,
                label: track.label.unwrap_or_else(|| "Unknown".to_string()),
            })
        })
        .collect();

    PlaybackLinks { links, subtitles }
}

/// Script carrying the player setup
///
/// Tries the adapter selector first, then any script with a sources array.
pub fn locate_player_script(html: &str, player: &InlinePlayer) -> Option<String> {
    let document = Html::parse_document(html);

    let by_selector = selector(&player.script_selector).and_then(|s| {
        document
            .select(&s)
            .next()
            .map(|el| el.text().collect::<String>())
    });
    if by_selector.is_some() {
        return by_selector;
    }

    let scripts = Selector::parse("script").ok()?;
    document
        .select(&scripts)
        .map(|el| el.text().collect::<String>())
        .find(|text| SOURCES_MARKER.is_match(text))
}

/// Override extractor qualities with the quality the listing declared
pub fn apply_quality_policy(
    mut media: PlaybackLinks,
    quality_hint: Option<u32>,
    policy: &QualityPolicy,
) -> PlaybackLinks {
    for link in &mut media.links {
        if let Some(height) = quality_hint {
            if !(link.is_hls && policy.hls_keeps_extractor_quality) {
                link.quality = Quality::from_height(height);
            }
        }
        if link.quality == Quality::Unknown {
            link.quality = policy.fallback;
        }
    }
    media
}

/// Runs the dispatch for one site
pub struct PlayerExtractor<'a> {
    fetcher: &'a dyn Fetcher,
    registry: &'a dyn ExtractorRegistry,
    adapter: &'a SiteAdapter,
}

impl<'a> PlayerExtractor<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        registry: &'a dyn ExtractorRegistry,
        adapter: &'a SiteAdapter,
    ) -> Self {
        Self {
            fetcher,
            registry,
            adapter,
        }
    }

    /// Playable links and subtitles behind one player link
    ///
    /// Never fails: a broken player contributes nothing.
    pub async fn extract(&self, link: &ResolvedPlayerLink, referer: &str) -> PlaybackLinks {
        match dispatch(&link.url, self.adapter) {
            Dispatch::InlineJs => self.extract_inline(&link.url, referer).await,
            Dispatch::Generic => self.extract_generic(link, referer).await,
        }
    }

    async fn extract_inline(&self, url: &str, referer: &str) -> PlaybackLinks {
        let Some(player) = self.adapter.inline_player.as_ref() else {
            return PlaybackLinks::default();
        };

        let html = match self.fetcher.fetch(url, Some(referer)).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch inline player {}: {}", url, e);
                return PlaybackLinks::default();
            }
        };

        match locate_player_script(&html, player) {
            Some(script) => parse_inline_player(&script, url, player, &self.adapter.quality),
            None => {
                debug!("No player script in {}", url);
                PlaybackLinks::default()
            }
        }
    }

    async fn extract_generic(&self, link: &ResolvedPlayerLink, referer: &str) -> PlaybackLinks {
        match self.registry.resolve(&link.url, Some(referer)).await {
            Ok(media) => apply_quality_policy(media, link.quality_hint, &self.adapter.quality),
            Err(ExtractError::NoMatch(url)) => {
                debug!("No extractor for {}", url);
                PlaybackLinks::default()
            }
            Err(e) => {
                warn!("Extractor failed for {}: {}", link.url, e);
                PlaybackLinks::default()
            }
        }
    }
}
