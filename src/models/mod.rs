//! Data models for the drama scraper
//!
//! This module contains the records produced by the listing parser, the
//! mirror resolver and the player extractor, plus the JSON envelopes used by
//! the REST endpoints.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

lazy_static! {
    static ref QUALITY_HEIGHT: Regex = Regex::new(r"(\d{3,4})\s*p").unwrap();
    static ref QUALITY_DIGITS: Regex = Regex::new(r"(\d{3,4})").unwrap();
}

/// One tile of a catalog, search or recommendation listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Show title
    pub title: String,
    /// Absolute URL of the show detail page
    pub detail_url: String,
    /// Absolute poster image URL, if the tile has one
    pub poster_url: Option<String>,
}

/// Airing status of a show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum ShowStatus {
    Ongoing,
    Completed,
}

/// Kind of show listed on a detail page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum ShowType {
    Movie,
    Series,
    Anime,
}

/// Reference to a single playable episode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    /// Name as shown on the page (e.g. "Episode 12")
    pub display_name: String,
    /// Episode number when one can be read from the name
    pub episode_number: Option<u32>,
    /// Episode page URL or an encoded source token
    pub source_url: String,
}

/// Full metadata of a show detail page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetail {
    pub title: String,
    /// URL the detail was loaded from
    pub url: String,
    pub poster_url: Option<String>,
    pub plot: Option<String>,
    pub tags: Vec<String>,
    pub year: Option<i32>,
    pub status: ShowStatus,
    #[serde(rename = "type")]
    pub show_type: ShowType,
    /// Sorted by episode number, unnumbered episodes last
    pub episodes: Vec<EpisodeRef>,
    pub recommendations: Vec<CatalogEntry>,
}

/// Raw `<option>` of a mirror selector, still Base64-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOption {
    pub encoded_value: String,
    /// Visible option text, usually the server name
    pub label: Option<String>,
}

/// Candidate player URL recovered from a mirror or an encoded source token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlayerLink {
    pub url: String,
    pub server_name_hint: Option<String>,
    /// Quality declared by the listing for this link, in pixels of height
    pub quality_hint: Option<u32>,
}

impl ResolvedPlayerLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            server_name_hint: None,
            quality_hint: None,
        }
    }
}

/// Video quality tier
///
/// Serialized as the tier height in pixels, `0` for unknown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(from = "u32", into = "u32")]
pub enum Quality {
    #[default]
    Unknown,
    P240,
    P360,
    P480,
    P720,
    P1080,
    P1440,
    P2160,
    Custom(u32),
}

impl Quality {
    /// Map a height in pixels to its tier
    pub fn from_height(height: u32) -> Self {
        match height {
            0 => Quality::Unknown,
            240 => Quality::P240,
            360 => Quality::P360,
            480 => Quality::P480,
            720 => Quality::P720,
            1080 => Quality::P1080,
            1440 => Quality::P1440,
            2160 => Quality::P2160,
            other => Quality::Custom(other),
        }
    }

    /// Height in pixels, `None` when unknown
    pub fn height(self) -> Option<u32> {
        match self {
            Quality::Unknown => None,
            Quality::P240 => Some(240),
            Quality::P360 => Some(360),
            Quality::P480 => Some(480),
            Quality::P720 => Some(720),
            Quality::P1080 => Some(1080),
            Quality::P1440 => Some(1440),
            Quality::P2160 => Some(2160),
            Quality::Custom(h) => Some(h),
        }
    }

    /// Fuzzy mapping from a human label to a quality tier
    ///
    /// Handles labels like "1080p", "720p HD", "HD", "SD" and "4K". Numeric
    /// heights win over the textual hints, and a height written as `720p`
    /// wins over other digit runs such as a codec name.
    pub fn from_name(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        if lower.is_empty() {
            return Quality::Unknown;
        }
        if lower.contains("4k") || lower.contains("uhd") {
            return Quality::P2160;
        }
        if let Some(height) = [&*QUALITY_HEIGHT, &*QUALITY_DIGITS].iter().find_map(|re| {
            re.captures(&lower)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        }) {
            return Quality::from_height(height);
        }
        if lower.contains("fhd") || lower.contains("full hd") || lower.contains("fullhd") {
            Quality::P1080
        } else if lower.contains("hd") {
            Quality::P720
        } else if lower.contains("sd") {
            Quality::P480
        } else {
            Quality::Unknown
        }
    }
}

impl From<u32> for Quality {
    fn from(height: u32) -> Self {
        Quality::from_height(height)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.height().unwrap_or(0)
    }
}

/// A link a player can open directly
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayableLink {
    /// Name of the extractor or server that produced the link
    pub source_label: String,
    pub url: String,
    pub referer: Option<String>,
    #[schema(value_type = u32)]
    pub quality: Quality,
    pub is_hls: bool,
    /// Extra request headers the player must send
    pub headers: BTreeMap<String, String>,
}

/// External subtitle file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub label: String,
    pub url: String,
}

/// Everything resolved for one episode or one player
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackLinks {
    pub links: Vec<PlayableLink>,
    pub subtitles: Vec<SubtitleTrack>,
}

impl PlaybackLinks {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.subtitles.is_empty()
    }

    /// Append another batch, keeping order
    pub fn extend(&mut self, other: PlaybackLinks) {
        self.links.extend(other.links);
        self.subtitles.extend(other.subtitles);
    }
}

/// A browsable listing of a site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSection {
    /// Stable identifier used in the `section` query parameter
    pub key: String,
    /// Human readable section name
    pub name: String,
    /// Path relative to the base URL, `{page}` is replaced by the page number
    pub path: String,
}

/// One quality group of an encoded source token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeSourceGroup {
    pub quality: Option<u32>,
    pub links: Vec<EpisodeSourceLink>,
}

/// Embed URL and the server name it was listed under
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeSourceLink {
    pub url: String,
    pub server: String,
}

/// Generic API response wrapper for successful responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the operation was successful (always true for this type)
    pub success: bool,
    /// The response payload
    pub data: T,
    /// ISO timestamp of when data was fetched
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Create a new successful API response with the current timestamp
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a new successful API response with a custom timestamp
    pub fn with_timestamp(data: T, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            data,
            timestamp: timestamp.to_rfc3339(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Whether the operation was successful (always false for errors)
    pub success: bool,
    /// Error message describing what went wrong
    pub error: String,
    /// ISO timestamp of when the error occurred
    pub timestamp: String,
}

impl ApiError {
    /// Create a new API error response with the current timestamp
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
