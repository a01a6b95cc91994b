//! Mirror resolver
//!
//! Turns an episode source into candidate player URLs. Episode pages carry
//! Base64-encoded `<option>` values whose decoded payload is an iframe
//! snippet; sites that list links per quality store an encoded source token
//! instead, which is decoded without any network access.

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
    Engine,
};
use reqwest::Url;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{EpisodeSourceGroup, MirrorOption, ResolvedPlayerLink};
use crate::parser::{element_text, fix_url, selector};
use crate::scraper::Fetcher;
use crate::sites::{EmbedFix, HostRewrite, SiteAdapter};

/// Reasons a single mirror is dropped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Value is not valid Base64
    #[error("invalid base64: {0}")]
    Base64(String),

    /// Decoded bytes are not UTF-8
    #[error("decoded mirror is not valid UTF-8")]
    Utf8,

    /// Decoded markup has no iframe with a usable `src`
    #[error("no iframe src in decoded mirror")]
    MissingIframe,

    /// Encoded source token is not the expected JSON
    #[error("malformed source token: {0}")]
    Token(String),
}

/// Whether an episode source is an encoded token rather than a URL
pub fn is_source_token(source: &str) -> bool {
    source.trim_start().starts_with('[')
}

/// Read the mirror `<option>`s of an episode page, in DOM order
pub fn parse_mirror_options(html: &str, adapter: &SiteAdapter) -> Vec<MirrorOption> {
    let document = Html::parse_document(html);
    let Some(options) = selector(&adapter.mirror_options) else {
        return Vec::new();
    };

    document
        .select(&options)
        .filter_map(|option| {
            let value = option.value().attr("value")?.trim();
            if value.is_empty() {
                return None;
            }
            let label = element_text(option);
            Some(MirrorOption {
                encoded_value: value.to_string(),
                label: (!label.is_empty()).then_some(label),
            })
        })
        .collect()
}

/// Player iframes embedded directly in an episode page
fn parse_page_iframes(html: &str, adapter: &SiteAdapter, base_url: &str) -> Vec<ResolvedPlayerLink> {
    let Some(iframes) = adapter.page_iframes.as_deref().and_then(selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    document
        .select(&iframes)
        .filter_map(|iframe| {
            let src = iframe
                .value()
                .attr("src")
                .or_else(|| iframe.value().attr("data-litespeed-src"))?;
            fix_url(base_url, src)
        })
        .map(ResolvedPlayerLink::new)
        .collect()
}

fn decode_base64(value: &str) -> Result<Vec<u8>, DecodeError> {
    let value = value.trim();
    STANDARD
        .decode(value)
        .or_else(|_| STANDARD_NO_PAD.decode(value.trim_end_matches('=')))
        .map_err(|e| DecodeError::Base64(e.to_string()))
}

/// Decode one mirror option into its player URL
///
/// The option value is Base64 of an iframe snippet; the iframe `src` is the
/// player URL. The option label is kept as the server name hint.
pub fn decode_mirror(option: &MirrorOption, base_url: &str) -> Result<ResolvedPlayerLink, DecodeError> {
    let bytes = decode_base64(&option.encoded_value)?;
    let markup = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;

    let fragment = Html::parse_fragment(&markup);
    let iframe = Selector::parse("iframe").map_err(|_| DecodeError::MissingIframe)?;
    let src = fragment
        .select(&iframe)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .ok_or(DecodeError::MissingIframe)?;

    let url = fix_url(base_url, src).ok_or(DecodeError::MissingIframe)?;
    Ok(ResolvedPlayerLink {
        url,
        server_name_hint: option.label.clone(),
        quality_hint: None,
    })
}

/// Replace a dead host by its declared successor
///
/// Scheme, path and query are preserved. URLs on other hosts, or that do
/// not parse, are returned unchanged.
pub fn rewrite_host(url: &str, rewrites: &[HostRewrite]) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed.host_str().map(str::to_string) else {
        return url.to_string();
    };

    match rewrites.iter().find(|r| r.from.eq_ignore_ascii_case(&host)) {
        Some(rewrite) => {
            if parsed.set_host(Some(&rewrite.to)).is_err() {
                return url.to_string();
            }
            debug!("Rewrote host {} -> {}", host, rewrite.to);
            parsed.to_string()
        }
        None => url.to_string(),
    }
}

/// Rewrite an embed link into the form its player serves
pub fn apply_embed_fix(url: &str, fix: EmbedFix) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return url.to_string();
    };
    let origin = format!("{}://{}", parsed.scheme(), host);

    match fix {
        EmbedFix::EmbedPathPrefix => url.replacen(&format!("{}/", origin), &format!("{}/e/", origin), 1),
        EmbedFix::EmbedHtmlPage => {
            let id = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
            format!("{}/embed-{}.html", origin, id)
        }
    }
}

/// Decode an encoded source token into its quality groups
pub fn decode_source_token(token: &str) -> Result<Vec<EpisodeSourceGroup>, DecodeError> {
    serde_json::from_str(token).map_err(|e| DecodeError::Token(e.to_string()))
}

/// Player links listed in an encoded source token
///
/// Skipped qualities are dropped, embed fixes and host rewrites applied, and
/// the group quality carried as the quality hint.
pub fn resolve_source_token(token: &str, adapter: &SiteAdapter) -> Vec<ResolvedPlayerLink> {
    let groups = match decode_source_token(token) {
        Ok(groups) => groups,
        Err(e) => {
            warn!("Dropping episode source: {}", e);
            return Vec::new();
        }
    };

    groups
        .into_iter()
        .filter(|group| {
            !group
                .quality
                .is_some_and(|q| adapter.skipped_qualities.contains(&q))
        })
        .flat_map(|group| {
            let quality = group.quality;
            group.links.into_iter().filter_map(move |link| {
                let url = link.url.trim();
                if url.is_empty() {
                    return None;
                }
                let fixed = match adapter.embed_fix_for(&link.server) {
                    Some(fix) => apply_embed_fix(url, fix),
                    None => url.to_string(),
                };
                Some(ResolvedPlayerLink {
                    url: rewrite_host(&fixed, &adapter.host_rewrites),
                    server_name_hint: Some(link.server).filter(|s| !s.is_empty()),
                    quality_hint: quality,
                })
            })
        })
        .collect()
}

/// Candidate player links of an episode page's HTML, in DOM order
///
/// Options that fail to decode are logged and dropped. Duplicates are kept.
pub fn resolve_mirror_page(html: &str, adapter: &SiteAdapter, base_url: &str) -> Vec<ResolvedPlayerLink> {
    let options = parse_mirror_options(html, adapter);
    if options.is_empty() {
        return parse_page_iframes(html, adapter, base_url)
            .into_iter()
            .map(|mut link| {
                link.url = rewrite_host(&link.url, &adapter.host_rewrites);
                link
            })
            .collect();
    }

    options
        .iter()
        .filter_map(|option| match decode_mirror(option, base_url) {
            Ok(mut link) => {
                link.url = rewrite_host(&link.url, &adapter.host_rewrites);
                Some(link)
            }
            Err(e) => {
                debug!("Dropping mirror {:?}: {}", option.label, e);
                None
            }
        })
        .collect()
}

/// Resolve an episode source into candidate player links
///
/// Encoded tokens are decoded locally; URLs are fetched and their mirror
/// options decoded. A failed fetch yields no links.
pub async fn resolve_mirrors(
    fetcher: &dyn Fetcher,
    source: &str,
    adapter: &SiteAdapter,
    base_url: &str,
) -> Vec<ResolvedPlayerLink> {
    if is_source_token(source) {
        return resolve_source_token(source, adapter);
    }

    let referer = format!("{}/", base_url.trim_end_matches('/'));
    match fetcher.fetch(source, Some(&referer)).await {
        Ok(html) => resolve_mirror_page(&html, adapter, base_url),
        Err(e) => {
            warn!("Failed to fetch episode page {}: {}", source, e);
            Vec::new()
        }
    }
}
