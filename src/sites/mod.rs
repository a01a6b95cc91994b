//! Per-site adapter tables
//!
//! Every supported site is described by a [`SiteAdapter`]: the selectors the
//! listing parser reads, the mirror and inline-player rules the resolver and
//! extractor follow, and the host rewrites and quality policy applied to
//! resolved links. The parser, resolver and extractor themselves are
//! site-agnostic.

use std::str::FromStr;

use crate::models::{CatalogSection, Quality, ShowType};

/// Where to look up the live base URL of a site that changes domains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrlProbe {
    /// Landing page that links to the current domain
    pub url: String,
    /// Selector of the link whose `href` is the current base URL
    pub selector: String,
}

/// Selectors for one catalog tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSelectors {
    pub item: String,
    pub title: String,
    pub link: String,
    pub poster: String,
}

/// Selectors for a show detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailSelectors {
    pub title: String,
    pub poster: String,
    pub plot: String,
    pub tags: String,
    /// Node whose text carries the release year
    pub year: String,
    /// Spans of the form `Label: value`
    pub info_spans: String,
    pub status_label: String,
    pub type_label: String,
    /// Container of recommendation tiles, read with the catalog selectors
    pub recommendations: String,
}

/// How a detail page lists its episodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpisodeLayout {
    /// One list item per episode, each linking to its own episode page
    List {
        item: String,
        link: String,
        title: String,
    },
    /// Per-episode groups of quality rows, each row listing embed links.
    /// Falls back to a plain link list when the page has one.
    Grouped {
        link_list: String,
        content_paragraphs: String,
        group_end: String,
        download_block: String,
        download_headings: String,
    },
}

/// Replace a dead or rebranded host with its current equivalent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRewrite {
    pub from: String,
    pub to: String,
}

impl HostRewrite {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Rewrite applied to embed links listed under a given server name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedFix {
    /// `https://host/id` -> `https://host/e/id`
    EmbedPathPrefix,
    /// `https://host/id` -> `https://host/embed-id.html`
    EmbedHtmlPage,
}

/// Pages that expose their sources as inline JavaScript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePlayer {
    /// Substrings of player URLs handled inline
    pub host_patterns: Vec<String>,
    /// Selector of the script node carrying the player setup
    pub script_selector: String,
    /// Referer the resulting links must be played with
    pub referer: Option<String>,
    /// `source_label` of the resulting links
    pub source_label: String,
}

/// Quality defaults, which differ between sites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityPolicy {
    /// Used when nothing better is known
    pub fallback: Quality,
    /// Whether HLS links keep the quality their extractor reported instead
    /// of the quality declared by the listing
    pub hls_keeps_extractor_quality: bool,
}

/// Declarative description of one site
#[derive(Debug, Clone)]
pub struct SiteAdapter {
    pub key: &'static str,
    pub name: &'static str,
    pub default_base_url: String,
    pub base_url_probe: Option<BaseUrlProbe>,
    /// Search path relative to the base URL, `{query}` is replaced
    pub search_path: String,
    pub sections: Vec<CatalogSection>,
    pub catalog: CatalogSelectors,
    pub search_item: Option<String>,
    pub detail: DetailSelectors,
    pub default_type: ShowType,
    pub episodes: EpisodeLayout,
    /// Episode-page URLs are mapped to their series page when set.
    /// `(marker, series path prefix)`, e.g. `("-episode-", "series/")`
    pub series_link: Option<(String, String)>,
    pub mirror_options: String,
    /// Player iframes embedded directly in the episode page, read when the
    /// page has no mirror options
    pub page_iframes: Option<String>,
    pub host_rewrites: Vec<HostRewrite>,
    pub embed_fixes: Vec<(String, EmbedFix)>,
    /// Quality groups listed at these heights are ignored
    pub skipped_qualities: Vec<u32>,
    pub inline_player: Option<InlinePlayer>,
    pub quality: QualityPolicy,
}

fn section(key: &str, name: &str, path: &str) -> CatalogSection {
    CatalogSection {
        key: key.to_string(),
        name: name.to_string(),
        path: path.to_string(),
    }
}

impl SiteAdapter {
    /// dramaid: Asian drama catalog with Base64 mirror selectors
    pub fn dramaid() -> Self {
        Self {
            key: "dramaid",
            name: "DramaId",
            default_base_url: "https://dramaid.nl".to_string(),
            base_url_probe: None,
            search_path: "/?s={query}".to_string(),
            sections: vec![
                section(
                    "update",
                    "Drama Terbaru",
                    "/series/?page={page}&status=&type=&order=update",
                ),
                section("latest", "Baru Ditambahkan", "/series/?page={page}&order=latest"),
                section(
                    "popular",
                    "Drama Popular",
                    "/series/?page={page}&status=&type=&order=popular",
                ),
            ],
            catalog: CatalogSelectors {
                item: "article[itemscope=itemscope]".to_string(),
                title: "h2[itemprop=headline]".to_string(),
                link: "a.tip".to_string(),
                poster: "img:last-child".to_string(),
            },
            search_item: None,
            detail: DetailSelectors {
                title: "h1.entry-title".to_string(),
                poster: "div.thumb img:last-child".to_string(),
                plot: ".entry-content > p".to_string(),
                tags: ".genxed > a".to_string(),
                year: ".info-content > .spe > span > time".to_string(),
                info_spans: ".info-content .spe span".to_string(),
                status_label: "Status:".to_string(),
                type_label: "Tipe:".to_string(),
                recommendations: ".listupd".to_string(),
            },
            default_type: ShowType::Series,
            episodes: EpisodeLayout::List {
                item: ".eplister > ul > li".to_string(),
                link: "a".to_string(),
                title: "a > .epl-title".to_string(),
            },
            series_link: Some(("-episode-".to_string(), "series/".to_string())),
            mirror_options: ".mobius > .mirror > option".to_string(),
            page_iframes: None,
            host_rewrites: vec![HostRewrite::new("ndrama.xyz", "www.fembed.com")],
            embed_fixes: vec![],
            skipped_qualities: vec![],
            inline_player: Some(InlinePlayer {
                host_patterns: vec!["motonews".to_string()],
                script_selector: ".picasa + script".to_string(),
                referer: Some("https://motonews.club/".to_string()),
                source_label: "Drive".to_string(),
            }),
            quality: QualityPolicy {
                fallback: Quality::Unknown,
                hls_keeps_extractor_quality: false,
            },
        }
    }

    /// nodrakorid: movie/drama catalog that moves between domains and lists
    /// embed links per quality
    pub fn nodrakorid() -> Self {
        Self {
            key: "nodrakorid",
            name: "Nodrakorid",
            default_base_url: "https://nodrakor22.store".to_string(),
            base_url_probe: Some(BaseUrlProbe {
                url: "https://link.nodrakorid.info/".to_string(),
                selector: "a.button".to_string(),
            }),
            search_path: "/?s={query}".to_string(),
            sections: vec![
                section("movie", "Film Terbaru", "/genre/movie/page/{page}/"),
                section("drama", "Drama Korea", "/genre/drama/page/{page}/"),
                section("c-drama", "Drama China", "/genre/c-drama/page/{page}/"),
                section("fantasy", "Fantasy", "/genre/fantasy/page/{page}/"),
            ],
            catalog: CatalogSelectors {
                item: "article.item-infinite, div.gmr-box-content article".to_string(),
                title: "h2.entry-title, h2.title-archive".to_string(),
                link: "a".to_string(),
                poster: "img".to_string(),
            },
            search_item: Some("div.gmr-box-content article".to_string()),
            detail: DetailSelectors {
                title: "h1.entry-title".to_string(),
                poster: "figure.pull-left > img".to_string(),
                plot: "div[itemprop=description] > p".to_string(),
                tags: "div.gmr-moviedata a[rel=tag]".to_string(),
                year: "div.gmr-moviedata time".to_string(),
                info_spans: "div.gmr-moviedata".to_string(),
                status_label: "Status:".to_string(),
                type_label: "Tipe:".to_string(),
                recommendations: "div.gmr-related-post".to_string(),
            },
            default_type: ShowType::Movie,
            episodes: EpisodeLayout::Grouped {
                link_list: "div.vid-episodes a, div.gmr-listseries a".to_string(),
                content_paragraphs: "div.entry-content p".to_string(),
                group_end: "div.content-moviedata".to_string(),
                download_block: "div#download".to_string(),
                download_headings: "div#download h3.title-download".to_string(),
            },
            series_link: None,
            mirror_options: "select.mirror option".to_string(),
            page_iframes: Some("div.gmr-embed-responsive iframe".to_string()),
            host_rewrites: vec![],
            embed_fixes: vec![
                ("streamsb".to_string(), EmbedFix::EmbedPathPrefix),
                ("hxfile".to_string(), EmbedFix::EmbedHtmlPage),
            ],
            skipped_qualities: vec![360],
            inline_player: None,
            quality: QualityPolicy {
                fallback: Quality::Unknown,
                hls_keeps_extractor_quality: true,
            },
        }
    }

    /// All built-in adapters
    pub fn all() -> Vec<SiteAdapter> {
        vec![SiteAdapter::dramaid(), SiteAdapter::nodrakorid()]
    }

    /// Look up a built-in adapter by key
    pub fn by_key(key: &str) -> Option<SiteAdapter> {
        SiteAdapter::all()
            .into_iter()
            .find(|adapter| adapter.key.eq_ignore_ascii_case(key.trim()))
    }

    /// Whether `url` belongs to an inline JavaScript player
    pub fn is_inline_player(&self, url: &str) -> bool {
        self.inline_player
            .as_ref()
            .is_some_and(|p| p.host_patterns.iter().any(|pattern| url.contains(pattern.as_str())))
    }

    /// Embed fix registered for a server name, matched case-insensitively
    pub fn embed_fix_for(&self, server: &str) -> Option<EmbedFix> {
        let server = server.to_lowercase();
        self.embed_fixes
            .iter()
            .find(|(name, _)| server.contains(name.as_str()))
            .map(|(_, fix)| *fix)
    }

    /// Selector for search result tiles
    pub fn search_item(&self) -> &str {
        self.search_item.as_deref().unwrap_or(&self.catalog.item)
    }
}

impl FromStr for SiteAdapter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SiteAdapter::by_key(s).ok_or_else(|| format!("unknown site '{}'", s))
    }
}
