//! Parser module for extracting structured data from HTML
//!
//! This module turns catalog, search and show detail pages into
//! [`CatalogEntry`] and [`ShowDetail`] records. Which nodes are read is
//! decided by the [`SiteAdapter`] passed in; the parsing itself is shared by
//! every site.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::{
    CatalogEntry, EpisodeRef, EpisodeSourceGroup, EpisodeSourceLink, ShowDetail, ShowStatus,
    ShowType,
};
use crate::sites::{CatalogSelectors, EpisodeLayout, SiteAdapter};

lazy_static! {
    static ref EPISODE_NUMBER: Regex = Regex::new(r"(?i)(?:Episode|Eps)\s*(\d+)").unwrap();
    static ref YEAR: Regex = Regex::new(r"\d{4}").unwrap();
}

/// Compile an adapter selector, logging and returning `None` when invalid
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Invalid selector '{}': {}", css, e);
            None
        }
    }
}

/// Text content of an element with whitespace collapsed
pub(crate) fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the element's own text nodes, ignoring its children elements
fn own_text(el: ElementRef) -> String {
    el.children()
        .filter_map(|node| node.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(root: ElementRef, selector: Option<&Selector>) -> Option<String> {
    root.select(selector?)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn digits(text: &str) -> Option<u32> {
    text.chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}

/// Resolve `href` against `base_url`
///
/// Protocol-relative links get `https:`, relative links are joined to the
/// base. Blank values yield `None`.
pub fn fix_url(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|url| url.to_string())
}

/// Map an episode-page URL to its parent series URL
///
/// `https://site/<slug>-episode-3-...` becomes `https://site/series/<slug>`
/// when the adapter declares a series link rule. Other URLs are returned
/// unchanged.
pub fn series_link(url: &str, adapter: &SiteAdapter, base_url: &str) -> String {
    let Some((marker, prefix)) = &adapter.series_link else {
        return url.to_string();
    };
    if !url.contains(marker.as_str()) {
        return url.to_string();
    }

    let base = base_url.trim_end_matches('/');
    let pattern = format!(r"^{}/(.+)-ep.+", regex::escape(base));
    Regex::new(&pattern)
        .ok()
        .and_then(|re| re.captures(url))
        .and_then(|c| c.get(1))
        .map(|slug| format!("{}/{}{}", base, prefix, slug.as_str()))
        .unwrap_or_else(|| url.to_string())
}

/// Read the episode number from a display name like "Episode 12" or "Eps 3"
pub fn extract_episode_number(text: &str) -> Option<u32> {
    EPISODE_NUMBER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Map a status label to [`ShowStatus`]; unknown labels count as completed
pub fn map_status(text: &str) -> ShowStatus {
    match text.trim() {
        "Ongoing" => ShowStatus::Ongoing,
        "Completed" => ShowStatus::Completed,
        _ => ShowStatus::Completed,
    }
}

/// Map a type label to [`ShowType`]
pub fn map_type(text: Option<&str>, default: ShowType) -> ShowType {
    let Some(text) = text.map(str::to_lowercase) else {
        return default;
    };
    if text.contains("movie") {
        ShowType::Movie
    } else if text.contains("anime") {
        ShowType::Anime
    } else {
        default
    }
}

/// Sort episodes by number, unnumbered ones last in their original order
pub fn sort_episodes(mut episodes: Vec<EpisodeRef>) -> Vec<EpisodeRef> {
    episodes.sort_by_key(|ep| match ep.episode_number {
        Some(n) => (0, n),
        None => (1, 0),
    });
    episodes
}

/// Serialize quality groups into the token stored as an episode source
pub fn encode_source_token(groups: &[EpisodeSourceGroup]) -> Option<String> {
    serde_json::to_string(groups).ok()
}

/// Compiled catalog tile selectors
struct TileSelectors {
    title: Selector,
    link: Selector,
    poster: Selector,
}

impl TileSelectors {
    fn new(catalog: &CatalogSelectors) -> Option<Self> {
        Some(Self {
            title: selector(&catalog.title)?,
            link: selector(&catalog.link)?,
            poster: selector(&catalog.poster)?,
        })
    }
}

fn parse_tile(
    tile: ElementRef,
    selectors: &TileSelectors,
    adapter: &SiteAdapter,
    base_url: &str,
) -> Option<CatalogEntry> {
    let title = first_text(tile, Some(&selectors.title))?;

    let href = tile
        .select(&selectors.link)
        .next()
        .and_then(|el| el.value().attr("href"))?;
    let detail_url = series_link(&fix_url(base_url, href)?, adapter, base_url);

    let poster_url = tile
        .select(&selectors.poster)
        .next()
        .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
        .and_then(|src| fix_url(base_url, src));

    Some(CatalogEntry {
        title,
        detail_url,
        poster_url,
    })
}

fn parse_tiles<'a>(
    tiles: impl Iterator<Item = ElementRef<'a>>,
    adapter: &SiteAdapter,
    base_url: &str,
) -> Vec<CatalogEntry> {
    let Some(selectors) = TileSelectors::new(&adapter.catalog) else {
        return Vec::new();
    };

    tiles
        .filter_map(|tile| {
            let entry = parse_tile(tile, &selectors, adapter, base_url);
            if entry.is_none() {
                debug!("Skipping catalog tile without title or link");
            }
            entry
        })
        .collect()
}

/// Parse the tiles of a catalog page
///
/// Tiles missing a title or a link are skipped; a missing poster is `None`.
pub fn parse_catalog(html: &str, adapter: &SiteAdapter, base_url: &str) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);
    let Some(item) = selector(&adapter.catalog.item) else {
        return Vec::new();
    };
    parse_tiles(document.select(&item), adapter, base_url)
}

/// Parse the tiles of a search result page
pub fn parse_search_results(
    html: &str,
    adapter: &SiteAdapter,
    base_url: &str,
) -> Vec<CatalogEntry> {
    let document = Html::parse_document(html);
    let Some(item) = selector(adapter.search_item()) else {
        return Vec::new();
    };
    parse_tiles(document.select(&item), adapter, base_url)
}

/// Value of the first `Label: value` span carrying `label`
fn labelled_value(document: &Html, spans: Option<&Selector>, label: &str) -> Option<String> {
    let label = Regex::new(&format!("(?i){}", regex::escape(label))).ok()?;
    document.select(spans?).find_map(|span| {
        let text = element_text(span);
        let end = label.find(&text)?.end();
        let value = text[end..].trim().to_string();
        (!value.is_empty()).then_some(value)
    })
}

/// Parse a show detail page
///
/// # Arguments
/// * `html` - The HTML content to parse
/// * `url` - URL the page was loaded from, used for movie pages without an
///   episode list
/// * `adapter` - Site rules
/// * `base_url` - Current base URL of the site, for relative links
pub fn parse_detail(html: &str, url: &str, adapter: &SiteAdapter, base_url: &str) -> ShowDetail {
    let document = Html::parse_document(html);
    let rules = &adapter.detail;
    let root = document.root_element();

    let title = first_text(root, selector(&rules.title).as_ref()).unwrap_or_default();

    let poster_url = selector(&rules.poster)
        .and_then(|s| {
            document
                .select(&s)
                .next()
                .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
                .map(str::to_string)
        })
        .and_then(|src| fix_url(base_url, &src));

    let tags: Vec<String> = selector(&rules.tags)
        .map(|s| {
            document
                .select(&s)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let year = first_text(root, selector(&rules.year).as_ref())
        .and_then(|text| YEAR.find(&text).and_then(|m| m.as_str().parse().ok()));

    let plot = selector(&rules.plot)
        .map(|s| {
            document
                .select(&s)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty());

    let spans = selector(&rules.info_spans);
    let status = labelled_value(&document, spans.as_ref(), &rules.status_label)
        .map(|s| map_status(&s))
        .unwrap_or(ShowStatus::Completed);
    let type_text = labelled_value(&document, spans.as_ref(), &rules.type_label);

    let (episodes, listed) = match &adapter.episodes {
        EpisodeLayout::List { item, link, title } => (
            parse_list_episodes(&document, item, link, title, base_url),
            true,
        ),
        EpisodeLayout::Grouped { .. } => parse_grouped_episodes(&document, adapter, base_url),
    };
    let episodes = if episodes.is_empty() && !listed {
        vec![EpisodeRef {
            display_name: title.clone(),
            episode_number: None,
            source_url: url.to_string(),
        }]
    } else {
        sort_episodes(episodes)
    };

    let mut show_type = map_type(type_text.as_deref(), adapter.default_type);
    if type_text.is_none() && show_type == ShowType::Movie && listed {
        show_type = ShowType::Series;
    }

    let recommendations = match (selector(&rules.recommendations), selector(&adapter.catalog.item)) {
        (Some(container), Some(item)) => parse_tiles(
            document
                .select(&container)
                .flat_map(|c| c.select(&item).collect::<Vec<_>>()),
            adapter,
            base_url,
        ),
        _ => Vec::new(),
    };

    ShowDetail {
        title,
        url: url.to_string(),
        poster_url,
        plot,
        tags,
        year,
        status,
        show_type,
        episodes,
        recommendations,
    }
}

/// One episode per list item, each linking to an episode page
fn parse_list_episodes(
    document: &Html,
    item: &str,
    link: &str,
    title: &str,
    base_url: &str,
) -> Vec<EpisodeRef> {
    let (Some(item), Some(link), title) = (selector(item), selector(link), selector(title)) else {
        return Vec::new();
    };

    document
        .select(&item)
        .filter_map(|li| {
            let a = li.select(&link).next()?;
            let source_url = fix_url(base_url, a.value().attr("href")?)?;
            let display_name =
                first_text(li, title.as_ref()).unwrap_or_else(|| element_text(a));
            Some(EpisodeRef {
                episode_number: extract_episode_number(&display_name),
                display_name,
                source_url,
            })
        })
        .collect()
}

/// Episodes of sites that list embed links per quality
///
/// Returns the episodes and whether the page had an episode listing at all.
fn parse_grouped_episodes(
    document: &Html,
    adapter: &SiteAdapter,
    base_url: &str,
) -> (Vec<EpisodeRef>, bool) {
    let EpisodeLayout::Grouped {
        link_list,
        content_paragraphs,
        group_end,
        download_block,
        download_headings,
    } = &adapter.episodes
    else {
        return (Vec::new(), false);
    };

    if let Some(links) = selector(link_list) {
        let episodes: Vec<EpisodeRef> = document
            .select(&links)
            .filter_map(|a| {
                let source_url = fix_url(base_url, a.value().attr("href")?)?;
                let display_name = element_text(a);
                Some(EpisodeRef {
                    episode_number: extract_episode_number(&display_name),
                    display_name,
                    source_url,
                })
            })
            .collect();
        if !episodes.is_empty() {
            return (episodes, true);
        }
    }

    let has_download = selector(download_block)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false);

    let episodes = if has_download {
        parse_download_groups(document, download_headings)
    } else {
        parse_paragraph_groups(document, content_paragraphs, group_end)
    };
    let listed = !episodes.is_empty();
    (episodes, listed)
}

fn grouped_episode(heading: &str, groups: Vec<EpisodeSourceGroup>) -> Option<EpisodeRef> {
    if groups.is_empty() {
        return None;
    }
    Some(EpisodeRef {
        display_name: heading.to_string(),
        episode_number: extract_episode_number(heading),
        source_url: encode_source_token(&groups)?,
    })
}

fn is_episode_heading(text: &str) -> bool {
    text.to_lowercase().contains("episode")
}

/// "Episode N" paragraphs followed by one paragraph per quality
fn parse_paragraph_groups(document: &Html, paragraphs: &str, group_end: &str) -> Vec<EpisodeRef> {
    let Some(paragraphs) = selector(paragraphs) else {
        return Vec::new();
    };
    let group_end = selector(group_end);
    let anchors = Selector::parse("a").ok();

    let headings: Vec<ElementRef> = document
        .select(&paragraphs)
        .filter(|p| is_episode_heading(&element_text(*p)))
        .collect();

    let mut seen = Vec::new();
    let mut episodes = Vec::new();
    for heading in &headings {
        let heading_text = element_text(*heading);
        if seen.contains(&heading_text) {
            continue;
        }
        seen.push(heading_text.clone());

        let groups: Vec<EpisodeSourceGroup> = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|sibling| {
                let next_heading = sibling.value().name() == "p"
                    && is_episode_heading(&element_text(*sibling));
                let end = group_end.as_ref().is_some_and(|s| s.matches(sibling));
                !next_heading && !end
            })
            .filter_map(|row| {
                let quality = digits(&own_text(row))?;
                let links = anchors
                    .as_ref()
                    .map(|a| {
                        row.select(a)
                            .filter_map(|link| {
                                Some(EpisodeSourceLink {
                                    url: link.value().attr("href")?.trim().to_string(),
                                    server: element_text(link),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(EpisodeSourceGroup {
                    quality: Some(quality),
                    links,
                })
            })
            .collect();

        if let Some(episode) = grouped_episode(&heading_text, groups) {
            episodes.push(episode);
        }
    }
    episodes
}

/// Download block: each heading is followed by a list of quality rows
fn parse_download_groups(document: &Html, headings: &str) -> Vec<EpisodeRef> {
    let (Some(headings), Ok(items), Ok(anchors)) = (
        selector(headings),
        Selector::parse("li"),
        Selector::parse("a"),
    ) else {
        return Vec::new();
    };

    document
        .select(&headings)
        .filter_map(|heading| {
            let list = heading.next_siblings().find_map(ElementRef::wrap)?;
            let groups = list
                .select(&items)
                .filter_map(|row| {
                    let quality = digits(&own_text(row)).or_else(|| digits(&element_text(row)))?;
                    let links = row
                        .select(&anchors)
                        .filter_map(|link| {
                            let server = element_text(link)
                                .split(' ')
                                .next()
                                .unwrap_or_default()
                                .to_string();
                            Some(EpisodeSourceLink {
                                url: link.value().attr("href")?.trim().to_string(),
                                server,
                            })
                        })
                        .collect();
                    Some(EpisodeSourceGroup {
                        quality: Some(quality),
                        links,
                    })
                })
                .collect();
            grouped_episode(&element_text(heading), groups)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://dramaid.nl";

    fn dramaid() -> SiteAdapter {
        SiteAdapter::dramaid()
    }

    #[test]
    fn test_extract_episode_number() {
        assert_eq!(extract_episode_number("Episode 12"), Some(12));
        assert_eq!(extract_episode_number("Eps 3"), Some(3));
        assert_eq!(extract_episode_number("eps3"), Some(3));
        assert_eq!(extract_episode_number("My Drama EPISODE 07 END"), Some(7));
        assert_eq!(extract_episode_number("Special"), None);
    }

    #[test]
    fn test_map_status_fallback() {
        assert_eq!(map_status("Ongoing"), ShowStatus::Ongoing);
        assert_eq!(map_status(" Completed "), ShowStatus::Completed);
        assert_eq!(map_status("Hiatus"), ShowStatus::Completed);
        assert_eq!(map_status(""), ShowStatus::Completed);
    }

    #[test]
    fn test_map_type() {
        assert_eq!(map_type(Some("Movie"), ShowType::Series), ShowType::Movie);
        assert_eq!(map_type(Some("anime"), ShowType::Series), ShowType::Anime);
        assert_eq!(map_type(Some("Drama"), ShowType::Series), ShowType::Series);
        assert_eq!(map_type(None, ShowType::Movie), ShowType::Movie);
    }

    #[test]
    fn test_fix_url() {
        assert_eq!(fix_url(BASE, "/series/a/").as_deref(), Some("https://dramaid.nl/series/a/"));
        assert_eq!(fix_url(BASE, "//cdn.example.com/p.jpg").as_deref(), Some("https://cdn.example.com/p.jpg"));
        assert_eq!(fix_url(BASE, "https://x.example/y").as_deref(), Some("https://x.example/y"));
        assert_eq!(fix_url(BASE, "   "), None);
    }

    #[test]
    fn test_series_link() {
        let adapter = dramaid();
        assert_eq!(
            series_link("https://dramaid.nl/my-deep-love-episode-3-subtitle-indonesia/", &adapter, BASE),
            "https://dramaid.nl/series/my-deep-love"
        );
        assert_eq!(
            series_link("https://dramaid.nl/series/my-deep-love/", &adapter, BASE),
            "https://dramaid.nl/series/my-deep-love/"
        );
        // Sites without the rule keep their links
        assert_eq!(
            series_link("https://nodrakor22.store/a-episode-2/", &SiteAdapter::nodrakorid(), "https://nodrakor22.store"),
            "https://nodrakor22.store/a-episode-2/"
        );
    }

    #[test]
    fn test_sort_episodes_unnumbered_last() {
        let ep = |name: &str, n: Option<u32>| EpisodeRef {
            display_name: name.to_string(),
            episode_number: n,
            source_url: format!("https://dramaid.nl/{}", name),
        };
        let sorted = sort_episodes(vec![
            ep("special-a", None),
            ep("e3", Some(3)),
            ep("special-b", None),
            ep("e1", Some(1)),
            ep("e2", Some(2)),
        ]);
        let names: Vec<&str> = sorted.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["e1", "e2", "e3", "special-a", "special-b"]);
    }

    #[test]
    fn test_parse_catalog_empty_html() {
        let entries = parse_catalog("<html><body></body></html>", &dramaid(), BASE);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_parse_catalog_skips_incomplete_tiles() {
        let html = r#"
        <html><body>
            <article itemscope="itemscope">
                <a class="tip" href="/series/first-drama/">
                    <img src="/a.jpg" /><img src="https://cdn.example.com/first.jpg" />
                </a>
                <h2 itemprop="headline"> First Drama </h2>
            </article>
            <article itemscope="itemscope">
                <h2 itemprop="headline">No Link</h2>
            </article>
            <article itemscope="itemscope">
                <a class="tip" href="/series/no-title/"></a>
            </article>
            <article itemscope="itemscope">
                <a class="tip" href="https://dramaid.nl/second-drama-episode-5-subtitle-indonesia/"></a>
                <h2 itemprop="headline">Second Drama Episode 5</h2>
            </article>
        </body></html>
        "#;

        let entries = parse_catalog(html, &dramaid(), BASE);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].title, "First Drama");
        assert_eq!(entries[0].detail_url, "https://dramaid.nl/series/first-drama/");
        assert_eq!(entries[0].poster_url.as_deref(), Some("https://cdn.example.com/first.jpg"));

        assert_eq!(entries[1].title, "Second Drama Episode 5");
        assert_eq!(entries[1].detail_url, "https://dramaid.nl/series/second-drama");
        assert_eq!(entries[1].poster_url, None);
    }

    #[test]
    fn test_parse_search_results_nodrakorid() {
        let html = r#"
        <html><body>
            <div class="gmr-box-content">
                <article>
                    <a href="https://nodrakor22.store/film-a/"><img src="https://nodrakor22.store/a.jpg" /></a>
                    <h2 class="title-archive">Film A</h2>
                </article>
            </div>
            <article class="item-infinite">
                <a href="https://nodrakor22.store/film-b/"></a>
                <h2 class="entry-title">Film B</h2>
            </article>
        </body></html>
        "#;

        let adapter = SiteAdapter::nodrakorid();
        let results = parse_search_results(html, &adapter, "https://nodrakor22.store");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Film A");

        let catalog = parse_catalog(html, &adapter, "https://nodrakor22.store");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_parse_detail_full() {
        let html = r#"
        <html><body>
            <h1 class="entry-title">  Test Drama  </h1>
            <div class="thumb"><img src="/small.jpg" /><img src="https://cdn.example.com/poster.jpg" /></div>
            <div class="info-content">
                <div class="spe">
                    <span><b>Status:</b> Ongoing</span>
                    <span><b>Tipe:</b> Drama</span>
                    <span><time>March 3, 2023</time></span>
                </div>
            </div>
            <div class="genxed"><a href="/g/romance">Romance</a><a href="/g/comedy">Comedy</a></div>
            <div class="entry-content"><p>First line.</p><p>Second line.</p></div>
            <div class="eplister"><ul>
                <li><a href="/test-drama-episode-2/"><div class="epl-title">Episode 2</div></a></li>
                <li><a href="/test-drama-special/"><div class="epl-title">Special</div></a></li>
                <li><a href="/test-drama-episode-1/"><div class="epl-title">Episode 1</div></a></li>
                <li><span>no link</span></li>
            </ul></div>
            <div class="listupd">
                <article itemscope="itemscope">
                    <a class="tip" href="/series/other/"></a>
                    <h2 itemprop="headline">Other Drama</h2>
                </article>
            </div>
        </body></html>
        "#;

        let detail = parse_detail(html, "https://dramaid.nl/series/test-drama/", &dramaid(), BASE);
        assert_eq!(detail.title, "Test Drama");
        assert_eq!(detail.poster_url.as_deref(), Some("https://cdn.example.com/poster.jpg"));
        assert_eq!(detail.status, ShowStatus::Ongoing);
        assert_eq!(detail.show_type, ShowType::Series);
        assert_eq!(detail.year, Some(2023));
        assert_eq!(detail.tags, vec!["Romance", "Comedy"]);
        assert_eq!(detail.plot.as_deref(), Some("First line. Second line."));

        assert_eq!(detail.episodes.len(), 3);
        assert_eq!(detail.episodes[0].episode_number, Some(1));
        assert_eq!(detail.episodes[0].source_url, "https://dramaid.nl/test-drama-episode-1/");
        assert_eq!(detail.episodes[1].episode_number, Some(2));
        assert_eq!(detail.episodes[2].display_name, "Special");
        assert_eq!(detail.episodes[2].episode_number, None);

        assert_eq!(detail.recommendations.len(), 1);
        assert_eq!(detail.recommendations[0].detail_url, "https://dramaid.nl/series/other/");
    }

    #[test]
    fn test_parse_detail_missing_optional_fields() {
        let html = r#"<html><body><h1 class="entry-title">Bare</h1></body></html>"#;

        let detail = parse_detail(html, "https://dramaid.nl/series/bare/", &dramaid(), BASE);
        assert_eq!(detail.title, "Bare");
        assert_eq!(detail.poster_url, None);
        assert_eq!(detail.plot, None);
        assert_eq!(detail.year, None);
        assert!(detail.tags.is_empty());
        assert_eq!(detail.status, ShowStatus::Completed);
        assert_eq!(detail.show_type, ShowType::Series);
        assert!(detail.episodes.is_empty());
    }

    #[test]
    fn test_parse_detail_movie_type() {
        let html = r#"
        <html><body>
            <h1 class="entry-title">A Film</h1>
            <div class="info-content"><div class="spe"><span>Tipe: Movie</span></div></div>
        </body></html>
        "#;
        let detail = parse_detail(html, "https://dramaid.nl/series/a-film/", &dramaid(), BASE);
        assert_eq!(detail.show_type, ShowType::Movie);
    }

    #[test]
    fn test_parse_detail_grouped_paragraphs() {
        let html = r#"
        <html><body>
            <h1 class="entry-title">Korean Drama</h1>
            <div class="entry-content">
                <p>Sinopsis singkat.</p>
                <p>Episode 1</p>
                <p>360p <a href="https://a.example/1-360">Fembed</a></p>
                <p>720p <a href="https://b.example/abc">StreamSB</a> <a href="https://c.example/xyz">HXFile</a></p>
                <p>Episode 2</p>
                <p>720p <a href="https://b.example/def">StreamSB</a></p>
                <p>no quality here <a href="https://d.example/z">Nope</a></p>
                <p>Episode 2</p>
                <div class="content-moviedata">meta</div>
            </div>
        </body></html>
        "#;

        let adapter = SiteAdapter::nodrakorid();
        let detail = parse_detail(html, "https://nodrakor22.store/korean-drama/", &adapter, "https://nodrakor22.store");
        assert_eq!(detail.show_type, ShowType::Series);
        assert_eq!(detail.episodes.len(), 2);

        let first = &detail.episodes[0];
        assert_eq!(first.episode_number, Some(1));
        let groups: Vec<EpisodeSourceGroup> = serde_json::from_str(&first.source_url).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].quality, Some(360));
        assert_eq!(groups[1].quality, Some(720));
        assert_eq!(groups[1].links.len(), 2);
        assert_eq!(groups[1].links[1].server, "HXFile");

        let second: Vec<EpisodeSourceGroup> =
            serde_json::from_str(&detail.episodes[1].source_url).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].links[0].url, "https://b.example/def");
    }

    #[test]
    fn test_parse_detail_grouped_headings_ignore_case() {
        let html = r#"
        <html><body>
            <h1 class="entry-title">Loud Drama</h1>
            <div class="entry-content">
                <p>EPISODE 1</p>
                <p>720p <a href="https://b.example/one">StreamSB</a></p>
                <p>episode 2</p>
                <p>480p <a href="https://b.example/two">StreamSB</a></p>
                <div class="content-moviedata">meta</div>
            </div>
        </body></html>
        "#;

        let adapter = SiteAdapter::nodrakorid();
        let detail = parse_detail(html, "https://nodrakor22.store/k/", &adapter, "https://nodrakor22.store");
        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[0].episode_number, Some(1));
        assert_eq!(detail.episodes[1].episode_number, Some(2));

        let first: Vec<EpisodeSourceGroup> =
            serde_json::from_str(&detail.episodes[0].source_url).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].links[0].url, "https://b.example/one");
    }

    #[test]
    fn test_labelled_value_after_non_ascii_text() {
        let html = r#"<div class="info-content"><div class="spe">
            <span>İİ Tipe: Movie</span>
            <span>STATUS: Ongoing</span>
        </div></div>"#;
        let document = Html::parse_document(html);
        let spans = selector(".info-content .spe span");

        assert_eq!(
            labelled_value(&document, spans.as_ref(), "Tipe:").as_deref(),
            Some("Movie")
        );
        assert_eq!(
            labelled_value(&document, spans.as_ref(), "Status:").as_deref(),
            Some("Ongoing")
        );
        assert_eq!(labelled_value(&document, spans.as_ref(), "Negara:"), None);
    }

    #[test]
    fn test_parse_detail_grouped_download_block() {
        let html = r#"
        <html><body>
            <h1 class="entry-title">Download Drama</h1>
            <div id="download">
                <h3 class="title-download">Episode 2</h3>
                <ul>
                    <li><strong>720p</strong> <a href="https://x.example/2">Fembed Server</a></li>
                </ul>
                <h3 class="title-download">Episode 1</h3>
                <ul>
                    <li>480p <a href="https://x.example/1">Hxfile Mirror</a></li>
                    <li>no links</li>
                </ul>
            </div>
        </body></html>
        "#;

        let adapter = SiteAdapter::nodrakorid();
        let detail = parse_detail(html, "https://nodrakor22.store/dl/", &adapter, "https://nodrakor22.store");
        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[0].episode_number, Some(1));

        let groups: Vec<EpisodeSourceGroup> =
            serde_json::from_str(&detail.episodes[0].source_url).unwrap();
        assert_eq!(groups[0].quality, Some(480));
        assert_eq!(groups[0].links[0].server, "Hxfile");
        assert_eq!(groups[0].links[0].url, "https://x.example/1");
    }

    #[test]
    fn test_parse_detail_movie_page_is_its_own_episode() {
        let html = r#"<html><body><h1 class="entry-title">Just A Movie</h1></body></html>"#;
        let adapter = SiteAdapter::nodrakorid();
        let detail = parse_detail(html, "https://nodrakor22.store/just-a-movie/", &adapter, "https://nodrakor22.store");
        assert_eq!(detail.show_type, ShowType::Movie);
        assert_eq!(detail.episodes.len(), 1);
        assert_eq!(detail.episodes[0].source_url, "https://nodrakor22.store/just-a-movie/");
    }

    #[test]
    fn test_parse_detail_link_list_wins() {
        let html = r#"
        <html><body>
            <h1 class="entry-title">Listed</h1>
            <div class="gmr-listseries">
                <a href="/listed-episode-2/">Eps 2</a>
                <a href="/listed-episode-1/">Eps 1</a>
            </div>
            <div class="entry-content"><p>Episode 1</p><p>720p <a href="https://x/1">A</a></p></div>
        </body></html>
        "#;
        let adapter = SiteAdapter::nodrakorid();
        let detail = parse_detail(html, "https://nodrakor22.store/listed/", &adapter, "https://nodrakor22.store");
        assert_eq!(detail.episodes.len(), 2);
        assert_eq!(detail.episodes[0].source_url, "https://nodrakor22.store/listed-episode-1/");
        assert_eq!(detail.show_type, ShowType::Series);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn arbitrary_title() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9 ]{0,30}".prop_map(|s| s.trim().to_string())
    }

    /// (has title, has link, title text)
    fn arbitrary_tile() -> impl Strategy<Value = (bool, bool, String)> {
        (any::<bool>(), any::<bool>(), arbitrary_title())
    }

    fn tile_html(index: usize, has_title: bool, has_link: bool, title: &str) -> String {
        let link = if has_link {
            format!(r#"<a class="tip" href="/series/drama-{}/"></a>"#, index)
        } else {
            String::new()
        };
        let heading = if has_title {
            format!(r#"<h2 itemprop="headline">{}</h2>"#, title)
        } else {
            String::new()
        };
        format!(r#"<article itemscope="itemscope">{}{}</article>"#, link, heading)
    }

    proptest! {
        /// Entries without a title or a detail URL never reach the output
        #[test]
        fn property_catalog_entries_are_complete(
            tiles in prop::collection::vec(arbitrary_tile(), 0..12),
        ) {
            let body: String = tiles
                .iter()
                .enumerate()
                .map(|(i, (t, l, title))| tile_html(i, *t, *l, title))
                .collect();
            let html = format!("<html><body>{}</body></html>", body);

            let entries = parse_catalog(&html, &SiteAdapter::dramaid(), "https://dramaid.nl");
            let complete = tiles.iter().filter(|(t, l, _)| *t && *l).count();

            prop_assert_eq!(entries.len(), complete);
            for entry in &entries {
                prop_assert!(!entry.title.is_empty());
                prop_assert!(entry.detail_url.starts_with("https://dramaid.nl/series/drama-"));
            }
        }

        /// "Episode N" and "Eps N" read back N regardless of case
        #[test]
        fn property_episode_number_round_trip(
            n in 0u32..100_000,
            prefix in prop_oneof![Just("Episode"), Just("EPISODE"), Just("Eps"), Just("eps")],
            spaces in 0usize..3,
        ) {
            let text = format!("Drama {}{}{}", prefix, " ".repeat(spaces), n);
            prop_assert_eq!(extract_episode_number(&text), Some(n));
        }

        /// Text without the markers never yields a number
        #[test]
        fn property_no_marker_no_number(text in "[a-df-zA-DF-Z0-9 ]{0,40}") {
            prop_assert_eq!(extract_episode_number(&text), None);
        }
    }
}
