//! Constants module for the Drama Scraper API
//!
//! Contains endpoint URL builders that use the current base URL of a site.

/// URL builder functions for all endpoints
pub mod endpoints {
    fn join(base_url: &str, path: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Catalog section page; pages start at 1
    pub fn section(base_url: &str, path: &str, page: u32) -> String {
        join(base_url, &path.replace("{page}", &page.max(1).to_string()))
    }

    /// Search URL with the query substituted into the site's search path
    pub fn search(base_url: &str, search_path: &str, query: &str) -> String {
        join(
            base_url,
            &search_path.replace("{query}", &urlencoding::encode(query)),
        )
    }
}
