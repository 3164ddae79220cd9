//! Page Object Model Support
//!
//! Page objects encapsulate the structure of a page or component behind a
//! semantic API, so scenarios never depend on raw selectors.

/// Trait for page objects representing a page or component in the UI.
pub trait PageObject {
    /// URL pattern that matches this page (e.g., "/", "/users/*")
    fn url_pattern(&self) -> &str;

    /// Get the page name for logging/debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Check whether a URL belongs to this page
    fn matches_url(&self, url: &str) -> bool {
        url_matches(self.url_pattern(), url)
    }
}

/// Match a URL against a pattern of literal segments and `*` wildcards.
///
/// Scheme, host, query and fragment are ignored; only the path is compared.
#[must_use]
pub fn url_matches(pattern: &str, url: &str) -> bool {
    let path = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest.find('/').map_or("/", |i| &rest[i..]));
    let path = path.split(['?', '#']).next().unwrap_or("");

    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let url_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_segments.len() != url_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(&url_segments)
        .all(|(p, u)| *p == "*" || p == u)
}
