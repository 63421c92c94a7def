//! Link extractor (component B).
//!
//! Parses HTML permissively and emits the same-host, canonical absolute URLs
//! reachable from a page, in first-seen order with duplicates removed.

use indexmap::IndexSet;
use scraper::{Html, Selector};

use crate::canonical::{canonicalize, host_of};

/// Extract same-host canonical links from `html`, resolved against `page_url`
/// (which must itself already be canonical).
pub fn extract_links(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    // `a` is a static, always-valid selector; a parse failure here would be a
    // programmer error, not a runtime condition to propagate.
    let selector = Selector::parse("a").expect("static selector \"a\" is always valid");

    let page_host = host_of(page_url);
    let mut seen = IndexSet::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with("mailto:")
            || href.starts_with("javascript:")
        {
            continue;
        }

        let Ok(canonical) = canonicalize(href, Some(page_url)) else {
            continue;
        };

        if host_of(&canonical) != page_host {
            continue;
        }

        seen.insert(canonical);
    }

    seen.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_same_host_links_in_order() {
        let html = r#"
            <html><body>
                <a href="/page1">one</a>
                <a href="/page2">two</a>
                <a href="https://other.example.com/page">external</a>
                <a href="/page1">dup</a>
            </body></html>
        "#;
        let links = extract_links(html, "http://example.com/");
        assert_eq!(
            links,
            vec!["http://example.com/page1", "http://example.com/page2"]
        );
    }

    #[test]
    fn discards_mailto_javascript_and_empty_hrefs() {
        let html = r#"
            <a href="mailto:a@b.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="">empty</a>
            <a>no href</a>
        "#;
        let links = extract_links(html, "http://example.com/");
        assert!(links.is_empty());
    }

    #[test]
    fn resolves_relative_hrefs_against_page_url() {
        let html = r#"<a href="child">c</a>"#;
        let links = extract_links(html, "http://example.com/dir/page");
        assert_eq!(links, vec!["http://example.com/dir/child"]);
    }
}
