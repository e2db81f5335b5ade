//! Same-origin URL discovery.
//!
//! Collects hyperlink targets from a seed page, keeps those sharing the
//! seed's origin, and unions in `sitemap.xml` entries when present. Fetch
//! failures on the seed yield an empty result; a missing or malformed
//! sitemap is silently ignored.

use std::collections::HashSet;

use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{Html, Selector};
use tracing::{debug, error};
use url::Url;

use crate::fetch::Fetcher;

/// Discover in-scope URLs starting from `seed`.
///
/// The result is deduplicated and unordered; the caller truncates it to its
/// page limit. An empty result means there is nothing to ingest.
pub async fn discover_urls(fetcher: &dyn Fetcher, seed: &str) -> Vec<String> {
    let base = match Url::parse(seed) {
        Ok(url) => url,
        Err(err) => {
            error!(seed, %err, "invalid seed URL");
            return Vec::new();
        }
    };

    let mut urls: HashSet<String> = match fetcher.fetch(seed).await {
        Ok(page) if page.is_success() => {
            let html = String::from_utf8_lossy(&page.bytes);
            same_origin_links(&html, &base)
        }
        Ok(page) => {
            error!(seed, status = page.status, "seed page fetch failed");
            return Vec::new();
        }
        Err(err) => {
            error!(seed, error = %format!("{err:#}"), "seed page fetch failed");
            return Vec::new();
        }
    };

    // Union in sitemap entries that fall under the seed URL. Absence or
    // failure of the sitemap is not an error.
    if let Ok(sitemap_url) = base.join("sitemap.xml") {
        match fetcher.fetch(sitemap_url.as_str()).await {
            Ok(page) if page.is_success() => {
                for url in sitemap_urls(&page.bytes, seed) {
                    urls.insert(url);
                }
            }
            Ok(_) | Err(_) => {
                debug!(seed, "no sitemap found, continuing with discovered URLs");
            }
        }
    }

    urls.into_iter().collect()
}

/// Extract all `a[href]` targets from `html`, resolved against `base`,
/// keeping only URLs with the same origin (scheme + host + port).
pub fn same_origin_links(html: &str, base: &Url) -> HashSet<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("anchor selector");

    let mut links = HashSet::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        // Same-page anchors resolve to the page itself.
        if href.starts_with('#') {
            continue;
        }
        if let Ok(url) = base.join(href) {
            if same_origin(&url, base) {
                links.insert(url.to_string());
            }
        }
    }
    links
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Parse `<loc>` entries out of a sitemap, keeping URLs under `seed`.
pub fn sitemap_urls(xml: &[u8], seed: &str) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut urls = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(text) = t.unescape() {
                    let url = text.trim().to_string();
                    if url.starts_with(seed) {
                        urls.push(url);
                    }
                }
            }
            Ok(Event::Eof) => break,
            // Malformed sitemaps are ignored, not fatal.
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;

    const SEED: &str = "https://docs.example/";

    #[test]
    fn keeps_same_origin_links_only() {
        let html = r##"
            <html><body>
              <a href="/guide">Guide</a>
              <a href="https://docs.example/api">API</a>
              <a href="reference">Reference</a>
              <a href="https://other.example/away">Other site</a>
              <a href="http://docs.example/insecure">Scheme change</a>
              <a href="/guide">Guide again</a>
              <a href="#section">Anchor</a>
            </body></html>
        "##;
        let base = Url::parse(SEED).unwrap();
        let links = same_origin_links(html, &base);

        let mut sorted: Vec<_> = links.into_iter().collect();
        sorted.sort();
        assert_eq!(
            sorted,
            vec![
                "https://docs.example/api",
                "https://docs.example/guide",
                "https://docs.example/reference",
            ]
        );
    }

    #[test]
    fn sitemap_locs_are_filtered_by_seed_prefix() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://docs.example/guide</loc></url>
              <url><loc> https://docs.example/api </loc></url>
              <url><loc>https://other.example/elsewhere</loc></url>
            </urlset>"#;
        let urls = sitemap_urls(xml, SEED);
        assert_eq!(
            urls,
            vec!["https://docs.example/guide", "https://docs.example/api"]
        );
    }

    #[test]
    fn malformed_sitemap_is_ignored() {
        let urls = sitemap_urls(b"<urlset><loc>https://docs.example/a", SEED);
        assert_eq!(urls, vec!["https://docs.example/a"]);
        let urls = sitemap_urls(b"not xml at all", SEED);
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn seed_fetch_failure_yields_empty_result() {
        let fetcher = StaticFetcher::new();
        let urls = discover_urls(&fetcher, SEED).await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn sitemap_entries_are_unioned_with_page_links() {
        let fetcher = StaticFetcher::new()
            .with_page(
                SEED,
                r#"<html><body><a href="/guide">Guide</a></body></html>"#,
            )
            .with_page(
                "https://docs.example/sitemap.xml",
                r#"<urlset><url><loc>https://docs.example/hidden</loc></url></urlset>"#,
            );
        let mut urls = discover_urls(&fetcher, SEED).await;
        urls.sort();
        assert_eq!(
            urls,
            vec!["https://docs.example/guide", "https://docs.example/hidden"]
        );
    }
}
