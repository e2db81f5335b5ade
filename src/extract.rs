//! HTML content extraction.
//!
//! Turns raw page bytes into a cleaned `(title, text)` pair: non-content
//! subtrees (script, style, nav, header, footer, aside) are dropped, the
//! remaining text nodes are collapsed into one whitespace-normalized string,
//! and the title falls back from `<title>` to the URL's last path segment to
//! the URL itself.

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::Document;

/// Elements whose subtrees carry no documentation content.
const SKIP_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "aside"];

/// Extract a [`Document`] from raw page bytes.
///
/// Returns `None` when the page has no content after cleaning. Extraction
/// never fails; malformed markup is parsed leniently and invalid UTF-8 is
/// replaced.
pub fn extract_document(url: &str, bytes: &[u8]) -> Option<Document> {
    let html = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&html);

    let title = page_title(&document).unwrap_or_else(|| title_from_url(url));

    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);
    let text = collapse_whitespace(&raw);

    if text.is_empty() {
        return None;
    }

    Some(Document {
        url: url.to_string(),
        title,
        text,
        fetched_at: Utc::now(),
    })
}

fn page_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").expect("title selector");
    let element = document.select(&selector).next()?;
    let title = collapse_whitespace(&element.text().collect::<String>());
    (!title.is_empty()).then_some(title)
}

/// Last non-empty path segment of the URL, or the URL itself.
fn title_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// Walks the element tree, appending text nodes and skipping non-content
/// subtrees.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIP_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    buf.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_non_content_elements() {
        let html = r#"
            <html><head><title>Install Guide</title>
            <script>var x = "never";</script><style>.a { color: red }</style></head>
            <body>
              <nav>Home | Docs | About</nav>
              <header>Site header</header>
              <main><p>Run the installer   and follow
              the prompts.</p></main>
              <aside>Related links</aside>
              <footer>Copyright</footer>
            </body></html>
        "#;
        let doc = extract_document("https://docs.example/install", html.as_bytes()).unwrap();
        assert_eq!(doc.title, "Install Guide");
        assert!(doc.text.contains("Run the installer and follow the prompts."));
        assert!(!doc.text.contains("never"));
        assert!(!doc.text.contains("color: red"));
        assert!(!doc.text.contains("Home | Docs"));
        assert!(!doc.text.contains("Site header"));
        assert!(!doc.text.contains("Related links"));
        assert!(!doc.text.contains("Copyright"));
    }

    #[test]
    fn title_falls_back_to_last_path_segment() {
        let html = "<html><body><p>content here</p></body></html>";
        let doc = extract_document("https://docs.example/guides/setup", html.as_bytes()).unwrap();
        assert_eq!(doc.title, "setup");
    }

    #[test]
    fn title_falls_back_to_url_when_path_is_empty() {
        let html = "<html><body><p>content here</p></body></html>";
        let doc = extract_document("https://docs.example/", html.as_bytes()).unwrap();
        assert_eq!(doc.title, "https://docs.example/");
    }

    #[test]
    fn empty_page_yields_no_document() {
        assert!(extract_document("https://docs.example/x", b"<html><body></body></html>").is_none());
        assert!(extract_document(
            "https://docs.example/x",
            b"<html><body><script>only()</script></body></html>"
        )
        .is_none());
    }

    #[test]
    fn whitespace_is_normalized() {
        let html = "<html><body><p>one</p>\n\n  <p>two\tthree</p></body></html>";
        let doc = extract_document("https://docs.example/x", html.as_bytes()).unwrap();
        assert_eq!(doc.text, "one two three");
    }

    #[test]
    fn invalid_utf8_is_tolerated() {
        let mut bytes = b"<html><body><p>ok ".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b" still ok</p></body></html>");
        let doc = extract_document("https://docs.example/x", &bytes).unwrap();
        assert!(doc.text.contains("ok"));
        assert!(doc.text.contains("still ok"));
    }
}
