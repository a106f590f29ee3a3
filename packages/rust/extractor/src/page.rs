//! HTML → [`ScrapedContent`] normalization.
//!
//! Pure and deterministic: the same HTML and URL always produce the same
//! bundle, including the truncation point of `raw_text`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use compete_shared::{PageLink, ScrapedContent};

/// Hard cap on `raw_text`, in characters.
pub const RAW_TEXT_LIMIT: usize = 15_000;
pub const MAX_HEADINGS: usize = 20;
pub const MAX_PARAGRAPHS: usize = 50;
pub const MAX_LINKS: usize = 30;

/// Elements whose text never counts as page content.
const CHROME_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "nav", "footer", "header",
];

/// Title used when a page offers none.
const UNKNOWN_TITLE: &str = "Unknown";

/// Normalize a fetched page.
///
/// `source_url` is recorded verbatim on the result; `base` resolves relative
/// links (usually the post-redirect URL).
pub fn parse_page(html: &str, source_url: &str, base: &Url) -> ScrapedContent {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let description = meta_content(&doc, r#"meta[name="description"]"#)
        .or_else(|| meta_content(&doc, r#"meta[property="og:description"]"#))
        .unwrap_or_default();

    let headings: Vec<String> = content_texts(&doc, "h1, h2, h3")
        .into_iter()
        .filter(|t| within(t, 3, 199))
        .take(MAX_HEADINGS)
        .collect();

    let paragraphs: Vec<String> = content_texts(&doc, "p, li")
        .into_iter()
        .filter(|t| within(t, 21, 1999))
        .take(MAX_PARAGRAPHS)
        .collect();

    let links = extract_links(&doc, base);
    let raw_text = build_raw_text(&title, &description, &headings, &paragraphs);

    ScrapedContent {
        url: source_url.to_string(),
        title,
        description,
        headings,
        paragraphs,
        links,
        raw_text,
    }
}

/// `<title>` → `og:title` → first content `<h1>` → "Unknown".
fn extract_title(doc: &Html) -> String {
    let title_sel = Selector::parse("title").expect("static selector");
    let from_tag = doc
        .select(&title_sel)
        .next()
        .map(|el| collapse(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    from_tag
        .or_else(|| meta_content(doc, r#"meta[property="og:title"]"#))
        .or_else(|| content_texts(doc, "h1").into_iter().find(|t| !t.is_empty()))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse)
        .find(|c| !c.is_empty())
}

/// Whitespace-collapsed text of every matching element outside page chrome.
fn content_texts(doc: &Html, css: &str) -> Vec<String> {
    let sel = Selector::parse(css).expect("static selector");
    doc.select(&sel)
        .filter(|el| !in_chrome(*el))
        .map(visible_text)
        .collect()
}

fn extract_links(doc: &Html, base: &Url) -> Vec<PageLink> {
    let link_sel = Selector::parse("a[href]").expect("static selector");
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if links.len() == MAX_LINKS {
            break;
        }
        if in_chrome(el) {
            continue;
        }
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') {
            continue;
        }

        let text = visible_text(el);
        if !within(&text, 2, 99) {
            continue;
        }

        // Malformed hrefs and non-web schemes are dropped silently
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        resolved.set_fragment(None);

        links.push(PageLink {
            text,
            href: resolved.to_string(),
        });
    }

    links
}

fn build_raw_text(
    title: &str,
    description: &str,
    headings: &[String],
    paragraphs: &[String],
) -> String {
    let parts: Vec<&str> = [title, description]
        .into_iter()
        .chain(headings.iter().map(String::as_str))
        .chain(paragraphs.iter().map(String::as_str))
        .filter(|p| !p.is_empty())
        .collect();

    truncate_chars(&parts.join("\n\n"), RAW_TEXT_LIMIT)
}

/// Truncate to at most `max` characters (never splits a code point).
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

fn in_chrome(el: ElementRef<'_>) -> bool {
    el.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|e| CHROME_TAGS.contains(&e.name()))
    })
}

/// Text of `el`, skipping any nested chrome (inline scripts and the like).
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| CHROME_TAGS.contains(&e.name()))
            });
        if !hidden {
            out.push_str(text);
        }
    }
    collapse(&out)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn within(text: &str, min: usize, max: usize) -> bool {
    let len = text.chars().count();
    len >= min && len <= max
}
