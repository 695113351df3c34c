//! Content Extractor: best-effort article body text from arbitrary news HTML.
//!
//! The fetched page is cleaned of non-content elements, then run through a
//! cascade of heuristics, each a little less picky than the last:
//!
//! 1. paragraphs inside the first known main-content container,
//! 2. any sufficiently long paragraph in the document,
//! 3. the visible text of `<body>` (or the whole document if it has none).
//!
//! Nothing here returns an error. Network failures and pages without usable
//! text come back as [`ExtractedContent`] variants whose `Display` is a
//! human-readable sentinel string.

use super::Fetch;
use crate::utils::collapse_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Elements that never hold article prose.
static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, header, footer, form, iframe, noscript")
        .expect("static selector")
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

/// Likely main-content containers, most specific first.
static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        r#"[role="main"]"#,
        "main",
        ".article-content",
        ".story-content",
        ".post-content",
        ".entry-content",
        ".story-body",
        "#article-body",
        ".content",
        "#content-body",
        ".main-content",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector"))
    .collect()
});

const CONTAINER_MIN_PARAGRAPH: usize = 20;
const DOCUMENT_MIN_PARAGRAPH: usize = 30;
const CONTAINER_ENOUGH: usize = 200;
const PARAGRAPHS_ENOUGH: usize = 150;
const BODY_TEXT_ENOUGH: usize = 200;

/// Outcome of extracting one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedContent {
    Content(String),
    /// The page loaded but no tier produced enough text.
    Insufficient { url: String },
    /// The page could not be fetched.
    Failed { url: String, reason: String },
}

impl ExtractedContent {
    /// The article text, if extraction succeeded.
    pub fn usable_text(&self) -> Option<&str> {
        match self {
            ExtractedContent::Content(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractedContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractedContent::Content(text) => f.write_str(text),
            ExtractedContent::Insufficient { url } => {
                write!(f, "Could not extract meaningful content from {url}")
            }
            ExtractedContent::Failed { url, reason } => {
                write!(f, "Error fetching content from {url}: {reason}")
            }
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Text of every `<p>` under `scope`, trimmed, longer than `min_chars`, in document order.
fn paragraphs<'a>(
    scope: impl Iterator<Item = scraper::ElementRef<'a>>,
    min_chars: usize,
) -> String {
    let mut seen = HashSet::new();
    scope
        .flat_map(|el| el.select(&PARAGRAPH))
        .filter(|p| seen.insert(p.id()))
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| char_len(text) > min_chars)
        .join("\n\n")
}

/// Run the extraction cascade over a fetched page.
pub fn extract_from_html(html: &str, url: &str) -> ExtractedContent {
    let mut document = Html::parse_document(html);

    let noise: Vec<_> = document.select(&NOISE).map(|el| el.id()).collect();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let mut content = String::new();
    if let Some((selector, matched)) = CONTAINERS.iter().find_map(|selector| {
        let matched: Vec<_> = document.select(selector).collect();
        (!matched.is_empty()).then_some((selector, matched))
    }) {
        content = paragraphs(matched.into_iter(), CONTAINER_MIN_PARAGRAPH);
        debug!(%url, ?selector, chars = char_len(&content), "Container paragraphs");
    }

    if char_len(&content) < CONTAINER_ENOUGH {
        let all = paragraphs(std::iter::once(document.root_element()), DOCUMENT_MIN_PARAGRAPH);
        debug!(%url, chars = char_len(&all), "Document paragraphs");
        if char_len(&all) > char_len(&content) {
            content = all;
        }
    }

    if char_len(&content) < PARAGRAPHS_ENOUGH {
        let scope = document
            .select(&BODY)
            .next()
            .unwrap_or_else(|| document.root_element());
        let body = collapse_whitespace(&scope.text().join(" "));
        debug!(%url, chars = char_len(&body), "Document text");
        if char_len(&body) > BODY_TEXT_ENOUGH {
            return ExtractedContent::Content(body);
        }
        return ExtractedContent::Insufficient {
            url: url.to_string(),
        };
    }

    ExtractedContent::Content(content)
}

/// Fetch one article and extract its text.
///
/// # Arguments
///
/// * `fetcher` - The HTTP seam
/// * `url` - The article URL
/// * `timeout` - Deadline for the fetch
///
/// # Returns
///
/// [`ExtractedContent::Content`] with the article text,
/// [`ExtractedContent::Insufficient`] when no heuristic finds enough text, or
/// [`ExtractedContent::Failed`] when the page cannot be fetched. Never an error.
///
/// # Examples
///
/// ```ignore
/// let extracted = fetch_content(&fetcher, "https://news.example.com/a", Duration::from_secs(15)).await;
/// match extracted.usable_text() {
///     Some(text) => println!("{} chars", text.len()),
///     None => println!("{extracted}"),
/// }
/// ```
#[instrument(level = "info", skip(fetcher, timeout), fields(%url))]
pub async fn fetch_content<F: Fetch>(fetcher: &F, url: &str, timeout: Duration) -> ExtractedContent {
    let html = match fetcher.fetch_text(url, Some(timeout)).await {
        Ok(html) => html,
        Err(e) => {
            warn!(%url, error = %e, "Article fetch failed");
            return ExtractedContent::Failed {
                url: url.to_string(),
                reason: e.to_string(),
            };
        }
    };

    let extracted = extract_from_html(&html, url);
    match &extracted {
        ExtractedContent::Content(text) => info!(%url, chars = char_len(text), "Extracted article"),
        other => warn!(%url, outcome = %other, "No usable article text"),
    }
    extracted
}
