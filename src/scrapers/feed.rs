//! Feed Normalizer: RSS 2.0 / RSS 1.0 / Atom into [`CanonicalItem`]s.
//!
//! Parsing happens in three steps:
//!
//! 1. The document is streamed through `quick_xml::Reader` into a small owned
//!    [`Element`] tree (qualified names, attributes, decoded text).
//! 2. [`FeedShape::detect`] looks at the root once and decides between the
//!    RSS and Atom dialects.
//! 3. Each item or entry is mapped field by field, with every field falling
//!    back to a sentinel instead of failing.
//!
//! Link and guid elements come in two flavours, bare text
//! (`<link>https://…</link>`) and attributed (`<link href="https://…"/>`).
//! [`LinkField`] keeps that distinction explicit.

use super::Fetch;
use crate::error::FeedError;
use crate::models::{CanonicalItem, NO_DATE, NO_LINK};
use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use std::borrow::Cow;
use tracing::{debug, info, instrument, warn};
use url::Url;

static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("static regex"));

/// Minimal owned XML element.
#[derive(Debug, Default, Clone)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Text directly inside this element.
    pub text: String,
    /// Text of this element and every descendant, in document order, with a
    /// space at each markup boundary.
    pub inner: String,
    pub children: Vec<Element>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Self {
        let attrs = start
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let raw = String::from_utf8_lossy(&attr.value);
                (key, unescape_lossy(&raw).into_owned())
            })
            .collect();
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs,
            ..Default::default()
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key || k.rsplit(':').next() == Some(key))
            .map(|(_, v)| v.as_str())
    }

    /// Children whose qualified name is exactly `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Visible text, including nested markup such as Atom `type="xhtml"` bodies.
    pub fn inner_text(&self) -> Cow<'_, str> {
        if self.children.is_empty() {
            Cow::Borrowed(self.text.trim())
        } else {
            Cow::Owned(collapse_whitespace(&self.inner))
        }
    }

    /// Inner text of the first child among `names` that has any.
    pub fn child_text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| {
            self.children_named(name)
                .map(|c| c.inner_text())
                .find(|t| !t.is_empty())
                .map(Cow::into_owned)
        })
    }

    /// `src` of the first `<img>` nested anywhere below this element.
    pub fn nested_img_src(&self) -> Option<&str> {
        self.children.iter().find_map(|c| {
            if c.local_name().eq_ignore_ascii_case("img") {
                if let Some(src) = c.attr("src").map(str::trim).filter(|s| !s.is_empty()) {
                    return Some(src);
                }
            }
            c.nested_img_src()
        })
    }
}

fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(raw)
}

/// Resolve an entity reference name such as `amp`, `eacute` or `#x27`.
///
/// Feeds routinely carry HTML named entities that plain XML does not
/// define. Unknown names are kept as written.
fn resolve_reference(name: &str) -> String {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => num.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default();
    }
    html_escape::decode_html_entities(&format!("&{name};")).into_owned()
}

/// Parse a whole document into its root element.
///
/// End tags are matched by position, not by name: feeds in the wild carry
/// mismatched HTML inside unescaped descriptions.
pub fn parse_document(xml: &str) -> Result<Element, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().check_end_names = false;

    // Slot 0 is a synthetic document node collecting top-level elements.
    let mut stack: Vec<Element> = vec![Element::default()];

    fn close(stack: &mut Vec<Element>) {
        if stack.len() > 1 {
            if let Some(done) = stack.pop() {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(done);
                }
            }
            push_inner(stack, " ");
        }
    }

    // Every open element sees the text of all its descendants.
    fn push_inner(stack: &mut [Element], text: &str) {
        for open in stack.iter_mut().skip(1) {
            open.inner.push_str(text);
        }
    }

    fn push_text(stack: &mut [Element], text: &str) {
        if let Some(top) = stack.last_mut() {
            top.text.push_str(text);
        }
        push_inner(stack, text);
    }

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FeedError::Parse(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => {
                push_inner(&mut stack, " ");
                stack.push(Element::open(&start));
            }
            Event::Empty(start) => {
                push_inner(&mut stack, " ");
                let element = Element::open(&start);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::End(_) => close(&mut stack),
            Event::Text(text) => {
                let raw = String::from_utf8_lossy(&text);
                push_text(&mut stack, &unescape_lossy(&raw));
            }
            Event::CData(cdata) => push_text(&mut stack, &String::from_utf8_lossy(&cdata)),
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference);
                push_text(&mut stack, &resolve_reference(&name));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    while stack.len() > 1 {
        close(&mut stack);
    }
    stack
        .pop()
        .and_then(|document| document.children.into_iter().next())
        .ok_or_else(|| FeedError::Parse("document has no root element".into()))
}

/// The two feed dialects, resolved once per document.
#[derive(Debug)]
pub enum FeedShape {
    /// RSS 2.0 `rss > channel > item`, or RSS 1.0 `rdf:RDF > item`.
    Rss {
        title: Option<String>,
        items: Vec<Element>,
    },
    /// Atom `feed > entry`.
    Atom {
        title: Option<String>,
        entries: Vec<Element>,
    },
}

impl FeedShape {
    pub fn detect(root: Element) -> Result<Self, FeedError> {
        match root.local_name() {
            "rss" => {
                let channel = root
                    .children
                    .into_iter()
                    .find(|c| c.local_name() == "channel")
                    .ok_or_else(|| FeedError::Parse("rss document without <channel>".into()))?;
                let title = channel.child_text(&["title"]);
                let items = channel
                    .children
                    .into_iter()
                    .filter(|c| c.name == "item")
                    .collect();
                Ok(FeedShape::Rss { title, items })
            }
            "RDF" => {
                let title = root
                    .children
                    .iter()
                    .find(|c| c.local_name() == "channel")
                    .and_then(|c| c.child_text(&["title"]));
                let items = root
                    .children
                    .into_iter()
                    .filter(|c| c.local_name() == "item")
                    .collect();
                Ok(FeedShape::Rss { title, items })
            }
            "feed" => {
                let title = root
                    .children
                    .iter()
                    .find(|c| c.local_name() == "title")
                    .map(|c| c.inner_text().into_owned())
                    .filter(|t| !t.is_empty());
                let entries = root
                    .children
                    .into_iter()
                    .filter(|c| c.local_name() == "entry")
                    .collect();
                Ok(FeedShape::Atom { title, entries })
            }
            other => Err(FeedError::Parse(format!("unrecognized feed shape <{other}>"))),
        }
    }
}

/// A link-like field as it appeared in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkField {
    /// `<link>https://…</link>`
    Text(String),
    /// `<link href="https://…"/>`
    Href(String),
}

impl LinkField {
    pub fn from_element(el: &Element) -> Option<Self> {
        if let Some(href) = el.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
            return Some(LinkField::Href(href.to_string()));
        }
        let text = el.text.trim();
        (!text.is_empty()).then(|| LinkField::Text(text.to_string()))
    }

    pub fn into_url(self) -> String {
        match self {
            LinkField::Text(url) | LinkField::Href(url) => url,
        }
    }
}

/// Display name for a source, falling back through title, host and URL.
pub fn source_name(title: Option<&str>, source_url: &str) -> String {
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    let host = Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty());
    if let Some(host) = host {
        return host;
    }
    let trimmed = source_url.trim();
    if trimmed.is_empty() {
        "Unknown Source".to_string()
    } else {
        trimmed.to_string()
    }
}

fn is_image_type(el: &Element) -> bool {
    el.attr("type")
        .map(|t| t.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// `media:*` elements directly on the item or wrapped in `media:group`.
fn media_elements<'a>(item: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    item.children_named(name).chain(
        item.children_named("media:group")
            .flat_map(move |group| group.children_named(name)),
    )
}

fn non_empty(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// First image found by the enclosure → media:content → media:thumbnail → `<img>` cascade.
///
/// `bodies` names the item's HTML-bearing children in priority order. Their
/// `<img>` may be escaped text or nested markup.
fn resolve_image(item: &Element, bodies: &[&str]) -> Option<String> {
    let enclosure = item
        .children
        .iter()
        .filter(|c| {
            c.name == "enclosure" || (c.local_name() == "link" && c.attr("rel") == Some("enclosure"))
        })
        .filter(|c| is_image_type(c))
        .find_map(|c| non_empty(c.attr("url").or_else(|| c.attr("href"))));
    if enclosure.is_some() {
        return enclosure;
    }

    let media_content = media_elements(item, "media:content")
        .filter(|c| is_image_type(c))
        .find_map(|c| non_empty(c.attr("url")));
    if media_content.is_some() {
        return media_content;
    }

    let thumbnail = media_elements(item, "media:thumbnail").find_map(|c| non_empty(c.attr("url")));
    if thumbnail.is_some() {
        return thumbnail;
    }

    bodies
        .iter()
        .flat_map(|name| item.children_named(name))
        .find_map(|body| {
            body.nested_img_src().map(str::to_string).or_else(|| {
                IMG_SRC_RE
                    .captures(&body.text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
        })
}

#[allow(clippy::too_many_arguments)]
fn finish_item(
    own_id: Option<String>,
    link: Option<LinkField>,
    title: Option<String>,
    description: Option<String>,
    pub_date: Option<String>,
    image_url: Option<String>,
    source_url: &str,
    source_name: &str,
) -> CanonicalItem {
    let title = title.unwrap_or_default();
    let link = link.map(LinkField::into_url).unwrap_or_else(|| NO_LINK.to_string());
    let pub_date = pub_date.unwrap_or_else(|| NO_DATE.to_string());

    let guid = match own_id {
        Some(id) => id,
        None if link != NO_LINK => link.clone(),
        None => format!("{source_url}{title}{pub_date}"),
    };

    CanonicalItem {
        guid,
        title,
        description: description.unwrap_or_default(),
        link,
        pub_date,
        image_url,
        source: source_url.to_string(),
        source_name: source_name.to_string(),
    }
}

fn rss_item(item: &Element, source_url: &str, name: &str) -> CanonicalItem {
    let description = item.child_text(&["description"]);
    let encoded = item.child_text(&["content:encoded"]);
    let image_url = resolve_image(item, &["description", "content:encoded"]);
    let link = item.children_named("link").find_map(LinkField::from_element);

    finish_item(
        item.child_text(&["guid"]),
        link,
        item.child_text(&["title"]),
        description.or(encoded),
        item.child_text(&["pubDate", "dc:date"]),
        image_url,
        source_url,
        name,
    )
}

fn atom_entry(entry: &Element, source_url: &str, name: &str) -> CanonicalItem {
    let text_of = |local: &str| {
        entry
            .children
            .iter()
            .filter(|c| c.local_name() == local)
            .map(|c| c.inner_text())
            .find(|t| !t.is_empty())
            .map(Cow::into_owned)
    };

    let links: Vec<&Element> = entry
        .children
        .iter()
        .filter(|c| c.local_name() == "link")
        .collect();
    let link = links
        .iter()
        .filter(|l| matches!(l.attr("rel"), None | Some("alternate")))
        .find_map(|l| LinkField::from_element(l))
        .or_else(|| {
            links
                .iter()
                .filter(|l| l.attr("rel") != Some("enclosure"))
                .find_map(|l| LinkField::from_element(l))
        });

    let summary = text_of("summary");
    let content = text_of("content");
    let image_url = resolve_image(entry, &["summary", "content"]);

    finish_item(
        text_of("id"),
        link,
        text_of("title"),
        summary.or(content),
        text_of("published").or_else(|| text_of("updated")),
        image_url,
        source_url,
        name,
    )
}

/// Normalize a feed document into items, in document order.
///
/// Accepts RSS 2.0 (`rss > channel > item`), RSS 1.0 (`rdf:RDF > item`) and
/// Atom (`feed > entry`). Missing fields become sentinels rather than
/// errors: no link is [`NO_LINK`], no date is [`NO_DATE`], and every item
/// gets a non-empty guid.
///
/// # Arguments
///
/// * `xml` - The raw feed document
/// * `source_url` - URL the document was fetched from, stamped on every item
///
/// # Returns
///
/// The items in document order, or [`FeedError::Parse`] if the document is
/// malformed or not a recognizable feed.
///
/// # Examples
///
/// ```ignore
/// let xml = "<rss><channel><title>Desk</title><item><title>A</title></item></channel></rss>";
/// let items = parse_feed(xml, "https://example.com/rss")?;
/// assert_eq!(items[0].source_name, "Desk");
/// ```
pub fn parse_feed(xml: &str, source_url: &str) -> Result<Vec<CanonicalItem>, FeedError> {
    let root = parse_document(xml)?;
    let items = match FeedShape::detect(root)? {
        FeedShape::Rss { title, items } => {
            let name = source_name(title.as_deref(), source_url);
            items
                .iter()
                .map(|item| rss_item(item, source_url, &name))
                .collect::<Vec<_>>()
        }
        FeedShape::Atom { title, entries } => {
            let name = source_name(title.as_deref(), source_url);
            entries
                .iter()
                .map(|entry| atom_entry(entry, source_url, &name))
                .collect()
        }
    };
    debug!(count = items.len(), source = source_url, "Normalized feed");
    Ok(items)
}

/// Fetch and normalize one source.
///
/// The feed fetch carries no timeout of its own. A fetch or parse failure
/// is logged at `warn` and yields an empty list, so one broken source never
/// affects the others.
///
/// # Arguments
///
/// * `fetcher` - The HTTP seam
/// * `url` - The feed URL
///
/// # Returns
///
/// The source's items in document order, or an empty `Vec` on failure.
#[instrument(level = "info", skip(fetcher), fields(source = %url))]
pub async fn load_source<F: Fetch>(fetcher: &F, url: &str) -> Vec<CanonicalItem> {
    let body = match fetcher.fetch_text(url, None).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %FeedError::from(e), source = url, "Feed fetch failed; skipping source");
            return Vec::new();
        }
    };
    match parse_feed(&body, url) {
        Ok(items) => {
            info!(count = items.len(), source = url, "Loaded feed");
            items
        }
        Err(e) => {
            warn!(error = %e, source = url, "Feed parse failed; skipping source");
            Vec::new()
        }
    }
}
