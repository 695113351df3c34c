//! Data models shared by the pipeline stages.
//!
//! - [`CanonicalItem`]: a feed entry normalized out of RSS or Atom
//! - [`ProcessedItem`]: the per-item output record with its summary
//! - [`FeedsResponse`]: the envelope returned by a process-all run
//!
//! The output records keep the mixed camelCase/snake_case key names the web
//! front-end consumes, hence the explicit `serde(rename)` attributes.

use serde::{Deserialize, Serialize};

/// Link sentinel for entries without a resolvable article URL.
pub const NO_LINK: &str = "#";
/// Publication date sentinel for entries that carry no date.
pub const NO_DATE: &str = "No Date";

/// A feed entry normalized into one shape regardless of feed dialect.
///
/// Every field has a fallback; title and description default to the empty
/// string, `link` to [`NO_LINK`] and `pub_date` to [`NO_DATE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalItem {
    pub guid: String,
    pub title: String,
    /// Feed-supplied teaser. May contain HTML.
    pub description: String,
    pub link: String,
    /// Source-native date string, parsed only for sorting.
    pub pub_date: String,
    pub image_url: Option<String>,
    /// URL of the feed this item came from.
    pub source: String,
    pub source_name: String,
}

impl CanonicalItem {
    pub fn has_link(&self) -> bool {
        !self.link.is_empty() && self.link != NO_LINK
    }
}

/// Output record for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedItem {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub summarized_content: String,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "sourceName")]
    pub source_name: String,
    #[serde(rename = "pubDate")]
    pub pub_date: String,
}

impl ProcessedItem {
    pub fn from_item(item: &CanonicalItem, summarized_content: String) -> Self {
        Self {
            guid: item.guid.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            summarized_content,
            image_url: item.image_url.clone(),
            source_name: item.source_name.clone(),
            pub_date: item.pub_date.clone(),
        }
    }
}

/// Result of a process-all run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsResponse {
    pub sources: Vec<String>,
    /// ISO-8601 UTC timestamp of when the run finished.
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
    pub items: Vec<ProcessedItem>,
}
