use serde::Deserialize;

use crate::domain::{CollectionKey, ItemKey, Pmid};

/// Bibliographic record as returned by the local API. Fields the helpers do
/// not consume stay out of the model; the server owns the full schema.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub key: ItemKey,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub data: ItemData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "DOI", default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub attachment: Option<LinkRef>,
    #[serde(default)]
    pub enclosure: Option<LinkRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRef {
    pub href: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub key: CollectionKey,
    #[serde(default)]
    pub data: CollectionData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionData {
    #[serde(default)]
    pub name: String,
}

/// Value of a `PMID:`-prefixed line: everything after the first colon,
/// surrounding whitespace stripped.
pub fn pmid_line_value(line: &str) -> Option<&str> {
    line.strip_prefix("PMID:").map(str::trim)
}

/// Scans the item's free-text `extra` field for a PMID line. First matching
/// line wins; the value is taken as-is, without numeric validation.
pub fn extract_pmid(item: &Item) -> Option<Pmid> {
    let extra = item.data.extra.as_deref()?;
    for line in extra.split('\n') {
        if let Some(value) = pmid_line_value(line) {
            if value.is_empty() {
                return None;
            }
            return value.parse().ok();
        }
    }
    None
}
