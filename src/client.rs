use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{CollectionKey, ItemKey};
use crate::error::ZotlError;
use crate::fs_util::unwrap_file_payload;
use crate::model::{Collection, Item, pmid_line_value};
use crate::transport::ApiTransport;

/// Collection lookups.
pub trait CollectionsApi: Send + Sync {
    fn collections(&self) -> Result<Vec<Collection>, ZotlError>;
    fn collection_items(&self, key: &CollectionKey) -> Result<Vec<Item>, ZotlError>;
}

/// Item retrieval and search.
pub trait ItemsApi: Send + Sync {
    fn items(&self) -> Result<Vec<Item>, ZotlError>;
    fn item(&self, key: &ItemKey) -> Result<Item, ZotlError>;

    /// Free-text search. Result set and ranking are entirely server-defined;
    /// nothing is filtered client-side.
    fn search_items(&self, query: &str) -> Result<Vec<Item>, ZotlError>;

    /// Fetches the full item list and filters by DOI, case-insensitively.
    /// A linear scan over the whole library; known cost, kept as the
    /// documented contract.
    fn search_by_doi(&self, doi: &str) -> Result<Vec<Item>, ZotlError> {
        Ok(filter_by_doi(self.items()?, doi))
    }

    /// Fetches the full item list and keeps items whose `extra` field has a
    /// `PMID:` line matching `pmid`. Same linear-scan contract as
    /// [`ItemsApi::search_by_doi`].
    fn search_by_pmid(&self, pmid: &str) -> Result<Vec<Item>, ZotlError> {
        Ok(filter_by_pmid(self.items()?, pmid))
    }
}

/// Attachment resolution and file download.
pub trait FilesApi: Send + Sync {
    /// The `file://` URI of the item's attachment, or `None` when the item
    /// has no file attachment. Absence is a normal outcome, not an error.
    fn attachment_href(&self, key: &ItemKey) -> Result<Option<String>, ZotlError>;

    /// The attachment's bytes, transparently unwrapped from the server's zip
    /// envelope when one is signalled.
    fn item_file(&self, key: &ItemKey) -> Result<Vec<u8>, ZotlError>;
}

/// HTTP implementation of all three capabilities over one shared transport.
#[derive(Clone)]
pub struct ZoteroHttpClient {
    transport: ApiTransport,
}

impl ZoteroHttpClient {
    pub fn new() -> Result<Self, ZotlError> {
        Ok(Self {
            transport: ApiTransport::new()?,
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ZotlError> {
        Ok(Self {
            transport: ApiTransport::with_base_url(base_url)?,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, ZotlError> {
        let value = self
            .transport
            .get_json(path, query)?
            .ok_or_else(|| ZotlError::Decode(format!("empty response for {path}")))?;
        decode(value)
    }

    fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, ZotlError> {
        match self.transport.get_json(path, query)? {
            Some(value) => decode(value),
            None => Ok(Vec::new()),
        }
    }
}

impl CollectionsApi for ZoteroHttpClient {
    fn collections(&self) -> Result<Vec<Collection>, ZotlError> {
        self.get_list("/collections", &[])
    }

    fn collection_items(&self, key: &CollectionKey) -> Result<Vec<Item>, ZotlError> {
        self.get_list(&format!("/collections/{key}/items"), &[])
    }
}

impl ItemsApi for ZoteroHttpClient {
    fn items(&self) -> Result<Vec<Item>, ZotlError> {
        self.get_list("/items", &[])
    }

    fn item(&self, key: &ItemKey) -> Result<Item, ZotlError> {
        self.get(&format!("/items/{key}"), &[])
    }

    fn search_items(&self, query: &str) -> Result<Vec<Item>, ZotlError> {
        self.get_list("/items", &[("q", query)])
    }
}

impl FilesApi for ZoteroHttpClient {
    fn attachment_href(&self, key: &ItemKey) -> Result<Option<String>, ZotlError> {
        let item = self.item(key)?;
        resolve_attachment_href(item, |attachment_key| self.item(attachment_key))
    }

    fn item_file(&self, key: &ItemKey) -> Result<Vec<u8>, ZotlError> {
        let raw = self.transport.get_raw(&format!("/items/{key}/file"))?;
        unwrap_file_payload(raw)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ZotlError> {
    serde_json::from_value(value).map_err(|err| ZotlError::Decode(err.to_string()))
}

/// First collection whose name matches exactly, in server-returned order.
/// Names are not unique server-side; first match wins under duplicates.
pub fn find_collection_key_by_name<'a>(
    collections: &'a [Collection],
    name: &str,
) -> Option<&'a CollectionKey> {
    collections
        .iter()
        .find(|collection| collection.data.name == name)
        .map(|collection| &collection.key)
}

pub fn filter_by_doi(items: Vec<Item>, doi: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| {
            item.data
                .doi
                .as_deref()
                .map(|value| value.eq_ignore_ascii_case(doi))
                .unwrap_or(false)
        })
        .collect()
}

pub fn filter_by_pmid(items: Vec<Item>, pmid: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item_has_pmid(item, pmid))
        .collect()
}

fn item_has_pmid(item: &Item, pmid: &str) -> bool {
    let Some(extra) = item.data.extra.as_deref() else {
        return false;
    };
    // stop at the first matching line; the item appears at most once
    extra
        .split('\n')
        .any(|line| pmid_line_value(line) == Some(pmid))
}

/// Resolves an item's `file://` enclosure href. An attachment item carries
/// its enclosure directly; a parent item is followed through its attachment
/// relation with `fetch`. Absence at any step is `Ok(None)`.
fn resolve_attachment_href<F>(item: Item, fetch: F) -> Result<Option<String>, ZotlError>
where
    F: FnOnce(&ItemKey) -> Result<Item, ZotlError>,
{
    if let Some(enclosure) = item.links.enclosure {
        return Ok(Some(enclosure.href));
    }
    let Some(attachment) = item.links.attachment else {
        return Ok(None);
    };
    let attachment_key = key_from_api_href(&attachment.href)?;
    let attachment_item = fetch(&attachment_key)?;
    Ok(attachment_item.links.enclosure.map(|link| link.href))
}

/// Item key from the tail of an API href such as
/// `http://localhost:23119/api/users/0/items/EFGH5678`.
fn key_from_api_href(href: &str) -> Result<ItemKey, ZotlError> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(href)
        .parse()
}
