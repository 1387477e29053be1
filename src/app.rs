use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::{CollectionsApi, FilesApi, ItemsApi, find_collection_key_by_name};
use crate::domain::Pmid;
use crate::error::ZotlError;
use crate::fs_util::{copy_into_dir, default_download_dir, normalize_file_uri};
use crate::model::{Item, extract_pmid};

#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Destination directory; the platform Downloads directory when unset.
    pub target_dir: Option<Utf8PathBuf>,
    /// Rename each copy to `<pmid>.<ext>` when a PMID can be extracted.
    pub rename_by_pmid: bool,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            target_dir: None,
            rename_by_pmid: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PullResult {
    pub target_dir: String,
    pub pulled_at: String,
    pub items: Vec<PullItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PullItem {
    pub key: String,
    pub title: Option<String>,
    pub pmid: Option<String>,
    pub action: String,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionsResult {
    pub collections: Vec<CollectionEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionEntry {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub items: Vec<SearchEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchEntry {
    pub key: String,
    pub title: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
}

/// Batch workflows composed from the capability traits. A failure on one
/// item is recorded in its result entry and the batch continues; only
/// failures outside the per-item loop abort the whole pull.
pub struct App<Z> {
    client: Z,
}

impl<Z: CollectionsApi + ItemsApi + FilesApi> App<Z> {
    pub fn new(client: Z) -> Self {
        Self { client }
    }

    pub fn list_collections(&self) -> Result<CollectionsResult, ZotlError> {
        let collections = self.client.collections()?;
        Ok(CollectionsResult {
            collections: collections
                .into_iter()
                .map(|collection| CollectionEntry {
                    key: collection.key.to_string(),
                    name: collection.data.name,
                })
                .collect(),
        })
    }

    pub fn search(&self, query: &str) -> Result<SearchResult, ZotlError> {
        let items = self.client.search_items(query)?;
        Ok(SearchResult {
            items: items.iter().map(search_entry).collect(),
        })
    }

    /// Copies every attachment of the named collection into the target
    /// directory. The name lookup is exact and first-match under duplicates.
    pub fn pull_collection(
        &self,
        name: &str,
        options: &PullOptions,
    ) -> Result<PullResult, ZotlError> {
        let collections = self.client.collections()?;
        let key = find_collection_key_by_name(&collections, name)
            .ok_or_else(|| ZotlError::CollectionNotFound(name.to_string()))?
            .clone();
        info!(collection = name, key = %key, "resolved collection");
        let items = self.client.collection_items(&key)?;
        self.pull_items(items, options)
    }

    /// Copies the attachments of every server-side search hit.
    pub fn pull_search(&self, query: &str, options: &PullOptions) -> Result<PullResult, ZotlError> {
        let items = self.client.search_items(query)?;
        self.pull_items(items, options)
    }

    fn pull_items(&self, items: Vec<Item>, options: &PullOptions) -> Result<PullResult, ZotlError> {
        let target_dir = match &options.target_dir {
            Some(dir) => dir.clone(),
            None => default_download_dir()?,
        };
        info!(target = %target_dir, count = items.len(), "pulling attachments");

        let mut results = Vec::new();
        for item in &items {
            let pmid = extract_pmid(item);
            let (action, path) = match self.pull_attachment(item, &target_dir, options) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(key = %item.key, error = %err, "pull failed");
                    (format!("error: {err}"), None)
                }
            };
            results.push(PullItem {
                key: item.key.to_string(),
                title: item.data.title.clone(),
                pmid: pmid.map(|value| value.to_string()),
                action,
                path,
            });
        }

        Ok(PullResult {
            target_dir: target_dir.into_string(),
            pulled_at: chrono::Utc::now().to_rfc3339(),
            items: results,
        })
    }

    fn pull_attachment(
        &self,
        item: &Item,
        target_dir: &Utf8Path,
        options: &PullOptions,
    ) -> Result<(String, Option<String>), ZotlError> {
        let Some(href) = self.client.attachment_href(&item.key)? else {
            return Ok(("skipped: no attachment".to_string(), None));
        };
        let source = normalize_file_uri(&href)?;
        if !source.as_std_path().exists() {
            return Ok((format!("skipped: file not found at {source}"), None));
        }
        let dest = copy_into_dir(&source, target_dir)?;
        if options.rename_by_pmid {
            if let Some(pmid) = extract_pmid(item) {
                let renamed = rename_by_pmid(&dest, &pmid)?;
                return Ok(("renamed".to_string(), Some(renamed.into_string())));
            }
        }
        Ok(("copied".to_string(), Some(dest.into_string())))
    }
}

fn search_entry(item: &Item) -> SearchEntry {
    SearchEntry {
        key: item.key.to_string(),
        title: item.data.title.clone(),
        doi: item.data.doi.clone(),
        pmid: extract_pmid(item).map(|value| value.to_string()),
    }
}

/// Renames a freshly copied attachment to `<pmid>.<ext>`, keeping the
/// source extension (bare `<pmid>` when there is none).
fn rename_by_pmid(dest: &Utf8Path, pmid: &Pmid) -> Result<Utf8PathBuf, ZotlError> {
    let parent = dest
        .parent()
        .ok_or_else(|| ZotlError::Filesystem(format!("no parent directory for {dest}")))?;
    let file_name = match dest.extension() {
        Some(ext) => format!("{pmid}.{ext}"),
        None => pmid.to_string(),
    };
    let renamed = parent.join(file_name);
    fs::rename(dest.as_std_path(), renamed.as_std_path())
        .map_err(|err| ZotlError::Filesystem(format!("rename {dest} to {renamed}: {err}")))?;
    Ok(renamed)
}
