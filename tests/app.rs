use std::collections::HashMap;
use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use zotl::app::{App, PullOptions};
use zotl::client::{CollectionsApi, FilesApi, ItemsApi};
use zotl::domain::{CollectionKey, ItemKey};
use zotl::error::ZotlError;
use zotl::model::{Collection, CollectionData, Item, ItemData, Links};

#[derive(Default)]
struct MockZotero {
    collections: Vec<Collection>,
    collection_items: HashMap<String, Vec<Item>>,
    items: Vec<Item>,
    search_results: Vec<Item>,
    hrefs: HashMap<String, String>,
}

impl CollectionsApi for MockZotero {
    fn collections(&self) -> Result<Vec<Collection>, ZotlError> {
        Ok(self.collections.clone())
    }

    fn collection_items(&self, key: &CollectionKey) -> Result<Vec<Item>, ZotlError> {
        self.collection_items
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| ZotlError::NotFound(format!("/collections/{key}/items")))
    }
}

impl ItemsApi for MockZotero {
    fn items(&self) -> Result<Vec<Item>, ZotlError> {
        Ok(self.items.clone())
    }

    fn item(&self, key: &ItemKey) -> Result<Item, ZotlError> {
        self.items
            .iter()
            .find(|item| item.key == *key)
            .cloned()
            .ok_or_else(|| ZotlError::NotFound(format!("/items/{key}")))
    }

    fn search_items(&self, _query: &str) -> Result<Vec<Item>, ZotlError> {
        Ok(self.search_results.clone())
    }
}

impl FilesApi for MockZotero {
    fn attachment_href(&self, key: &ItemKey) -> Result<Option<String>, ZotlError> {
        Ok(self.hrefs.get(key.as_str()).cloned())
    }

    fn item_file(&self, key: &ItemKey) -> Result<Vec<u8>, ZotlError> {
        Err(ZotlError::NotFound(format!("/items/{key}/file")))
    }
}

fn item(key: &str, extra: Option<&str>) -> Item {
    Item {
        key: key.parse().unwrap(),
        links: Links::default(),
        data: ItemData {
            title: Some(format!("title for {key}")),
            extra: extra.map(|v| v.to_string()),
            ..ItemData::default()
        },
    }
}

fn collection(key: &str, name: &str) -> Collection {
    Collection {
        key: key.parse().unwrap(),
        data: CollectionData {
            name: name.to_string(),
        },
    }
}

fn utf8_tempdir(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
}

#[test]
fn pull_search_copies_and_renames_by_pmid() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_tempdir(&temp);
    let source = root.join("My Paper.pdf");
    fs::write(source.as_std_path(), b"%PDF-1.7").unwrap();

    // filename carries a percent-encoded space, as the server reports it
    let href = format!(
        "file://{}/{}",
        root,
        urlencoding::encode("My Paper.pdf")
    );

    let mut client = MockZotero::default();
    client.search_results = vec![item("AAAA1111", Some("PMID: 12345"))];
    client.hrefs.insert("AAAA1111".to_string(), href);

    let target = root.join("downloads");
    let options = PullOptions {
        target_dir: Some(target.clone()),
        rename_by_pmid: true,
    };
    let result = App::new(client).pull_search("uORF", &options).unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].action, "renamed");
    assert_eq!(result.items[0].pmid.as_deref(), Some("12345"));
    let dest = Utf8PathBuf::from(result.items[0].path.clone().unwrap());
    assert_eq!(dest, target.join("12345.pdf"));
    assert_eq!(fs::read(dest.as_std_path()).unwrap(), b"%PDF-1.7");
}

#[test]
fn pull_twice_overwrites_same_destination() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_tempdir(&temp);
    let source = root.join("paper.pdf");
    fs::write(source.as_std_path(), b"v1").unwrap();

    let mut client = MockZotero::default();
    client.search_results = vec![item("AAAA1111", None)];
    client
        .hrefs
        .insert("AAAA1111".to_string(), format!("file://{source}"));

    let target = root.join("downloads");
    let options = PullOptions {
        target_dir: Some(target.clone()),
        rename_by_pmid: false,
    };

    let app = App::new(client);
    let first = app.pull_search("q", &options).unwrap();
    fs::write(source.as_std_path(), b"v2").unwrap();
    let second = app.pull_search("q", &options).unwrap();

    assert_eq!(first.items[0].path, second.items[0].path);
    let dest = Utf8PathBuf::from(second.items[0].path.clone().unwrap());
    assert_eq!(fs::read(dest.as_std_path()).unwrap(), b"v2");
}

#[test]
fn item_without_attachment_is_skipped_not_failed() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_tempdir(&temp);

    let mut client = MockZotero::default();
    client.search_results = vec![item("AAAA1111", Some("PMID: 12345"))];

    let options = PullOptions {
        target_dir: Some(root.join("downloads")),
        rename_by_pmid: true,
    };
    let result = App::new(client).pull_search("q", &options).unwrap();

    assert_eq!(result.items[0].action, "skipped: no attachment");
    assert!(result.items[0].path.is_none());
}

#[test]
fn missing_source_file_is_skipped() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_tempdir(&temp);

    let mut client = MockZotero::default();
    client.search_results = vec![item("AAAA1111", None)];
    client.hrefs.insert(
        "AAAA1111".to_string(),
        format!("file://{}/gone.pdf", root),
    );

    let options = PullOptions {
        target_dir: Some(root.join("downloads")),
        rename_by_pmid: true,
    };
    let result = App::new(client).pull_search("q", &options).unwrap();

    assert!(result.items[0].action.starts_with("skipped: file not found"));
}

#[test]
fn pull_collection_resolves_first_duplicate_name() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_tempdir(&temp);

    let mut client = MockZotero::default();
    client.collections = vec![collection("AAAA0001", "uORF"), collection("BBBB0002", "uORF")];
    client
        .collection_items
        .insert("AAAA0001".to_string(), vec![]);
    // the duplicate is never consulted
    let options = PullOptions {
        target_dir: Some(root.join("downloads")),
        rename_by_pmid: true,
    };
    let result = App::new(client).pull_collection("uORF", &options).unwrap();
    assert!(result.items.is_empty());
}

#[test]
fn pull_unknown_collection_is_an_error() {
    let client = MockZotero::default();
    let err = App::new(client)
        .pull_collection("absent", &PullOptions::default())
        .unwrap_err();
    assert_matches!(err, ZotlError::CollectionNotFound(_));
}

#[test]
fn search_by_pmid_without_match_is_empty() {
    let mut client = MockZotero::default();
    client.items = vec![
        item("AAAA1111", Some("PMID: 111")),
        item("BBBB2222", None),
    ];
    let matched = client.search_by_pmid("99999").unwrap();
    assert!(matched.is_empty());
}

#[test]
fn search_by_doi_matches_case_insensitively() {
    let mut client = MockZotero::default();
    let mut with_doi = item("AAAA1111", None);
    with_doi.data.doi = Some("10.1000/ABC".to_string());
    client.items = vec![with_doi, item("BBBB2222", None)];

    let matched = client.search_by_doi("10.1000/abc").unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].key.as_str(), "AAAA1111");
}
