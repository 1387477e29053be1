use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ZotlError {
    #[error("invalid item key: {0}")]
    InvalidItemKey(String),

    #[error("invalid collection key: {0}")]
    InvalidCollectionKey(String),

    #[error("invalid PMID: {0}")]
    InvalidPmid(String),

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Zotero request failed: {0}")]
    Transport(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("Zotero returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("invalid file URI: {0}")]
    InvalidFileUri(String),

    #[error("attachment archive error: {0}")]
    Archive(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
