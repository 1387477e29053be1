use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::error::ZotlError;

/// Default origin of the Zotero desktop application's embedded API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:23119/api/users/0";

/// Header the server sets when an attachment payload is wrapped in a zip
/// envelope.
pub const FILE_COMPRESSED_HEADER: &str = "Zotero-File-Compressed";

/// Raw payload of a file request together with the two header signals the
/// attachment resolver keys on.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub compressed: bool,
}

/// Blocking transport over one reused connection to the local API. No retry,
/// no backoff: the endpoint lives on the same host and either answers or the
/// caller is told immediately.
#[derive(Debug, Clone)]
pub struct ApiTransport {
    client: Client,
    base_url: String,
}

impl ApiTransport {
    pub fn new() -> Result<Self, ZotlError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ZotlError> {
        let trimmed = base_url.trim_end_matches('/');
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ZotlError::InvalidBaseUrl(base_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("zotl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ZotlError::Transport(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ZotlError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::blocking::Response, ZotlError> {
        let url = format!("{}{}", self.base_url, path);
        let query = merge_format_param(query);
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .map_err(|err| ZotlError::Transport(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ZotlError::NotFound(url));
        }
        if !status.is_success() {
            let status = status.as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "Zotero request failed".to_string());
            return Err(ZotlError::Status { status, message });
        }
        Ok(response)
    }

    /// GET a JSON resource. An empty body is a valid no-content response and
    /// comes back as `Ok(None)` rather than a decode error.
    pub fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>, ZotlError> {
        let response = self.send(path, query)?;
        let bytes = response
            .bytes()
            .map_err(|err| ZotlError::Transport(err.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| ZotlError::Decode(err.to_string()))
    }

    /// GET a resource in raw mode, used for attachment file downloads.
    pub fn get_raw(&self, path: &str) -> Result<RawFile, ZotlError> {
        let response = self.send(path, &[])?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let compressed = response
            .headers()
            .get(FILE_COMPRESSED_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.eq_ignore_ascii_case("yes"))
            .unwrap_or(false);
        let bytes = response
            .bytes()
            .map_err(|err| ZotlError::Transport(err.to_string()))?;
        Ok(RawFile {
            bytes: bytes.to_vec(),
            content_type,
            compressed,
        })
    }
}

/// Every request carries `format=json` unless the caller already set an
/// overriding `format` value.
fn merge_format_param<'a>(query: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    let mut merged = query.to_vec();
    if !merged.iter().any(|(key, _)| *key == "format") {
        merged.push(("format", "json"));
    }
    merged
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn format_param_added_when_missing() {
        let merged = merge_format_param(&[("q", "uORF")]);
        assert_eq!(merged, vec![("q", "uORF"), ("format", "json")]);
    }

    #[test]
    fn format_param_not_duplicated() {
        let merged = merge_format_param(&[("format", "atom")]);
        assert_eq!(merged, vec![("format", "atom")]);
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let transport = ApiTransport::with_base_url("http://localhost:23119/api/users/0/").unwrap();
        assert_eq!(transport.base_url(), "http://localhost:23119/api/users/0");
    }

    #[test]
    fn base_url_must_be_http() {
        let err = ApiTransport::with_base_url("localhost:23119").unwrap_err();
        assert_matches!(err, ZotlError::InvalidBaseUrl(_));
    }
}
