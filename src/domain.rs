use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZotlError;

/// Eight-character alphanumeric key identifying an item in the library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemKey {
    type Err = ZotlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid =
            normalized.len() == 8 && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(ZotlError::InvalidItemKey(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionKey(String);

impl CollectionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionKey {
    type Err = ZotlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid =
            normalized.len() == 8 && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(ZotlError::InvalidCollectionKey(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// PubMed accession as stored in free-text metadata. The extractor never
/// validates the digits, so this type only rejects blank input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pmid(String);

impl Pmid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pmid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pmid {
    type Err = ZotlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ZotlError::InvalidPmid(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_item_key_valid() {
        let key: ItemKey = "abcd1234".parse().unwrap();
        assert_eq!(key.as_str(), "ABCD1234");
    }

    #[test]
    fn parse_item_key_invalid() {
        let err = "short".parse::<ItemKey>().unwrap_err();
        assert_matches!(err, ZotlError::InvalidItemKey(_));
    }

    #[test]
    fn parse_collection_key_invalid() {
        let err = "ABCD-234".parse::<CollectionKey>().unwrap_err();
        assert_matches!(err, ZotlError::InvalidCollectionKey(_));
    }

    #[test]
    fn parse_pmid_keeps_value_verbatim() {
        let pmid: Pmid = " 12345 ".parse().unwrap();
        assert_eq!(pmid.as_str(), "12345");
    }

    #[test]
    fn parse_pmid_rejects_blank() {
        let err = "   ".parse::<Pmid>().unwrap_err();
        assert_matches!(err, ZotlError::InvalidPmid(_));
    }
}
