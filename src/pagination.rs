//! Cursor-based pagination over the indexing API's two page shapes.
//!
//! The API exposes the same concept under two mutually exclusive field-name
//! pairs depending on endpoint: `{nfts, nextToken}` or `{ownedNfts,
//! pageKey}`. The shape is resolved exactly once at the decode boundary;
//! everything downstream sees a single [`Page`].

use crate::metadata::NftMetadata;
use serde::Deserialize;

/// Raw response, one of the two provider shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawPage {
    Keyed {
        #[serde(rename = "ownedNfts")]
        owned_nfts: Vec<NftMetadata>,
        #[serde(rename = "pageKey", default)]
        page_key: Option<String>,
    },
    Tokened {
        nfts: Vec<NftMetadata>,
        #[serde(rename = "nextToken", default)]
        next_token: Option<String>,
    },
}

/// One normalized page of results with its continuation cursor.
#[derive(Debug)]
pub struct Page {
    pub items: Vec<NftMetadata>,
    pub cursor: Option<String>,
}

impl From<RawPage> for Page {
    fn from(raw: RawPage) -> Self {
        match raw {
            RawPage::Keyed {
                owned_nfts,
                page_key,
            } => Page {
                items: owned_nfts,
                cursor: page_key,
            },
            RawPage::Tokened { nfts, next_token } => Page {
                items: nfts,
                cursor: next_token,
            },
        }
    }
}

/// Accumulated results across sequential page fetches.
#[derive(Debug, Default)]
pub struct PagedCollection {
    pub items: Vec<NftMetadata>,
    pub cursor: Option<String>,
}

impl PagedCollection {
    /// Fold a page in. An explicit continuation appends after the existing
    /// items in order; a fresh query replaces the collection entirely, since
    /// it is not additive to a prior, possibly differently-filtered, result
    /// set. The cursor is replaced either way.
    pub fn apply(&mut self, page: Page, continuing: bool) {
        if continuing {
            self.items.extend(page.items);
        } else {
            self.items = page.items;
        }
        self.cursor = page.cursor;
    }

    /// Whether the provider reported another page.
    pub fn has_next(&self) -> bool {
        self.cursor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(token_id: u32) -> serde_json::Value {
        serde_json::json!({
            "contract": { "address": "0x52ec2d1a0ab17cb86b6a4b08e39d42356542cfbc" },
            "id": { "tokenId": token_id.to_string() },
        })
    }

    fn decode(value: serde_json::Value) -> Page {
        serde_json::from_value::<RawPage>(value).unwrap().into()
    }

    #[test]
    fn keyed_shape_normalizes() {
        let page = decode(serde_json::json!({
            "ownedNfts": [item(1), item(2)],
            "pageKey": "abc",
        }));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn tokened_shape_normalizes() {
        let page = decode(serde_json::json!({
            "nfts": [item(3)],
            "nextToken": "xyz",
        }));
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.cursor.as_deref(), Some("xyz"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = decode(serde_json::json!({ "ownedNfts": [item(1)] }));
        assert!(page.cursor.is_none());
    }

    #[test]
    fn continuation_appends_in_order() {
        let mut collection = PagedCollection::default();
        collection.apply(
            decode(serde_json::json!({ "ownedNfts": [item(1), item(2)], "pageKey": "k1" })),
            false,
        );
        collection.apply(
            decode(serde_json::json!({ "ownedNfts": [item(3)], "pageKey": null })),
            true,
        );
        assert_eq!(collection.items.len(), 3);
        let ids: Vec<String> = collection
            .items
            .iter()
            .map(|i| i.id.token_id.clone())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(!collection.has_next());
    }

    #[test]
    fn fresh_fetch_replaces() {
        let mut collection = PagedCollection::default();
        collection.apply(
            decode(serde_json::json!({ "ownedNfts": [item(1), item(2)], "pageKey": "k1" })),
            false,
        );
        collection.apply(
            decode(serde_json::json!({ "nfts": [item(9)], "nextToken": "k2" })),
            false,
        );
        assert_eq!(collection.items.len(), 1);
        assert_eq!(collection.items[0].id.token_id, "9");
        assert_eq!(collection.cursor.as_deref(), Some("k2"));
    }
}
