//! Client for the external NFT-indexing API.
//!
//! Reads are pass-through on every interaction; no response is cached.

use crate::addr::format_address;
use crate::error::Error;
use crate::metadata::NftMetadata;
use crate::pagination::{Page, RawPage};
use ethers::types::{Address, U256};
use url::Url;

pub struct IndexerClient {
    http: reqwest::Client,
    base: Url,
}

impl IndexerClient {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| Error::Config(format!("invalid indexer url {base_url}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// `getNFTMetadata?contractAddress&tokenId`
    pub async fn nft_metadata(
        &self,
        contract: Address,
        token_id: U256,
    ) -> Result<NftMetadata, Error> {
        let mut url = self
            .base
            .join("getNFTMetadata")
            .map_err(|e| Error::Indexer(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("contractAddress", &format_address(contract))
            .append_pair("tokenId", &token_id.to_string());
        self.fetch(url).await
    }

    /// `getNFTs?owner[&pageKey]`, normalized to a single [`Page`] shape.
    pub async fn owned_page(
        &self,
        owner: Address,
        cursor: Option<&str>,
    ) -> Result<Page, Error> {
        let mut url = self
            .base
            .join("getNFTs")
            .map_err(|e| Error::Indexer(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("owner", &format_address(owner));
            if let Some(cursor) = cursor {
                query.append_pair("pageKey", cursor);
            }
        }
        let raw: RawPage = self.fetch(url).await?;
        Ok(raw.into())
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Indexer(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Indexer(format!("request rejected: {e}")))?
            .json::<T>()
            .await
            .map_err(|e| Error::Indexer(format!("malformed response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = IndexerClient::new("https://example.com/nft/v2/key").unwrap();
        assert_eq!(client.base.as_str(), "https://example.com/nft/v2/key/");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(IndexerClient::new("not a url").is_err());
    }
}
