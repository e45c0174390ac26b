//! Client configuration.

use serde::Deserialize;

/// Configuration for the marketplace client.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::network")]
    pub network: String,

    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    #[serde(default = "defaults::indexer_url")]
    pub indexer_url: String,

    #[serde(default = "defaults::marketplace_address")]
    pub marketplace_address: String,

    /// NFT contract minted through by the marketplace's `createNFT`.
    #[serde(default = "defaults::creator_contract")]
    pub creator_contract: String,

    #[serde(default = "defaults::chain_id")]
    pub chain_id: u64,

    #[serde(default = "defaults::keystore_path")]
    pub keystore_path: String,

    #[serde(default)]
    pub pinata_api_key: String,

    #[serde(default)]
    pub pinata_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: defaults::network(),
            rpc_url: defaults::rpc_url(),
            indexer_url: defaults::indexer_url(),
            marketplace_address: defaults::marketplace_address(),
            creator_contract: defaults::creator_contract(),
            chain_id: defaults::chain_id(),
            keystore_path: defaults::keystore_path(),
            pinata_api_key: String::new(),
            pinata_secret: String::new(),
        }
    }
}

mod defaults {
    /// Build an Alchemy URL from API key + network, `demo` key otherwise.
    fn alchemy_url(path: &str) -> String {
        let net = network();
        let key = std::env::var("ALCHEMY_API_KEY").unwrap_or_default();
        let key = if key.is_empty() { "demo".into() } else { key };
        format!("https://eth-{net}.g.alchemy.com/{path}/{key}")
    }

    pub fn network() -> String {
        std::env::var("MARKET_NETWORK").unwrap_or_else(|_| "sepolia".into())
    }

    pub fn rpc_url() -> String {
        // Priority: MARKET_RPC_URL > ALCHEMY_API_KEY > public demo endpoint
        if let Ok(url) = std::env::var("MARKET_RPC_URL") {
            if !url.is_empty() {
                return url;
            }
        }
        alchemy_url("v2")
    }

    pub fn indexer_url() -> String {
        alchemy_url("nft/v2")
    }

    pub fn marketplace_address() -> String {
        "0x9f0ea8f9bd08e9cbd21ec798ba58dd4e09029d17".into()
    }

    pub fn creator_contract() -> String {
        "0x2e42dc7c46d55ab1c5f5e9a57b2f52efd4c7c01e".into()
    }

    pub fn chain_id() -> u64 {
        if network().contains("mainnet") {
            1
        } else {
            11155111
        }
    }

    pub fn keystore_path() -> String {
        "./market_key".into()
    }
}
