//! Display-model derivation for indexer metadata records.
//!
//! The indexing API returns heterogeneous records with most fields
//! optional. Nothing here mutates a record; the resolvers only derive a
//! thumbnail URL and a display title from whatever happens to be present.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ethers::types::U256;
use serde::Deserialize;

/// HTTPS gateway used to rewrite `ipfs://` content references.
pub const IPFS_GATEWAY: &str = "https://cloudflare-ipfs.com/ipfs/";

/// Local placeholder shown when no usable media exists.
pub const PLACEHOLDER_IMAGE: &str = "/images/NFT.png";

/// One metadata record as returned by the indexing API.
#[derive(Debug, Clone, Deserialize)]
pub struct NftMetadata {
    pub contract: ContractRef,
    pub id: TokenRef,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub media: Vec<MediaEntry>,
    #[serde(default)]
    pub metadata: TokenDocument,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractRef {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRef {
    #[serde(rename = "tokenId")]
    pub token_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaEntry {
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub raw: Option<String>,
}

/// The token's own document, nested inside the indexer record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenDocument {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl NftMetadata {
    /// Token id as a number. The API reports it as a hex or decimal string
    /// depending on endpoint.
    pub fn token_id(&self) -> U256 {
        let text = self.id.token_id.trim();
        if let Some(hex) = text.strip_prefix("0x") {
            U256::from_str_radix(hex, 16).unwrap_or_default()
        } else {
            U256::from_dec_str(text).unwrap_or_default()
        }
    }
}

/// Derive the display thumbnail. Fallback chain, first satisfied rule wins:
/// precomputed thumbnail, inline SVG (re-encoded to base64 so it renders
/// everywhere), gateway-rewritten image reference, local placeholder.
pub fn resolve_thumbnail(item: &NftMetadata) -> String {
    if let Some(entry) = item.media.first() {
        if let Some(thumbnail) = entry.thumbnail.as_deref().filter(|t| !t.is_empty()) {
            return thumbnail.to_string();
        }
        if let Some(raw) = entry.raw.as_deref() {
            if raw.contains("svg+xml") {
                // The utf8 variant carries an unencoded payload that some
                // renderers choke on; strip the prefix and re-encode.
                if let Some((_, payload)) = raw.split_once("utf8,") {
                    return format!("data:image/svg+xml;base64,{}", BASE64.encode(payload));
                }
                return raw.to_string();
            }
        }
    }
    if let Some(image) = item.metadata.image.as_deref().filter(|i| !i.is_empty()) {
        if let Some(path) = image.strip_prefix("ipfs://") {
            return format!("{IPFS_GATEWAY}{path}");
        }
        return image.to_string();
    }
    PLACEHOLDER_IMAGE.to_string()
}

/// Derive the display title: append ` #<tokenId>` unless the title already
/// carries a `#` marker; a missing title renders as `#<tokenId>` alone.
pub fn resolve_title(item: &NftMetadata) -> String {
    let token_id = item.token_id();
    match item.title.as_deref().filter(|t| !t.is_empty()) {
        Some(title) if !title.contains('#') => format!("{title} #{token_id}"),
        Some(title) => title.to_string(),
        None => format!("#{token_id}"),
    }
}
