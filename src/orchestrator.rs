//! Transaction orchestration.
//!
//! Every workflow follows the same skeleton: precondition checks against a
//! fresh resolver snapshot, a single in-flight guard, submission, a
//! confirmation wait, and a mandatory refresh of the resolver's outputs.
//! Re-invoking a workflow while it is pending is rejected, never queued.
//! No workflow retries automatically and none supports cancellation; a
//! pending confirmation wait runs to completion or failure.

use crate::chain::{ChainRead, MarketWrite};
use crate::error::Error;
use crate::listing::{ListingRecord, ListingStateResolver};
use crate::session::SessionManager;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ethers::types::{Address, U256};
use ethers::utils::parse_ether;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Confirmation depth for listing mutations. Two blocks guard against
/// short-lived reorgs that would otherwise show a stale success.
const LISTING_CONFIRMATIONS: usize = 2;

/// Confirmation depth for one-shot mint/purchase operations, trading reorg
/// risk for responsiveness.
const DEFAULT_CONFIRMATIONS: usize = 1;

/// RAII release for a workflow's in-flight flag. Cleared on drop, so the
/// user can retry after any failure path.
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, workflow: &'static str) -> Result<Self, Error> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(Error::Busy(workflow));
        }
        Ok(Self { flag })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Inputs for the mint workflow.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub name: String,
    pub description: String,
    /// Content hash of the already-pinned image.
    pub image_hash: String,
    /// Royalty percentage, e.g. `"2.5"`.
    pub royalty_percent: String,
}

/// Outcome of a successful mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub contract: Address,
    pub token_id: U256,
}

/// Drives approve, list/update, unlist, purchase, and mint as guarded,
/// confirmable operations. The only component allowed to submit
/// state-mutating chain calls.
pub struct TxOrchestrator {
    session: Arc<SessionManager>,
    resolver: Arc<ListingStateResolver>,
    reader: Arc<dyn ChainRead>,
    writer: Arc<dyn MarketWrite>,
    creator_contract: Address,
    approving: AtomicBool,
    listing: AtomicBool,
    unlisting: AtomicBool,
    buying: AtomicBool,
    minting: AtomicBool,
}

impl TxOrchestrator {
    pub fn new(
        session: Arc<SessionManager>,
        resolver: Arc<ListingStateResolver>,
        reader: Arc<dyn ChainRead>,
        writer: Arc<dyn MarketWrite>,
        creator_contract: Address,
    ) -> Self {
        Self {
            session,
            resolver,
            reader,
            writer,
            creator_contract,
            approving: AtomicBool::new(false),
            listing: AtomicBool::new(false),
            unlisting: AtomicBool::new(false),
            buying: AtomicBool::new(false),
            minting: AtomicBool::new(false),
        }
    }

    /// Grant the marketplace operator rights over a token. Requires
    /// ownership; callers gate on current approval state so this is never
    /// submitted for an already-approved token.
    pub async fn approve(&self, token_contract: Address, token_id: U256) -> Result<bool, Error> {
        let _guard = FlightGuard::acquire(&self.approving, "approve")?;
        let session = self.session.address().await;
        if !self
            .resolver
            .resolve_ownership(token_contract, token_id, session)
            .await?
        {
            return Err(Error::Precondition("approve requires token ownership".into()));
        }
        let confirmation = self
            .writer
            .approve(token_contract, token_id, DEFAULT_CONFIRMATIONS)
            .await?;
        info!(tx = ?confirmation.tx_hash, "approval confirmed");
        self.resolver.resolve_approval(token_contract, token_id).await
    }

    /// Create or update a listing. A single user-facing action: the
    /// on-chain call is selected by the current listing record. A price
    /// equal to the active listing is rejected before submission.
    pub async fn list_or_update(
        &self,
        token_contract: Address,
        token_id: U256,
        price_text: &str,
    ) -> Result<Option<ListingRecord>, Error> {
        let _guard = FlightGuard::acquire(&self.listing, "listing")?;
        let price_text = price_text.trim();
        if price_text.is_empty() {
            return Err(Error::InvalidPrice("price must not be empty".into()));
        }
        let price = parse_ether(price_text)
            .map_err(|e| Error::InvalidPrice(format!("{price_text}: {e}")))?;

        let session = self.session.address().await;
        if !self
            .resolver
            .resolve_ownership(token_contract, token_id, session)
            .await?
        {
            return Err(Error::Precondition("listing requires token ownership".into()));
        }
        if !self.resolver.resolve_approval(token_contract, token_id).await? {
            return Err(Error::Precondition(
                "listing requires marketplace approval".into(),
            ));
        }

        let current = self.resolver.resolve_listing(token_contract, token_id).await?;
        let active = current.filter(|record| record.is_listed);
        let confirmation = match active {
            Some(record) if record.price == price => return Err(Error::UnchangedPrice),
            Some(_) => {
                self.writer
                    .update_price(token_contract, token_id, price, LISTING_CONFIRMATIONS)
                    .await?
            }
            None => {
                self.writer
                    .list_item(token_contract, token_id, price, LISTING_CONFIRMATIONS)
                    .await?
            }
        };
        info!(tx = ?confirmation.tx_hash, price = %price, "listing confirmed");
        self.resolver.resolve_listing(token_contract, token_id).await
    }

    /// Remove listing intent. The registry record survives on-chain flagged
    /// not-listed.
    pub async fn unlist(
        &self,
        token_contract: Address,
        token_id: U256,
    ) -> Result<Option<ListingRecord>, Error> {
        let _guard = FlightGuard::acquire(&self.unlisting, "unlist")?;
        let session = self.session.address().await;
        if !self
            .resolver
            .resolve_ownership(token_contract, token_id, session)
            .await?
        {
            return Err(Error::Precondition("unlist requires token ownership".into()));
        }
        let active = self
            .resolver
            .resolve_listing(token_contract, token_id)
            .await?
            .filter(|record| record.is_listed);
        if active.is_none() {
            return Err(Error::Precondition("token has no active listing".into()));
        }
        let confirmation = self
            .writer
            .unlist_item(token_contract, token_id, LISTING_CONFIRMATIONS)
            .await?;
        info!(tx = ?confirmation.tx_hash, "unlist confirmed");
        self.resolver.resolve_listing(token_contract, token_id).await
    }

    /// Buy a listed token at its exact stored price. Self-purchase is
    /// blocked here; the contract may or may not reject it on its own.
    pub async fn purchase(
        &self,
        token_contract: Address,
        token_id: U256,
    ) -> Result<Option<ListingRecord>, Error> {
        let _guard = FlightGuard::acquire(&self.buying, "purchase")?;
        let buyer = self.session.address().await.ok_or_else(|| {
            Error::Precondition("purchase requires a connected session".into())
        })?;
        let record = self
            .resolver
            .resolve_listing(token_contract, token_id)
            .await?
            .filter(|record| record.is_listed)
            .ok_or_else(|| Error::Precondition("token is not listed".into()))?;
        if record.seller == buyer {
            return Err(Error::Precondition("cannot purchase own listing".into()));
        }
        let confirmation = self
            .writer
            .sale(token_contract, token_id, record.price, DEFAULT_CONFIRMATIONS)
            .await?;
        info!(tx = ?confirmation.tx_hash, price = %record.price, "purchase confirmed");
        self.resolver.resolve_listing(token_contract, token_id).await
    }

    /// Mint a new NFT. The token document travels inline in the URI; only
    /// the image lives on external storage. The creation fee is a mutable
    /// contract parameter and is fetched fresh immediately before
    /// submission.
    pub async fn create_nft(&self, request: &MintRequest) -> Result<MintedToken, Error> {
        let _guard = FlightGuard::acquire(&self.minting, "mint")?;
        if self.session.address().await.is_none() {
            return Err(Error::Precondition("mint requires a connected session".into()));
        }
        let token_uri = token_uri(&request.name, &request.description, &request.image_hash);
        let royalty_rate = royalty_rate(&request.royalty_percent)?;
        let fee = self.reader.creator_fee().await?;
        let confirmation = self
            .writer
            .create_nft(token_uri, royalty_rate, fee, DEFAULT_CONFIRMATIONS)
            .await?;
        // The minted id is the third indexed topic of the first event. Its
        // absence means the contract took a revert path that did not fail
        // the transaction; that must not pass as success.
        let token_id = confirmation
            .logs
            .first()
            .and_then(|log| log.topics.get(3))
            .map(|topic| U256::from_big_endian(topic.as_bytes()))
            .ok_or(Error::MissingMintEvent)?;
        info!(tx = ?confirmation.tx_hash, token_id = %token_id, "mint confirmed");
        Ok(MintedToken {
            contract: self.creator_contract,
            token_id,
        })
    }
}

/// Self-describing token URI embedding the document inline.
fn token_uri(name: &str, description: &str, image_hash: &str) -> String {
    let document = serde_json::json!({
        "name": name,
        "description": description,
        "image": format!("ipfs://{image_hash}"),
    });
    format!(
        "data:application/json;base64,{}",
        BASE64.encode(document.to_string())
    )
}

/// Royalty percentage to the gwei-scaled on-chain rate (pct/100 gwei).
fn royalty_rate(percent: &str) -> Result<U256, Error> {
    let pct: f64 = percent
        .trim()
        .parse()
        .map_err(|_| Error::InvalidPrice(format!("invalid royalty percent: {percent}")))?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(Error::InvalidPrice(format!(
            "royalty percent out of range: {percent}"
        )));
    }
    Ok(U256::from((pct * 1e7).round() as u64))
}
