//! Listing state resolution for a single (contract, token) pair.
//!
//! All reads here are side-effect free and return snapshots: on-chain state
//! can change underneath the client at any time, so consumers re-fetch
//! rather than patch. Ownership is resolved before approval; the approval
//! bit is only meaningful for the owner.

use crate::chain::ChainRead;
use crate::error::Error;
use ethers::types::{Address, U256};
use ethers::utils::{format_ether, format_units};
use std::sync::Arc;

/// One row of the marketplace's item registry.
///
/// The registry is 1-based: `index == 0` means "no record exists" and must
/// never be dereferenced. An unlisted record persists on-chain with
/// `is_listed == false` rather than being deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub contract_address: Address,
    pub token_id: U256,
    pub seller: Address,
    /// Sale price in wei.
    pub price: U256,
    /// Royalty rate, gwei-scaled (1 gwei == 100%).
    pub royalty: U256,
    pub royalty_address: Address,
    pub is_listed: bool,
    /// Position in the item registry, 1-based.
    pub index: U256,
}

impl ListingRecord {
    /// Price in ETH, trailing zeros trimmed.
    pub fn price_eth(&self) -> String {
        let text = format_ether(self.price);
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() {
            "0".into()
        } else {
            trimmed.to_string()
        }
    }

    /// Royalty rate as a percentage.
    pub fn royalty_percent(&self) -> f64 {
        format_units(self.royalty, "gwei")
            .ok()
            .and_then(|text| text.parse::<f64>().ok())
            .unwrap_or(0.0)
            * 100.0
    }
}

/// Snapshot of everything the UI needs to gate actions on a token, from the
/// session holder's perspective.
#[derive(Debug, Clone, Default)]
pub struct TokenStatus {
    pub is_owner: bool,
    pub is_approved: bool,
    pub listing: Option<ListingRecord>,
}

impl TokenStatus {
    /// The listing record, if one exists and is currently active.
    pub fn active_listing(&self) -> Option<&ListingRecord> {
        self.listing.as_ref().filter(|record| record.is_listed)
    }
}

/// Derives ownership, approval, and listing state from chain reads.
pub struct ListingStateResolver {
    reader: Arc<dyn ChainRead>,
    marketplace: Address,
}

impl ListingStateResolver {
    pub fn new(reader: Arc<dyn ChainRead>, marketplace: Address) -> Self {
        Self {
            reader,
            marketplace,
        }
    }

    /// Whether the session holds the token. Vacuously false without a
    /// session.
    pub async fn resolve_ownership(
        &self,
        token_contract: Address,
        token_id: U256,
        session: Option<Address>,
    ) -> Result<bool, Error> {
        let Some(session) = session else {
            return Ok(false);
        };
        let owner = self.reader.owner_of(token_contract, token_id).await?;
        Ok(owner == session)
    }

    /// Whether the marketplace contract is the token's approved operator.
    pub async fn resolve_approval(
        &self,
        token_contract: Address,
        token_id: U256,
    ) -> Result<bool, Error> {
        let operator = self.reader.approved_for(token_contract, token_id).await?;
        Ok(operator == self.marketplace)
    }

    /// Look up the registry record for the pair. The zero index sentinel
    /// short-circuits to `None` without a second read.
    pub async fn resolve_listing(
        &self,
        token_contract: Address,
        token_id: U256,
    ) -> Result<Option<ListingRecord>, Error> {
        let index = self.reader.index_of_item(token_contract, token_id).await?;
        if index.is_zero() {
            return Ok(None);
        }
        let record = self.reader.item_at(index).await?;
        Ok(Some(record))
    }

    /// Full snapshot for a token page. Ownership is read first; approval is
    /// only fetched once ownership is established.
    pub async fn resolve(
        &self,
        token_contract: Address,
        token_id: U256,
        session: Option<Address>,
    ) -> Result<TokenStatus, Error> {
        let is_owner = self
            .resolve_ownership(token_contract, token_id, session)
            .await?;
        let is_approved = if is_owner {
            self.resolve_approval(token_contract, token_id).await?
        } else {
            false
        };
        let listing = self.resolve_listing(token_contract, token_id).await?;
        Ok(TokenStatus {
            is_owner,
            is_approved,
            listing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainRead;
    use ethers::utils::parse_ether;
    use mockall::predicate::eq;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn record(index: u64, listed: bool) -> ListingRecord {
        ListingRecord {
            contract_address: addr(1),
            token_id: U256::from(7),
            seller: addr(2),
            price: parse_ether("1.5").unwrap(),
            royalty: U256::zero(),
            royalty_address: Address::zero(),
            is_listed: listed,
            index: U256::from(index),
        }
    }

    #[tokio::test]
    async fn ownership_is_vacuously_false_without_session() {
        let reader = MockChainRead::new();
        let resolver = ListingStateResolver::new(Arc::new(reader), addr(9));
        let owned = resolver
            .resolve_ownership(addr(1), U256::from(7), None)
            .await
            .unwrap();
        assert!(!owned);
    }

    #[tokio::test]
    async fn zero_index_short_circuits_to_unlisted() {
        let mut reader = MockChainRead::new();
        reader
            .expect_index_of_item()
            .with(eq(addr(1)), eq(U256::from(7)))
            .times(1)
            .returning(|_, _| Ok(U256::zero()));
        reader.expect_item_at().times(0);
        let resolver = ListingStateResolver::new(Arc::new(reader), addr(9));
        let listing = resolver
            .resolve_listing(addr(1), U256::from(7))
            .await
            .unwrap();
        assert!(listing.is_none());
    }

    #[tokio::test]
    async fn resolve_listing_is_idempotent_absent_writes() {
        let mut reader = MockChainRead::new();
        reader
            .expect_index_of_item()
            .times(2)
            .returning(|_, _| Ok(U256::from(3)));
        reader
            .expect_item_at()
            .with(eq(U256::from(3)))
            .times(2)
            .returning(|_| Ok(record(3, true)));
        let resolver = ListingStateResolver::new(Arc::new(reader), addr(9));
        let first = resolver
            .resolve_listing(addr(1), U256::from(7))
            .await
            .unwrap();
        let second = resolver
            .resolve_listing(addr(1), U256::from(7))
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn approval_is_skipped_for_non_owner() {
        let mut reader = MockChainRead::new();
        reader
            .expect_owner_of()
            .times(1)
            .returning(|_, _| Ok(addr(2)));
        reader.expect_approved_for().times(0);
        reader
            .expect_index_of_item()
            .times(1)
            .returning(|_, _| Ok(U256::zero()));
        let resolver = ListingStateResolver::new(Arc::new(reader), addr(9));
        let status = resolver
            .resolve(addr(1), U256::from(7), Some(addr(5)))
            .await
            .unwrap();
        assert!(!status.is_owner);
        assert!(!status.is_approved);
    }

    #[tokio::test]
    async fn owner_snapshot_reads_approval() {
        let mut reader = MockChainRead::new();
        reader
            .expect_owner_of()
            .times(1)
            .returning(|_, _| Ok(addr(5)));
        reader
            .expect_approved_for()
            .times(1)
            .returning(|_, _| Ok(addr(9)));
        reader
            .expect_index_of_item()
            .times(1)
            .returning(|_, _| Ok(U256::from(3)));
        reader
            .expect_item_at()
            .times(1)
            .returning(|_| Ok(record(3, true)));
        let resolver = ListingStateResolver::new(Arc::new(reader), addr(9));
        let status = resolver
            .resolve(addr(1), U256::from(7), Some(addr(5)))
            .await
            .unwrap();
        assert!(status.is_owner);
        assert!(status.is_approved);
        assert!(status.active_listing().is_some());
    }

    #[test]
    fn price_renders_without_trailing_zeros() {
        assert_eq!(record(1, true).price_eth(), "1.5");
    }

    #[test]
    fn inactive_record_is_not_an_active_listing() {
        let status = TokenStatus {
            is_owner: false,
            is_approved: false,
            listing: Some(record(1, false)),
        };
        assert!(status.active_listing().is_none());
    }
}
