//! Chain read/write boundary.
//!
//! The marketplace and token contracts are consumed behind two traits so
//! the orchestration layer never touches a live provider directly: reads go
//! through [`ChainRead`], state-mutating submissions through
//! [`MarketWrite`]. The concrete implementations wrap an ethers
//! `Provider<Http>` (read-only JSON-RPC) and a `SignerMiddleware` carrying
//! the wallet's key.

use crate::error::Error;
use crate::listing::ListingRecord;
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::LocalWallet;
use ethers::types::{Address, TransactionReceipt, H256, U256};
use std::sync::Arc;

abigen!(
    Marketplace,
    r#"[
        struct Item { address contractAddress; uint256 tokenId; address seller; uint256 price; uint256 royalty; address royaltyAddress; bool isListed; }
        function creatorFee() external view returns (uint256)
        function getItems(bool onlyListed) external view returns (Item[] memory)
        function indexOfItem(address tokenContract, uint256 tokenId) external view returns (uint256)
        function getItem(uint256 index) external view returns (Item memory)
        function listItem(address tokenContract, uint256 tokenId, uint256 price) external
        function updatePrice(address tokenContract, uint256 tokenId, uint256 price) external
        function unlistItem(address tokenContract, uint256 tokenId) external
        function sale(address tokenContract, uint256 tokenId) external payable
        function createNFT(string tokenURI, uint256 royaltyRate) external payable
    ]"#
);

abigen!(
    Erc721,
    r#"[
        function ownerOf(uint256 tokenId) external view returns (address)
        function getApproved(uint256 tokenId) external view returns (address)
        function approve(address to, uint256 tokenId) external
    ]"#
);

/// One event emitted by a confirmed transaction.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// A transaction that reached its requested confirmation depth.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub logs: Vec<EventLog>,
}

impl From<TransactionReceipt> for Confirmation {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            logs: receipt
                .logs
                .into_iter()
                .map(|log| EventLog {
                    address: log.address,
                    topics: log.topics,
                    data: log.data.to_vec(),
                })
                .collect(),
        }
    }
}

/// Read-only chain surface: balance queries plus the marketplace and
/// ERC-721 view calls. All calls are pass-through; nothing is cached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainRead: Send + Sync {
    async fn balance_of(&self, address: Address) -> Result<U256, Error>;
    async fn owner_of(&self, token_contract: Address, token_id: U256) -> Result<Address, Error>;
    async fn approved_for(&self, token_contract: Address, token_id: U256)
        -> Result<Address, Error>;
    async fn index_of_item(&self, token_contract: Address, token_id: U256)
        -> Result<U256, Error>;
    async fn item_at(&self, index: U256) -> Result<ListingRecord, Error>;
    async fn listed_items(&self) -> Result<Vec<ListingRecord>, Error>;
    async fn creator_fee(&self) -> Result<U256, Error>;
}

/// State-mutating chain surface. Every call submits through the wallet's
/// signer and resolves only after `confirmations` blocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketWrite: Send + Sync {
    async fn approve(
        &self,
        token_contract: Address,
        token_id: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error>;
    async fn list_item(
        &self,
        token_contract: Address,
        token_id: U256,
        price: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error>;
    async fn update_price(
        &self,
        token_contract: Address,
        token_id: U256,
        price: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error>;
    async fn unlist_item(
        &self,
        token_contract: Address,
        token_id: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error>;
    async fn sale(
        &self,
        token_contract: Address,
        token_id: U256,
        value: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error>;
    async fn create_nft(
        &self,
        token_uri: String,
        royalty_rate: U256,
        fee: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error>;
}

/// Tuple shape abigen produces for the marketplace's `Item` struct.
type ItemTuple = (Address, U256, Address, U256, U256, Address, bool);

fn record_from(item: ItemTuple, index: U256) -> ListingRecord {
    let (contract_address, token_id, seller, price, royalty, royalty_address, is_listed) = item;
    ListingRecord {
        contract_address,
        token_id,
        seller,
        price,
        royalty,
        royalty_address,
        is_listed,
        index,
    }
}

/// Read-only gateway over a JSON-RPC provider.
pub struct EthersGateway {
    provider: Arc<Provider<Http>>,
    marketplace: Address,
}

impl EthersGateway {
    pub fn new(rpc_url: &str, marketplace: Address) -> Result<Self, Error> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::Config(format!("invalid rpc url {rpc_url}: {e}")))?;
        Ok(Self {
            provider: Arc::new(provider),
            marketplace,
        })
    }

    fn market(&self) -> Marketplace<Provider<Http>> {
        Marketplace::new(self.marketplace, Arc::clone(&self.provider))
    }

    fn token(&self, token_contract: Address) -> Erc721<Provider<Http>> {
        Erc721::new(token_contract, Arc::clone(&self.provider))
    }
}

#[async_trait]
impl ChainRead for EthersGateway {
    async fn balance_of(&self, address: Address) -> Result<U256, Error> {
        self.provider
            .get_balance(address, None)
            .await
            .map_err(|e| Error::Rpc(format!("balance query failed: {e}")))
    }

    async fn owner_of(&self, token_contract: Address, token_id: U256) -> Result<Address, Error> {
        self.token(token_contract)
            .owner_of(token_id)
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("ownerOf failed: {e}")))
    }

    async fn approved_for(
        &self,
        token_contract: Address,
        token_id: U256,
    ) -> Result<Address, Error> {
        self.token(token_contract)
            .get_approved(token_id)
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("getApproved failed: {e}")))
    }

    async fn index_of_item(
        &self,
        token_contract: Address,
        token_id: U256,
    ) -> Result<U256, Error> {
        self.market()
            .index_of_item(token_contract, token_id)
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("indexOfItem failed: {e}")))
    }

    async fn item_at(&self, index: U256) -> Result<ListingRecord, Error> {
        let item = self
            .market()
            .get_item(index)
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("getItem failed: {e}")))?;
        Ok(record_from(item, index))
    }

    async fn listed_items(&self) -> Result<Vec<ListingRecord>, Error> {
        let items = self
            .market()
            .get_items(true)
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("getItems failed: {e}")))?;
        // The registry keeps a placeholder row at slot 0; positions in the
        // returned array are the 1-based registry indices otherwise.
        Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| item.0 != Address::zero())
            .map(|(position, item)| record_from(item, U256::from(position)))
            .collect())
    }

    async fn creator_fee(&self) -> Result<U256, Error> {
        self.market()
            .creator_fee()
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("creatorFee failed: {e}")))
    }
}

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;
type WriteCall = ethers::contract::ContractCall<SignerClient, ()>;

/// Submitting gateway: marketplace and ERC-721 writes through the wallet's
/// signer, each awaited to its confirmation depth.
pub struct EthersSubmitter {
    client: Arc<SignerClient>,
    marketplace: Address,
}

impl EthersSubmitter {
    pub fn new(rpc_url: &str, marketplace: Address, signer: LocalWallet) -> Result<Self, Error> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::Config(format!("invalid rpc url {rpc_url}: {e}")))?;
        Ok(Self {
            client: Arc::new(SignerMiddleware::new(provider, signer)),
            marketplace,
        })
    }

    fn market(&self) -> Marketplace<SignerClient> {
        Marketplace::new(self.marketplace, Arc::clone(&self.client))
    }

    async fn confirm(&self, call: WriteCall, confirmations: usize) -> Result<Confirmation, Error> {
        let pending = call
            .send()
            .await
            .map_err(|e| Error::Rpc(format!("submission failed: {e}")))?;
        let receipt = pending
            .confirmations(confirmations)
            .await
            .map_err(|e| Error::Rpc(format!("confirmation wait failed: {e}")))?
            .ok_or(Error::Dropped)?;
        Ok(receipt.into())
    }
}

#[async_trait]
impl MarketWrite for EthersSubmitter {
    async fn approve(
        &self,
        token_contract: Address,
        token_id: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error> {
        let token = Erc721::new(token_contract, Arc::clone(&self.client));
        self.confirm(token.approve(self.marketplace, token_id), confirmations)
            .await
    }

    async fn list_item(
        &self,
        token_contract: Address,
        token_id: U256,
        price: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error> {
        self.confirm(
            self.market().list_item(token_contract, token_id, price),
            confirmations,
        )
        .await
    }

    async fn update_price(
        &self,
        token_contract: Address,
        token_id: U256,
        price: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error> {
        self.confirm(
            self.market().update_price(token_contract, token_id, price),
            confirmations,
        )
        .await
    }

    async fn unlist_item(
        &self,
        token_contract: Address,
        token_id: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error> {
        self.confirm(
            self.market().unlist_item(token_contract, token_id),
            confirmations,
        )
        .await
    }

    async fn sale(
        &self,
        token_contract: Address,
        token_id: U256,
        value: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error> {
        self.confirm(
            self.market().sale(token_contract, token_id).value(value),
            confirmations,
        )
        .await
    }

    async fn create_nft(
        &self,
        token_uri: String,
        royalty_rate: U256,
        fee: U256,
        confirmations: usize,
    ) -> Result<Confirmation, Error> {
        self.confirm(
            self.market().create_nft(token_uri, royalty_rate).value(fee),
            confirmations,
        )
        .await
    }
}
