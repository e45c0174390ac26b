//! Wallet provider boundary.
//!
//! Mirrors the injected-provider surface: a non-interactive account query,
//! an interactive account request, and an `accountsChanged` subscription
//! that may fire at arbitrary times. [`KeyfileWallet`] is the concrete
//! provider backed by a local signing key.

use crate::config::Config;
use crate::error::Error;
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use tokio::sync::broadcast;

/// The injected wallet surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Already-authorized accounts (`eth_accounts`), non-interactive.
    async fn accounts(&self) -> Result<Vec<Address>, Error>;
    /// Interactive account request (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, Error>;
    /// Subscription to externally-triggered `accountsChanged` events. An
    /// empty account list means the wallet disconnected.
    fn accounts_changed(&self) -> broadcast::Receiver<Vec<Address>>;
}

/// Wallet backed by a local key, loaded from env or a key file the same way
/// the signer would be handed to any other headless client.
#[derive(Clone)]
pub struct KeyfileWallet {
    wallet: LocalWallet,
    changes: broadcast::Sender<Vec<Address>>,
}

impl KeyfileWallet {
    /// Try loading a key from `MARKET_PRIVATE_KEY`, then from the
    /// configured key file. Absence of both is not an error: it is the
    /// "no wallet installed" state and write features are gated off.
    pub fn load(config: &Config) -> Result<Option<Self>, Error> {
        let raw = match std::env::var("MARKET_PRIVATE_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => match std::fs::read_to_string(&config.keystore_path) {
                Ok(contents) => contents,
                Err(_) => return Ok(None),
            },
        };
        let wallet: LocalWallet = raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid signing key: {e}")))?;
        let wallet = wallet.with_chain_id(config.chain_id);
        let (changes, _) = broadcast::channel(8);
        Ok(Some(Self { wallet, changes }))
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Signer handed to the write gateway.
    pub fn signer(&self) -> LocalWallet {
        self.wallet.clone()
    }

    /// Push an external account change to subscribers.
    pub fn notify_accounts(&self, accounts: Vec<Address>) {
        let _ = self.changes.send(accounts);
    }
}

#[async_trait]
impl WalletProvider for KeyfileWallet {
    async fn accounts(&self) -> Result<Vec<Address>, Error> {
        Ok(vec![self.wallet.address()])
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, Error> {
        Ok(vec![self.wallet.address()])
    }

    fn accounts_changed(&self) -> broadcast::Receiver<Vec<Address>> {
        self.changes.subscribe()
    }
}
