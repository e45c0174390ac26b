//! Wallet session state and account-change reactivity.

use crate::chain::ChainRead;
use crate::error::Error;
use crate::wallet::WalletProvider;
use ethers::types::Address;
use ethers::utils::format_ether;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

/// The current wallet session. `balance_eth` is only meaningful while
/// `address` is set.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub address: Option<Address>,
    /// Balance in ETH, rounded to 4 decimal places.
    pub balance_eth: f64,
}

/// Owns connection state and reacts to external account changes.
///
/// Address changes always trigger a balance refetch; a zero-account change
/// notification tears the session down. In-flight transactions are not
/// invalidated by a change — only subsequent submissions pick up the new
/// identity.
pub struct SessionManager {
    wallet: Option<Arc<dyn WalletProvider>>,
    reader: Arc<dyn ChainRead>,
    session: RwLock<Session>,
}

impl SessionManager {
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>, reader: Arc<dyn ChainRead>) -> Self {
        Self {
            wallet,
            reader,
            session: RwLock::new(Session::default()),
        }
    }

    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn address(&self) -> Option<Address> {
        self.session.read().await.address
    }

    /// Query for an already-authorized account, non-interactively. A
    /// missing provider is an expected condition and only logged.
    pub async fn check_existing_connection(&self) {
        let Some(wallet) = &self.wallet else {
            debug!("no wallet provider present, write features disabled");
            return;
        };
        match wallet.accounts().await {
            Ok(accounts) => {
                if let Some(first) = accounts.first() {
                    self.adopt(*first).await;
                }
            }
            Err(e) => debug!(error = %e, "wallet account query failed"),
        }
    }

    /// Interactively request account access.
    pub async fn connect(&self) -> Result<Address, Error> {
        let wallet = self.wallet.as_ref().ok_or(Error::ProviderUnavailable)?;
        let accounts = wallet.request_accounts().await?;
        let first = *accounts.first().ok_or(Error::NoAccountGranted)?;
        self.adopt(first).await;
        Ok(first)
    }

    /// Fetch and store the session balance. Requires a connected session.
    pub async fn refresh_balance(&self) -> Result<(), Error> {
        let address = self.address().await.ok_or_else(|| {
            Error::Precondition("balance refresh requires a connected session".into())
        })?;
        let wei = self.reader.balance_of(address).await?;
        let eth = format_ether(wei).parse::<f64>().unwrap_or(0.0);
        let rounded = (eth * 10_000.0).round() / 10_000.0;
        self.session.write().await.balance_eth = rounded;
        Ok(())
    }

    async fn adopt(&self, address: Address) {
        {
            let mut session = self.session.write().await;
            session.address = Some(address);
        }
        info!(address = ?address, "session account adopted");
        if let Err(e) = self.refresh_balance().await {
            warn!(error = %e, "balance refresh failed");
        }
    }

    async fn disconnect(&self) {
        *self.session.write().await = Session::default();
        info!("wallet disconnected");
    }

    pub(crate) async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        match accounts.first() {
            None => self.disconnect().await,
            Some(first) => self.adopt(*first).await,
        }
    }

    /// Register the single persistent `accountsChanged` listener for the
    /// lifetime of the session.
    pub fn spawn_accounts_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let Some(wallet) = &self.wallet else {
            return tokio::spawn(async {});
        };
        let mut rx = wallet.accounts_changed();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(accounts) => manager.handle_accounts_changed(accounts).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainRead;
    use crate::wallet::MockWalletProvider;
    use ethers::utils::parse_ether;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn reader_with_balance(eth: &str, times: usize) -> Arc<MockChainRead> {
        let wei = parse_ether(eth).unwrap();
        let mut reader = MockChainRead::new();
        reader
            .expect_balance_of()
            .times(times)
            .returning(move |_| Ok(wei));
        Arc::new(reader)
    }

    #[tokio::test]
    async fn connect_without_provider_fails() {
        let manager = SessionManager::new(None, Arc::new(MockChainRead::new()));
        assert!(matches!(
            manager.connect().await,
            Err(Error::ProviderUnavailable)
        ));
    }

    #[tokio::test]
    async fn connect_with_empty_grant_fails() {
        let mut wallet = MockWalletProvider::new();
        wallet
            .expect_request_accounts()
            .times(1)
            .returning(|| Ok(Vec::new()));
        let manager =
            SessionManager::new(Some(Arc::new(wallet)), Arc::new(MockChainRead::new()));
        assert!(matches!(
            manager.connect().await,
            Err(Error::NoAccountGranted)
        ));
        assert!(manager.address().await.is_none());
    }

    #[tokio::test]
    async fn connect_adopts_first_account_and_fetches_balance() {
        let mut wallet = MockWalletProvider::new();
        wallet
            .expect_request_accounts()
            .times(1)
            .returning(|| Ok(vec![addr(1), addr(2)]));
        let manager =
            SessionManager::new(Some(Arc::new(wallet)), reader_with_balance("1.23456789", 1));
        let connected = manager.connect().await.unwrap();
        assert_eq!(connected, addr(1));
        let session = manager.snapshot().await;
        assert_eq!(session.address, Some(addr(1)));
        assert_eq!(session.balance_eth, 1.2346);
    }

    #[tokio::test]
    async fn missing_provider_check_is_silent() {
        let manager = SessionManager::new(None, Arc::new(MockChainRead::new()));
        manager.check_existing_connection().await;
        assert!(manager.address().await.is_none());
    }

    #[tokio::test]
    async fn balance_refresh_requires_session() {
        let manager = SessionManager::new(None, Arc::new(MockChainRead::new()));
        assert!(matches!(
            manager.refresh_balance().await,
            Err(Error::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn zero_accounts_change_disconnects() {
        let mut wallet = MockWalletProvider::new();
        wallet
            .expect_request_accounts()
            .times(1)
            .returning(|| Ok(vec![addr(1)]));
        let manager =
            SessionManager::new(Some(Arc::new(wallet)), reader_with_balance("1", 1));
        manager.connect().await.unwrap();
        manager.handle_accounts_changed(Vec::new()).await;
        let session = manager.snapshot().await;
        assert!(session.address.is_none());
        assert_eq!(session.balance_eth, 0.0);
    }

    #[tokio::test]
    async fn account_change_adopts_new_identity_and_refetches() {
        let mut wallet = MockWalletProvider::new();
        wallet
            .expect_request_accounts()
            .times(1)
            .returning(|| Ok(vec![addr(1)]));
        // Two balance reads: one on connect, one on the change.
        let manager =
            SessionManager::new(Some(Arc::new(wallet)), reader_with_balance("2", 2));
        manager.connect().await.unwrap();
        manager.handle_accounts_changed(vec![addr(7)]).await;
        assert_eq!(manager.address().await, Some(addr(7)));
    }
}
