//! Marketplace client binary.

use clap::{Parser, Subcommand};
use ethers::types::{Address, U256};
use nft_market::addr::{format_address, parse_address, shorten_address};
use nft_market::chain::{ChainRead, EthersGateway, EthersSubmitter, MarketWrite};
use nft_market::indexer::IndexerClient;
use nft_market::listing::ListingStateResolver;
use nft_market::metadata::{resolve_thumbnail, resolve_title};
use nft_market::pagination::PagedCollection;
use nft_market::pinning::PinningClient;
use nft_market::wallet::{KeyfileWallet, WalletProvider};
use nft_market::{Config, Error, MintRequest, SessionManager, TxOrchestrator};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "market", about = "NFT marketplace client", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse items currently listed on the marketplace.
    Browse,
    /// List NFTs owned by an address (the session's by default).
    Owned {
        owner: Option<String>,
        /// Follow pagination cursors to the end.
        #[arg(long)]
        all: bool,
    },
    /// Show one token with its on-chain listing state.
    Show { contract: String, token: String },
    /// Grant the marketplace operator rights over a token.
    Approve { contract: String, token: String },
    /// Create or update a listing at a price in ETH.
    List {
        contract: String,
        token: String,
        price: String,
    },
    /// Remove a listing.
    Unlist { contract: String, token: String },
    /// Purchase a listed token at its stored price.
    Buy { contract: String, token: String },
    /// Mint a new NFT through the marketplace's creator contract.
    Mint {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Path to the image file to pin.
        #[arg(long)]
        image: String,
        /// Royalty percentage.
        #[arg(long, default_value = "0")]
        royalty: String,
    },
    /// Connect the wallet and print the session.
    Connect,
}

struct App {
    config: Config,
    reader: Arc<dyn ChainRead>,
    indexer: IndexerClient,
    session: Arc<SessionManager>,
    resolver: Arc<ListingStateResolver>,
    orchestrator: Option<TxOrchestrator>,
}

impl App {
    fn new(config: Config) -> anyhow::Result<Self> {
        let marketplace = parse_address(&config.marketplace_address)?;
        let creator_contract = parse_address(&config.creator_contract)?;
        let reader: Arc<dyn ChainRead> =
            Arc::new(EthersGateway::new(&config.rpc_url, marketplace)?);
        let indexer = IndexerClient::new(&config.indexer_url)?;

        let wallet = KeyfileWallet::load(&config)?.map(Arc::new);
        let session = Arc::new(SessionManager::new(
            wallet
                .clone()
                .map(|w| w as Arc<dyn WalletProvider>),
            Arc::clone(&reader),
        ));
        let resolver = Arc::new(ListingStateResolver::new(Arc::clone(&reader), marketplace));

        let orchestrator = match &wallet {
            Some(wallet) => {
                let writer: Arc<dyn MarketWrite> = Arc::new(EthersSubmitter::new(
                    &config.rpc_url,
                    marketplace,
                    wallet.signer(),
                )?);
                Some(TxOrchestrator::new(
                    Arc::clone(&session),
                    Arc::clone(&resolver),
                    Arc::clone(&reader),
                    writer,
                    creator_contract,
                ))
            }
            None => None,
        };

        Ok(Self {
            config,
            reader,
            indexer,
            session,
            resolver,
            orchestrator,
        })
    }

    fn orchestrator(&self) -> Result<&TxOrchestrator, Error> {
        self.orchestrator.as_ref().ok_or(Error::ProviderUnavailable)
    }

    async fn print_session(&self) {
        let session = self.session.snapshot().await;
        match session.address {
            Some(address) => println!(
                "Connected {}  balance {:.4} ETH",
                shorten_address(&format_address(address)),
                session.balance_eth
            ),
            None => println!("Not connected"),
        }
    }

    async fn browse(&self) -> anyhow::Result<()> {
        let items = self.reader.listed_items().await?;
        if items.is_empty() {
            println!("No results");
            return Ok(());
        }
        for record in items {
            let metadata = self
                .indexer
                .nft_metadata(record.contract_address, record.token_id)
                .await?;
            println!(
                "{}  {}  {} ETH  {}",
                resolve_title(&metadata),
                shorten_address(&format_address(record.contract_address)),
                record.price_eth(),
                resolve_thumbnail(&metadata),
            );
        }
        Ok(())
    }

    async fn owned(&self, owner: Option<String>, all: bool) -> anyhow::Result<()> {
        let owner = match owner {
            Some(text) => parse_address(&text)?,
            None => self.session.address().await.ok_or_else(|| {
                Error::Precondition("no owner given and no session".into())
            })?,
        };
        let mut collection = PagedCollection::default();
        let mut continuing = false;
        loop {
            let page = self
                .indexer
                .owned_page(owner, collection.cursor.as_deref())
                .await?;
            collection.apply(page, continuing);
            if !all || !collection.has_next() {
                break;
            }
            continuing = true;
        }
        if collection.items.is_empty() {
            println!("No results");
            return Ok(());
        }
        for item in &collection.items {
            println!(
                "{}  {}",
                resolve_title(item),
                shorten_address(&item.contract.address)
            );
        }
        if collection.has_next() {
            println!("(more results available, pass --all)");
        }
        Ok(())
    }

    async fn show(&self, contract: Address, token_id: U256) -> anyhow::Result<()> {
        let metadata = self.indexer.nft_metadata(contract, token_id).await?;
        let status = self
            .resolver
            .resolve(contract, token_id, self.session.address().await)
            .await?;

        println!("{}", resolve_title(&metadata));
        println!("Contract  {}", format_address(contract));
        println!("Token ID  #{token_id}");
        println!("Image     {}", resolve_thumbnail(&metadata));
        for attribute in &metadata.metadata.attributes {
            println!(
                "  {}: {}",
                attribute.trait_type.as_deref().unwrap_or("trait"),
                attribute.value
            );
        }
        if let Some(record) = status.active_listing() {
            if !record.royalty.is_zero() {
                println!("Royalty   {}% to {}", record.royalty_percent(), format_address(record.royalty_address));
            }
            println!("Seller    {}", format_address(record.seller));
            println!("Price     {} ETH", record.price_eth());
        } else {
            println!("Not listed");
        }
        if status.is_owner {
            println!(
                "You own this token ({})",
                if status.is_approved {
                    "marketplace approved"
                } else {
                    "marketplace not approved"
                }
            );
        }
        Ok(())
    }

    async fn mint(
        &self,
        name: String,
        description: String,
        image: String,
        royalty: String,
    ) -> anyhow::Result<()> {
        let pinning = PinningClient::new(&self.config.pinata_api_key, &self.config.pinata_secret)?;
        let bytes = std::fs::read(&image)
            .map_err(|e| Error::Pinning(format!("cannot read {image}: {e}")))?;
        let filename = std::path::Path::new(&image)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let image_hash = pinning.pin_file(&filename, bytes).await?;
        info!(hash = %image_hash, "image pinned");

        let minted = self
            .orchestrator()?
            .create_nft(&MintRequest {
                name,
                description,
                image_hash,
                royalty_percent: royalty,
            })
            .await?;
        println!("Minted token #{}", minted.token_id);
        // Land on the fresh token's detail view.
        self.show(minted.contract, minted.token_id).await
    }
}

fn parse_token(text: &str) -> Result<U256, Error> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix("0x") {
        U256::from_str_radix(hex, 16).ok()
    } else {
        U256::from_dec_str(text).ok()
    };
    parsed.ok_or_else(|| Error::Precondition(format!("invalid token id: {text}")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config: Config = config::Config::builder()
        .add_source(config::File::with_name("market").required(false))
        .add_source(config::Environment::with_prefix("MARKET"))
        .build()?
        .try_deserialize()
        .unwrap_or_default();

    info!(network = %config.network, marketplace = %config.marketplace_address, "configuration loaded");

    let app = App::new(config)?;
    app.session.check_existing_connection().await;
    let _listener = app.session.spawn_accounts_listener();

    match cli.command {
        Command::Browse => {
            app.print_session().await;
            app.browse().await?;
        }
        Command::Owned { owner, all } => {
            app.print_session().await;
            app.owned(owner, all).await?;
        }
        Command::Show { contract, token } => {
            app.print_session().await;
            app.show(parse_address(&contract)?, parse_token(&token)?)
                .await?;
        }
        Command::Approve { contract, token } => {
            let approved = app
                .orchestrator()?
                .approve(parse_address(&contract)?, parse_token(&token)?)
                .await?;
            println!("Approved: {approved}");
        }
        Command::List {
            contract,
            token,
            price,
        } => {
            let record = app
                .orchestrator()?
                .list_or_update(parse_address(&contract)?, parse_token(&token)?, &price)
                .await?;
            match record {
                Some(record) => println!("Listed at {} ETH", record.price_eth()),
                None => println!("Listing submitted, record not yet visible"),
            }
        }
        Command::Unlist { contract, token } => {
            app.orchestrator()?
                .unlist(parse_address(&contract)?, parse_token(&token)?)
                .await?;
            println!("Unlisted");
        }
        Command::Buy { contract, token } => {
            let contract = parse_address(&contract)?;
            let token = parse_token(&token)?;
            app.orchestrator()?.purchase(contract, token).await?;
            println!("Purchase confirmed");
            app.show(contract, token).await?;
        }
        Command::Mint {
            name,
            description,
            image,
            royalty,
        } => {
            app.mint(name, description, image, royalty).await?;
        }
        Command::Connect => {
            let address = app.session.connect().await?;
            info!(address = ?address, "wallet connected");
            app.print_session().await;
        }
    }

    Ok(())
}
