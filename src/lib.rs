//! # NFT Market Client
//!
//! Client core for a single on-chain NFT marketplace: wallet session
//! tracking, listing lifecycle orchestration (approve → list/update →
//! unlist → purchase), mint, and normalization of indexer metadata into a
//! uniform display model.
//!
//! Reads go through a third-party JSON-RPC provider and indexing API;
//! writes go through the wallet's signer. The authoritative mutable state
//! lives on-chain, so every resolver output is a snapshot that is
//! re-fetched rather than patched.

pub mod addr;
pub mod chain;
pub mod config;
pub mod error;
pub mod feedback;
pub mod indexer;
pub mod listing;
pub mod metadata;
pub mod orchestrator;
pub mod pagination;
pub mod pinning;
pub mod session;
pub mod wallet;

pub use config::Config;
pub use error::Error;
pub use listing::{ListingRecord, ListingStateResolver, TokenStatus};
pub use orchestrator::{MintRequest, MintedToken, TxOrchestrator};
pub use session::{Session, SessionManager};
