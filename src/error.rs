//! Error types for the marketplace client.

use std::fmt;

/// Client error type.
///
/// No variant is retried automatically anywhere in the crate; recovery is
/// always a user-initiated re-invocation after the in-flight guard clears.
#[derive(Debug)]
pub enum Error {
    /// No wallet provider is present. Expected on read-only setups.
    ProviderUnavailable,
    /// Interactive connect succeeded but granted no accounts.
    NoAccountGranted,
    /// The named workflow already has a transaction in flight.
    Busy(&'static str),
    /// A workflow was invoked without its required session/on-chain state.
    Precondition(String),
    /// Malformed address input.
    Address(String),
    /// Malformed or empty price input.
    InvalidPrice(String),
    /// Submitted price equals the currently listed price (no-op guard).
    UnchangedPrice,
    /// RPC call or transaction submission failure.
    Rpc(String),
    /// Transaction vanished from the mempool before reaching its
    /// confirmation depth.
    Dropped,
    /// Indexing API failure.
    Indexer(String),
    /// Pinning service failure.
    Pinning(String),
    /// Configuration error.
    Config(String),
    /// A mint confirmed but emitted no parseable mint event. This is a
    /// contract-level revert path that must not be treated as success.
    MissingMintEvent,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ProviderUnavailable => write!(f, "no wallet provider available"),
            Error::NoAccountGranted => write!(f, "wallet granted no accounts"),
            Error::Busy(workflow) => write!(f, "{workflow} already in flight"),
            Error::Precondition(msg) => write!(f, "precondition failed: {msg}"),
            Error::Address(msg) => write!(f, "invalid address: {msg}"),
            Error::InvalidPrice(msg) => write!(f, "invalid price: {msg}"),
            Error::UnchangedPrice => write!(f, "price equals the current listing"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Dropped => write!(f, "transaction dropped before confirmation"),
            Error::Indexer(msg) => write!(f, "indexer error: {msg}"),
            Error::Pinning(msg) => write!(f, "pinning error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::MissingMintEvent => write!(f, "mint confirmed without a mint event"),
        }
    }
}

impl std::error::Error for Error {}
