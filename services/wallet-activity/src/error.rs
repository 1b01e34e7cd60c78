//! Error types for chain, marketplace and action failures

use thiserror::Error;

/// Errors from the chain client boundary
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Node API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Transaction {hash} not confirmed within {secs}s")]
    ConfirmationTimeout { hash: String, secs: u64 },
}

/// Errors from the marketplace HTTP boundary
#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("Connection timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("Marketplace API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Failed to make the request after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl MarketplaceError {
    /// Only timeouts are worth retrying
    pub fn is_timeout(&self) -> bool {
        matches!(self, MarketplaceError::Timeout(_))
    }
}

impl From<reqwest::Error> for MarketplaceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MarketplaceError::Timeout(err.to_string())
        } else {
            MarketplaceError::Http(err)
        }
    }
}

/// Failure to build or submit an action transaction.
///
/// The session runner reports every variant as "Error when creating a TX";
/// none of them stop the session.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error("No token with a balance above the dust threshold")]
    NoHoldableToken,

    #[error("No destination token available for {0}")]
    NoDestinationToken(String),

    #[error("Computed amount for {0} is zero")]
    ZeroAmount(String),

    #[error("Coin registration for {symbol} failed: {reason}")]
    RegistrationFailed { symbol: String, reason: String },

    #[error("No collection found within max price {max_price}")]
    NoEligibleCollection { max_price: u64 },

    #[error("Collection {0} is not on the marketplace")]
    UnknownCollection(String),

    #[error("Nothing to list")]
    NothingToList,

    #[error("Delisting {item} failed: {reason}")]
    DelistFailed { item: String, reason: String },
}

/// Errors from the USD price feed
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("Price request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Price not found for {0}")]
    NotFound(String),
}
