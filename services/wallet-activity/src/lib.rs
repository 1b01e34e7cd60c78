//! Wallet Activity Library
//!
//! Randomized swap, liquid staking and NFT marketplace activity for a set of
//! Aptos wallets, one independent session per wallet.

pub mod actions;
pub mod amount;
pub mod chain;
pub mod config;
pub mod dice;
pub mod error;
pub mod intent;
pub mod keys;
pub mod marketplace;
pub mod price;
pub mod session;
pub mod status;

// Re-export main types for convenience
pub use actions::{ActionExecutor, WalletActions};
pub use amount::{from_raw_amount, native_token, to_raw_amount, token_list, Token};
pub use chain::{AptosRestClient, ChainClient, EntryFunction, OwnedToken, TxOutcome, WalletKey};
pub use config::{AppConfig, ExecutionConfig, SwapVenue, ThresholdConfig, TxTypeChoice};
pub use dice::Dice;
pub use error::{ActionError, ChainError, MarketplaceError, PriceError};
pub use intent::{ActionKind, ResultLabel, TxIntent, TxIntentState};
pub use keys::{load_keys, verify_wallets, KeyEntry, KeyFileError};
pub use marketplace::{BlueMoveClient, Collection, NftItem, NftMarketplace};
pub use price::{CoinGeckoFeed, PriceFeed, StaticPrice};
pub use session::{SessionPlan, WalletSession};
pub use status::{StatusBoard, StatusSlot, WalletOutputData};
