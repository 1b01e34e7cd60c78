//! Randomized wallet actions
//!
//! Each module reads wallet state through the chain client, walks its
//! decision tree and submits one entry function. The returned hash is
//! confirmed by the session runner.

pub mod nft;
pub mod stake;
pub mod swap;

use async_trait::async_trait;
use std::sync::Arc;

use crate::amount::{native_token, token_list, Token};
use crate::chain::{ChainClient, EntryFunction, TxOutcome, WalletKey};
use crate::config::AppConfig;
use crate::dice::Dice;
use crate::error::ActionError;
use crate::intent::ActionKind;
use crate::marketplace::NftMarketplace;
use crate::price::{reference_price, PriceFeed, NATIVE_COINGECKO_ID};

pub use nft::NftModule;
pub use stake::StakeModule;
pub use swap::SwapModule;

/// Runs one action of the requested kind and returns the submitted hash
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, kind: ActionKind, dice: &mut Dice) -> Result<String, ActionError>;
}

/// All action modules bound to one wallet
pub struct WalletActions {
    swap: SwapModule,
    stake: StakeModule,
    nft: NftModule,
    price: Arc<dyn PriceFeed>,
    native: Token,
}

impl WalletActions {
    pub fn new(
        config: &AppConfig,
        chain: Arc<dyn ChainClient>,
        market: Arc<dyn NftMarketplace>,
        price: Arc<dyn PriceFeed>,
        wallet: Arc<WalletKey>,
    ) -> Self {
        let native = native_token();
        Self {
            swap: SwapModule::new(
                chain.clone(),
                wallet.clone(),
                token_list(),
                config.thresholds.dust_threshold_usd,
                config.swap_venues.clone(),
            ),
            stake: StakeModule::new(chain.clone(), wallet.clone()),
            nft: NftModule::new(chain, market, wallet, config.thresholds),
            price,
            native,
        }
    }
}

#[async_trait]
impl ActionExecutor for WalletActions {
    async fn execute(&self, kind: ActionKind, dice: &mut Dice) -> Result<String, ActionError> {
        match kind {
            ActionKind::Swap => self.swap.make_random_swap(dice).await,
            ActionKind::Stake => self.stake.make_random_stake_action(dice).await,
            ActionKind::Nft => {
                let price =
                    reference_price(self.price.as_ref(), NATIVE_COINGECKO_ID, &self.native).await;
                self.nft.make_random_nft_action(price, dice).await
            }
        }
    }
}

/// Submit a prerequisite transaction and wait for it.
///
/// Any failure, on-chain or not, is turned into an error by `on_failure`.
pub(crate) async fn submit_and_confirm(
    chain: &dyn ChainClient,
    wallet: &WalletKey,
    call: &EntryFunction,
    on_failure: impl FnOnce(String) -> ActionError,
) -> Result<String, ActionError> {
    let reason = match chain.submit(wallet, call).await {
        Ok(hash) => match chain.wait_for_transaction(&hash).await {
            Ok(TxOutcome::Success) => return Ok(hash),
            Ok(TxOutcome::Failure { vm_status }) => vm_status,
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };
    Err(on_failure(reason))
}
