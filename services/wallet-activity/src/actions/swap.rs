//! Random DEX swaps between the listed tokens

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use super::submit_and_confirm;
use crate::amount::{from_raw_amount, percent_of, Token};
use crate::chain::{ChainClient, EntryFunction, WalletKey};
use crate::config::SwapVenue;
use crate::dice::Dice;
use crate::error::ActionError;

const LIQUIDSWAP: &str = "0x190d44266241744264b964a37b8f09863167a12d3e70cda39376cfb4e3561e12";
const PANCAKESWAP: &str = "0xc7efb4076dbe143cbcd98cfaaa929ecfc8f299203dfff63b95ccb6bfe19850fa";

const MIN_SWAP_PCT: u64 = 10;
/// Keeps gas money when swapping the native token away
const NATIVE_MAX_SWAP_PCT: u64 = 70;

/// Tokens whose balance is worth more than the dust threshold
pub fn holdable_tokens<'a>(
    tokens: &'a [Token],
    balances: &[u64],
    dust_threshold_usd: Decimal,
) -> Vec<&'a Token> {
    tokens
        .iter()
        .zip(balances)
        .filter(|(token, balance)| token.usd_value(**balance) > dust_threshold_usd)
        .map(|(token, _)| token)
        .collect()
}

/// Every token except the source
pub fn destination_candidates<'a>(tokens: &'a [Token], source: &Token) -> Vec<&'a Token> {
    tokens
        .iter()
        .filter(|token| token.address != source.address)
        .collect()
}

/// Uniform in [10%, 70%] of the balance for the native token, [10%, 100%] otherwise
pub fn swap_amount(dice: &mut Dice, balance: u64, is_native: bool) -> u64 {
    let max_pct = if is_native { NATIVE_MAX_SWAP_PCT } else { 100 };
    dice.between(percent_of(balance, MIN_SWAP_PCT), percent_of(balance, max_pct))
}

pub fn register_payload(coin: &Token) -> EntryFunction {
    EntryFunction::new("0x1::managed_coin::register").type_arg(&coin.address)
}

/// Exact-input swap with no minimum output
pub fn swap_payload(venue: SwapVenue, from: &Token, to: &Token, amount: u64) -> EntryFunction {
    let call = match venue {
        SwapVenue::LiquidSwap => {
            EntryFunction::new(format!("{}::scripts_v2::swap", LIQUIDSWAP))
                .type_arg(&from.address)
                .type_arg(&to.address)
                .type_arg(format!("{}::curves::Uncorrelated", LIQUIDSWAP))
        }
        SwapVenue::PancakeSwap => {
            EntryFunction::new(format!("{}::router::swap_exact_input", PANCAKESWAP))
                .type_arg(&from.address)
                .type_arg(&to.address)
        }
    };
    call.arg(amount.to_string()).arg("0")
}

/// Swap module bound to one wallet
pub struct SwapModule {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<WalletKey>,
    tokens: Vec<Token>,
    dust_threshold_usd: Decimal,
    venues: Vec<SwapVenue>,
}

impl SwapModule {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        wallet: Arc<WalletKey>,
        tokens: Vec<Token>,
        dust_threshold_usd: Decimal,
        venues: Vec<SwapVenue>,
    ) -> Self {
        Self {
            chain,
            wallet,
            tokens,
            dust_threshold_usd,
            venues,
        }
    }

    async fn balance(&self, token: &Token) -> Result<u64, ActionError> {
        Ok(self
            .chain
            .coin_balance(self.wallet.address(), &token.address)
            .await?)
    }

    /// Swap a random share of a random holdable token into another token
    pub async fn make_random_swap(&self, dice: &mut Dice) -> Result<String, ActionError> {
        let mut balances = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            balances.push(self.balance(token).await?);
        }

        let holdable = holdable_tokens(&self.tokens, &balances, self.dust_threshold_usd);
        let source = *dice.pick(&holdable).ok_or(ActionError::NoHoldableToken)?;

        let destinations = destination_candidates(&self.tokens, source);
        let destination = *dice
            .pick(&destinations)
            .ok_or_else(|| ActionError::NoDestinationToken(source.symbol.clone()))?;

        let is_native = self
            .tokens
            .first()
            .map_or(false, |native| native.address == source.address);
        let balance = self.balance(source).await?;
        let amount = swap_amount(dice, balance, is_native);
        if amount == 0 {
            return Err(ActionError::ZeroAmount(source.symbol.clone()));
        }

        let owner = self.wallet.address();
        if !self
            .chain
            .is_coin_registered(owner, &destination.address)
            .await?
        {
            debug!("Registering {} for {}", destination.symbol, owner);
            submit_and_confirm(
                self.chain.as_ref(),
                &self.wallet,
                &register_payload(destination),
                |reason| ActionError::RegistrationFailed {
                    symbol: destination.symbol.clone(),
                    reason,
                },
            )
            .await?;
        }

        let venue = dice.pick(&self.venues).copied().unwrap_or(SwapVenue::LiquidSwap);
        let call = swap_payload(venue, source, destination, amount);
        let hash = self.chain.submit(&self.wallet, &call).await?;

        info!(
            "Swap {} {} -> {} via {:?} from {}: {}",
            from_raw_amount(amount, source.decimals),
            source.symbol,
            destination.symbol,
            venue,
            owner,
            hash
        );
        Ok(hash)
    }
}
