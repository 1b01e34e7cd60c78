//! Liquid staking: stake APT or unstake a derivative (Ditto, Tortuga)

use std::sync::Arc;
use tracing::info;

use crate::amount::{from_raw_amount, percent_of, APT_COIN, DITTO_STAPT, TORTUGA_TAPT};
use crate::chain::{ChainClient, EntryFunction, WalletKey};
use crate::dice::Dice;
use crate::error::ActionError;

const DITTO: &str = "0xd11107bdf0d6d7040c6c0bfbdecb6545191fdf13e8d8d259952f53e1713f61b5";
const TORTUGA_ROUTER: &str = "0x8f396e4246b2ba87b51c0739ef5ea4f26515a98375308c31ac2ec1e42142a57f";
const TORTUGA_AMM: &str = "0xbd35135844473187163ca197ca93b2ab014370587bb0ed3befff9e902d6bb541";

const MIN_UNSTAKE_PCT: u64 = 60;
const MIN_STAKE_PCT: u64 = 20;
const MAX_STAKE_PCT: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeVenue {
    Ditto,
    Tortuga,
}

impl StakeVenue {
    /// Coin type of the liquid staking derivative
    pub fn derivative(&self) -> &'static str {
        match self {
            StakeVenue::Ditto => DITTO_STAPT,
            StakeVenue::Tortuga => TORTUGA_TAPT,
        }
    }

    pub fn stake_payload(&self, amount: u64) -> EntryFunction {
        let function = match self {
            StakeVenue::Ditto => format!("{}::ditto_staking::stake_aptos", DITTO),
            StakeVenue::Tortuga => format!("{}::stake_router::stake", TORTUGA_ROUTER),
        };
        EntryFunction::new(function).arg(amount.to_string())
    }

    /// Ditto unstakes instantly; Tortuga sells tAPT back through its AMM
    pub fn unstake_payload(&self, amount: u64) -> EntryFunction {
        match self {
            StakeVenue::Ditto => {
                EntryFunction::new(format!("{}::ditto_staking::instant_unstake", DITTO))
                    .arg(amount.to_string())
            }
            StakeVenue::Tortuga => EntryFunction::new(format!(
                "{}::amm::swap_exact_coin_for_coin_with_signer",
                TORTUGA_AMM
            ))
            .type_arg(TORTUGA_TAPT)
            .type_arg(APT_COIN)
            .arg(amount.to_string())
            .arg("0"),
        }
    }
}

/// Pick the unstake venue and a candidate amount in [60%, 100%] of its balance.
///
/// Both candidate amounts are drawn before the venue.
pub fn plan_unstake(dice: &mut Dice, ditto_balance: u64, tortuga_balance: u64) -> (StakeVenue, u64) {
    let ditto_amount = dice.between(percent_of(ditto_balance, MIN_UNSTAKE_PCT), ditto_balance);
    let tortuga_amount =
        dice.between(percent_of(tortuga_balance, MIN_UNSTAKE_PCT), tortuga_balance);

    if ditto_balance > 0 && tortuga_balance > 0 {
        if dice.flip() {
            (StakeVenue::Ditto, ditto_amount)
        } else {
            (StakeVenue::Tortuga, tortuga_amount)
        }
    } else if ditto_balance > 0 {
        (StakeVenue::Ditto, ditto_amount)
    } else {
        (StakeVenue::Tortuga, tortuga_amount)
    }
}

/// Uniform in [20%, 60%] of the native balance
pub fn stake_amount(dice: &mut Dice, native_balance: u64) -> u64 {
    dice.between(
        percent_of(native_balance, MIN_STAKE_PCT),
        percent_of(native_balance, MAX_STAKE_PCT),
    )
}

/// Staking module bound to one wallet
pub struct StakeModule {
    chain: Arc<dyn ChainClient>,
    wallet: Arc<WalletKey>,
}

impl StakeModule {
    pub fn new(chain: Arc<dyn ChainClient>, wallet: Arc<WalletKey>) -> Self {
        Self { chain, wallet }
    }

    async fn balance(&self, coin_type: &str) -> Result<u64, ActionError> {
        Ok(self.chain.coin_balance(self.wallet.address(), coin_type).await?)
    }

    /// Unstake when derivatives are held and the coin says so, otherwise stake
    pub async fn make_random_stake_action(&self, dice: &mut Dice) -> Result<String, ActionError> {
        let ditto_balance = self.balance(DITTO_STAPT).await?;
        let tortuga_balance = self.balance(TORTUGA_TAPT).await?;

        if ditto_balance.saturating_add(tortuga_balance) > 0 && dice.flip() {
            self.unstake(dice, ditto_balance, tortuga_balance).await
        } else {
            self.stake(dice).await
        }
    }

    async fn unstake(
        &self,
        dice: &mut Dice,
        ditto_balance: u64,
        tortuga_balance: u64,
    ) -> Result<String, ActionError> {
        let (venue, planned) = plan_unstake(dice, ditto_balance, tortuga_balance);

        // balance may have moved since the decision
        let fresh = self.balance(venue.derivative()).await?;
        let amount = planned.min(fresh);
        if amount == 0 {
            return Err(ActionError::ZeroAmount(venue.derivative().to_string()));
        }

        let hash = self
            .chain
            .submit(&self.wallet, &venue.unstake_payload(amount))
            .await?;
        info!(
            "Unstake {} via {:?} from {}: {}",
            from_raw_amount(amount, 8),
            venue,
            self.wallet.address(),
            hash
        );
        Ok(hash)
    }

    async fn stake(&self, dice: &mut Dice) -> Result<String, ActionError> {
        let native_balance = self.balance(APT_COIN).await?;
        let amount = stake_amount(dice, native_balance);
        let venue = if dice.flip() {
            StakeVenue::Ditto
        } else {
            StakeVenue::Tortuga
        };
        if amount == 0 {
            return Err(ActionError::ZeroAmount(APT_COIN.to_string()));
        }

        let hash = self
            .chain
            .submit(&self.wallet, &venue.stake_payload(amount))
            .await?;
        info!(
            "Stake {} APT via {:?} from {}: {}",
            from_raw_amount(amount, 8),
            venue,
            self.wallet.address(),
            hash
        );
        Ok(hash)
    }
}
