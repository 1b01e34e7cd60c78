//! Wallet session runner
//!
//! A session draws its transaction count and delays up front, then runs one
//! random action per delay and reports every step to its status slot.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::actions::ActionExecutor;
use crate::chain::{ChainClient, TxOutcome};
use crate::config::{AppConfig, TxTypeChoice};
use crate::dice::Dice;
use crate::intent::{ActionKind, TxIntent};
use crate::status::StatusSlot;

/// Minutes with two decimals
pub fn minutes(duration: Duration) -> f64 {
    (duration.as_secs_f64() / 60.0 * 100.0).round() / 100.0
}

/// Pre-drawn delays; one transaction follows each delay
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub delays: Vec<Duration>,
}

impl SessionPlan {
    /// Draw N in [min_tx, max_tx] delays in [min_delay, max_delay] seconds.
    ///
    /// The first delay is scaled by the wallet index to stagger start-up.
    pub fn draw(
        dice: &mut Dice,
        min_tx: u64,
        max_tx: u64,
        min_delay_secs: u64,
        max_delay_secs: u64,
        wallet_index: usize,
    ) -> Self {
        let total = dice.between(min_tx, max_tx);
        let mut delays: Vec<Duration> = (0..total)
            .map(|_| Duration::from_secs(dice.between(min_delay_secs, max_delay_secs)))
            .collect();
        if let Some(first) = delays.first_mut() {
            let factor = u32::try_from(wallet_index).unwrap_or(u32::MAX);
            *first = first.saturating_mul(factor);
        }
        Self { delays }
    }

    pub fn total(&self) -> u64 {
        self.delays.len() as u64
    }

    pub fn duration(&self) -> Duration {
        self.delays
            .iter()
            .fold(Duration::ZERO, |total, delay| total.saturating_add(*delay))
    }

    pub fn duration_minutes(&self) -> f64 {
        minutes(self.duration())
    }
}

/// Fixed choice, or uniform over swap, stake and (when enabled) NFT
pub fn choose_action(choice: TxTypeChoice, nft_enabled: bool, dice: &mut Dice) -> ActionKind {
    match choice {
        TxTypeChoice::Swap => ActionKind::Swap,
        TxTypeChoice::Stake => ActionKind::Stake,
        TxTypeChoice::Nft => ActionKind::Nft,
        TxTypeChoice::Random => {
            let mut kinds = vec![ActionKind::Swap, ActionKind::Stake];
            if nft_enabled {
                kinds.push(ActionKind::Nft);
            }
            dice.pick(&kinds).copied().unwrap_or(ActionKind::Swap)
        }
    }
}

/// One wallet's activity session
pub struct WalletSession {
    index: usize,
    plan: SessionPlan,
    actions: Arc<dyn ActionExecutor>,
    chain: Arc<dyn ChainClient>,
    slot: StatusSlot,
    dice: Dice,
    tx_type: TxTypeChoice,
    nft_enabled: bool,
}

impl WalletSession {
    pub fn new(
        index: usize,
        config: &AppConfig,
        actions: Arc<dyn ActionExecutor>,
        chain: Arc<dyn ChainClient>,
        slot: StatusSlot,
    ) -> Self {
        let mut dice = Dice::for_wallet(config.seed, index);
        let plan = SessionPlan::draw(
            &mut dice,
            config.min_tx,
            config.max_tx,
            config.min_delay_secs,
            config.max_delay_secs,
            index,
        );

        Self {
            index,
            plan,
            actions,
            chain,
            slot,
            dice,
            tx_type: config.tx_type,
            nft_enabled: config.nft_enabled,
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Run every planned step, then mark the wallet complete.
    ///
    /// Step failures are recorded and never end the session early.
    pub async fn run(mut self) -> Vec<TxIntent> {
        let total = self.plan.total();
        self.slot.set_plan(total, self.plan.duration_minutes());
        info!(
            "Wallet {}: {} transactions over {:.2} min",
            self.index + 1,
            total,
            self.plan.duration_minutes()
        );

        let delays = self.plan.delays.clone();
        let mut history = Vec::with_capacity(delays.len());
        for (step, delay) in delays.into_iter().enumerate() {
            self.slot.set_until_next(minutes(delay));
            tokio::time::sleep(delay).await;

            let kind = choose_action(self.tx_type, self.nft_enabled, &mut self.dice);
            self.slot.set_current(kind.label());

            let intent = self.run_step(kind).await;
            if let Some(label) = intent.label() {
                self.slot.set_result(label);
            }
            self.slot.set_progress(step as u64 + 1);
            history.push(intent);
        }

        self.slot.mark_complete();
        info!("Wallet {}: session complete", self.index + 1);
        history
    }

    async fn run_step(&mut self, kind: ActionKind) -> TxIntent {
        let mut intent = TxIntent::new(self.index, kind);

        match self.actions.execute(kind, &mut self.dice).await {
            Ok(hash) => {
                intent.submitted(hash.clone());
                match self.chain.wait_for_transaction(&hash).await {
                    Ok(outcome) => {
                        if let TxOutcome::Failure { vm_status } = &outcome {
                            warn!("Wallet {}: tx {} failed: {}", self.index + 1, hash, vm_status);
                        }
                        intent.finalize(outcome);
                    }
                    Err(e) => {
                        warn!("Wallet {}: could not confirm {}: {}", self.index + 1, hash, e);
                        intent.unconfirmed(e.to_string());
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Wallet {}: error when creating {} tx: {}",
                    self.index + 1,
                    kind.label(),
                    e
                );
                intent.construction_error(e.to_string());
            }
        }

        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_bounds() {
        let mut dice = Dice::seeded(21);
        for _ in 0..100 {
            let plan = SessionPlan::draw(&mut dice, 4, 7, 120, 300, 1);
            assert!((4..=7).contains(&plan.total()));
            for delay in &plan.delays {
                assert!((120..=300).contains(&delay.as_secs()));
            }
        }
    }

    #[test]
    fn test_first_delay_scaled_by_index() {
        let first_wallet = SessionPlan::draw(&mut Dice::seeded(8), 2, 2, 60, 60, 0);
        assert_eq!(first_wallet.delays[0], Duration::ZERO);
        assert_eq!(first_wallet.delays[1], Duration::from_secs(60));

        let third_wallet = SessionPlan::draw(&mut Dice::seeded(8), 2, 2, 60, 60, 2);
        assert_eq!(third_wallet.delays[0], Duration::from_secs(120));
        assert_eq!(third_wallet.delays[1], Duration::from_secs(60));
        assert_eq!(third_wallet.duration_minutes(), 3.0);
    }

    #[test]
    fn test_huge_delays_saturate() {
        let huge = u64::MAX / 2;
        let plan = SessionPlan::draw(&mut Dice::seeded(3), 2, 2, huge, huge, 3);
        assert_eq!(plan.delays[0], Duration::MAX);
        assert_eq!(plan.duration(), Duration::MAX);
    }

    #[test]
    fn test_minutes_rounding() {
        assert_eq!(minutes(Duration::from_secs(200)), 3.33);
        assert_eq!(minutes(Duration::from_secs(90)), 1.5);
        assert_eq!(minutes(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_choose_action() {
        let mut dice = Dice::seeded(17);
        assert_eq!(choose_action(TxTypeChoice::Stake, false, &mut dice), ActionKind::Stake);
        assert_eq!(choose_action(TxTypeChoice::Nft, false, &mut dice), ActionKind::Nft);

        let without_nft: Vec<ActionKind> = (0..200)
            .map(|_| choose_action(TxTypeChoice::Random, false, &mut dice))
            .collect();
        assert!(!without_nft.contains(&ActionKind::Nft));
        assert!(without_nft.contains(&ActionKind::Swap));
        assert!(without_nft.contains(&ActionKind::Stake));

        let with_nft: Vec<ActionKind> = (0..200)
            .map(|_| choose_action(TxTypeChoice::Random, true, &mut dice))
            .collect();
        assert!(with_nft.contains(&ActionKind::Nft));
    }
}
