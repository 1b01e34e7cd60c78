//! NFT marketplace actions: buy, list, relist
//!
//! What to do is decided from how many marketplace NFTs the wallet holds and
//! how many it already has listed.

use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::submit_and_confirm;
use crate::amount::{from_raw_amount, percent_of, to_raw_amount, APT_COIN};
use crate::chain::{ChainClient, EntryFunction, WalletKey};
use crate::config::{BuyCap, BuyCaps, ThresholdConfig};
use crate::dice::Dice;
use crate::error::ActionError;
use crate::marketplace::{Collection, NftItem, NftMarketplace};

const BLUEMOVE: &str = "0xd1fd99c1944b84d1670a2536417e997864ad12303d19eac725891691b04d614e";
const NATIVE_DECIMALS: u8 = 8;

/// Count bucket used by the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Empty,
    Few,
    Many,
}

impl Bucket {
    pub fn of(count: usize) -> Self {
        match count {
            0 => Bucket::Empty,
            1 | 2 => Bucket::Few,
            _ => Bucket::Many,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NftDecision {
    Buy(BuyCap),
    List,
    Relist,
}

/// Decision table keyed by (held, listed) buckets
pub fn decide(held: usize, listed: usize, caps: &BuyCaps, dice: &mut Dice) -> NftDecision {
    use Bucket::*;

    match (Bucket::of(held), Bucket::of(listed)) {
        (Empty, Empty) => NftDecision::Buy(caps.empty),
        (Empty, Few) => {
            if dice.flip() {
                NftDecision::Buy(caps.few_listed)
            } else {
                NftDecision::Relist
            }
        }
        (Empty, Many) => NftDecision::Relist,
        (Few, Empty) => {
            if dice.flip() {
                NftDecision::Buy(caps.few_held)
            } else {
                NftDecision::List
            }
        }
        (Many, Empty) => NftDecision::List,
        _ => {
            if dice.flip() {
                NftDecision::List
            } else {
                NftDecision::Relist
            }
        }
    }
}

/// Max buy price in raw octas.
///
/// Funded wallets spend a fixed USD amount, others a share of the balance.
pub fn buy_cap(balance: u64, reference_price: Decimal, cap: BuyCap, balance_threshold: u64) -> u64 {
    if balance > balance_threshold && reference_price > Decimal::ZERO {
        to_raw_amount(cap.usd / reference_price, NATIVE_DECIMALS).unwrap_or(0)
    } else {
        percent_of(balance, cap.pct)
    }
}

/// A listing is acceptable when it sits at the floor or under the cap
pub fn acceptable_listing(collection: &Collection, item: &NftItem, max_price: u64) -> bool {
    item.price == collection.floor_price || item.price <= max_price
}

fn token_args(item: &NftItem) -> [serde_json::Value; 3] {
    [
        json!([item.creator]),
        json!([item.collection_name]),
        json!([item.name]),
    ]
}

pub fn buy_payload(item: &NftItem) -> EntryFunction {
    let [creators, collections, names] = token_args(item);
    EntryFunction::new(format!("{}::marketplaceV2::batch_buy_script", BLUEMOVE))
        .arg(creators)
        .arg(collections)
        .arg(names)
        .arg(json!([item.property_version]))
}

pub fn list_payload(item: &NftItem, price: u64) -> EntryFunction {
    let [creators, collections, names] = token_args(item);
    EntryFunction::new(format!("{}::marketplaceV2::batch_list_script", BLUEMOVE))
        .arg(creators)
        .arg(collections)
        .arg(names)
        .arg(json!([price.to_string()]))
        .arg(json!([item.property_version]))
}

pub fn delist_payload(item: &NftItem) -> EntryFunction {
    let [creators, collections, names] = token_args(item);
    EntryFunction::new(format!("{}::marketplaceV2::batch_delist_script", BLUEMOVE))
        .arg(creators)
        .arg(collections)
        .arg(names)
        .arg(json!([item.property_version]))
}

/// NFT module bound to one wallet
pub struct NftModule {
    chain: Arc<dyn ChainClient>,
    market: Arc<dyn NftMarketplace>,
    wallet: Arc<WalletKey>,
    thresholds: ThresholdConfig,
}

impl NftModule {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        market: Arc<dyn NftMarketplace>,
        wallet: Arc<WalletKey>,
        thresholds: ThresholdConfig,
    ) -> Self {
        Self {
            chain,
            market,
            wallet,
            thresholds,
        }
    }

    /// Buy, list or relist one NFT. `reference_price` is the APT/USD price.
    pub async fn make_random_nft_action(
        &self,
        reference_price: Decimal,
        dice: &mut Dice,
    ) -> Result<String, ActionError> {
        let owner = self.wallet.address();
        let balance = self.chain.coin_balance(owner, APT_COIN).await?;
        let collections = self.market.collections().await?;
        let held = self.held_items(&collections).await?;
        let listed = self.market.listed_items(owner).await?;

        let decision = decide(held.len(), listed.len(), &self.thresholds.buy_caps, dice);
        debug!(
            "{}: {} held, {} listed, balance {} -> {:?}",
            owner,
            held.len(),
            listed.len(),
            balance,
            decision
        );

        match decision {
            NftDecision::Buy(cap) => {
                let max_price = buy_cap(
                    balance,
                    reference_price,
                    cap,
                    self.thresholds.buy_balance_threshold,
                );
                self.buy(max_price, collections, dice).await
            }
            NftDecision::List => {
                let item = dice.pick(&held).ok_or(ActionError::NothingToList)?;
                self.list(item, &collections).await
            }
            NftDecision::Relist => {
                let item = dice.pick(&listed).ok_or(ActionError::NothingToList)?;
                self.relist(item, &collections).await
            }
        }
    }

    /// Owned tokens that belong to a marketplace collection
    async fn held_items(&self, collections: &[Collection]) -> Result<Vec<NftItem>, ActionError> {
        let tokens = self.chain.account_tokens(self.wallet.address()).await?;
        Ok(tokens
            .into_iter()
            .filter(|token| collections.iter().any(|c| c.name == token.collection_name))
            .map(|token| NftItem {
                name: token.name,
                collection_name: token.collection_name,
                creator: token.creator,
                property_version: token.property_version,
                price: 0,
            })
            .collect())
    }

    /// First collection (random order) with an acceptable cheapest listing
    async fn find_listing(
        &self,
        max_price: u64,
        mut collections: Vec<Collection>,
        dice: &mut Dice,
    ) -> Result<Option<NftItem>, ActionError> {
        dice.shuffle(&mut collections);
        for collection in collections.iter().filter(|c| c.floor_price <= max_price) {
            if let Some(item) = self.market.cheapest_item(collection.id).await? {
                if acceptable_listing(collection, &item, max_price) {
                    return Ok(Some(item));
                }
            }
        }
        Ok(None)
    }

    async fn buy(
        &self,
        max_price: u64,
        collections: Vec<Collection>,
        dice: &mut Dice,
    ) -> Result<String, ActionError> {
        let item = self
            .find_listing(max_price, collections, dice)
            .await?
            .ok_or(ActionError::NoEligibleCollection { max_price })?;

        let hash = self.chain.submit(&self.wallet, &buy_payload(&item)).await?;
        info!(
            "Buy {} ({}) for {} APT from {}: {}",
            item.name,
            item.collection_name,
            from_raw_amount(item.price, NATIVE_DECIMALS),
            self.wallet.address(),
            hash
        );
        Ok(hash)
    }

    /// Listing price from the collection's current cheapest listing
    async fn sell_price(
        &self,
        collection_name: &str,
        collections: &[Collection],
    ) -> Result<u64, ActionError> {
        let collection = collections
            .iter()
            .find(|c| c.name == collection_name)
            .ok_or_else(|| ActionError::UnknownCollection(collection_name.to_string()))?;

        let floor = match self.market.cheapest_item(collection.id).await? {
            Some(item) => item.price,
            None => self.thresholds.default_sell_price,
        };
        Ok(percent_of(floor, self.thresholds.relist_price_pct))
    }

    async fn list(&self, item: &NftItem, collections: &[Collection]) -> Result<String, ActionError> {
        let price = self.sell_price(&item.collection_name, collections).await?;
        let hash = self
            .chain
            .submit(&self.wallet, &list_payload(item, price))
            .await?;
        info!(
            "List {} ({}) at {} APT from {}: {}",
            item.name,
            item.collection_name,
            from_raw_amount(price, NATIVE_DECIMALS),
            self.wallet.address(),
            hash
        );
        Ok(hash)
    }

    /// Delist, wait for it, then list again at the current floor
    async fn relist(&self, item: &NftItem, collections: &[Collection]) -> Result<String, ActionError> {
        submit_and_confirm(
            self.chain.as_ref(),
            &self.wallet,
            &delist_payload(item),
            |reason| ActionError::DelistFailed {
                item: item.name.clone(),
                reason,
            },
        )
        .await?;
        debug!("Delisted {}, listing again", item.name);
        self.list(item, collections).await
    }
}
