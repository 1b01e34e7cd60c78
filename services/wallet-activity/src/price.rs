//! USD reference price for the native token

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::amount::Token;
use crate::error::PriceError;

/// CoinGecko id of the native token
pub const NATIVE_COINGECKO_ID: &str = "aptos";

#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn usd_price(&self, coin_id: &str) -> Result<Decimal, PriceError>;
}

/// Live price, or the token's static estimate when the feed fails
pub async fn reference_price(feed: &dyn PriceFeed, coin_id: &str, token: &Token) -> Decimal {
    match feed.usd_price(coin_id).await {
        Ok(price) if price > Decimal::ZERO => price,
        Ok(price) => {
            warn!("Ignoring non-positive {} price {}", coin_id, price);
            token.estimated_price_usd
        }
        Err(e) => {
            warn!(
                "Price feed failed for {}, using estimate {}: {}",
                coin_id, token.estimated_price_usd, e
            );
            token.estimated_price_usd
        }
    }
}

/// CoinGecko simple price endpoint
pub struct CoinGeckoFeed {
    client: Client,
    base_url: String,
}

impl CoinGeckoFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PriceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Decimal,
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn usd_price(&self, coin_id: &str) -> Result<Decimal, PriceError> {
        let url = format!("{}/simple/price", self.base_url);
        let response: HashMap<String, SimplePriceEntry> = self
            .client
            .get(&url)
            .query(&[("ids", coin_id), ("vs_currencies", "usd")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let price = response
            .get(coin_id)
            .map(|entry| entry.usd)
            .ok_or_else(|| PriceError::NotFound(coin_id.to_string()))?;
        debug!("{} price: ${}", coin_id, price);
        Ok(price)
    }
}

/// Fixed price, for offline runs and tests
pub struct StaticPrice(pub Decimal);

#[async_trait]
impl PriceFeed for StaticPrice {
    async fn usd_price(&self, _coin_id: &str) -> Result<Decimal, PriceError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::native_token;

    struct FailingFeed;

    #[async_trait]
    impl PriceFeed for FailingFeed {
        async fn usd_price(&self, coin_id: &str) -> Result<Decimal, PriceError> {
            Err(PriceError::NotFound(coin_id.to_string()))
        }
    }

    #[tokio::test]
    async fn test_reference_price_fallback() {
        let apt = native_token();
        let price = reference_price(&FailingFeed, NATIVE_COINGECKO_ID, &apt).await;
        assert_eq!(price, apt.estimated_price_usd);

        let zero = reference_price(&StaticPrice(Decimal::ZERO), NATIVE_COINGECKO_ID, &apt).await;
        assert_eq!(zero, apt.estimated_price_usd);

        let live = reference_price(&StaticPrice(Decimal::new(875, 2)), NATIVE_COINGECKO_ID, &apt).await;
        assert_eq!(live, Decimal::new(875, 2));
    }
}
