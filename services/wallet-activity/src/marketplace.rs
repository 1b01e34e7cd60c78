//! BlueMove marketplace API client
//!
//! Strapi-style REST: filters, sorting and pagination go in the query string.
//! Every request is retried while it keeps timing out.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ThresholdConfig;
use crate::error::MarketplaceError;

/// Upper price bound used by the cheapest-listing query
const MAX_LISTING_PRICE: &str = "10000000000000000";

/// Marketplace collection with its floor price (raw octas)
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub id: u64,
    pub name: String,
    pub floor_price: u64,
}

/// A token as the marketplace sees it
#[derive(Debug, Clone, PartialEq)]
pub struct NftItem {
    pub name: String,
    pub collection_name: String,
    pub creator: String,
    pub property_version: String,
    /// Listing price, 0 for items not on sale
    pub price: u64,
}

/// Read-only marketplace queries
#[async_trait]
pub trait NftMarketplace: Send + Sync {
    /// Recent collections across the configured pages
    async fn collections(&self) -> Result<Vec<Collection>, MarketplaceError>;

    /// Cheapest active listing in a collection
    async fn cheapest_item(&self, collection_id: u64) -> Result<Option<NftItem>, MarketplaceError>;

    /// Items the owner currently has listed for sale
    async fn listed_items(&self, owner: &str) -> Result<Vec<NftItem>, MarketplaceError>;
}

/// Run `op` until it returns something other than a timeout.
///
/// Non-timeout errors are returned immediately. After `max_attempts`
/// consecutive timeouts the call fails with `RetriesExhausted`.
pub async fn retry_on_timeout<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T, MarketplaceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketplaceError>>,
{
    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_timeout() => {
                warn!("Connection timed out, retrying ({}/{})", attempt, max_attempts);
            }
            Err(e) => return Err(e),
        }
    }
    Err(MarketplaceError::RetriesExhausted {
        attempts: max_attempts,
    })
}

/// BlueMove HTTP client
pub struct BlueMoveClient {
    client: Client,
    base_url: String,
    pages: u32,
    page_size: u32,
    max_retries: u32,
}

impl BlueMoveClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        thresholds: &ThresholdConfig,
    ) -> Result<Self, MarketplaceError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(MarketplaceError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pages: thresholds.collection_pages,
            page_size: thresholds.collection_page_size,
            max_retries: thresholds.max_retries,
        })
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketplaceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MarketplaceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| MarketplaceError::InvalidResponse(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketplaceError> {
        retry_on_timeout(self.max_retries, move || self.get_once(path, query)).await
    }
}

#[async_trait]
impl NftMarketplace for BlueMoveClient {
    async fn collections(&self) -> Result<Vec<Collection>, MarketplaceError> {
        let mut collections = Vec::new();
        for page in 1..=self.pages {
            let query = [
                ("filters[name][$containsi]", String::new()),
                ("sort[0]", "createdAt:DESC".to_string()),
                ("pagination[page]", page.to_string()),
                ("pagination[pageSize]", self.page_size.to_string()),
            ];
            let list: StrapiList<CollectionAttributes> = self.get("/collections", &query).await?;
            debug!("Collections page {}: {} entries", page, list.data.len());

            collections.extend(list.data.into_iter().map(|entry| Collection {
                id: entry.id,
                name: entry.attributes.name,
                floor_price: entry.attributes.floor_price,
            }));
        }
        Ok(collections)
    }

    async fn cheapest_item(&self, collection_id: u64) -> Result<Option<NftItem>, MarketplaceError> {
        let query = [
            ("filters[collection][id][$eq]", collection_id.to_string()),
            ("filters[$or][0][status][$eq]", "1".to_string()),
            ("filters[price][$gte]", "0".to_string()),
            ("filters[price][$lte]", MAX_LISTING_PRICE.to_string()),
            ("sort[0]", "price:asc".to_string()),
            ("pagination[page]", "1".to_string()),
            ("pagination[pageSize]", "24".to_string()),
        ];
        let list: StrapiList<MarketItemAttributes> = self.get("/market-items", &query).await?;
        Ok(list.data.into_iter().next().map(NftItem::from))
    }

    async fn listed_items(&self, owner: &str) -> Result<Vec<NftItem>, MarketplaceError> {
        let query = [
            ("filters[listed_address][$eq]", owner.to_string()),
            ("filters[status][$eq]", "1".to_string()),
            ("populate[collection][fields][0]", "name".to_string()),
            ("pagination[page]", "1".to_string()),
            ("pagination[pageSize]", "10000".to_string()),
        ];
        let list: StrapiList<MarketItemAttributes> = self.get("/market-items", &query).await?;
        Ok(list.data.into_iter().map(NftItem::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct StrapiList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<StrapiEntry<T>>,
}

#[derive(Debug, Deserialize)]
struct StrapiEntry<T> {
    id: u64,
    attributes: T,
}

#[derive(Debug, Deserialize)]
struct CollectionAttributes {
    name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    floor_price: u64,
}

#[derive(Debug, Deserialize)]
struct MarketItemAttributes {
    name: String,
    collection_name: String,
    creator: String,
    #[serde(default = "zero_version", deserialize_with = "lenient_string")]
    property_version: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    price: u64,
}

impl From<StrapiEntry<MarketItemAttributes>> for NftItem {
    fn from(entry: StrapiEntry<MarketItemAttributes>) -> Self {
        let a = entry.attributes;
        NftItem {
            name: a.name,
            collection_name: a.collection_name,
            creator: a.creator,
            property_version: a.property_version,
            price: a.price,
        }
    }
}

fn zero_version() -> String {
    "0".to_string()
}

/// Prices arrive as numbers, numeric strings or null
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Value::String(s) => s
            .parse::<u64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        _ => 0,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => zero_version(),
        other => other.to_string(),
    })
}
