//! Runner Configuration
//!
//! Layered from built-in defaults, an optional TOML file and `ACTIVITY_*`
//! environment variables (nested keys use `__`, e.g. `ACTIVITY_EXECUTION__MAX_GAS_AMOUNT`).

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Env var holding the config file path
pub const CONFIG_PATH_ENV: &str = "ACTIVITY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "activity.toml";
/// Longest allowed delay between two transactions (one day)
pub const MAX_DELAY_SECS: u64 = 86_400;

/// Top level runner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_min_tx")]
    pub min_tx: u64,
    #[serde(default = "default_max_tx")]
    pub max_tx: u64,
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_indexer_url")]
    pub indexer_url: String,
    #[serde(default = "default_marketplace_url")]
    pub marketplace_url: String,
    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,
    #[serde(default = "default_keys_file")]
    pub keys_file: String,
    #[serde(default)]
    pub tx_type: TxTypeChoice,
    /// NFT actions join the random rotation only when enabled
    #[serde(default)]
    pub nft_enabled: bool,
    /// Fixed seed for reproducible sessions
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Empty means stderr
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_swap_venues")]
    pub swap_venues: Vec<SwapVenue>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl AppConfig {
    /// Load from the path in `ACTIVITY_CONFIG` (or `activity.toml`) plus env
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load from an explicit file path. A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ACTIVITY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: AppConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_tx == 0 || self.min_tx > self.max_tx {
            return Err(ConfigError::Message(format!(
                "invalid tx range: min_tx={} max_tx={}",
                self.min_tx, self.max_tx
            )));
        }
        if self.min_delay_secs > self.max_delay_secs {
            return Err(ConfigError::Message(format!(
                "invalid delay range: min_delay_secs={} max_delay_secs={}",
                self.min_delay_secs, self.max_delay_secs
            )));
        }
        if self.max_delay_secs > MAX_DELAY_SECS {
            return Err(ConfigError::Message(format!(
                "max_delay_secs must be at most {}, got {}",
                MAX_DELAY_SECS, self.max_delay_secs
            )));
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::Message("refresh_interval_ms must be at least 1".into()));
        }
        if self.execution.request_timeout_secs == 0 {
            return Err(ConfigError::Message("request_timeout_secs must be at least 1".into()));
        }
        if self.swap_venues.is_empty() {
            return Err(ConfigError::Message("swap_venues must not be empty".into()));
        }
        if self.thresholds.relist_price_pct == 0 || self.thresholds.relist_price_pct > 100 {
            return Err(ConfigError::Message(format!(
                "relist_price_pct must be in 1..=100, got {}",
                self.thresholds.relist_price_pct
            )));
        }
        if self.thresholds.max_retries == 0 {
            return Err(ConfigError::Message("max_retries must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            min_tx: default_min_tx(),
            max_tx: default_max_tx(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            rpc_url: default_rpc_url(),
            indexer_url: default_indexer_url(),
            marketplace_url: default_marketplace_url(),
            price_api_url: default_price_api_url(),
            keys_file: default_keys_file(),
            tx_type: TxTypeChoice::default(),
            nft_enabled: false,
            seed: None,
            refresh_interval_ms: default_refresh_interval_ms(),
            log_file: default_log_file(),
            swap_venues: default_swap_venues(),
            execution: ExecutionConfig::default(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

fn default_min_tx() -> u64 { 4 }
fn default_max_tx() -> u64 { 7 }
fn default_min_delay_secs() -> u64 { 120 }
fn default_max_delay_secs() -> u64 { 300 }
fn default_rpc_url() -> String { "https://fullnode.mainnet.aptoslabs.com/v1".to_string() }
fn default_indexer_url() -> String { "https://api.mainnet.aptoslabs.com/v1/graphql".to_string() }
fn default_marketplace_url() -> String { "https://aptos-mainnet-api.bluemove.net/api".to_string() }
fn default_price_api_url() -> String { "https://api.coingecko.com/api/v3".to_string() }
fn default_keys_file() -> String { "privates.txt".to_string() }
fn default_refresh_interval_ms() -> u64 { 500 }
fn default_log_file() -> String { "activity.log".to_string() }
fn default_swap_venues() -> Vec<SwapVenue> { vec![SwapVenue::LiquidSwap] }

/// Which action a session performs at each step
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TxTypeChoice {
    Swap,
    Stake,
    Nft,
    #[default]
    Random,
}

/// DEX used for swaps
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwapVenue {
    LiquidSwap,
    PancakeSwap,
}

/// Transaction building and confirmation settings
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ExecutionConfig {
    /// Upper bound for max gas; the balance-derived bound may be lower
    #[serde(default = "default_max_gas_amount")]
    pub max_gas_amount: u64,
    /// Transaction expiry relative to build time
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: i64,
    /// Confirmation timeout in seconds
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    #[serde(default = "default_confirm_poll_ms")]
    pub confirm_poll_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_gas_amount: default_max_gas_amount(),
            expiration_secs: default_expiration_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            confirm_poll_ms: default_confirm_poll_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_max_gas_amount() -> u64 { 200_000 }
fn default_expiration_secs() -> i64 { 3600 }
fn default_confirm_timeout_secs() -> u64 { 60 }
fn default_confirm_poll_ms() -> u64 { 1000 }
fn default_request_timeout_secs() -> u64 { 30 }

/// NFT buy cap: a USD amount for funded wallets, a balance percentage otherwise
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct BuyCap {
    pub usd: Decimal,
    pub pct: u64,
}

/// Buy caps per (held, listed) bucket
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct BuyCaps {
    /// Nothing held, nothing listed
    #[serde(default = "default_cap_empty")]
    pub empty: BuyCap,
    /// Nothing held, one or two listed
    #[serde(default = "default_cap_few_listed")]
    pub few_listed: BuyCap,
    /// One or two held, nothing listed
    #[serde(default = "default_cap_few_held")]
    pub few_held: BuyCap,
}

impl Default for BuyCaps {
    fn default() -> Self {
        Self {
            empty: default_cap_empty(),
            few_listed: default_cap_few_listed(),
            few_held: default_cap_few_held(),
        }
    }
}

fn default_cap_empty() -> BuyCap { BuyCap { usd: Decimal::new(200, 2), pct: 30 } }
fn default_cap_few_listed() -> BuyCap { BuyCap { usd: Decimal::new(70, 2), pct: 15 } }
fn default_cap_few_held() -> BuyCap { BuyCap { usd: Decimal::new(60, 2), pct: 12 } }

/// Decision thresholds for the action modules
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ThresholdConfig {
    /// Balances worth less than this are not swapped
    #[serde(default = "default_dust_threshold_usd")]
    pub dust_threshold_usd: Decimal,
    /// Native balance (raw) above which NFT caps are USD based
    #[serde(default = "default_buy_balance_threshold")]
    pub buy_balance_threshold: u64,
    #[serde(default)]
    pub buy_caps: BuyCaps,
    /// Listing price as a percentage of the collection floor
    #[serde(default = "default_relist_price_pct")]
    pub relist_price_pct: u64,
    /// Floor used when a collection has no active listing
    #[serde(default = "default_sell_price")]
    pub default_sell_price: u64,
    #[serde(default = "default_collection_pages")]
    pub collection_pages: u32,
    #[serde(default = "default_collection_page_size")]
    pub collection_page_size: u32,
    /// Attempts per marketplace request when it keeps timing out
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            dust_threshold_usd: default_dust_threshold_usd(),
            buy_balance_threshold: default_buy_balance_threshold(),
            buy_caps: BuyCaps::default(),
            relist_price_pct: default_relist_price_pct(),
            default_sell_price: default_sell_price(),
            collection_pages: default_collection_pages(),
            collection_page_size: default_collection_page_size(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_dust_threshold_usd() -> Decimal { Decimal::new(10, 2) }
fn default_buy_balance_threshold() -> u64 { 150_000_000 }
fn default_relist_price_pct() -> u64 { 95 }
fn default_sell_price() -> u64 { 10_000_000 }
fn default_collection_pages() -> u32 { 3 }
fn default_collection_page_size() -> u32 { 100 }
fn default_max_retries() -> u32 { 10 }
