//! Wallet Activity - keeps a set of Aptos wallets organically active
//!
//! 1. Loads configuration and the private keys file
//! 2. Verifies every wallet exists and is funded
//! 3. Spawns one randomized activity session per wallet
//! 4. Draws the status table until every session completes

use anyhow::Context;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

use wallet_activity::{
    load_keys, status, verify_wallets, AppConfig, AptosRestClient, BlueMoveClient, ChainClient,
    CoinGeckoFeed, NftMarketplace, PriceFeed, StatusBoard, WalletActions, WalletSession,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.log_file)?;

    info!("Starting Wallet Activity...");
    info!(
        "RPC: {}, tx type: {:?}, NFT actions: {}",
        config.rpc_url, config.tx_type, config.nft_enabled
    );

    let entries = load_keys(&config.keys_file)
        .with_context(|| format!("Failed to load keys from {}", config.keys_file))?;

    let chain: Arc<dyn ChainClient> = Arc::new(
        AptosRestClient::new(&config.rpc_url, &config.indexer_url, config.execution)
            .context("Failed to create chain client")?,
    );
    verify_wallets(chain.as_ref(), &entries)
        .await
        .context("Wrong private keys are entered or there are no funds on the wallet")?;

    let request_timeout = Duration::from_secs(config.execution.request_timeout_secs);
    let market: Arc<dyn NftMarketplace> = Arc::new(
        BlueMoveClient::new(&config.marketplace_url, request_timeout, &config.thresholds)
            .context("Failed to create marketplace client")?,
    );
    let price: Arc<dyn PriceFeed> = Arc::new(
        CoinGeckoFeed::new(&config.price_api_url, request_timeout)
            .context("Failed to create price feed")?,
    );

    let (board, slots) = StatusBoard::new(entries.len());
    for (index, (entry, slot)) in entries.into_iter().zip(slots).enumerate() {
        let wallet = Arc::new(entry.key);
        let actions = Arc::new(WalletActions::new(
            &config,
            chain.clone(),
            market.clone(),
            price.clone(),
            wallet,
        ));
        let session = WalletSession::new(index, &config, actions, chain.clone(), slot);
        tokio::spawn(session.run());
    }

    status::run_reporter(board, Duration::from_millis(config.refresh_interval_ms)).await;
    info!("All wallets finished, exiting");
    Ok(())
}

/// Logs go to the log file; the terminal belongs to the status table
fn init_logging(log_file: &str) -> anyhow::Result<()> {
    if log_file.is_empty() {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file))?;

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
