//! End-to-end activity harness
//!
//! Drives the action modules and wallet sessions against the mock chain:
//! wallet state → decision → payloads → confirmation → status board


use mock_chain::{nft, owned, test_wallet, wallet_for, MockChain, MockMarketplace};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use wallet_activity::{
    actions::{ActionExecutor, NftModule, StakeModule, SwapModule},
    amount::{token_list, APT_COIN, DITTO_STAPT, LZ_USDC, LZ_USDT, LZ_WETH, TORTUGA_TAPT},
    config::{AppConfig, SwapVenue, ThresholdConfig, TxTypeChoice},
    error::ActionError,
    intent::{ActionKind, ResultLabel},
    keys::{verify_wallets, KeyEntry, KeyFileError},
    price::StaticPrice,
    session::WalletSession,
    status::{self, StatusBoard},
    Dice, NftMarketplace, WalletActions,
};

const TEN_APT: u64 = 10_00000000;

fn swap_module(chain: Arc<MockChain>) -> SwapModule {
    SwapModule::new(
        chain,
        Arc::new(test_wallet()),
        token_list(),
        Decimal::new(10, 2),
        vec![SwapVenue::LiquidSwap],
    )
}

fn nft_module(chain: Arc<MockChain>, market: MockMarketplace) -> NftModule {
    NftModule::new(
        chain,
        Arc::new(market),
        Arc::new(test_wallet()),
        ThresholdConfig::default(),
    )
}

fn amount_arg(call: &wallet_activity::EntryFunction) -> u64 {
    call.arguments[0].as_str().unwrap().parse().unwrap()
}

// ============================================================================
// Swap
// ============================================================================

#[tokio::test]
async fn test_native_only_wallet_swaps_native_within_bounds() {
    let mut destinations = std::collections::HashSet::new();

    for seed in 0..40 {
        let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
        let module = swap_module(chain.clone());
        let mut dice = Dice::seeded(seed);

        module.make_random_swap(&mut dice).await.unwrap();

        let calls = chain.submitted();
        // destination coin is registered first, then swapped into
        assert_eq!(chain.submitted_names(), vec!["register", "swap"]);
        let swap = &calls[1];
        assert_eq!(swap.type_arguments[0], APT_COIN);
        assert_ne!(swap.type_arguments[1], APT_COIN);
        assert_eq!(calls[0].type_arguments[0], swap.type_arguments[1]);

        let amount = amount_arg(swap);
        assert!((1_00000000..=7_00000000).contains(&amount), "amount {}", amount);
        destinations.insert(swap.type_arguments[1].clone());
    }

    // destination is spread over the other tokens
    assert!(destinations.len() > 1);
}

#[tokio::test]
async fn test_swap_skips_registration_when_registered() {
    let chain = Arc::new(
        MockChain::new()
            .with_balance(LZ_USDC, 50_000_000)
            .with_registered(APT_COIN)
            .with_registered(DITTO_STAPT)
            .with_registered(TORTUGA_TAPT)
            .with_registered(LZ_USDT)
            .with_registered(LZ_WETH),
    );
    let module = swap_module(chain.clone());

    module.make_random_swap(&mut Dice::seeded(1)).await.unwrap();

    assert_eq!(chain.submitted_names(), vec!["swap"]);
    let swap = &chain.submitted()[0];
    assert_eq!(swap.type_arguments[0], LZ_USDC);
    let amount = amount_arg(swap);
    assert!((5_000_000..=50_000_000).contains(&amount));
}

#[tokio::test]
async fn test_swap_without_holdable_token_is_construction_error() {
    // 0.05 USDC is dust
    let chain = Arc::new(MockChain::new().with_balance(LZ_USDC, 50_000));
    let module = swap_module(chain.clone());

    let result = module.make_random_swap(&mut Dice::seeded(2)).await;
    assert!(matches!(result, Err(ActionError::NoHoldableToken)));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_failed_registration_aborts_swap() {
    let chain = Arc::new(
        MockChain::new()
            .with_balance(APT_COIN, TEN_APT)
            .failing_on_chain("register"),
    );
    let module = swap_module(chain.clone());

    let result = module.make_random_swap(&mut Dice::seeded(3)).await;
    assert!(matches!(result, Err(ActionError::RegistrationFailed { .. })));
    assert_eq!(chain.submitted_names(), vec!["register"]);
}

// ============================================================================
// Stake
// ============================================================================

#[tokio::test]
async fn test_zero_derivatives_always_stake() {
    for seed in 0..40 {
        let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
        let module = StakeModule::new(chain.clone(), Arc::new(test_wallet()));

        module
            .make_random_stake_action(&mut Dice::seeded(seed))
            .await
            .unwrap();

        let calls = chain.submitted();
        assert_eq!(calls.len(), 1);
        let name = calls[0].short_name();
        assert!(name == "stake_aptos" || name == "stake", "unexpected {}", name);

        let amount = amount_arg(&calls[0]);
        assert!((2_00000000..=6_00000000).contains(&amount));
    }
}

#[tokio::test]
async fn test_unstake_amount_clamped_to_fresh_balance() {
    let mut unstakes = 0;

    for seed in 0..64 {
        // decision sees 10 stAPT, the re-read right before submission sees 0.0001
        let chain = Arc::new(
            MockChain::new()
                .with_balance(APT_COIN, TEN_APT)
                .with_balance(DITTO_STAPT, 10_000)
                .with_balance_reads(DITTO_STAPT, vec![TEN_APT]),
        );
        let module = StakeModule::new(chain.clone(), Arc::new(test_wallet()));

        module
            .make_random_stake_action(&mut Dice::seeded(seed))
            .await
            .unwrap();

        let call = &chain.submitted()[0];
        if call.short_name() == "instant_unstake" {
            unstakes += 1;
            assert!(amount_arg(call) <= 10_000);
        }
    }

    assert!(unstakes > 0);
}

#[tokio::test]
async fn test_unstake_zero_fresh_balance_is_construction_error() {
    let mut saw_zero = false;
    for seed in 0..32 {
        let chain = Arc::new(
            MockChain::new()
                .with_balance(APT_COIN, TEN_APT)
                .with_balance_reads(TORTUGA_TAPT, vec![TEN_APT]),
        );
        let module = StakeModule::new(chain.clone(), Arc::new(test_wallet()));

        match module.make_random_stake_action(&mut Dice::seeded(seed)).await {
            Err(ActionError::ZeroAmount(coin)) => {
                assert_eq!(coin, TORTUGA_TAPT);
                assert!(chain.submitted().is_empty());
                saw_zero = true;
            }
            Ok(_) => assert!(matches!(
                chain.submitted()[0].short_name(),
                "stake_aptos" | "stake"
            )),
            Err(e) => panic!("unexpected error {}", e),
        }
    }
    assert!(saw_zero);
}

// ============================================================================
// NFT
// ============================================================================

#[tokio::test]
async fn test_empty_funded_wallet_buys_under_usd_cap() {
    let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
    // $2 at $4/APT caps the buy at 0.5 APT
    let market = MockMarketplace::new()
        .with_collection(1, "Pricey Apes", 80_000_000)
        .with_collection(2, "Cheap Cats", 30_000_000)
        .with_cheapest(1, nft("Ape #1", "Pricey Apes", 80_000_000))
        .with_cheapest(2, nft("Cat #7", "Cheap Cats", 30_000_000));
    let module = nft_module(chain.clone(), market);

    module
        .make_random_nft_action(Decimal::from(4), &mut Dice::seeded(5))
        .await
        .unwrap();

    let calls = chain.submitted();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].short_name(), "batch_buy_script");
    assert_eq!(calls[0].arguments[2], serde_json::json!(["Cat #7"]));
}

#[tokio::test]
async fn test_buy_without_affordable_collection_is_construction_error() {
    let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
    let market = MockMarketplace::new()
        .with_collection(1, "Pricey Apes", 80_000_000)
        .with_cheapest(1, nft("Ape #1", "Pricey Apes", 80_000_000));
    let module = nft_module(chain.clone(), market);

    let result = module
        .make_random_nft_action(Decimal::from(4), &mut Dice::seeded(6))
        .await;

    assert!(matches!(
        result,
        Err(ActionError::NoEligibleCollection {
            max_price: 50_000_000
        })
    ));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_relist_delists_then_lists_at_floor() {
    let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
    let market = MockMarketplace::new()
        .with_collection(3, "Bruh Bears", 10_000_000)
        .with_cheapest(3, nft("Bruh #2", "Bruh Bears", 20_000_000))
        .with_listed(vec![
            nft("Bruh #5", "Bruh Bears", 25_000_000),
            nft("Bruh #6", "Bruh Bears", 25_000_000),
            nft("Bruh #7", "Bruh Bears", 25_000_000),
        ]);
    let module = nft_module(chain.clone(), market);

    // nothing held, three listed: always relist
    module
        .make_random_nft_action(Decimal::from(4), &mut Dice::seeded(7))
        .await
        .unwrap();

    assert_eq!(
        chain.submitted_names(),
        vec!["batch_delist_script", "batch_list_script"]
    );
    let calls = chain.submitted();
    assert_eq!(calls[0].arguments[2], calls[1].arguments[2]);
    // 95% of the cheapest listing
    assert_eq!(calls[1].arguments[3], serde_json::json!(["19000000"]));
}

#[tokio::test]
async fn test_failed_delist_skips_listing() {
    let chain = Arc::new(
        MockChain::new()
            .with_balance(APT_COIN, TEN_APT)
            .failing_on_chain("batch_delist_script"),
    );
    let market = MockMarketplace::new()
        .with_collection(3, "Bruh Bears", 10_000_000)
        .with_listed(vec![
            nft("Bruh #5", "Bruh Bears", 25_000_000),
            nft("Bruh #6", "Bruh Bears", 25_000_000),
            nft("Bruh #7", "Bruh Bears", 25_000_000),
        ]);
    let module = nft_module(chain.clone(), market);

    let result = module
        .make_random_nft_action(Decimal::from(4), &mut Dice::seeded(8))
        .await;

    assert!(matches!(result, Err(ActionError::DelistFailed { .. })));
    assert_eq!(chain.submitted_names(), vec!["batch_delist_script"]);
}

#[tokio::test]
async fn test_list_uses_default_floor_without_listings() {
    let chain = Arc::new(
        MockChain::new()
            .with_balance(APT_COIN, TEN_APT)
            .with_tokens(vec![
                owned("Fresh #1", "Fresh Mint"),
                owned("Fresh #2", "Fresh Mint"),
                owned("Fresh #3", "Fresh Mint"),
                owned("Other #1", "Not On Market"),
            ]),
    );
    let market = MockMarketplace::new().with_collection(9, "Fresh Mint", 0);
    let module = nft_module(chain.clone(), market);

    // three held on the marketplace, nothing listed: always list
    module
        .make_random_nft_action(Decimal::from(4), &mut Dice::seeded(9))
        .await
        .unwrap();

    let calls = chain.submitted();
    assert_eq!(chain.submitted_names(), vec!["batch_list_script"]);
    assert_eq!(calls[0].arguments[1], serde_json::json!(["Fresh Mint"]));
    assert_eq!(calls[0].arguments[3], serde_json::json!(["9500000"]));
}

// ============================================================================
// Sessions and status board
// ============================================================================

fn session_config(tx_type: TxTypeChoice, txs: u64) -> AppConfig {
    AppConfig {
        min_tx: txs,
        max_tx: txs,
        min_delay_secs: 30,
        max_delay_secs: 60,
        tx_type,
        seed: Some(42),
        ..AppConfig::default()
    }
}

fn wallet_actions(
    config: &AppConfig,
    chain: Arc<MockChain>,
    index: u8,
) -> Arc<dyn ActionExecutor> {
    let market: Arc<dyn NftMarketplace> = Arc::new(MockMarketplace::new());
    Arc::new(WalletActions::new(
        config,
        chain,
        market,
        Arc::new(StaticPrice(Decimal::from(4))),
        Arc::new(wallet_for(index)),
    ))
}

#[tokio::test(start_paused = true)]
async fn test_session_runs_every_step_and_completes() {
    let config = session_config(TxTypeChoice::Stake, 3);
    let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
    let (board, mut slots) = StatusBoard::new(1);

    let session = WalletSession::new(
        0,
        &config,
        wallet_actions(&config, chain.clone(), 0),
        chain.clone(),
        slots.remove(0),
    );
    assert_eq!(session.plan().total(), 3);

    let history = session.run().await;

    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|i| i.kind == ActionKind::Stake));
    assert!(history
        .iter()
        .all(|i| i.label() == Some(ResultLabel::Success) && i.usable_hash().is_some()));

    let row = &board.snapshot()[0];
    assert_eq!(row.progress(), "3/3");
    assert_eq!(row.last_tx_result, "TX was successful");
    assert_eq!(row.current_tx_type, "liquid staking action");
    assert!(row.is_complete());
}

#[tokio::test(start_paused = true)]
async fn test_session_maps_failures_to_labels() {
    // on-chain failure
    let config = session_config(TxTypeChoice::Stake, 2);
    let chain = Arc::new(
        MockChain::new()
            .with_balance(APT_COIN, TEN_APT)
            .failing_on_chain("stake_aptos")
            .failing_on_chain("stake"),
    );
    let (board, mut slots) = StatusBoard::new(1);
    let session = WalletSession::new(
        0,
        &config,
        wallet_actions(&config, chain.clone(), 0),
        chain.clone(),
        slots.remove(0),
    );
    let history = session.run().await;
    assert!(history.iter().all(|i| i.label() == Some(ResultLabel::Failed)));
    assert_eq!(board.snapshot()[0].last_tx_result, "TX failed");

    // nothing to stake: construction error, session still completes
    let chain = Arc::new(MockChain::new());
    let (board, mut slots) = StatusBoard::new(1);
    let session = WalletSession::new(
        0,
        &config,
        wallet_actions(&config, chain.clone(), 0),
        chain.clone(),
        slots.remove(0),
    );
    let history = session.run().await;
    assert!(history
        .iter()
        .all(|i| i.label() == Some(ResultLabel::ConstructionError)));
    let row = &board.snapshot()[0];
    assert_eq!(row.last_tx_result, "Error when creating a TX");
    assert_eq!(row.progress(), "2/2");
    assert!(row.is_complete());

    // confirmation never observed counts as failed
    let chain = Arc::new(
        MockChain::new()
            .with_balance(APT_COIN, TEN_APT)
            .unconfirmable(),
    );
    let (_board, mut slots) = StatusBoard::new(1);
    let session = WalletSession::new(
        0,
        &config,
        wallet_actions(&config, chain.clone(), 0),
        chain.clone(),
        slots.remove(0),
    );
    let history = session.run().await;
    assert!(history.iter().all(|i| i.label() == Some(ResultLabel::Failed)));
}

#[tokio::test(start_paused = true)]
async fn test_sessions_stagger_by_wallet_index() {
    let config = session_config(TxTypeChoice::Stake, 2);
    let chain = Arc::new(MockChain::new().with_balance(APT_COIN, TEN_APT));
    let (board, slots) = StatusBoard::new(3);

    for (index, slot) in slots.into_iter().enumerate() {
        let session = WalletSession::new(
            index,
            &config,
            wallet_actions(&config, chain.clone(), index as u8),
            chain.clone(),
            slot,
        );
        tokio::spawn(session.run());
    }

    // wallet 0 has no initial delay
    tokio::time::sleep(Duration::from_millis(1)).await;
    let rows = board.snapshot();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].progress(), "1/2");
    assert_eq!(rows[1].progress(), "0/2");
    assert_eq!(rows[2].progress(), "0/2");

    status::run_reporter(board, Duration::from_millis(500)).await;
}

#[tokio::test(start_paused = true)]
async fn test_reporter_returns_when_all_wallets_complete() {
    let config = session_config(TxTypeChoice::Random, 4);
    let chain = Arc::new(
        MockChain::new()
            .with_balance(APT_COIN, TEN_APT)
            .with_registered(APT_COIN),
    );
    let (board, slots) = StatusBoard::new(4);
    let board_len = board.len();

    let mut handles = Vec::new();
    for (index, slot) in slots.into_iter().enumerate() {
        let session = WalletSession::new(
            index,
            &config,
            wallet_actions(&config, chain.clone(), index as u8),
            chain.clone(),
            slot,
        );
        handles.push(tokio::spawn(session.run()));
    }

    status::run_reporter(board, Duration::from_millis(500)).await;

    assert_eq!(board_len, 4);
    for handle in handles {
        let history = handle.await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(history.iter().all(|i| i.is_finalized()));
    }
}

// ============================================================================
// Startup validation
// ============================================================================

#[tokio::test]
async fn test_verify_wallets_reports_line_numbers() {
    let entries = vec![
        KeyEntry {
            line: 1,
            key: wallet_for(0),
        },
        KeyEntry {
            line: 3,
            key: wallet_for(1),
        },
    ];
    let missing = entries[1].key.address().to_string();

    let chain = MockChain::new()
        .with_balance(APT_COIN, TEN_APT)
        .with_missing_account(&missing);
    match verify_wallets(&chain, &entries).await {
        Err(KeyFileError::AccountNotFound { line, address }) => {
            assert_eq!(line, 3);
            assert_eq!(address, missing);
        }
        other => panic!("expected missing account, got {:?}", other),
    }

    let unfunded = MockChain::new();
    assert!(matches!(
        verify_wallets(&unfunded, &entries).await,
        Err(KeyFileError::Unfunded { line: 1, .. })
    ));

    let funded = MockChain::new().with_balance(APT_COIN, 1);
    assert!(verify_wallets(&funded, &entries).await.is_ok());
}
