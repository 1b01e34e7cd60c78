//! Token list and amount handling for raw on-chain units

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

pub const APT_COIN: &str = "0x1::aptos_coin::AptosCoin";
pub const LZ_USDC: &str =
    "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::USDC";
pub const LZ_USDT: &str =
    "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::USDT";
pub const LZ_WETH: &str =
    "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::WETH";
pub const DITTO_STAPT: &str =
    "0xd11107bdf0d6d7040c6c0bfbdecb6545191fdf13e8d8d259952f53e1713f61b5::staked_coin::StakedAptos";
pub const TORTUGA_TAPT: &str =
    "0x84d7aeef42d38a5ffc3ccef853e1b82e4958659d16a7de736a29c55fbbeb0114::staked_aptos_coin::StakedAptosCoin";

/// Token metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub chain_id: u8,
    pub decimals: u8,
    /// Move type tag of the coin
    pub address: String,
    pub estimated_price_usd: Decimal,
}

impl Token {
    /// USD value of a raw balance at the estimated price
    pub fn usd_value(&self, raw_amount: u64) -> Decimal {
        from_raw_amount(raw_amount, self.decimals) * self.estimated_price_usd
    }
}

/// Convert UI amount (human readable) to raw amount (u64)
///
/// Fractional raw units are truncated.
pub fn to_raw_amount(ui_amount: Decimal, decimals: u8) -> anyhow::Result<u64> {
    if ui_amount < Decimal::ZERO {
        return Err(anyhow::anyhow!("Amount cannot be negative: {}", ui_amount));
    }

    let multiplier = Decimal::from(10u64.pow(decimals as u32));
    let raw = ui_amount * multiplier;

    raw.to_u64().ok_or_else(|| {
        anyhow::anyhow!(
            "Amount {} with {} decimals overflows u64",
            ui_amount,
            decimals
        )
    })
}

/// Convert raw amount (u64) to UI amount (human readable)
pub fn from_raw_amount(raw_amount: u64, decimals: u8) -> Decimal {
    let divisor = Decimal::from(10u64.pow(decimals as u32));
    Decimal::from(raw_amount) / divisor
}

/// `pct` percent of a raw amount, rounded down
pub fn percent_of(raw_amount: u64, pct: u64) -> u64 {
    ((raw_amount as u128 * pct as u128) / 100) as u64
}

/// Get token info by symbol or Move type tag
pub fn get_token_info(symbol_or_address: &str) -> Option<Token> {
    let (name, symbol, decimals, address, price) = match symbol_or_address {
        "APT" | APT_COIN => ("Aptos Coin", "APT", 8, APT_COIN, Decimal::new(422, 2)),
        "lzUSDC" | LZ_USDC => ("LayerZero - USD Coin", "lzUSDC", 6, LZ_USDC, Decimal::ONE),
        "lzUSDT" | LZ_USDT => ("LayerZero - Tether USD", "lzUSDT", 6, LZ_USDT, Decimal::ONE),
        "lzWETH" | LZ_WETH => (
            "LayerZero - Wrapped Ether",
            "lzWETH",
            6,
            LZ_WETH,
            Decimal::new(345326, 2),
        ),
        "stAPT" | DITTO_STAPT => ("Ditto Staked Aptos", "stAPT", 8, DITTO_STAPT, Decimal::new(462, 2)),
        "tAPT" | TORTUGA_TAPT => ("Tortuga Staked APT", "tAPT", 8, TORTUGA_TAPT, Decimal::new(513, 2)),
        _ => return None,
    };

    Some(Token {
        name: name.to_string(),
        symbol: symbol.to_string(),
        chain_id: 1,
        decimals,
        address: address.to_string(),
        estimated_price_usd: price,
    })
}

/// The fixed swap universe. The native token is always first.
pub fn token_list() -> Vec<Token> {
    ["APT", "lzUSDC", "lzUSDT", "lzWETH", "stAPT", "tAPT"]
        .iter()
        .filter_map(|symbol| get_token_info(symbol))
        .collect()
}

/// Native gas token
pub fn native_token() -> Token {
    token_list().remove(0)
}
