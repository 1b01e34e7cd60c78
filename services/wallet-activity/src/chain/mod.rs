//! Chain client boundary
//!
//! Everything the action modules need from the network goes through
//! [`ChainClient`]; [`AptosRestClient`] is the node REST implementation.

pub mod rest;
pub mod wallet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChainError;

pub use rest::AptosRestClient;
pub use wallet::WalletKey;

/// Move entry function call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFunction {
    /// `address::module::function`
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl EntryFunction {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn type_arg(mut self, type_tag: impl Into<String>) -> Self {
        self.type_arguments.push(type_tag.into());
        self
    }

    /// Append an argument; u64 amounts go over JSON as strings
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// Function name without the module address
    pub fn short_name(&self) -> &str {
        self.function.rsplit("::").next().unwrap_or(&self.function)
    }
}

/// On-chain result of a committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    Success,
    Failure { vm_status: String },
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Success)
    }
}

/// Token (v1 identity) owned by an account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OwnedToken {
    pub name: String,
    pub collection_name: String,
    pub creator: String,
    pub property_version: String,
}

/// Operations the action modules need from the chain
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fails with `NotFound` when the account does not exist
    async fn ensure_account(&self, address: &str) -> Result<(), ChainError>;

    /// Raw coin balance, 0 when the coin store is absent
    async fn coin_balance(&self, owner: &str, coin_type: &str) -> Result<u64, ChainError>;

    async fn is_coin_registered(&self, owner: &str, coin_type: &str) -> Result<bool, ChainError>;

    async fn account_tokens(&self, owner: &str) -> Result<Vec<OwnedToken>, ChainError>;

    /// Build, sign and submit; returns the transaction hash
    async fn submit(&self, signer: &WalletKey, call: &EntryFunction) -> Result<String, ChainError>;

    /// Wait until the transaction is committed (bounded)
    async fn wait_for_transaction(&self, hash: &str) -> Result<TxOutcome, ChainError>;
}
