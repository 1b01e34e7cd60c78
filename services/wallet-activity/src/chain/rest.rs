//! Aptos node REST client
//!
//! Transactions are encoded by the node (`/transactions/encode_submission`)
//! and signed locally, so no BCS implementation is needed here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ChainClient, EntryFunction, OwnedToken, TxOutcome, WalletKey};
use crate::amount::APT_COIN;
use crate::config::ExecutionConfig;
use crate::error::ChainError;

/// Client for the node REST API and indexer
pub struct AptosRestClient {
    client: Client,
    base_url: String,
    indexer_url: String,
    execution: ExecutionConfig,
}

impl AptosRestClient {
    pub fn new(
        base_url: &str,
        indexer_url: &str,
        execution: ExecutionConfig,
    ) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(execution.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            indexer_url: indexer_url.to_string(),
            execution,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChainError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        Self::parse_response(response, path).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ChainError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::parse_response(response, path).await
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ChainError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ChainError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<NodeErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return Err(ChainError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// Call a view function and return its first result
    async fn view(
        &self,
        function: &str,
        type_arguments: &[&str],
        arguments: Vec<Value>,
    ) -> Result<Value, ChainError> {
        let body = json!({
            "function": function,
            "type_arguments": type_arguments,
            "arguments": arguments,
        });
        let result: Vec<Value> = self.post_json("/view", &body).await?;
        result
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::InvalidResponse(format!("{} returned nothing", function)))
    }

    async fn sequence_number(&self, address: &str) -> Result<u64, ChainError> {
        let account: AccountData = self.get_json(&format!("/accounts/{}", address)).await?;
        parse_u64(&account.sequence_number)
    }

    async fn gas_unit_price(&self) -> Result<u64, ChainError> {
        let estimate: GasEstimate = self.get_json("/estimate_gas_price").await?;
        Ok(estimate.gas_estimate.max(1))
    }

    /// Largest gas amount the sender can pay for, capped by config
    pub async fn estimate_max_gas_amount(
        &self,
        address: &str,
        gas_unit_price: u64,
    ) -> Result<u64, ChainError> {
        let balance = self.coin_balance(address, APT_COIN).await?;
        Ok(max_gas_for_balance(
            balance,
            gas_unit_price,
            self.execution.max_gas_amount,
        ))
    }
}

/// `min(balance / gas_unit_price, cap)`
pub fn max_gas_for_balance(balance: u64, gas_unit_price: u64, cap: u64) -> u64 {
    (balance / gas_unit_price.max(1)).min(cap)
}

fn parse_u64(raw: &str) -> Result<u64, ChainError> {
    raw.parse()
        .map_err(|_| ChainError::InvalidResponse(format!("not a u64: {}", raw)))
}

fn value_to_u64(value: &Value) -> Result<u64, ChainError> {
    match value {
        Value::String(s) => parse_u64(s),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ChainError::InvalidResponse(format!("not a u64: {}", n))),
        other => Err(ChainError::InvalidResponse(format!("not a u64: {}", other))),
    }
}

#[async_trait]
impl ChainClient for AptosRestClient {
    async fn ensure_account(&self, address: &str) -> Result<(), ChainError> {
        let _: AccountData = self.get_json(&format!("/accounts/{}", address)).await?;
        Ok(())
    }

    async fn coin_balance(&self, owner: &str, coin_type: &str) -> Result<u64, ChainError> {
        if !self.is_coin_registered(owner, coin_type).await? {
            return Ok(0);
        }
        let value = self
            .view("0x1::coin::balance", &[coin_type], vec![json!(owner)])
            .await?;
        value_to_u64(&value)
    }

    async fn is_coin_registered(&self, owner: &str, coin_type: &str) -> Result<bool, ChainError> {
        let value = self
            .view(
                "0x1::coin::is_account_registered",
                &[coin_type],
                vec![json!(owner)],
            )
            .await?;
        value
            .as_bool()
            .ok_or_else(|| ChainError::InvalidResponse(format!("not a bool: {}", value)))
    }

    async fn account_tokens(&self, owner: &str) -> Result<Vec<OwnedToken>, ChainError> {
        let body = json!({
            "query": ACCOUNT_TOKENS_QUERY,
            "variables": { "owner": owner },
        });
        let response = self.client.post(&self.indexer_url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ChainError::Api { status, message });
        }

        let parsed: GraphQlResponse<AccountTokensData> = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("indexer: {}", e)))?;
        if let Some(errors) = parsed.errors {
            return Err(ChainError::Api {
                status: 200,
                message: errors.to_string(),
            });
        }

        let rows = parsed
            .data
            .map(|d| d.current_token_ownerships_v2)
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(TokenOwnershipRow::into_owned_token)
            .collect())
    }

    async fn submit(&self, signer: &WalletKey, call: &EntryFunction) -> Result<String, ChainError> {
        let sender = signer.address();
        let sequence_number = self.sequence_number(sender).await?;
        let gas_unit_price = self.gas_unit_price().await?;
        let max_gas_amount = self.estimate_max_gas_amount(sender, gas_unit_price).await?;
        let expiration = chrono::Utc::now().timestamp() + self.execution.expiration_secs;

        let request = UserTransactionRequest {
            sender: sender.to_string(),
            sequence_number: sequence_number.to_string(),
            max_gas_amount: max_gas_amount.to_string(),
            gas_unit_price: gas_unit_price.to_string(),
            expiration_timestamp_secs: expiration.to_string(),
            payload: EntryFunctionPayload {
                payload_type: "entry_function_payload",
                call,
            },
        };

        debug!(
            "Encoding {} for {} (seq {}, max gas {}, gas price {})",
            call.function, sender, sequence_number, max_gas_amount, gas_unit_price
        );

        let signing_message: String = self
            .post_json("/transactions/encode_submission", &request)
            .await?;
        let message = hex::decode(signing_message.trim_start_matches("0x"))
            .map_err(|e| ChainError::InvalidResponse(format!("signing message: {}", e)))?;

        let signed = SubmitTransactionRequest {
            request: &request,
            signature: TransactionSignature {
                signature_type: "ed25519_signature",
                public_key: signer.public_key_hex(),
                signature: signer.sign_hex(&message),
            },
        };

        let pending: PendingTransaction = self.post_json("/transactions", &signed).await?;
        info!("Submitted {} from {}: {}", call.short_name(), sender, pending.hash);
        Ok(pending.hash)
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<TxOutcome, ChainError> {
        let timeout = Duration::from_secs(self.execution.confirm_timeout_secs);
        let poll = Duration::from_millis(self.execution.confirm_poll_ms);
        let deadline = tokio::time::Instant::now() + timeout;
        let path = format!("/transactions/by_hash/{}", hash);

        loop {
            match self.get_json::<TransactionStatus>(&path).await {
                Ok(tx) if tx.tx_type != "pending_transaction" => {
                    return Ok(if tx.success.unwrap_or(false) {
                        TxOutcome::Success
                    } else {
                        TxOutcome::Failure {
                            vm_status: tx.vm_status.unwrap_or_default(),
                        }
                    });
                }
                Ok(_) | Err(ChainError::NotFound(_)) => {}
                Err(e) => warn!("Error polling transaction {}: {}", hash, e),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ChainError::ConfirmationTimeout {
                    hash: hash.to_string(),
                    secs: self.execution.confirm_timeout_secs,
                });
            }
            tokio::time::sleep(poll).await;
        }
    }
}

const ACCOUNT_TOKENS_QUERY: &str = r#"
query AccountTokens($owner: String!) {
  current_token_ownerships_v2(
    where: {owner_address: {_eq: $owner}, amount: {_gt: "0"}, token_standard: {_eq: "v1"}}
  ) {
    property_version_v1
    current_token_data {
      token_name
      current_collection {
        collection_name
        creator_address
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct GasEstimate {
    gas_estimate: u64,
}

#[derive(Debug, Serialize)]
struct EntryFunctionPayload<'a> {
    #[serde(rename = "type")]
    payload_type: &'static str,
    #[serde(flatten)]
    call: &'a EntryFunction,
}

#[derive(Debug, Serialize)]
struct UserTransactionRequest<'a> {
    sender: String,
    sequence_number: String,
    max_gas_amount: String,
    gas_unit_price: String,
    expiration_timestamp_secs: String,
    payload: EntryFunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct TransactionSignature {
    #[serde(rename = "type")]
    signature_type: &'static str,
    public_key: String,
    signature: String,
}

#[derive(Debug, Serialize)]
struct SubmitTransactionRequest<'a> {
    #[serde(flatten)]
    request: &'a UserTransactionRequest<'a>,
    signature: TransactionSignature,
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    #[serde(rename = "type")]
    tx_type: String,
    success: Option<bool>,
    vm_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AccountTokensData {
    current_token_ownerships_v2: Vec<TokenOwnershipRow>,
}

#[derive(Debug, Deserialize)]
struct TokenOwnershipRow {
    property_version_v1: Value,
    current_token_data: Option<TokenDataRow>,
}

#[derive(Debug, Deserialize)]
struct TokenDataRow {
    token_name: String,
    current_collection: Option<CollectionRow>,
}

#[derive(Debug, Deserialize)]
struct CollectionRow {
    collection_name: String,
    creator_address: String,
}

impl TokenOwnershipRow {
    /// `None` when the indexer has no token data for the row
    fn into_owned_token(self) -> Option<OwnedToken> {
        let property_version = match self.property_version_v1 {
            Value::String(s) => s,
            Value::Null => "0".to_string(),
            other => other.to_string(),
        };
        let data = self.current_token_data?;
        let (collection_name, creator) = data
            .current_collection
            .map(|c| (c.collection_name, c.creator_address))
            .unwrap_or_default();

        Some(OwnedToken {
            name: data.token_name,
            collection_name,
            creator,
            property_version,
        })
    }
}
