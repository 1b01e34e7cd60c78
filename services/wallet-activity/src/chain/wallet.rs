//! Wallet key handling: parse, derive address, sign

use ed25519_dalek::{Signer, SigningKey};
use tiny_keccak::{Hasher, Sha3};

use crate::error::ChainError;

/// Single-signer ed25519 authentication scheme id
const ED25519_SCHEME: u8 = 0x00;

/// Ed25519 account key with its derived address
pub struct WalletKey {
    signing_key: SigningKey,
    address: String,
}

impl WalletKey {
    /// Parse a hex private key. Accepts an optional `0x` and `ed25519-priv-` prefix.
    pub fn from_hex(input: &str) -> Result<Self, ChainError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix("ed25519-priv-").unwrap_or(trimmed);
        let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = hex::decode(trimmed).map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            ChainError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;

        Ok(Self::from_bytes(&secret))
    }

    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let address = derive_address(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Account address, `0x` + 64 hex chars
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().as_bytes()))
    }

    /// Sign raw bytes, returning the `0x` hex signature
    pub fn sign_hex(&self, message: &[u8]) -> String {
        let signature = self.signing_key.sign(message);
        format!("0x{}", hex::encode(signature.to_bytes()))
    }
}

impl std::fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Authentication key of a fresh account: sha3-256(pubkey || scheme)
pub fn derive_address(public_key: &[u8; 32]) -> String {
    let mut hasher = Sha3::v256();
    hasher.update(public_key);
    hasher.update(&[ED25519_SCHEME]);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    format!("0x{}", hex::encode(out))
}
