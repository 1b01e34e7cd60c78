//! Private keys file loading and startup validation

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::amount::APT_COIN;
use crate::chain::{ChainClient, WalletKey};
use crate::error::ChainError;

#[derive(Debug, Error)]
pub enum KeyFileError {
    #[error("Failed to read keys file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Keys file has no keys")]
    Empty,

    #[error("Wrong private key on line {line}: {reason}")]
    InvalidKey { line: usize, reason: String },

    #[error("Account {address} on line {line} does not exist")]
    AccountNotFound { line: usize, address: String },

    #[error("No funds on wallet {address} (line {line})")]
    Unfunded { line: usize, address: String },

    #[error("Failed to check wallet on line {line}: {source}")]
    Chain {
        line: usize,
        #[source]
        source: ChainError,
    },
}

/// A parsed key with its 1-based line in the keys file
#[derive(Debug)]
pub struct KeyEntry {
    pub line: usize,
    pub key: WalletKey,
}

/// Parse one key per line, skipping blank lines
pub fn parse_keys(contents: &str) -> Result<Vec<KeyEntry>, KeyFileError> {
    let mut entries = Vec::new();
    for (i, raw) in contents.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line = i + 1;
        let key = WalletKey::from_hex(trimmed).map_err(|e| KeyFileError::InvalidKey {
            line,
            reason: e.to_string(),
        })?;
        entries.push(KeyEntry { line, key });
    }

    if entries.is_empty() {
        return Err(KeyFileError::Empty);
    }
    Ok(entries)
}

pub fn load_keys(path: impl AsRef<Path>) -> Result<Vec<KeyEntry>, KeyFileError> {
    let contents = std::fs::read_to_string(path)?;
    parse_keys(&contents)
}

/// Every account must exist and hold some APT
pub async fn verify_wallets(
    chain: &dyn ChainClient,
    entries: &[KeyEntry],
) -> Result<(), KeyFileError> {
    for entry in entries {
        let address = entry.key.address();
        match chain.ensure_account(address).await {
            Ok(()) => {}
            Err(ChainError::NotFound(_)) => {
                return Err(KeyFileError::AccountNotFound {
                    line: entry.line,
                    address: address.to_string(),
                })
            }
            Err(source) => {
                return Err(KeyFileError::Chain {
                    line: entry.line,
                    source,
                })
            }
        }

        let balance = chain
            .coin_balance(address, APT_COIN)
            .await
            .map_err(|source| KeyFileError::Chain {
                line: entry.line,
                source,
            })?;
        if balance == 0 {
            return Err(KeyFileError::Unfunded {
                line: entry.line,
                address: address.to_string(),
            });
        }
        debug!("Line {}: {} holds {} octas", entry.line, address, balance);
    }

    info!("Verified {} wallets", entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY_A: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";
    const KEY_B: &str = "ed25519-priv-0x1f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a7988";

    #[test]
    fn test_parse_skips_blank_lines() {
        let contents = format!("{}\n\n   \n{}\n", KEY_A, KEY_B);
        let entries = parse_keys(&contents).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].line, 1);
        assert_eq!(entries[1].line, 4);
        assert_ne!(entries[0].key.address(), entries[1].key.address());
    }

    #[test]
    fn test_bad_key_names_line() {
        let contents = format!("{}\nnot-a-key\n", KEY_A);
        match parse_keys(&contents) {
            Err(KeyFileError::InvalidKey { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid key error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(parse_keys("\n\n"), Err(KeyFileError::Empty)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", KEY_A).unwrap();
        let entries = load_keys(file.path()).unwrap();
        assert_eq!(entries.len(), 1);

        assert!(matches!(
            load_keys("/nonexistent/privates.txt"),
            Err(KeyFileError::Io(_))
        ));
    }
}
