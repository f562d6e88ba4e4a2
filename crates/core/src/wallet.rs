use std::{path::Path, str::FromStr};

use alloy::{
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
};
use tracing::{info, warn};

use crate::error::ConfigError;

/// A signing key and the address derived from it.
#[derive(Clone, Debug)]
pub struct WalletKey {
    signer: PrivateKeySigner,
    address: Address,
}

impl WalletKey {
    pub fn new(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        Self { signer, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl From<PrivateKeySigner> for WalletKey {
    fn from(signer: PrivateKeySigner) -> Self {
        Self::new(signer)
    }
}

/// What to do with a line in the wallet file that isn't a valid private key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidKeyPolicy {
    /// Reject the whole file.
    #[default]
    Abort,
    /// Log a warning and continue with the remaining keys.
    Skip,
}

/// Parses a 32-byte hex private key, with or without a `0x` prefix.
pub fn parse_private_key(raw: &str) -> Option<PrivateKeySigner> {
    let hex_key = raw.strip_prefix("0x").unwrap_or(raw);
    if hex_key.len() != 64 || !hex_key.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = B256::from_str(hex_key).ok()?;
    PrivateKeySigner::from_bytes(&bytes).ok()
}

/// Parses newline-delimited private keys. Blank lines are ignored.
pub fn parse_wallets(
    contents: &str,
    policy: InvalidKeyPolicy,
) -> Result<Vec<WalletKey>, ConfigError> {
    let mut wallets = vec![];
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_private_key(line) {
            Some(signer) => wallets.push(WalletKey::new(signer)),
            None => {
                let err = ConfigError::invalid_private_key(idx + 1, line);
                match policy {
                    InvalidKeyPolicy::Abort => return Err(err),
                    InvalidKeyPolicy::Skip => warn!("skipping key: {err}"),
                }
            }
        }
    }

    if wallets.is_empty() {
        return Err(ConfigError::NoWallets);
    }
    Ok(wallets)
}

/// Reads and parses the wallet file at `path`.
pub fn load_wallets(
    path: impl AsRef<Path>,
    policy: InvalidKeyPolicy,
) -> Result<Vec<WalletKey>, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::WalletFileMissing(path.to_owned()));
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::WalletFileRead {
        path: path.to_owned(),
        source,
    })?;
    let wallets = parse_wallets(&contents, policy)?;
    info!("loaded {} wallet(s) from {}", wallets.len(), path.display());
    Ok(wallets)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub const TEST_KEYS: [&str; 3] = [
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
        "0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    ];

    pub fn get_test_wallets() -> Vec<WalletKey> {
        TEST_KEYS
            .iter()
            .map(|k| WalletKey::new(parse_private_key(k).unwrap()))
            .collect()
    }

    #[test]
    fn derives_address_from_key() {
        let wallet = WalletKey::new(parse_private_key(TEST_KEYS[0]).unwrap());
        assert_eq!(
            wallet.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn accepts_keys_without_prefix_and_ignores_blank_lines() {
        let contents = format!(
            "{}\n\n  {}  \n",
            TEST_KEYS[0],
            TEST_KEYS[1].trim_start_matches("0x")
        );
        let wallets = parse_wallets(&contents, InvalidKeyPolicy::Abort).unwrap();
        assert_eq!(wallets.len(), 2);
    }

    #[test]
    fn abort_policy_rejects_invalid_line() {
        let contents = format!("{}\n0x1234\n{}", TEST_KEYS[0], TEST_KEYS[1]);
        let err = parse_wallets(&contents, InvalidKeyPolicy::Abort).unwrap_err();
        match err {
            ConfigError::InvalidPrivateKey { line, preview } => {
                assert_eq!(line, 2);
                assert_eq!(preview, "0x1234");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn skip_policy_keeps_valid_keys() {
        let contents = format!("{}\nnot-a-key\n{}", TEST_KEYS[0], TEST_KEYS[2]);
        let wallets = parse_wallets(&contents, InvalidKeyPolicy::Skip).unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[1].address(), get_test_wallets()[2].address());
    }

    #[test]
    fn rejects_non_hex_key_of_correct_length() {
        let bad = format!("0x{}", "g".repeat(64));
        assert!(parse_private_key(&bad).is_none());
    }

    #[test]
    fn empty_file_is_an_error() {
        let err = parse_wallets("\n \n", InvalidKeyPolicy::Skip).unwrap_err();
        assert!(matches!(err, ConfigError::NoWallets));
    }
}
