use crate::{endpoint::EndpointError, payload::PayloadError};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("endpoint error")]
    Endpoint(#[from] EndpointError),

    #[error("payload error")]
    Payload(#[from] PayloadError),

    #[error("dispatcher worker failed to join")]
    TaskJoin(#[from] JoinError),
}

/// Problems detected before any network activity. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wallet file {0} does not exist; create it with one private key per line")]
    WalletFileMissing(PathBuf),

    #[error("failed to read wallet file {path}: {source}")]
    WalletFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid private key on line {line}: {preview}... (expected 64 hex characters)")]
    InvalidPrivateKey { line: usize, preview: String },

    #[error("no valid private keys found")]
    NoWallets,

    #[error("concurrency must be between 1 and {max}, got {got}")]
    ConcurrencyOutOfRange { got: usize, max: usize },

    #[error("repetitions per wallet must be at least 1")]
    RepetitionsZero,

    #[error("max delay ({max:?}) must not be less than min delay ({min:?})")]
    DelayRange { min: Duration, max: Duration },

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("invalid amount '{0}'; use a decimal ether amount or '<amount> <unit>'")]
    InvalidValue(String),

    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("chain id mismatch: network '{network}' expects {expected}, endpoint reports {actual}")]
    ChainIdMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },
}

impl ConfigError {
    pub fn invalid_private_key(line: usize, raw: &str) -> Self {
        Self::InvalidPrivateKey {
            line,
            preview: raw.chars().take(10).collect(),
        }
    }

    pub fn chain_id_mismatch(network: impl ToString, expected: u64, actual: u64) -> Self {
        Self::ChainIdMismatch {
            network: network.to_string(),
            expected,
            actual,
        }
    }
}
