//! Optional TOML file holding run parameters.
//!
//! ```toml
//! network = "base"
//! wallets = "wallets.txt"
//! contract = "0x..."
//! signature = "mint(address,uint256)"
//! args = ["1"]
//! concurrency = 3
//! repetitions = 2
//! min_delay = 1.5
//! max_delay = 4
//! value = "0.001"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::commands::error::ArgsError;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub wallets: Option<PathBuf>,
    pub contract: Option<String>,
    pub signature: Option<String>,
    pub abi: Option<PathBuf>,
    pub function: Option<String>,
    pub args: Option<Vec<String>>,
    pub input_data: Option<String>,
    pub address_slot: Option<usize>,
    pub concurrency: Option<usize>,
    pub repetitions: Option<u32>,
    /// Seconds.
    pub min_delay: Option<f64>,
    /// Seconds.
    pub max_delay: Option<f64>,
    pub value: Option<String>,
    /// Seconds.
    pub confirmation_timeout: Option<u64>,
    pub wallet_throttle_ms: Option<u64>,
    pub out_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArgsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ArgsError::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ArgsError> {
        Ok(toml::from_str(contents)?)
    }

    /// Fills every field missing in `self` from `fallback`.
    pub fn or(self, fallback: RunConfig) -> Self {
        Self {
            network: self.network.or(fallback.network),
            rpc_url: self.rpc_url.or(fallback.rpc_url),
            wallets: self.wallets.or(fallback.wallets),
            contract: self.contract.or(fallback.contract),
            signature: self.signature.or(fallback.signature),
            abi: self.abi.or(fallback.abi),
            function: self.function.or(fallback.function),
            args: self.args.or(fallback.args),
            input_data: self.input_data.or(fallback.input_data),
            address_slot: self.address_slot.or(fallback.address_slot),
            concurrency: self.concurrency.or(fallback.concurrency),
            repetitions: self.repetitions.or(fallback.repetitions),
            min_delay: self.min_delay.or(fallback.min_delay),
            max_delay: self.max_delay.or(fallback.max_delay),
            value: self.value.or(fallback.value),
            confirmation_timeout: self.confirmation_timeout.or(fallback.confirmation_timeout),
            wallet_throttle_ms: self.wallet_throttle_ms.or(fallback.wallet_throttle_ms),
            out_dir: self.out_dir.or(fallback.out_dir),
        }
    }
}
