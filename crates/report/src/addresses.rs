use std::{fs, path::Path};

use alloy::primitives::{Address, U256};

use crate::{Error, Result};

pub const ADDRESS_FILE: &str = "address.txt";

const WEI_PER_MICRO_ETHER: u64 = 1_000_000_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressEntry {
    pub address: Address,
    pub balance: Option<U256>,
}

/// Formats wei as ether with exactly six decimals, rounded half up.
pub fn format_balance(wei: U256) -> String {
    let step = U256::from(WEI_PER_MICRO_ETHER);
    let micro = wei.saturating_add(step / U256::from(2)) / step;
    let (whole, frac) = micro.div_rem(U256::from(1_000_000u64));
    format!("{whole}.{:06}", frac.to::<u64>())
}

/// One entry per line: `address` or `address-balance`.
pub fn render_address_list(entries: &[AddressEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        match entry.balance {
            Some(balance) => out.push_str(&format!("{}-{}", entry.address, format_balance(balance))),
            None => out.push_str(&entry.address.to_string()),
        }
        out.push('\n');
    }
    out
}

pub fn write_address_list(path: impl AsRef<Path>, entries: &[AddressEntry]) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_address_list(entries)).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
