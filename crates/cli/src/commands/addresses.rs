use std::path::PathBuf;

use alloy::primitives::U256;
use batchcall_core::{
    endpoint::{ChainEndpoint, RpcEndpoint},
    network::Network,
    wallet::{load_wallets, InvalidKeyPolicy, WalletKey},
};
use batchcall_report::addresses::{write_address_list, AddressEntry, ADDRESS_FILE};
use futures::StreamExt;
use tracing::{info, warn};
use url::Url;

use super::error::ArgsError;
use crate::error::CliError;

const BALANCE_QUERY_CONCURRENCY: usize = 8;

const DEFAULT_BALANCE_NETWORK: &str = "ethereum";

#[derive(Clone, Debug, clap::Args)]
pub struct AddressesCliArgs {
    /// File with one private key per line. Invalid lines are skipped.
    #[arg(
        short,
        long,
        env = "BATCHCALL_WALLETS",
        default_value = "wallets.txt"
    )]
    pub wallets: PathBuf,

    /// Append each address's native balance, formatted as `address-balance`.
    #[arg(long)]
    pub balance: bool,

    /// Network used for balance queries (key, name or chain id). Defaults to
    /// Ethereum mainnet unless --rpc-url is set.
    #[arg(short, long)]
    pub network: Option<String>,

    /// RPC URL used for balance queries instead of the network's default.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Output file.
    #[arg(short, long, default_value = ADDRESS_FILE)]
    pub out: PathBuf,
}

pub async fn addresses(args: AddressesCliArgs) -> Result<(), CliError> {
    let wallets = load_wallets(&args.wallets, InvalidKeyPolicy::Skip)?;

    let balances = if args.balance {
        let (url, network) = match (args.rpc_url, &args.network) {
            (Some(url), None) => (url, None),
            (rpc_url, query) => {
                let network = Network::find(query.as_deref().unwrap_or(DEFAULT_BALANCE_NETWORK))?;
                let url = match rpc_url {
                    Some(url) => url,
                    None => network
                        .resolve_rpc_url()
                        .parse()
                        .map_err(ArgsError::from)?,
                };
                (url, Some(network))
            }
        };
        let endpoint = RpcEndpoint::connect(url).await?;
        let chain_id = endpoint.chain_id().await?;
        if let Some(network) = network {
            network.verify_chain_id(chain_id)?;
        }
        info!("fetching balances on chain {chain_id}");
        Some(fetch_balances(&endpoint, &wallets).await)
    } else {
        None
    };

    let entries = address_entries(&wallets, balances);
    write_address_list(&args.out, &entries)?;
    info!(
        "wrote {} address(es) to {}",
        entries.len(),
        args.out.display()
    );
    Ok(())
}

/// Balances in wallet order. A failed query counts as zero.
async fn fetch_balances(endpoint: &impl ChainEndpoint, wallets: &[WalletKey]) -> Vec<U256> {
    futures::stream::iter(wallets)
        .map(|wallet| async move {
            endpoint
                .balance(wallet.address())
                .await
                .unwrap_or_else(|e| {
                    warn!("failed to fetch balance of {}: {e}", wallet.address());
                    U256::ZERO
                })
        })
        .buffered(BALANCE_QUERY_CONCURRENCY)
        .collect()
        .await
}

fn address_entries(wallets: &[WalletKey], balances: Option<Vec<U256>>) -> Vec<AddressEntry> {
    match balances {
        Some(balances) => wallets
            .iter()
            .zip(balances)
            .map(|(wallet, balance)| AddressEntry {
                address: wallet.address(),
                balance: Some(balance),
            })
            .collect(),
        None => wallets
            .iter()
            .map(|wallet| AddressEntry {
                address: wallet.address(),
                balance: None,
            })
            .collect(),
    }
}
