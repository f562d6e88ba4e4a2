use batchcall_core::network::SUPPORTED_NETWORKS;

use crate::util::bold;

pub fn networks() {
    println!(
        "{}",
        bold(format!(
            "{:<10} {:<18} {:>9}  {:<6} {}",
            "key", "name", "chain id", "symbol", "rpc url"
        ))
    );
    for network in SUPPORTED_NETWORKS {
        println!(
            "{:<10} {:<18} {:>9}  {:<6} {}",
            network.key,
            network.name,
            network.chain_id,
            network.symbol,
            network.resolve_rpc_url()
        );
    }
    println!(
        "\nOverride a network's RPC URL with BATCHCALL_<KEY>_RPC_URL, e.g. {}",
        bold("BATCHCALL_BASE_RPC_URL")
    );
}
