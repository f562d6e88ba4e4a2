use crate::error::ConfigError;

/// A known chain and its default public endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    /// Short identifier used on the command line and in env var names.
    pub key: &'static str,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub chain_id: u64,
    pub explorer_url: Option<&'static str>,
    /// Native currency symbol.
    pub symbol: &'static str,
}

pub const SUPPORTED_NETWORKS: &[Network] = &[
    Network {
        key: "ethereum",
        name: "Ethereum Mainnet",
        rpc_url: "https://ethereum-rpc.publicnode.com",
        chain_id: 1,
        explorer_url: Some("https://etherscan.io"),
        symbol: "ETH",
    },
    Network {
        key: "base",
        name: "Base Mainnet",
        rpc_url: "https://mainnet.base.org",
        chain_id: 8453,
        explorer_url: Some("https://basescan.org"),
        symbol: "ETH",
    },
    Network {
        key: "monad",
        name: "Monad",
        rpc_url: "https://rpc.monad.xyz",
        chain_id: 143,
        explorer_url: Some("https://monadvision.com"),
        symbol: "MON",
    },
    Network {
        key: "polygon",
        name: "Polygon Mainnet",
        rpc_url: "https://polygon-rpc.com",
        chain_id: 137,
        explorer_url: Some("https://polygonscan.com"),
        symbol: "POL",
    },
    Network {
        key: "bsc",
        name: "BSC Mainnet",
        rpc_url: "https://bsc-dataseed1.binance.org",
        chain_id: 56,
        explorer_url: Some("https://bscscan.com"),
        symbol: "BNB",
    },
    Network {
        key: "arbitrum",
        name: "Arbitrum Mainnet",
        rpc_url: "https://arb1.arbitrum.io/rpc",
        chain_id: 42161,
        explorer_url: Some("https://arbiscan.io"),
        symbol: "ETH",
    },
    Network {
        key: "sepolia",
        name: "Sepolia Testnet",
        rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
        chain_id: 11155111,
        explorer_url: Some("https://sepolia.etherscan.io"),
        symbol: "ETH",
    },
    Network {
        key: "local",
        name: "Local devnet",
        rpc_url: "http://localhost:8545",
        chain_id: 31337,
        explorer_url: None,
        symbol: "ETH",
    },
];

impl Network {
    /// Finds a network by key, name (case-insensitive) or chain id.
    pub fn find(query: &str) -> Result<&'static Network, ConfigError> {
        let query = query.trim();
        SUPPORTED_NETWORKS
            .iter()
            .find(|n| {
                n.key.eq_ignore_ascii_case(query)
                    || n.name.eq_ignore_ascii_case(query)
                    || query.parse::<u64>().is_ok_and(|id| id == n.chain_id)
            })
            .ok_or_else(|| ConfigError::UnknownNetwork(query.to_owned()))
    }

    /// Name of the environment variable that overrides this network's RPC URL.
    pub fn rpc_env_var(&self) -> String {
        format!("BATCHCALL_{}_RPC_URL", self.key.to_ascii_uppercase())
    }

    /// RPC URL, taking the environment override into account.
    pub fn resolve_rpc_url(&self) -> String {
        std::env::var(self.rpc_env_var())
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.rpc_url.to_owned())
    }

    pub fn verify_chain_id(&self, actual: u64) -> Result<(), ConfigError> {
        if actual != self.chain_id {
            return Err(ConfigError::chain_id_mismatch(self.name, self.chain_id, actual));
        }
        Ok(())
    }
}
