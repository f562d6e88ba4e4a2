use std::{path::PathBuf, sync::Arc, time::Duration};

use alloy::primitives::{utils::format_ether, Address, U256};
use batchcall_core::{
    callback::LogCallback,
    dispatcher::BatchDispatcher,
    endpoint::{ChainEndpoint, RpcEndpoint},
    error::ConfigError,
    network::{Network, SUPPORTED_NETWORKS},
    outcome::ResultSet,
    plan::{parse_value, ExecutionPlan, DEFAULT_CONFIRMATION_TIMEOUT, MAX_CONCURRENCY},
    wallet::{load_wallets, InvalidKeyPolicy},
};
use batchcall_report::results::write_results;
use nu_ansi_term::Color;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use super::{call_spec::resolve_call_spec, error::ArgsError};
use crate::{
    config::RunConfig,
    error::CliError,
    util::{bold, prompt_continue, prompt_parsed, prompt_select, prompt_validated},
};

#[derive(Clone, Debug, clap::Args)]
pub struct RunCliArgs {
    /// TOML file with run parameters. Flags given on the command line take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Network to use (key, name or chain id). See `batchcall networks`.
    #[arg(short, long, env = "BATCHCALL_NETWORK")]
    pub network: Option<String>,

    /// RPC URL to send requests to, overriding the network's default.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// File with one private key per line.
    #[arg(short, long, env = "BATCHCALL_WALLETS")]
    pub wallets: Option<PathBuf>,

    /// Address of the contract to call.
    #[arg(long, visible_alias = "to")]
    pub contract: Option<String>,

    /// Human-readable function signature, e.g. "mint(address,uint256)".
    #[arg(long)]
    pub signature: Option<String>,

    /// Path to a JSON ABI file.
    #[arg(long)]
    pub abi: Option<PathBuf>,

    /// Function to call from the ABI file.
    #[arg(short, long)]
    pub function: Option<String>,

    /// Value for a non-address parameter, in declaration order. May be repeated.
    #[arg(short, long = "arg", action = clap::ArgAction::Append)]
    pub args: Option<Vec<String>>,

    /// Raw calldata; one 32-byte word is replaced with each wallet's address.
    #[arg(long)]
    pub input_data: Option<String>,

    /// Index of the 32-byte word (after the selector) that receives the wallet address.
    #[arg(long, requires = "input_data")]
    pub address_slot: Option<usize>,

    /// Wallets processed at the same time (1-10).
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Sends per wallet.
    #[arg(short, long)]
    pub repetitions: Option<u32>,

    /// Minimum pause in seconds between a wallet's successful sends.
    #[arg(long)]
    pub min_delay: Option<f64>,

    /// Maximum pause in seconds between a wallet's successful sends.
    #[arg(long)]
    pub max_delay: Option<f64>,

    /// Native currency sent with every call, e.g. "0.01" or "20 gwei".
    #[arg(long)]
    pub value: Option<String>,

    /// Seconds to wait for each receipt.
    #[arg(long)]
    pub confirmation_timeout: Option<u64>,

    /// Pause in milliseconds before a worker moves on to its next wallet.
    #[arg(long)]
    pub wallet_throttle_ms: Option<u64>,

    /// Directory for the results file.
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Don't prompt: use defaults for missing values and skip confirmations.
    #[arg(short, long)]
    pub yes: bool,
}

impl RunCliArgs {
    fn to_config(&self) -> RunConfig {
        RunConfig {
            network: self.network.to_owned(),
            rpc_url: self.rpc_url.to_owned(),
            wallets: self.wallets.to_owned(),
            contract: self.contract.to_owned(),
            signature: self.signature.to_owned(),
            abi: self.abi.to_owned(),
            function: self.function.to_owned(),
            args: self.args.to_owned(),
            input_data: self.input_data.to_owned(),
            address_slot: self.address_slot,
            concurrency: self.concurrency,
            repetitions: self.repetitions,
            min_delay: self.min_delay,
            max_delay: self.max_delay,
            value: self.value.to_owned(),
            confirmation_timeout: self.confirmation_timeout,
            wallet_throttle_ms: self.wallet_throttle_ms,
            out_dir: self.out_dir.to_owned(),
        }
    }
}

/// Network the run targets: a table entry, or a bare RPC URL.
enum Target {
    Known(&'static Network),
    Custom(String),
}

impl Target {
    fn rpc_url(&self, rpc_override: Option<&str>) -> String {
        if let Some(url) = rpc_override {
            return url.to_owned();
        }
        match self {
            Target::Known(network) => network.resolve_rpc_url(),
            Target::Custom(url) => url.to_owned(),
        }
    }

    fn name(&self, chain_id: u64) -> String {
        match self {
            Target::Known(network) => network.name.to_owned(),
            Target::Custom(_) => format!("custom (chain id {chain_id})"),
        }
    }

    fn explorer_url(&self) -> Option<&'static str> {
        match self {
            Target::Known(network) => network.explorer_url,
            Target::Custom(_) => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Target::Known(network) => network.symbol,
            Target::Custom(_) => "ETH",
        }
    }
}

pub async fn run(args: RunCliArgs) -> Result<(), CliError> {
    let assume_yes = args.yes;
    let config = match &args.config {
        Some(path) => args.to_config().or(RunConfig::from_file(path)?),
        None => args.to_config(),
    };

    // everything that can fail without touching the network comes first
    let wallet_path = config
        .wallets
        .to_owned()
        .unwrap_or_else(|| PathBuf::from("wallets.txt"));
    let wallets = load_wallets(&wallet_path, InvalidKeyPolicy::Abort)?;

    let target = select_target(&config, assume_yes)?;
    let url: Url = target
        .rpc_url(config.rpc_url.as_deref())
        .parse()
        .map_err(ArgsError::from)?;

    let contract = match &config.contract {
        Some(contract) => parse_address(contract)?,
        None if assume_yes => {
            return Err(ArgsError::MissingValue {
                flag: "--yes",
                required: "--contract",
            }
            .into())
        }
        None => prompt_parsed::<Address>("Contract address", None)?,
    };
    let call = resolve_call_spec(&config, contract, assume_yes)?;
    let plan = build_plan(&config, assume_yes)?;

    info!("connecting to {url}");
    let endpoint = Arc::new(RpcEndpoint::connect(url).await?);
    let chain_id = endpoint.chain_id().await?;
    if let Target::Known(network) = &target {
        network.verify_chain_id(chain_id)?;
    }
    let network_name = target.name(chain_id);

    print_overview(
        &network_name,
        &call.describe(),
        contract,
        wallets.len(),
        &plan,
        target.symbol(),
    );
    if !assume_yes && !prompt_continue(Some("Start sending? [y/N]"))? {
        return Err(ArgsError::Aborted.into());
    }

    let cancel_token = CancellationToken::new();
    spawn_ctrl_c_handler(cancel_token.clone());

    let dispatcher = BatchDispatcher::new(endpoint, call, plan)
        .with_callback(LogCallback::new(target.explorer_url()))
        .with_network(network_name)
        .with_cancel_token(cancel_token);
    let results = dispatcher.dispatch(wallets).await?;

    let out_dir = config.out_dir.unwrap_or_else(|| PathBuf::from("."));
    let path = write_results(&out_dir, &results)?;
    print_summary(&results);
    println!("\nresults saved to {}", bold(path.display().to_string()));
    Ok(())
}

fn select_target(config: &RunConfig, assume_yes: bool) -> Result<Target, CliError> {
    if let Some(query) = &config.network {
        return Ok(Target::Known(Network::find(query)?));
    }
    if let Some(url) = &config.rpc_url {
        return Ok(Target::Custom(url.to_owned()));
    }
    if assume_yes {
        return Err(ArgsError::MissingValue {
            flag: "--yes",
            required: "--network or --rpc-url",
        }
        .into());
    }
    let names = SUPPORTED_NETWORKS
        .iter()
        .map(|n| format!("{} ({})", n.name, n.symbol))
        .collect::<Vec<_>>();
    let choice = prompt_select("Select a network:", &names)?;
    Ok(Target::Known(&SUPPORTED_NETWORKS[choice]))
}

fn parse_address(input: &str) -> Result<Address, ConfigError> {
    input
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidAddress(input.to_owned()))
}

fn seconds(value: f64) -> Result<Duration, ArgsError> {
    Duration::try_from_secs_f64(value).map_err(|_| ArgsError::InvalidDelay(value))
}

/// Builds the plan from `config`, asking for anything missing unless `assume_yes`.
fn build_plan(config: &RunConfig, assume_yes: bool) -> Result<ExecutionPlan, CliError> {
    let ask = !assume_yes;
    let concurrency = match config.concurrency {
        Some(n) => n,
        None if ask => prompt_validated(
            format!("Concurrent wallets (1-{MAX_CONCURRENCY})"),
            Some(1),
            |n: &usize| {
                if (1..=MAX_CONCURRENCY).contains(n) {
                    Ok(())
                } else {
                    Err(format!("must be between 1 and {MAX_CONCURRENCY}"))
                }
            },
        )?,
        None => 1,
    };
    let repetitions = match config.repetitions {
        Some(n) => n,
        None if ask => prompt_validated("Sends per wallet", Some(1u32), |n| {
            if *n > 0 {
                Ok(())
            } else {
                Err("must be at least 1".to_owned())
            }
        })?,
        None => 1,
    };
    let min_delay = match config.min_delay {
        Some(s) => s,
        None if ask && repetitions > 1 => {
            prompt_parsed("Minimum delay between sends (s)", Some(0.0))?
        }
        None => 0.0,
    };
    let max_delay = match config.max_delay {
        Some(s) => s,
        None if ask && repetitions > 1 => {
            prompt_validated("Maximum delay between sends (s)", Some(min_delay), |s: &f64| {
                if *s >= min_delay {
                    Ok(())
                } else {
                    Err(format!("must be at least {min_delay}"))
                }
            })?
        }
        None => min_delay,
    };
    let value = match &config.value {
        Some(v) => parse_value(v)?,
        None if ask => prompt_value()?,
        None => U256::ZERO,
    };

    let mut plan = ExecutionPlan::new(concurrency, repetitions)?
        .with_delay(seconds(min_delay)?, seconds(max_delay)?)?
        .with_value(value)
        .with_confirmation_timeout(
            config
                .confirmation_timeout
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONFIRMATION_TIMEOUT),
        );
    if let Some(ms) = config.wallet_throttle_ms {
        plan = plan.with_wallet_throttle(Duration::from_millis(ms));
    }
    Ok(plan)
}

fn prompt_value() -> Result<U256, CliError> {
    loop {
        let input = prompt_parsed::<String>("Value to send with each call", Some("0".to_owned()))?;
        match parse_value(&input) {
            Ok(value) => return Ok(value),
            Err(e) => println!("{}", Color::Red.paint(e.to_string())),
        }
    }
}

fn spawn_ctrl_c_handler(cancel_token: CancellationToken) {
    tokio::task::spawn(async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    warn!("CTRL-C received, finishing in-flight sends and cancelling the rest...");
                    cancel_token.cancel();
                }
            }
            _ = cancel_token.cancelled() => {}
        }
    });
}

fn print_overview(
    network: &str,
    payload: &str,
    contract: Address,
    wallet_count: usize,
    plan: &ExecutionPlan,
    symbol: &str,
) {
    println!("\n{}", bold("Run overview"));
    println!("  network      {network}");
    println!("  contract     {contract}");
    println!("  call         {payload}");
    println!("  wallets      {wallet_count}");
    println!("  concurrency  {}", plan.concurrency);
    println!("  repetitions  {}", plan.repetitions);
    println!(
        "  delay        {:?} - {:?}",
        plan.min_delay, plan.max_delay
    );
    println!("  value        {} {symbol}", format_ether(plan.value));
    println!(
        "  total sends  {}\n",
        wallet_count * plan.repetitions as usize
    );
}

fn print_summary(results: &ResultSet) {
    let summary = results.summary();
    println!("\n{}", bold("Summary"));
    println!("  network      {}", results.metadata.network);
    println!("  contract     {}", results.metadata.contract_address);
    println!(
        "  succeeded    {}",
        Color::Green.paint(format!("{}/{}", summary.succeeded, summary.total))
    );
    if summary.failed > 0 {
        println!(
            "  failed       {}",
            Color::Red.paint(format!("{}/{}", summary.failed, summary.total))
        );
    }
    println!("  gas used     {}", summary.total_gas_used);

    if summary.failed > 0 {
        println!("\n{}", bold("Failures"));
        for outcome in results.failures() {
            println!(
                "  wallet {} {} ({}/{}): {}",
                outcome.wallet_index + 1,
                outcome.wallet_address,
                outcome.repetition,
                outcome.total_repetitions,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_from_config_without_prompts() {
        let config = RunConfig {
            concurrency: Some(4),
            repetitions: Some(3),
            min_delay: Some(0.5),
            max_delay: Some(1.5),
            value: Some("1 gwei".to_owned()),
            wallet_throttle_ms: Some(0),
            ..Default::default()
        };
        let plan = build_plan(&config, true).unwrap();
        assert_eq!(plan.concurrency, 4);
        assert_eq!(plan.repetitions, 3);
        assert_eq!(plan.min_delay, Duration::from_millis(500));
        assert_eq!(plan.max_delay, Duration::from_millis(1500));
        assert_eq!(plan.value, U256::from(1_000_000_000u64));
        assert_eq!(plan.wallet_throttle, Duration::ZERO);
        assert_eq!(plan.confirmation_timeout, DEFAULT_CONFIRMATION_TIMEOUT);
    }

    #[test]
    fn defaults_apply_with_yes() {
        let plan = build_plan(&RunConfig::default(), true).unwrap();
        assert_eq!(plan, ExecutionPlan::default());
    }

    #[test]
    fn invalid_plan_values_are_config_errors() {
        let config = RunConfig {
            concurrency: Some(11),
            ..Default::default()
        };
        assert!(matches!(
            build_plan(&config, true),
            Err(CliError::Config(ConfigError::ConcurrencyOutOfRange { .. }))
        ));

        let config = RunConfig {
            min_delay: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            build_plan(&config, true),
            Err(CliError::Args(ArgsError::InvalidDelay(_)))
        ));

        let config = RunConfig {
            min_delay: Some(3.0),
            max_delay: Some(1.0),
            ..Default::default()
        };
        assert!(matches!(
            build_plan(&config, true),
            Err(CliError::Config(ConfigError::DelayRange { .. }))
        ));
    }

    #[test]
    fn network_flag_beats_rpc_url() {
        let config = RunConfig {
            network: Some("sepolia".to_owned()),
            rpc_url: Some("http://localhost:8545".to_owned()),
            ..Default::default()
        };
        match select_target(&config, true).unwrap() {
            Target::Known(network) => assert_eq!(network.chain_id, 11155111),
            Target::Custom(_) => panic!("expected a known network"),
        }

        let config = RunConfig {
            rpc_url: Some("http://localhost:8545".to_owned()),
            ..Default::default()
        };
        let target = select_target(&config, true).unwrap();
        assert!(matches!(target, Target::Custom(_)));
        assert_eq!(target.rpc_url(None), "http://localhost:8545");
        assert_eq!(target.name(5), "custom (chain id 5)");
        assert!(select_target(&RunConfig::default(), true).is_err());
    }

    #[test]
    fn parses_contract_addresses() {
        assert_eq!(
            parse_address(" 0x4242424242424242424242424242424242424242 ").unwrap(),
            Address::repeat_byte(0x42)
        );
        assert!(matches!(
            parse_address("0x1234"),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
