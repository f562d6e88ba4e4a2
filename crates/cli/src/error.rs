use batchcall_core::{endpoint::EndpointError, error::ConfigError, payload::PayloadError};
use miette::Diagnostic;
use thiserror::Error;

use crate::commands::error::ArgsError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("invalid arg(s)")]
    Args(#[from] ArgsError),

    #[error("invalid configuration")]
    #[diagnostic(help("check the wallet file, network and run parameters"))]
    Config(#[from] ConfigError),

    #[error("core error")]
    Core(#[from] batchcall_core::Error),

    #[error("failed to reach the RPC endpoint")]
    #[diagnostic(help("set --rpc-url or the network's BATCHCALL_<NETWORK>_RPC_URL variable"))]
    Endpoint(#[from] EndpointError),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("invalid call payload")]
    Payload(#[from] PayloadError),

    #[error("report error")]
    Report(#[from] batchcall_report::Error),
}
