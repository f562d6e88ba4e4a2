mod logging;
pub mod mock;
mod rpc;

pub use logging::{RpcLoggingLayer, RpcLoggingService};
pub use mock::MockEndpoint;
pub use rpc::RpcEndpoint;

use std::time::Duration;

use alloy::{
    network::{Ethereum, TransactionBuilderError},
    primitives::{Address, TxHash, U256},
    providers::PendingTransactionError,
    rpc::types::TransactionRequest,
    transports::{RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use thiserror::Error;

use crate::wallet::WalletKey;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),

    #[error("failed to watch pending tx: {0}")]
    PendingTx(#[from] PendingTransactionError),

    #[error("failed to build tx: {0}")]
    TransactionBuilder(#[from] TransactionBuilderError<Ethereum>),

    #[error("no receipt for tx {0} after {1:?}")]
    ConfirmationTimeout(TxHash, Duration),

    #[error("{0}")]
    Other(String),
}

/// Facts from an included transaction's receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// `false` when the transaction was included but reverted.
    pub success: bool,
}

/// The subset of a JSON-RPC node the executor needs.
///
/// Implementations must tolerate concurrent in-flight calls and must not retry;
/// errors are returned to the caller as-is.
#[async_trait]
pub trait ChainEndpoint: Send + Sync {
    async fn chain_id(&self) -> Result<u64, EndpointError>;

    async fn balance(&self, address: Address) -> Result<U256, EndpointError>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, EndpointError>;

    /// Legacy gas price in wei, or `None` when the network doesn't report one.
    async fn fee_rate(&self) -> Result<Option<u128>, EndpointError>;

    /// Fills nonce and chain id, signs with `wallet` and broadcasts.
    async fn submit(
        &self,
        wallet: &WalletKey,
        tx: TransactionRequest,
    ) -> Result<TxHash, EndpointError>;

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, EndpointError>;
}
