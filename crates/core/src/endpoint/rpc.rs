use std::time::Duration;

use alloy::{
    network::{EthereumWallet, ReceiptResponse, TransactionBuilder},
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::{client::ClientBuilder, types::TransactionRequest},
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use tracing::debug;

use super::{ChainEndpoint, Confirmation, EndpointError, RpcLoggingLayer};
use crate::wallet::WalletKey;

/// [`ChainEndpoint`] over a JSON-RPC HTTP connection.
#[derive(Clone)]
pub struct RpcEndpoint {
    provider: DynProvider,
    chain_id: u64,
}

impl RpcEndpoint {
    /// Connects to `url` and caches the chain id used for signing.
    pub async fn connect(url: Url) -> Result<Self, EndpointError> {
        let client = ClientBuilder::default()
            .layer(RpcLoggingLayer::new())
            .http(url.clone());
        let provider = DynProvider::new(ProviderBuilder::new().connect_client(client));
        let chain_id = provider.get_chain_id().await?;
        debug!("connected to {url} (chain id {chain_id})");
        Ok(Self { provider, chain_id })
    }
}

#[async_trait]
impl ChainEndpoint for RpcEndpoint {
    async fn chain_id(&self) -> Result<u64, EndpointError> {
        Ok(self.chain_id)
    }

    async fn balance(&self, address: Address) -> Result<U256, EndpointError> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, EndpointError> {
        Ok(self.provider.estimate_gas(tx.to_owned()).await?)
    }

    async fn fee_rate(&self) -> Result<Option<u128>, EndpointError> {
        let gas_price = self.provider.get_gas_price().await?;
        Ok((gas_price > 0).then_some(gas_price))
    }

    async fn submit(
        &self,
        wallet: &WalletKey,
        tx: TransactionRequest,
    ) -> Result<TxHash, EndpointError> {
        let nonce = self
            .provider
            .get_transaction_count(wallet.address())
            .pending()
            .await?;
        let tx = tx
            .with_from(wallet.address())
            .with_nonce(nonce)
            .with_chain_id(self.chain_id);

        let eth_wallet = EthereumWallet::from(wallet.signer().to_owned());
        let envelope = tx.build(&eth_wallet).await?;
        let pending = self.provider.send_tx_envelope(envelope).await?;
        Ok(*pending.tx_hash())
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, EndpointError> {
        let pending = PendingTransactionBuilder::new(self.provider.root().to_owned(), tx_hash);
        let receipt = tokio::time::timeout(timeout, pending.get_receipt())
            .await
            .map_err(|_| EndpointError::ConfirmationTimeout(tx_hash, timeout))??;
        Ok(Confirmation {
            tx_hash,
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
            success: receipt.status(),
        })
    }
}
