//! In-memory [`ChainEndpoint`] used by executor and dispatcher tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use alloy::{
    network::TransactionBuilder,
    primitives::{keccak256, Address, TxHash, U256},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;

use super::{ChainEndpoint, Confirmation, EndpointError};
use crate::wallet::WalletKey;

#[derive(Debug, Default)]
pub struct MockCalls {
    pub balance: AtomicUsize,
    pub estimate_gas: AtomicUsize,
    pub fee_rate: AtomicUsize,
    pub submit: AtomicUsize,
    pub await_confirmation: AtomicUsize,
}

#[derive(Debug)]
pub struct MockEndpoint {
    chain_id: u64,
    balance: U256,
    balances: HashMap<Address, U256>,
    gas_estimate: u64,
    gas_price: Option<u128>,
    latency: Duration,
    failing_senders: HashSet<Address>,
    reverting: bool,
    fail_estimate: bool,
    pub calls: MockCalls,
    submitted: Mutex<Vec<TransactionRequest>>,
    in_flight: Mutex<HashMap<Address, usize>>,
    pending_senders: Mutex<HashMap<TxHash, Address>>,
    current_in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    max_in_flight_per_wallet: AtomicUsize,
    block_number: AtomicU64,
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            balance: U256::from(10u128.pow(18)),
            balances: HashMap::new(),
            gas_estimate: 50_000,
            gas_price: Some(1_000_000_000),
            latency: Duration::ZERO,
            failing_senders: HashSet::new(),
            reverting: false,
            fail_estimate: false,
            calls: MockCalls::default(),
            submitted: Mutex::new(vec![]),
            in_flight: Mutex::new(HashMap::new()),
            pending_senders: Mutex::new(HashMap::new()),
            current_in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            max_in_flight_per_wallet: AtomicUsize::new(0),
            block_number: AtomicU64::new(1),
        }
    }
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance reported for every address without an explicit balance.
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_balance_for(mut self, address: Address, balance: U256) -> Self {
        self.balances.insert(address, balance);
        self
    }

    pub fn with_gas_estimate(mut self, gas: u64) -> Self {
        self.gas_estimate = gas;
        self
    }

    pub fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Time spent waiting for each receipt. A latency beyond the caller's
    /// confirmation timeout ends in [`EndpointError::ConfirmationTimeout`].
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Submissions signed by `address` are rejected.
    pub fn with_failing_sender(mut self, address: Address) -> Self {
        self.failing_senders.insert(address);
        self
    }

    /// Every receipt reports a reverted transaction.
    pub fn reverting(mut self) -> Self {
        self.reverting = true;
        self
    }

    pub fn failing_estimate(mut self) -> Self {
        self.fail_estimate = true;
        self
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().expect("poisoned").clone()
    }

    pub fn submit_count(&self) -> usize {
        self.calls.submit.load(Ordering::SeqCst)
    }

    /// Highest number of sends that were between submission and receipt at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous in-flight sends from any single wallet.
    pub fn max_in_flight_per_wallet(&self) -> usize {
        self.max_in_flight_per_wallet.load(Ordering::SeqCst)
    }

    fn enter(&self, sender: Address) {
        let now = self.current_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let mut in_flight = self.in_flight.lock().expect("poisoned");
        let count = in_flight.entry(sender).or_default();
        *count += 1;
        self.max_in_flight_per_wallet
            .fetch_max(*count, Ordering::SeqCst);
    }

    fn exit(&self, sender: Address) {
        self.current_in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut in_flight = self.in_flight.lock().expect("poisoned");
        if let Some(count) = in_flight.get_mut(&sender) {
            *count = count.saturating_sub(1);
        }
    }
}

#[async_trait]
impl ChainEndpoint for MockEndpoint {
    async fn chain_id(&self) -> Result<u64, EndpointError> {
        Ok(self.chain_id)
    }

    async fn balance(&self, address: Address) -> Result<U256, EndpointError> {
        self.calls.balance.fetch_add(1, Ordering::SeqCst);
        Ok(self.balances.get(&address).copied().unwrap_or(self.balance))
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64, EndpointError> {
        self.calls.estimate_gas.fetch_add(1, Ordering::SeqCst);
        if self.fail_estimate {
            return Err(EndpointError::Other("execution reverted".to_owned()));
        }
        Ok(self.gas_estimate)
    }

    async fn fee_rate(&self) -> Result<Option<u128>, EndpointError> {
        self.calls.fee_rate.fetch_add(1, Ordering::SeqCst);
        Ok(self.gas_price)
    }

    async fn submit(
        &self,
        wallet: &WalletKey,
        tx: TransactionRequest,
    ) -> Result<TxHash, EndpointError> {
        let n = self.calls.submit.fetch_add(1, Ordering::SeqCst);
        let sender = wallet.address();
        if self.failing_senders.contains(&sender) {
            return Err(EndpointError::Other(format!(
                "insufficient funds for gas * price + value (from {sender})"
            )));
        }
        self.enter(sender);
        self.submitted
            .lock()
            .expect("poisoned")
            .push(tx.with_from(sender));
        let tx_hash = keccak256((n as u64).to_be_bytes());
        self.pending_senders
            .lock()
            .expect("poisoned")
            .insert(tx_hash, sender);
        Ok(tx_hash)
    }

    async fn await_confirmation(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, EndpointError> {
        self.calls.await_confirmation.fetch_add(1, Ordering::SeqCst);
        let mined = self.latency.is_zero()
            || tokio::time::timeout(timeout, tokio::time::sleep(self.latency))
                .await
                .is_ok();
        let sender = self
            .pending_senders
            .lock()
            .expect("poisoned")
            .remove(&tx_hash)
            .ok_or_else(|| EndpointError::Other(format!("unknown tx {tx_hash}")))?;
        self.exit(sender);
        if !mined {
            return Err(EndpointError::ConfirmationTimeout(tx_hash, timeout));
        }
        Ok(Confirmation {
            tx_hash,
            block_number: Some(self.block_number.fetch_add(1, Ordering::SeqCst)),
            gas_used: self.gas_estimate,
            success: !self.reverting,
        })
    }
}
