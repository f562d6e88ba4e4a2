use std::{sync::Arc, time::Duration};

use alloy::{
    network::TransactionBuilder,
    primitives::{utils::format_ether, TxHash, U256},
    rpc::types::TransactionRequest,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    callback::OnOutcome,
    endpoint::{ChainEndpoint, Confirmation, EndpointError},
    outcome::{Attempt, Outcome},
    payload::{CallSpec, PayloadError},
    plan::ExecutionPlan,
    wallet::WalletKey,
};

/// Gas price used when the endpoint doesn't report one (20 gwei).
pub const DEFAULT_GAS_PRICE: u128 = 20_000_000_000;

/// Headroom added on top of the node's gas estimate, in percent.
pub const GAS_LIMIT_MARGIN_PERCENT: u64 = 20;

/// Why a single send did not end in a successful receipt.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to build calldata: {0}")]
    Payload(#[from] PayloadError),

    #[error("gas estimation failed: {0}")]
    Estimate(#[source] EndpointError),

    #[error("failed to fetch gas price: {0}")]
    FeeRate(#[source] EndpointError),

    #[error("failed to fetch balance: {0}")]
    Balance(#[source] EndpointError),

    #[error(
        "insufficient balance: have {} ETH, need {} ETH (short {} ETH)",
        ether(.balance),
        ether(.required),
        ether(.shortfall)
    )]
    InsufficientBalance {
        balance: U256,
        required: U256,
        shortfall: U256,
    },

    #[error("submission rejected: {0}")]
    Submission(#[source] EndpointError),

    #[error("confirmation failed: {0}")]
    Confirmation(#[source] EndpointError),

    #[error("transaction {} reverted", .0.tx_hash)]
    Reverted(Confirmation),

    #[error("cancelled before submission")]
    Cancelled,
}

impl SendError {
    pub fn insufficient_balance(balance: U256, required: U256) -> Self {
        Self::InsufficientBalance {
            balance,
            required,
            shortfall: required.saturating_sub(balance),
        }
    }
}

fn ether(wei: &U256) -> String {
    format_ether(*wei)
}

/// `estimate + estimate * 20 / 100`, saturating.
pub fn gas_limit_with_margin(estimate: u64) -> u64 {
    let limit = estimate as u128 * (100 + GAS_LIMIT_MARGIN_PERCENT as u128) / 100;
    u64::try_from(limit).unwrap_or(u64::MAX)
}

/// Upper bound on what a send can cost: `gas_limit * gas_price + value`.
pub fn max_cost(gas_limit: u64, gas_price: u128, value: U256) -> U256 {
    U256::from(gas_limit)
        .saturating_mul(U256::from(gas_price))
        .saturating_add(value)
}

/// What became known about a send before it stopped.
#[derive(Debug, Default)]
struct SendProgress {
    gas_estimate: Option<u64>,
    tx_hash: Option<TxHash>,
}

/// Performs one complete send for one wallet: resolve calldata, estimate,
/// price, check balance, submit, await the receipt.
///
/// Never retries. Every failure becomes a failed [`Outcome`].
pub struct SendExecutor<E: ChainEndpoint + ?Sized> {
    endpoint: Arc<E>,
    call: Arc<CallSpec>,
    value: U256,
    confirmation_timeout: Duration,
}

impl<E: ChainEndpoint + ?Sized> SendExecutor<E> {
    pub fn new(endpoint: Arc<E>, call: Arc<CallSpec>, plan: &ExecutionPlan) -> Self {
        Self {
            endpoint,
            call,
            value: plan.value,
            confirmation_timeout: plan.confirmation_timeout,
        }
    }

    pub async fn execute<F: OnOutcome + ?Sized>(
        &self,
        wallet: &WalletKey,
        attempt: Attempt,
        callback: &F,
    ) -> Outcome {
        let mut progress = SendProgress::default();
        let res = self
            .try_send(wallet, &mut progress, |tx_hash| {
                callback.on_submitted(&attempt, wallet.address(), tx_hash)
            })
            .await;

        let mut outcome = match res {
            Ok(confirmation) => {
                let mut outcome = Outcome::confirmed(attempt, wallet.address());
                outcome.block_number = confirmation.block_number;
                outcome.gas_used = Some(confirmation.gas_used);
                outcome
            }
            Err(e) => {
                debug!("send from {} failed: {e:?}", wallet.address());
                let mut outcome = Outcome::failed(attempt, wallet.address(), &e);
                if let SendError::Reverted(confirmation) = e {
                    outcome.block_number = confirmation.block_number;
                    outcome.gas_used = Some(confirmation.gas_used);
                }
                outcome
            }
        };
        outcome.tx_hash = progress.tx_hash;
        outcome.gas_estimate = progress.gas_estimate;
        outcome
    }

    async fn try_send(
        &self,
        wallet: &WalletKey,
        progress: &mut SendProgress,
        on_submitted: impl FnOnce(TxHash),
    ) -> Result<Confirmation, SendError> {
        let from = wallet.address();
        let input = self.call.resolve(from)?;
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(self.call.to)
            .with_input(input)
            .with_value(self.value);

        let gas_estimate = self
            .endpoint
            .estimate_gas(&tx)
            .await
            .map_err(SendError::Estimate)?;
        progress.gas_estimate = Some(gas_estimate);
        let gas_limit = gas_limit_with_margin(gas_estimate);

        let gas_price = match self.endpoint.fee_rate().await.map_err(SendError::FeeRate)? {
            Some(price) => price,
            None => {
                debug!("no gas price reported, using {DEFAULT_GAS_PRICE} wei");
                DEFAULT_GAS_PRICE
            }
        };

        let required = max_cost(gas_limit, gas_price, self.value);
        let balance = self
            .endpoint
            .balance(from)
            .await
            .map_err(SendError::Balance)?;
        if balance < required {
            return Err(SendError::insufficient_balance(balance, required));
        }

        debug!("submitting from {from}: gas limit {gas_limit}, gas price {gas_price}");
        let tx = tx.with_gas_limit(gas_limit).with_gas_price(gas_price);
        let tx_hash = self
            .endpoint
            .submit(wallet, tx)
            .await
            .map_err(SendError::Submission)?;
        progress.tx_hash = Some(tx_hash);
        on_submitted(tx_hash);

        let confirmation = self
            .endpoint
            .await_confirmation(tx_hash, self.confirmation_timeout)
            .await
            .map_err(SendError::Confirmation)?;
        if !confirmation.success {
            return Err(SendError::Reverted(confirmation));
        }
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use alloy::primitives::Address;

    use super::*;
    use crate::{
        callback::NilCallback,
        endpoint::MockEndpoint,
        payload::FunctionCall,
        wallet::tests::get_test_wallets,
    };

    const FIRST: Attempt = Attempt {
        wallet_index: 0,
        repetition: 1,
        total_repetitions: 1,
    };

    fn mint_call() -> Arc<CallSpec> {
        let call = FunctionCall::from_signature("mint(address)", vec![]).unwrap();
        Arc::new(CallSpec::function(Address::repeat_byte(0x42), call))
    }

    fn executor(
        endpoint: MockEndpoint,
        plan: &ExecutionPlan,
    ) -> (Arc<MockEndpoint>, SendExecutor<MockEndpoint>) {
        let endpoint = Arc::new(endpoint);
        let executor = SendExecutor::new(endpoint.clone(), mint_call(), plan);
        (endpoint, executor)
    }

    #[test]
    fn gas_limit_adds_twenty_percent() {
        assert_eq!(gas_limit_with_margin(50_000), 60_000);
        assert_eq!(gas_limit_with_margin(7), 8);
        assert_eq!(gas_limit_with_margin(0), 0);
        assert_eq!(gas_limit_with_margin(u64::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn successful_send_records_receipt() {
        let plan = ExecutionPlan::default().with_value(U256::from(1000));
        let (endpoint, executor) = executor(MockEndpoint::new(), &plan);
        let wallet = &get_test_wallets()[0];

        let outcome = executor.execute(wallet, FIRST, &NilCallback).await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.wallet_address, wallet.address());
        assert!(outcome.tx_hash.is_some());
        assert_eq!(outcome.block_number, Some(1));
        assert_eq!(outcome.gas_estimate, Some(50_000));
        assert_eq!(outcome.gas_used, Some(50_000));

        let submitted = endpoint.submitted();
        assert_eq!(submitted.len(), 1);
        let tx = &submitted[0];
        assert_eq!(tx.gas, Some(60_000));
        assert_eq!(tx.gas_price, Some(1_000_000_000));
        assert_eq!(tx.value, Some(U256::from(1000)));
        assert_eq!(tx.from, Some(wallet.address()));
        let input = tx.input.input().unwrap();
        assert_eq!(&input[16..36], wallet.address().as_slice());
    }

    #[tokio::test]
    async fn falls_back_to_default_gas_price() {
        let plan = ExecutionPlan::default();
        let (endpoint, executor) =
            executor(MockEndpoint::new().with_gas_price(None), &plan);
        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(outcome.success);
        assert_eq!(endpoint.submitted()[0].gas_price, Some(DEFAULT_GAS_PRICE));
    }

    #[tokio::test]
    async fn balance_one_wei_short_is_never_submitted() {
        let value = U256::from(1000);
        let plan = ExecutionPlan::default().with_value(value);
        let required = max_cost(60_000, 1_000_000_000, value);
        let (endpoint, executor) = executor(
            MockEndpoint::new().with_balance(required - U256::from(1)),
            &plan,
        );

        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(!outcome.success);
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .starts_with("insufficient balance"));
        assert_eq!(outcome.gas_estimate, Some(50_000));
        assert!(outcome.tx_hash.is_none());
        assert_eq!(endpoint.submit_count(), 0);
    }

    #[tokio::test]
    async fn exact_balance_is_enough() {
        let value = U256::from(1000);
        let plan = ExecutionPlan::default().with_value(value);
        let required = max_cost(60_000, 1_000_000_000, value);
        let (endpoint, executor) = executor(MockEndpoint::new().with_balance(required), &plan);

        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(endpoint.submit_count(), 1);
    }

    #[tokio::test]
    async fn estimate_failure_stops_before_submission() {
        let plan = ExecutionPlan::default();
        let (endpoint, executor) = executor(MockEndpoint::new().failing_estimate(), &plan);
        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(!outcome.success);
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .contains("gas estimation failed"));
        assert!(outcome.gas_estimate.is_none());
        assert_eq!(endpoint.calls.balance.load(Ordering::SeqCst), 0);
        assert_eq!(endpoint.submit_count(), 0);
    }

    #[tokio::test]
    async fn reverted_receipt_is_a_failure_with_details() {
        let plan = ExecutionPlan::default();
        let (_, executor) = executor(MockEndpoint::new().reverting(), &plan);
        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("reverted"));
        assert!(outcome.tx_hash.is_some());
        assert!(outcome.block_number.is_some());
        assert_eq!(outcome.gas_used, Some(50_000));
    }

    #[tokio::test]
    async fn gas_limit_follows_the_estimate() {
        let plan = ExecutionPlan::default();
        let (endpoint, executor) =
            executor(MockEndpoint::new().with_gas_estimate(100_000), &plan);
        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.gas_estimate, Some(100_000));
        assert_eq!(endpoint.submitted()[0].gas, Some(120_000));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_receipt_keeps_the_tx_hash() {
        let plan = ExecutionPlan::default().with_confirmation_timeout(Duration::from_secs(1));
        let (endpoint, executor) = executor(
            MockEndpoint::new().with_latency(Duration::from_secs(5)),
            &plan,
        );
        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(!outcome.success);
        assert!(outcome.tx_hash.is_some());
        assert!(outcome.block_number.is_none());
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .starts_with("confirmation failed: no receipt"));
        assert_eq!(endpoint.submit_count(), 1);
    }

    #[tokio::test]
    async fn rejected_submission_is_reported() {
        let wallet = &get_test_wallets()[1];
        let plan = ExecutionPlan::default();
        let (endpoint, executor) = executor(
            MockEndpoint::new().with_failing_sender(wallet.address()),
            &plan,
        );
        let outcome = executor.execute(wallet, FIRST, &NilCallback).await;
        assert!(!outcome.success);
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .starts_with("submission rejected"));
        assert!(outcome.tx_hash.is_none());
        assert_eq!(endpoint.submit_count(), 1);
        assert_eq!(endpoint.calls.await_confirmation.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn payload_error_makes_no_rpc_calls() {
        let call = FunctionCall::from_signature("transfer(address,uint256)", vec![]).unwrap();
        let endpoint = Arc::new(MockEndpoint::new());
        let executor = SendExecutor::new(
            endpoint.clone(),
            Arc::new(CallSpec::function(Address::repeat_byte(0x42), call)),
            &ExecutionPlan::default(),
        );
        let outcome = executor
            .execute(&get_test_wallets()[0], FIRST, &NilCallback)
            .await;
        assert!(!outcome.success);
        assert!(outcome
            .error
            .as_deref()
            .unwrap()
            .starts_with("failed to build calldata"));
        assert_eq!(endpoint.calls.estimate_gas.load(Ordering::SeqCst), 0);
    }
}
