use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    callback::{NilCallback, OnOutcome},
    endpoint::ChainEndpoint,
    executor::{SendError, SendExecutor},
    outcome::{Attempt, Outcome, ResultSet, RunMetadata},
    payload::CallSpec,
    plan::ExecutionPlan,
    wallet::WalletKey,
    Result,
};

/// Runs the send executor over every wallet with bounded concurrency.
///
/// Workers claim wallets from a shared cursor, so each wallet is handled by
/// exactly one worker and its repetitions run strictly in order.
pub struct BatchDispatcher<E, F = NilCallback>
where
    E: ChainEndpoint + ?Sized,
    F: OnOutcome,
{
    endpoint: Arc<E>,
    call: Arc<CallSpec>,
    plan: ExecutionPlan,
    callback: Arc<F>,
    cancel_token: CancellationToken,
    network: String,
}

impl<E> BatchDispatcher<E, NilCallback>
where
    E: ChainEndpoint + ?Sized + 'static,
{
    pub fn new(endpoint: Arc<E>, call: CallSpec, plan: ExecutionPlan) -> Self {
        Self {
            endpoint,
            call: Arc::new(call),
            plan,
            callback: Arc::new(NilCallback),
            cancel_token: CancellationToken::new(),
            network: String::from("unknown"),
        }
    }
}

impl<E, F> BatchDispatcher<E, F>
where
    E: ChainEndpoint + ?Sized + 'static,
    F: OnOutcome + 'static,
{
    pub fn with_callback<G: OnOutcome + 'static>(self, callback: G) -> BatchDispatcher<E, G> {
        BatchDispatcher {
            endpoint: self.endpoint,
            call: self.call,
            plan: self.plan,
            callback: Arc::new(callback),
            cancel_token: self.cancel_token,
            network: self.network,
        }
    }

    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    /// Network name recorded in the result metadata.
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// Sends `plan.repetitions` transactions from every wallet and collects one
    /// [`Outcome`] per (wallet, repetition).
    ///
    /// Individual send failures never abort the run; only an invalid plan, a
    /// failure to reach the endpoint before starting, or a panicked worker do.
    pub async fn dispatch(&self, wallets: Vec<WalletKey>) -> Result<ResultSet> {
        self.plan.validate()?;
        let chain_id = self.endpoint.chain_id().await?;
        let started_at = Utc::now();

        let wallets = Arc::new(wallets);
        let num_workers = self.plan.concurrency.min(wallets.len());
        info!(
            "dispatching {} wallet(s) x {} repetition(s) with {num_workers} worker(s)",
            wallets.len(),
            self.plan.repetitions
        );

        let cursor = Arc::new(AtomicUsize::new(0));
        let executor = Arc::new(SendExecutor::new(
            self.endpoint.clone(),
            self.call.clone(),
            &self.plan,
        ));
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let handles = (0..num_workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    wallets: wallets.clone(),
                    cursor: cursor.clone(),
                    executor: executor.clone(),
                    plan: self.plan.clone(),
                    callback: self.callback.clone(),
                    cancel_token: self.cancel_token.clone(),
                    outcomes: sender.clone(),
                };
                tokio::task::spawn(worker.run())
            })
            .collect::<Vec<_>>();
        drop(sender);

        futures::future::try_join_all(handles).await?;

        let mut outcomes = Vec::new();
        while let Some(outcome) = receiver.recv().await {
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|o| (o.wallet_index, o.repetition));

        Ok(ResultSet {
            metadata: RunMetadata {
                network: self.network.to_owned(),
                chain_id,
                contract_address: self.call.to,
                payload: self.call.describe(),
                wallet_count: wallets.len(),
                concurrency: self.plan.concurrency,
                repetitions: self.plan.repetitions,
                value: self.plan.value,
                started_at,
                finished_at: Utc::now(),
            },
            outcomes,
        })
    }
}

struct Worker<E: ChainEndpoint + ?Sized, F: OnOutcome> {
    id: usize,
    wallets: Arc<Vec<WalletKey>>,
    cursor: Arc<AtomicUsize>,
    executor: Arc<SendExecutor<E>>,
    plan: ExecutionPlan,
    callback: Arc<F>,
    cancel_token: CancellationToken,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl<E: ChainEndpoint + ?Sized, F: OnOutcome> Worker<E, F> {
    async fn run(self) {
        loop {
            let wallet_index = self.cursor.fetch_add(1, Ordering::SeqCst);
            let Some(wallet) = self.wallets.get(wallet_index) else {
                break;
            };
            debug!("worker {} claimed wallet {wallet_index}", self.id);
            self.run_wallet(wallet_index, wallet).await;

            let more_wallets = self.cursor.load(Ordering::SeqCst) < self.wallets.len();
            if more_wallets && !self.cancel_token.is_cancelled() {
                self.pause(self.plan.wallet_throttle).await;
            }
        }
        debug!("worker {} done", self.id);
    }

    async fn run_wallet(&self, wallet_index: usize, wallet: &WalletKey) {
        let total_repetitions = self.plan.repetitions;
        for repetition in 1..=total_repetitions {
            let attempt = Attempt {
                wallet_index,
                repetition,
                total_repetitions,
            };
            let outcome = if self.cancel_token.is_cancelled() {
                Outcome::failed(attempt, wallet.address(), SendError::Cancelled)
            } else {
                self.executor
                    .execute(wallet, attempt, self.callback.as_ref())
                    .await
            };
            let succeeded = outcome.success;
            self.callback.on_outcome(&outcome);
            // the receiver outlives every worker
            let _ = self.outcomes.send(outcome);

            // failed sends move straight on to the next repetition
            if succeeded && repetition < total_repetitions {
                let delay = self.plan.sample_delay();
                debug!("wallet {wallet_index}: waiting {delay:?} before next repetition");
                self.pause(delay).await;
            }
        }
    }

    /// Sleeps for `duration` unless the run is cancelled first.
    async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel_token.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}
