use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use tracing::{info, warn};

use crate::outcome::{Attempt, Outcome};

/// Hooks invoked by the dispatcher while a batch runs.
pub trait OnOutcome: Send + Sync {
    /// Called as soon as the endpoint accepted a transaction, before its receipt arrives.
    fn on_submitted(&self, _attempt: &Attempt, _wallet: Address, _tx_hash: TxHash) {}

    /// Called once per (wallet, repetition), including cancelled ones.
    fn on_outcome(&self, outcome: &Outcome);
}

impl<T: OnOutcome + ?Sized> OnOutcome for Arc<T> {
    fn on_submitted(&self, attempt: &Attempt, wallet: Address, tx_hash: TxHash) {
        (**self).on_submitted(attempt, wallet, tx_hash)
    }

    fn on_outcome(&self, outcome: &Outcome) {
        (**self).on_outcome(outcome)
    }
}

#[derive(Clone, Debug, Default)]
pub struct NilCallback;

impl OnOutcome for NilCallback {
    fn on_outcome(&self, _outcome: &Outcome) {
        // do nothing
    }
}

/// Logs every submission and outcome, linking to a block explorer when one is known.
#[derive(Clone, Debug, Default)]
pub struct LogCallback {
    explorer_url: Option<String>,
}

impl LogCallback {
    pub fn new(explorer_url: Option<impl Into<String>>) -> Self {
        Self {
            explorer_url: explorer_url.map(|url| url.into().trim_end_matches('/').to_owned()),
        }
    }

    pub fn tx_link(&self, tx_hash: &TxHash) -> String {
        match &self.explorer_url {
            Some(base) => format!("{base}/tx/{tx_hash}"),
            None => tx_hash.to_string(),
        }
    }
}

impl OnOutcome for LogCallback {
    fn on_submitted(&self, attempt: &Attempt, wallet: Address, tx_hash: TxHash) {
        info!(
            "[wallet {} {wallet}] sent {}/{}: {}",
            attempt.wallet_index + 1,
            attempt.repetition,
            attempt.total_repetitions,
            self.tx_link(&tx_hash)
        );
    }

    fn on_outcome(&self, outcome: &Outcome) {
        let label = format!(
            "[wallet {} {}] {}/{}",
            outcome.wallet_index + 1,
            outcome.wallet_address,
            outcome.repetition,
            outcome.total_repetitions
        );
        if outcome.success {
            info!(
                "{label} confirmed in block {} (gas used {})",
                outcome
                    .block_number
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "?".to_owned()),
                outcome.gas_used.unwrap_or_default()
            );
        } else {
            warn!(
                "{label} failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
