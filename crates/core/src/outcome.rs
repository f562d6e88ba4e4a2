use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one send: which wallet, and which of its repetitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub wallet_index: usize,
    /// 1-based.
    pub repetition: u32,
    pub total_repetitions: u32,
}

/// Result of one (wallet, repetition) pair.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub wallet_index: usize,
    pub wallet_address: Address,
    pub repetition: u32,
    pub total_repetitions: u32,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_estimate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    fn new(attempt: Attempt, wallet_address: Address, success: bool) -> Self {
        Self {
            wallet_index: attempt.wallet_index,
            wallet_address,
            repetition: attempt.repetition,
            total_repetitions: attempt.total_repetitions,
            success,
            tx_hash: None,
            block_number: None,
            gas_estimate: None,
            gas_used: None,
            error: None,
        }
    }

    pub fn confirmed(attempt: Attempt, wallet_address: Address) -> Self {
        Self::new(attempt, wallet_address, true)
    }

    pub fn failed(attempt: Attempt, wallet_address: Address, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(attempt, wallet_address, false)
        }
    }
}

/// Run-level facts recorded next to the outcomes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub network: String,
    pub chain_id: u64,
    pub contract_address: Address,
    pub payload: String,
    pub wallet_count: usize,
    pub concurrency: usize,
    pub repetitions: u32,
    pub value: U256,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Aggregate counts over a [`ResultSet`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_gas_used: u64,
}

/// Every outcome of one run, ordered by wallet index then repetition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSet {
    pub metadata: RunMetadata,
    pub outcomes: Vec<Outcome>,
}

impl ResultSet {
    pub fn summary(&self) -> RunSummary {
        let succeeded = self.outcomes.iter().filter(|o| o.success).count();
        RunSummary {
            total: self.outcomes.len(),
            succeeded,
            failed: self.outcomes.len() - succeeded,
            total_gas_used: self
                .outcomes
                .iter()
                .filter(|o| o.success)
                .filter_map(|o| o.gas_used)
                .sum(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}
