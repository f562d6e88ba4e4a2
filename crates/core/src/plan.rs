use std::time::Duration;

use alloy::primitives::{
    utils::{parse_ether, parse_units},
    U256,
};
use rand::Rng;

use crate::error::ConfigError;

pub const MAX_CONCURRENCY: usize = 10;

/// Pause between two wallets handled by the same worker.
pub const DEFAULT_WALLET_THROTTLE: Duration = Duration::from_millis(300);

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Scheduling parameters for one batch run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Number of wallets processed at the same time.
    pub concurrency: usize,
    /// Sends per wallet, executed one after another.
    pub repetitions: u32,
    /// Lower bound of the random pause after a successful send.
    pub min_delay: Duration,
    /// Upper bound (inclusive) of the random pause after a successful send.
    pub max_delay: Duration,
    /// Native currency (wei) attached to every call.
    pub value: U256,
    pub wallet_throttle: Duration,
    pub confirmation_timeout: Duration,
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self {
            concurrency: 1,
            repetitions: 1,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            value: U256::ZERO,
            wallet_throttle: DEFAULT_WALLET_THROTTLE,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

impl ExecutionPlan {
    pub fn new(concurrency: usize, repetitions: u32) -> Result<Self, ConfigError> {
        let plan = Self {
            concurrency,
            repetitions,
            ..Default::default()
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn with_delay(mut self, min: Duration, max: Duration) -> Result<Self, ConfigError> {
        self.min_delay = min;
        self.max_delay = max;
        self.validate()?;
        Ok(self)
    }

    /// Set value in wei to send with every call.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_wallet_throttle(mut self, throttle: Duration) -> Self {
        self.wallet_throttle = throttle;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ConcurrencyOutOfRange {
                got: self.concurrency,
                max: MAX_CONCURRENCY,
            });
        }
        if self.repetitions == 0 {
            return Err(ConfigError::RepetitionsZero);
        }
        if self.max_delay < self.min_delay {
            return Err(ConfigError::DelayRange {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }

    /// Draws a pause uniformly from `[min_delay, max_delay]`.
    pub fn sample_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

/// Parses an amount of native currency into wei.
///
/// Plain numbers are read as ether (`"0.05"`); a unit may follow after a space
/// (`"20 gwei"`, `"1000 wei"`).
pub fn parse_value(input: &str) -> Result<U256, ConfigError> {
    let input = input.trim();
    let invalid = || ConfigError::InvalidValue(input.to_owned());
    if input.is_empty() || input.starts_with('-') {
        return Err(invalid());
    }
    match input.split_once(char::is_whitespace) {
        Some((amount, unit)) => parse_units(amount.trim(), unit.trim())
            .map(|p| p.get_absolute())
            .map_err(|_| invalid()),
        None => parse_ether(input).map_err(|_| invalid()),
    }
}
