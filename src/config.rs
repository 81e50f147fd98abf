//! Pool configuration types

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordering policy for the idle queue.
///
/// The original pool popped the most recently returned handle; which end of
/// the queue to take from is a policy choice, so it is configurable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// Take the oldest idle handle first.
    #[default]
    Fifo,
    /// Take the most recently returned handle first.
    Lifo,
}

/// Configuration for a [`Pool`](crate::Pool).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Maximum number of live handles (idle + leased). Must be greater
    /// than zero.
    pub capacity: usize,
    /// Idle handles `maintain` tops the pool up to. Must not exceed
    /// `capacity`.
    pub min_idle: usize,
    /// Default wait budget for `acquire`.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` is non-blocking,
    /// `Some(d)` bounds the wait to `d`.
    pub acquire_timeout: Option<Duration>,
    /// Idle handles unused for longer than this are destroyed. `None`
    /// disables idle expiry.
    pub idle_timeout: Option<Duration>,
    /// Handles older than this are destroyed instead of reused. `None`
    /// disables the age limit.
    pub max_lifetime: Option<Duration>,
    /// Idle handles are re-validated on the acquire path at most this often.
    pub validation_interval: Duration,
    /// Idle-queue ordering policy.
    pub strategy: Strategy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            min_idle: 0,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(3600)),
            validation_interval: Duration::from_secs(30),
            strategy: Strategy::Fifo,
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::configuration("capacity must be greater than 0"));
        }
        if self.min_idle > self.capacity {
            return Err(Error::configuration(format!(
                "min_idle ({}) must not exceed capacity ({})",
                self.min_idle, self.capacity
            )));
        }
        Ok(())
    }
}
