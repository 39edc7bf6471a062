// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded fixed-interval retry policy for the blocking wait

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration applied around the authority's wait call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum wait attempts before the acquisition fails
    pub max_attempts: u32,
    /// Fixed delay between attempts
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            retry_interval: Duration::from_secs(10),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
