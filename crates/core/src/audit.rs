// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquisition audit entity
//!
//! One record per acquisition lifecycle: created before the blocking
//! wait, updated at grant and at release, never deleted by the client.
//! Rows with no grant time are the audit trail of failed or abandoned
//! acquisitions.

use crate::id::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record of one acquisition's life cycle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
    pub id: RequestId,
    /// Semaphore name the request is against
    pub name: String,
    /// What is requesting, and why
    pub task_id: String,
    /// Set at creation, before any blocking call
    pub request_time: DateTime<Utc>,
    /// Capacity snapshot at request time
    pub num_slots: u32,
    /// Wait attempts made; 0 until an outcome is recorded
    pub num_requests: u32,
    /// Set only on a successful grant
    pub grant_time: Option<DateTime<Utc>>,
    /// Slot assigned by the authority; present iff grant_time is
    pub slot: Option<u32>,
    /// Set only when the holder signals release
    pub release_time: Option<DateTime<Utc>>,
}

impl AcquisitionRequest {
    pub fn new(
        id: RequestId,
        name: impl Into<String>,
        task_id: impl Into<String>,
        request_time: DateTime<Utc>,
        num_slots: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            task_id: task_id.into(),
            request_time,
            num_slots,
            num_requests: 0,
            grant_time: None,
            slot: None,
            release_time: None,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.grant_time.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.release_time.is_some()
    }

    /// Check the row's structural invariants: a slot is recorded iff a
    /// grant is, and timestamps are ordered
    /// request <= grant <= release wherever present.
    pub fn is_consistent(&self) -> bool {
        if self.slot.is_some() != self.grant_time.is_some() {
            return false;
        }
        if let Some(grant) = self.grant_time {
            if grant < self.request_time {
                return false;
            }
            if let Some(release) = self.release_time {
                if release < grant {
                    return false;
                }
            }
        } else if self.release_time.is_some() {
            // Released without ever being granted
            return false;
        }
        true
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
