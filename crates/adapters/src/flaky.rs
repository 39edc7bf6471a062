// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault-injecting store wrapper for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::traits::{
    AuditError, AuditStore, AuthorityError, CoordinationStore, LockAuthority, SessionError,
    SessionProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semgate_core::audit::AcquisitionRequest;
use semgate_core::id::{RequestId, SessionId};
use semgate_core::profile::ConnectionProfile;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Open,
    Close { session: SessionId },
    Capacity { name: String },
    Wait { session: SessionId, name: String },
    Dequeue { session: SessionId, name: String },
    Signal { name: String, slot: u32 },
    NextRequestId,
    InsertRequest { id: RequestId },
    RecordGrant { id: RequestId },
    RecordAttempts { id: RequestId },
    RecordRelease { id: RequestId },
    Commit { session: SessionId },
}

/// Wrapper that records every store call and injects wait failures
#[derive(Clone, Debug)]
pub struct FlakyStore<S> {
    inner: S,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    wait_failures: Arc<AtomicU32>,
    fail_all_waits: Arc<AtomicBool>,
}

impl<S: CoordinationStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            wait_failures: Arc::new(AtomicU32::new(0)),
            fail_all_waits: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fail the next `n` wait calls with a connectivity fault
    pub fn fail_next_waits(&self, n: u32) {
        self.wait_failures.store(n, Ordering::SeqCst);
    }

    /// Fail every wait call from now on
    pub fn fail_all_waits(&self) {
        self.fail_all_waits.store(true, Ordering::SeqCst);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn wait_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Wait { .. }))
    }

    pub fn dequeue_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Dequeue { .. }))
    }

    pub fn signal_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Signal { .. }))
    }

    pub fn open_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Open))
    }

    pub fn close_count(&self) -> usize {
        self.count(|c| matches!(c, StoreCall::Close { .. }))
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn count(&self, pred: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| pred(c))
            .count()
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn take_wait_failure(&self) -> bool {
        if self.fail_all_waits.load(Ordering::SeqCst) {
            return true;
        }
        self.wait_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl<S: CoordinationStore> SessionProvider for FlakyStore<S> {
    async fn open(&self, profile: &ConnectionProfile) -> Result<SessionId, SessionError> {
        self.record(StoreCall::Open);
        self.inner.open(profile).await
    }

    async fn close(&self, session: &SessionId) -> Result<(), SessionError> {
        self.record(StoreCall::Close {
            session: session.clone(),
        });
        self.inner.close(session).await
    }
}

#[async_trait]
impl<S: CoordinationStore> LockAuthority for FlakyStore<S> {
    async fn capacity(&self, session: &SessionId, name: &str) -> Result<u32, AuthorityError> {
        self.record(StoreCall::Capacity {
            name: name.to_string(),
        });
        self.inner.capacity(session, name).await
    }

    async fn wait(&self, session: &SessionId, name: &str) -> Result<u32, AuthorityError> {
        self.record(StoreCall::Wait {
            session: session.clone(),
            name: name.to_string(),
        });
        if self.take_wait_failure() {
            return Err(AuthorityError::ConnectionLost(
                "injected connectivity fault".to_string(),
            ));
        }
        self.inner.wait(session, name).await
    }

    async fn dequeue(&self, session: &SessionId, name: &str) -> Result<(), AuthorityError> {
        self.record(StoreCall::Dequeue {
            session: session.clone(),
            name: name.to_string(),
        });
        self.inner.dequeue(session, name).await
    }

    async fn signal(&self, session: &SessionId, name: &str, slot: u32)
        -> Result<(), AuthorityError> {
        self.record(StoreCall::Signal {
            name: name.to_string(),
            slot,
        });
        self.inner.signal(session, name, slot).await
    }
}

#[async_trait]
impl<S: CoordinationStore> AuditStore for FlakyStore<S> {
    async fn next_request_id(&self, session: &SessionId) -> Result<RequestId, AuditError> {
        self.record(StoreCall::NextRequestId);
        self.inner.next_request_id(session).await
    }

    async fn insert_request(
        &self,
        session: &SessionId,
        request: &AcquisitionRequest,
    ) -> Result<(), AuditError> {
        self.record(StoreCall::InsertRequest { id: request.id });
        self.inner.insert_request(session, request).await
    }

    async fn record_grant(
        &self,
        session: &SessionId,
        id: RequestId,
        grant_time: DateTime<Utc>,
        num_requests: u32,
        slot: u32,
    ) -> Result<(), AuditError> {
        self.record(StoreCall::RecordGrant { id });
        self.inner
            .record_grant(session, id, grant_time, num_requests, slot)
            .await
    }

    async fn record_attempts(
        &self,
        session: &SessionId,
        id: RequestId,
        num_requests: u32,
    ) -> Result<(), AuditError> {
        self.record(StoreCall::RecordAttempts { id });
        self.inner.record_attempts(session, id, num_requests).await
    }

    async fn record_release(
        &self,
        session: &SessionId,
        id: RequestId,
        release_time: DateTime<Utc>,
    ) -> Result<(), AuditError> {
        self.record(StoreCall::RecordRelease { id });
        self.inner.record_release(session, id, release_time).await
    }

    async fn commit(&self, session: &SessionId) -> Result<(), AuditError> {
        self.record(StoreCall::Commit {
            session: session.clone(),
        });
        self.inner.commit(session).await
    }
}

#[cfg(test)]
#[path = "flaky_tests.rs"]
mod tests;
