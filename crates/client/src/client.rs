// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semaphore acquisition orchestration
//!
//! One client instance serves one logical task and makes one blocking
//! wait at a time; processes coordinate purely through the shared
//! store, never through in-process state.

use crate::error::AcquireError;
use crate::guard::SlotGuard;
use semgate_adapters::CoordinationStore;
use semgate_core::audit::AcquisitionRequest;
use semgate_core::clock::{Clock, SystemClock};
use semgate_core::id::{RequestId, SessionId};
use semgate_core::profile::ConnectionProfile;
use semgate_core::retry::RetryPolicy;

/// Client for acquiring slots from a store-coordinated semaphore
#[derive(Clone)]
pub struct SemaphoreClient<S: CoordinationStore, C: Clock> {
    store: S,
    profile: ConnectionProfile,
    retry: RetryPolicy,
    clock: C,
}

impl<S: CoordinationStore> SemaphoreClient<S, SystemClock> {
    pub fn new(store: S, profile: ConnectionProfile) -> Self {
        Self::with_clock(store, profile, SystemClock)
    }
}

impl<S: CoordinationStore, C: Clock> SemaphoreClient<S, C> {
    pub fn with_clock(store: S, profile: ConnectionProfile, clock: C) -> Self {
        Self {
            store,
            profile,
            retry: RetryPolicy::default(),
            clock,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Acquire a slot, blocking until one is granted or the retry
    /// budget runs out.
    ///
    /// Fails with `NotFound` when the name has no configured slots (no
    /// audit row is written) and with `AcquisitionFailed` when every
    /// wait attempt failed (the audit row persists with no grant time).
    pub async fn acquire(
        &self,
        name: &str,
        task_id: &str,
    ) -> Result<SlotGuard<S, C>, AcquireError> {
        let span = tracing::info_span!("sem.acquire", name, task_id);
        let _guard = span.enter();

        let session = self.store.open(&self.profile).await?;

        let capacity = match self.store.capacity(&session, name).await {
            Ok(c) => c,
            Err(err) => {
                self.close_quietly(&session).await;
                return Err(err.into());
            }
        };
        if capacity == 0 {
            tracing::warn!(name, "no semaphore registered");
            self.close_quietly(&session).await;
            return Err(AcquireError::NotFound(name.to_string()));
        }

        // The request row is committed on the acquisition session before
        // blocking, so operators can see the pending acquisition while
        // this call waits.
        let request_id = match self.persist_request(&session, name, task_id, capacity).await {
            Ok(id) => id,
            Err(err) => {
                self.close_quietly(&session).await;
                return Err(err.into());
            }
        };

        self.wait_with_retry(session, name, request_id).await
    }

    async fn persist_request(
        &self,
        session: &SessionId,
        name: &str,
        task_id: &str,
        capacity: u32,
    ) -> Result<RequestId, semgate_adapters::AuditError> {
        let id = self.store.next_request_id(session).await?;
        let request = AcquisitionRequest::new(id, name, task_id, self.clock.now(), capacity);
        self.store.insert_request(session, &request).await?;
        self.store.commit(session).await?;
        Ok(id)
    }

    async fn wait_with_retry(
        &self,
        mut session: SessionId,
        name: &str,
        request_id: RequestId,
    ) -> Result<SlotGuard<S, C>, AcquireError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            tracing::debug!(name, attempts, "waiting for slot");
            match self.store.wait(&session, name).await {
                Ok(slot) => {
                    self.record_grant(request_id, attempts, slot).await;
                    tracing::info!(name, slot, attempts, "slot granted");
                    return Ok(SlotGuard::new(
                        self.store.clone(),
                        self.clock.clone(),
                        session,
                        name.to_string(),
                        slot,
                        request_id,
                    ));
                }
                Err(err) if attempts < self.retry.max_attempts => {
                    tracing::warn!(name, attempts, error = %err, "wait failed; reconnecting");
                    tokio::time::sleep(self.retry.retry_interval).await;

                    // Close the failed session before replacing it, then
                    // clear any ghost queue entry on the fresh one.
                    self.close_quietly(&session).await;
                    session = self.store.open(&self.profile).await?;
                    if let Err(err) = self.store.dequeue(&session, name).await {
                        self.close_quietly(&session).await;
                        return Err(err.into());
                    }
                }
                Err(err) => {
                    tracing::warn!(name, attempts, error = %err, "wait attempts exhausted");
                    self.record_failure(request_id, attempts).await;
                    self.close_quietly(&session).await;
                    return Err(AcquireError::AcquisitionFailed {
                        name: name.to_string(),
                        attempts,
                    });
                }
            }
        }
    }

    /// Record grant info on a separate, independent session.
    ///
    /// Grant metadata must never be written on the session that holds
    /// the slot: on some authorities a commit there releases the very
    /// lock being recorded. Best-effort; the grant stands either way.
    async fn record_grant(&self, id: RequestId, num_requests: u32, slot: u32) {
        let session = match self.store.open(&self.profile).await {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%id, error = %err, "grant audit skipped: no recording session");
                return;
            }
        };
        let grant_time = self.clock.now();
        let write = match self
            .store
            .record_grant(&session, id, grant_time, num_requests, slot)
            .await
        {
            Ok(()) => self.store.commit(&session).await,
            Err(err) => Err(err),
        };
        if let Err(err) = write {
            tracing::warn!(%id, error = %err, "grant audit write failed");
        }
        self.close_quietly(&session).await;
    }

    /// Persist the final attempt count for an acquisition that never
    /// got a grant. Best-effort, on a fresh session: the wait session
    /// is presumed dead after a run of failures.
    async fn record_failure(&self, id: RequestId, num_requests: u32) {
        let session = match self.store.open(&self.profile).await {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%id, error = %err, "failure audit skipped: no recording session");
                return;
            }
        };
        let write = match self.store.record_attempts(&session, id, num_requests).await {
            Ok(()) => self.store.commit(&session).await,
            Err(err) => Err(err),
        };
        if let Err(err) = write {
            tracing::warn!(%id, error = %err, "failure audit write failed");
        }
        self.close_quietly(&session).await;
    }

    async fn close_quietly(&self, session: &SessionId) {
        if let Err(err) = self.store.close(session).await {
            tracing::debug!(%session, error = %err, "session close failed");
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
