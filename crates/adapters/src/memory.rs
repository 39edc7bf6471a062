// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory coordination store
//!
//! Implements the full `CoordinationStore` surface against process-local
//! state: a registered semaphore catalog, one slot pool per name, and a
//! staged-then-committed audit table. Waits block on a shared wakeup
//! that fires whenever a transition may have freed a slot.
//!
//! Audit writes model the store's transaction semantics: each session
//! stages its writes and `commit` publishes them; closing a session
//! discards whatever it had staged.

use crate::traits::{
    AuditError, AuditStore, AuthorityError, LockAuthority, SessionError, SessionProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semgate_core::audit::AcquisitionRequest;
use semgate_core::id::{RequestId, SessionId};
use semgate_core::pool::{PoolEvent, PoolInput, SlotPool};
use semgate_core::profile::ConnectionProfile;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::pin::pin;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct StoreState {
    catalog: HashMap<String, u32>,
    pools: HashMap<String, SlotPool>,
    open: HashSet<SessionId>,
    staged: HashMap<SessionId, HashMap<RequestId, AcquisitionRequest>>,
    committed: BTreeMap<RequestId, AcquisitionRequest>,
    next_request: u64,
}

/// Process-local coordination store
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    wakeup: Arc<Notify>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a semaphore in the catalog.
    ///
    /// The catalog is static configuration: register every name before
    /// handing the store to clients. Re-registering a name resets its
    /// pool.
    pub fn register(&self, name: impl Into<String>, capacity: u32) {
        let name = name.into();
        let mut state = self.lock();
        state.catalog.insert(name.clone(), capacity);
        state.pools.insert(name.clone(), SlotPool::new(name, capacity));
    }

    /// Free slots for a registered semaphore
    pub fn available_slots(&self, name: &str) -> Option<u32> {
        self.lock().pools.get(name).map(|p| p.available_slots())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn log_events(events: &[PoolEvent]) {
        for event in events {
            match event {
                PoolEvent::Granted {
                    name,
                    session,
                    slot,
                } => tracing::debug!(%name, %session, slot, "slot granted"),
                PoolEvent::Queued { name, session } => {
                    tracing::debug!(%name, %session, "waiter queued");
                }
                PoolEvent::Dequeued { name, session } => {
                    tracing::debug!(%name, %session, "waiter dequeued");
                }
                PoolEvent::Released { name, slot } => {
                    tracing::debug!(%name, slot, "slot released");
                }
                PoolEvent::Reclaimed {
                    name,
                    session,
                    slot,
                } => tracing::debug!(%name, %session, slot, "slot reclaimed from dead session"),
            }
        }
    }

    fn apply(
        state: &mut StoreState,
        name: &str,
        input: PoolInput,
    ) -> Result<Vec<PoolEvent>, AuthorityError> {
        let pool = state
            .pools
            .get(name)
            .ok_or_else(|| AuthorityError::UnknownSemaphore(name.to_string()))?;
        let (next, events) = pool.transition(input);
        state.pools.insert(name.to_string(), next);
        Self::log_events(&events);
        Ok(events)
    }

    /// Stage a mutation of an existing audit row on a session
    fn stage_update(
        &self,
        session: &SessionId,
        id: RequestId,
        mutate: impl FnOnce(&mut AcquisitionRequest),
    ) -> Result<(), AuditError> {
        let mut state = self.lock();
        if !state.open.contains(session) {
            return Err(AuditError::NotOpen(session.clone()));
        }
        let base = state
            .staged
            .get(session)
            .and_then(|rows| rows.get(&id))
            .or_else(|| state.committed.get(&id))
            .cloned();
        let mut row = base.ok_or(AuditError::UnknownRequest(id))?;
        mutate(&mut row);
        state
            .staged
            .entry(session.clone())
            .or_default()
            .insert(id, row);
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for MemoryStore {
    async fn open(&self, _profile: &ConnectionProfile) -> Result<SessionId, SessionError> {
        let id = SessionId::new(uuid::Uuid::new_v4().to_string());
        self.lock().open.insert(id.clone());
        tracing::debug!(session = %id, "session opened");
        Ok(id)
    }

    async fn close(&self, session: &SessionId) -> Result<(), SessionError> {
        {
            let mut state = self.lock();
            if !state.open.remove(session) {
                return Err(SessionError::NotOpen(session.clone()));
            }
            state.staged.remove(session);
            let names: Vec<String> = state.pools.keys().cloned().collect();
            for name in names {
                let _ = Self::apply(
                    &mut state,
                    &name,
                    PoolInput::Abandon {
                        session: session.clone(),
                    },
                );
            }
        }
        tracing::debug!(%session, "session closed");
        self.wakeup.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl LockAuthority for MemoryStore {
    async fn capacity(&self, session: &SessionId, name: &str) -> Result<u32, AuthorityError> {
        let state = self.lock();
        if !state.open.contains(session) {
            return Err(AuthorityError::SessionLost(session.clone()));
        }
        Ok(state.catalog.get(name).copied().unwrap_or(0))
    }

    async fn wait(&self, session: &SessionId, name: &str) -> Result<u32, AuthorityError> {
        loop {
            // Register for wakeups before re-checking state, so a signal
            // landing between the check and the await is not lost.
            let mut notified = pin!(self.wakeup.notified());
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if !state.open.contains(session) {
                    return Err(AuthorityError::SessionLost(session.clone()));
                }
                let events = Self::apply(
                    &mut state,
                    name,
                    PoolInput::Claim {
                        session: session.clone(),
                    },
                )?;
                for event in events {
                    if let PoolEvent::Granted { slot, .. } = event {
                        return Ok(slot);
                    }
                }
            }

            notified.await;
        }
    }

    async fn dequeue(&self, session: &SessionId, name: &str) -> Result<(), AuthorityError> {
        {
            let mut state = self.lock();
            if !state.open.contains(session) {
                return Err(AuthorityError::SessionLost(session.clone()));
            }
            Self::apply(
                &mut state,
                name,
                PoolInput::Dequeue {
                    session: session.clone(),
                },
            )?;

            // Sweep queue entries left behind by sessions that died
            // without authority-side cleanup.
            let dead: Vec<SessionId> = state
                .pools
                .get(name)
                .map(|pool| {
                    pool.queued_sessions()
                        .into_iter()
                        .filter(|s| !state.open.contains(s))
                        .collect()
                })
                .unwrap_or_default();
            for stale in dead {
                Self::apply(&mut state, name, PoolInput::Abandon { session: stale })?;
            }
        }
        self.wakeup.notify_waiters();
        Ok(())
    }

    async fn signal(&self, session: &SessionId, name: &str, slot: u32)
        -> Result<(), AuthorityError> {
        {
            let mut state = self.lock();
            if !state.open.contains(session) {
                return Err(AuthorityError::SessionLost(session.clone()));
            }
            Self::apply(&mut state, name, PoolInput::Release { slot })?;
        }
        self.wakeup.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn next_request_id(&self, session: &SessionId) -> Result<RequestId, AuditError> {
        let mut state = self.lock();
        if !state.open.contains(session) {
            return Err(AuditError::NotOpen(session.clone()));
        }
        state.next_request += 1;
        Ok(RequestId(state.next_request))
    }

    async fn insert_request(
        &self,
        session: &SessionId,
        request: &AcquisitionRequest,
    ) -> Result<(), AuditError> {
        let mut state = self.lock();
        if !state.open.contains(session) {
            return Err(AuditError::NotOpen(session.clone()));
        }
        state
            .staged
            .entry(session.clone())
            .or_default()
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn record_grant(
        &self,
        session: &SessionId,
        id: RequestId,
        grant_time: DateTime<Utc>,
        num_requests: u32,
        slot: u32,
    ) -> Result<(), AuditError> {
        self.stage_update(session, id, |row| {
            row.grant_time = Some(grant_time);
            row.num_requests = num_requests;
            row.slot = Some(slot);
        })
    }

    async fn record_attempts(
        &self,
        session: &SessionId,
        id: RequestId,
        num_requests: u32,
    ) -> Result<(), AuditError> {
        self.stage_update(session, id, |row| {
            row.num_requests = num_requests;
        })
    }

    async fn record_release(
        &self,
        session: &SessionId,
        id: RequestId,
        release_time: DateTime<Utc>,
    ) -> Result<(), AuditError> {
        self.stage_update(session, id, |row| {
            row.release_time = Some(release_time);
        })
    }

    async fn commit(&self, session: &SessionId) -> Result<(), AuditError> {
        let mut state = self.lock();
        if !state.open.contains(session) {
            return Err(AuditError::NotOpen(session.clone()));
        }
        if let Some(rows) = state.staged.remove(session) {
            for (id, row) in rows {
                state.committed.insert(id, row);
            }
        }
        Ok(())
    }
}

// Test support - inspection and failure simulation for specs
#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    /// Drop a session as if its process died, leaving queue entries and
    /// held slots behind for the authority's sweep to find.
    pub fn kill_session(&self, session: &SessionId) {
        let mut state = self.lock();
        state.open.remove(session);
        state.staged.remove(session);
        drop(state);
        self.wakeup.notify_waiters();
    }

    /// A committed audit row, if the id has been committed
    pub fn committed_request(&self, id: RequestId) -> Option<AcquisitionRequest> {
        self.lock().committed.get(&id).cloned()
    }

    /// All committed audit rows, in id order
    pub fn committed_requests(&self) -> Vec<AcquisitionRequest> {
        self.lock().committed.values().cloned().collect()
    }

    /// Sessions queued against a semaphore, in queue order
    pub fn queued_sessions(&self, name: &str) -> Vec<SessionId> {
        self.lock()
            .pools
            .get(name)
            .map(|p| p.queued_sessions())
            .unwrap_or_default()
    }

    /// Slots currently held against a semaphore
    pub fn held_slots(&self, name: &str) -> Vec<u32> {
        self.lock()
            .pools
            .get(name)
            .map(|p| {
                (1..=p.capacity())
                    .filter(|slot| p.holder_of(*slot).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of currently open sessions
    pub fn open_session_count(&self) -> usize {
        self.lock().open.len()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
