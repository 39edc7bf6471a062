// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped slot guard
//!
//! The guard's lifetime is the lock's lifetime: it owns the holding
//! session and releasing it is the only path that frees the slot.
//! `release` is the deterministic path; dropping an unreleased guard
//! falls back to a background release on the current runtime.

use semgate_adapters::CoordinationStore;
use semgate_core::clock::Clock;
use semgate_core::id::{RequestId, SessionId};

/// Live handle to one granted slot
#[derive(Debug)]
pub struct SlotGuard<S: CoordinationStore, C: Clock> {
    store: S,
    clock: C,
    session: SessionId,
    name: String,
    slot: u32,
    request_id: RequestId,
    released: bool,
}

impl<S: CoordinationStore, C: Clock> SlotGuard<S, C> {
    pub(crate) fn new(
        store: S,
        clock: C,
        session: SessionId,
        name: String,
        slot: u32,
        request_id: RequestId,
    ) -> Self {
        Self {
            store,
            clock,
            session,
            name,
            slot,
            request_id,
            released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Return the slot to the pool. Idempotent and infallible from the
    /// caller's view: this path runs during teardown, where a failure
    /// must not mask the surrounding control flow. After the call the
    /// slot is released regardless of whether the audit write landed.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        release_slot(
            self.store.clone(),
            self.clock.clone(),
            self.session.clone(),
            self.name.clone(),
            self.slot,
            self.request_id,
        )
        .await;
    }
}

impl<S: CoordinationStore, C: Clock> std::fmt::Display for SlotGuard<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/slot {}", self.name, self.slot)
    }
}

impl<S: CoordinationStore, C: Clock> Drop for SlotGuard<S, C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        tracing::warn!(
            name = %self.name,
            slot = self.slot,
            "slot guard dropped without release; releasing in background"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(release_slot(
                    self.store.clone(),
                    self.clock.clone(),
                    self.session.clone(),
                    self.name.clone(),
                    self.slot,
                    self.request_id,
                ));
            }
            Err(_) => tracing::error!(
                name = %self.name,
                slot = self.slot,
                "no runtime at drop; relying on authority session cleanup"
            ),
        }
    }
}

/// The release sequence: signal, audit, close. Every step is
/// best-effort; failures are logged and swallowed because a stuck
/// external lock is worse than a missing audit write.
async fn release_slot<S: CoordinationStore, C: Clock>(
    store: S,
    clock: C,
    session: SessionId,
    name: String,
    slot: u32,
    request_id: RequestId,
) {
    if let Err(err) = store.signal(&session, &name, slot).await {
        tracing::warn!(%name, slot, error = %err, "release signal failed");
    }
    let write = match store
        .record_release(&session, request_id, clock.now())
        .await
    {
        Ok(()) => store.commit(&session).await,
        Err(err) => Err(err),
    };
    if let Err(err) = write {
        tracing::warn!(id = %request_id, error = %err, "release audit write failed");
    }
    if let Err(err) = store.close(&session).await {
        tracing::debug!(%session, error = %err, "holding session close failed");
    }
    tracing::info!(%name, slot, "slot released");
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
