// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trait definitions for the coordination store seams

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use semgate_core::audit::AcquisitionRequest;
use semgate_core::id::{RequestId, SessionId};
use semgate_core::profile::ConnectionProfile;
use thiserror::Error;

// =============================================================================
// Session Provider
// =============================================================================

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open session: {0}")]
    OpenFailed(String),
    #[error("session not open: {0}")]
    NotOpen(SessionId),
}

/// Opens and closes sessions against the coordination store.
///
/// Sessions are stateful: closing one abandons everything the store
/// associates with it, including queued waits and uncommitted writes.
#[async_trait]
pub trait SessionProvider: Clone + Send + Sync + 'static {
    /// Open a new session
    async fn open(&self, profile: &ConnectionProfile) -> Result<SessionId, SessionError>;

    /// Close a session, abandoning its queued waits and staged writes
    async fn close(&self, session: &SessionId) -> Result<(), SessionError>;
}

// =============================================================================
// External Lock Authority
// =============================================================================

/// Errors from authority operations
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("session lost: {0}")]
    SessionLost(SessionId),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("no semaphore registered under name: {0}")]
    UnknownSemaphore(String),
}

/// The authority owning slot state and wait-queue semantics.
///
/// All primitives are bound to a caller session. The client assumes
/// nothing about queue ordering beyond "wait eventually returns if a
/// slot frees and the session survives".
#[async_trait]
pub trait LockAuthority: Clone + Send + Sync + 'static {
    /// Number of slots registered under a name; 0 when unregistered
    async fn capacity(&self, session: &SessionId, name: &str) -> Result<u32, AuthorityError>;

    /// Block until a slot is free, then return its number
    async fn wait(&self, session: &SessionId, name: &str) -> Result<u32, AuthorityError>;

    /// Remove the caller's queued wait entry, if any
    async fn dequeue(&self, session: &SessionId, name: &str) -> Result<(), AuthorityError>;

    /// Return a slot to the free pool, potentially unblocking a waiter
    async fn signal(&self, session: &SessionId, name: &str, slot: u32)
        -> Result<(), AuthorityError>;
}

// =============================================================================
// Audit Store
// =============================================================================

/// Errors from audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("session not open: {0}")]
    NotOpen(SessionId),
    #[error("unknown acquisition request: {0}")]
    UnknownRequest(RequestId),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

/// Persists the acquisition audit trail.
///
/// Writes are staged on the issuing session and become visible to other
/// sessions only after `commit` on that session.
#[async_trait]
pub trait AuditStore: Clone + Send + Sync + 'static {
    /// Mint the next request identifier
    async fn next_request_id(&self, session: &SessionId) -> Result<RequestId, AuditError>;

    /// Stage a new request row
    async fn insert_request(
        &self,
        session: &SessionId,
        request: &AcquisitionRequest,
    ) -> Result<(), AuditError>;

    /// Stage grant info onto an existing row
    async fn record_grant(
        &self,
        session: &SessionId,
        id: RequestId,
        grant_time: DateTime<Utc>,
        num_requests: u32,
        slot: u32,
    ) -> Result<(), AuditError>;

    /// Stage the final attempt count onto a row that was never granted
    async fn record_attempts(
        &self,
        session: &SessionId,
        id: RequestId,
        num_requests: u32,
    ) -> Result<(), AuditError>;

    /// Stage release info onto an existing row
    async fn record_release(
        &self,
        session: &SessionId,
        id: RequestId,
        release_time: DateTime<Utc>,
    ) -> Result<(), AuditError>;

    /// Make the session's staged writes visible
    async fn commit(&self, session: &SessionId) -> Result<(), AuditError>;
}

// =============================================================================
// Combined store
// =============================================================================

/// The full store surface the semaphore client depends on.
///
/// The three seams are separate contracts, but deployments ride them on
/// one store, so the client takes a single implementation of all three.
pub trait CoordinationStore: SessionProvider + LockAuthority + AuditStore {}

impl<T: SessionProvider + LockAuthority + AuditStore> CoordinationStore for T {}
