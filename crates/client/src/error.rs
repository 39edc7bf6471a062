// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the acquisition client

use semgate_adapters::{AuditError, AuthorityError, SessionError};
use thiserror::Error;

/// Errors surfaced by `SemaphoreClient::acquire`
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The semaphore name has no configured slots; nothing was written
    #[error("no semaphore registered under name: {0}")]
    NotFound(String),
    /// The retry budget ran out without a grant; the audit row persists
    /// with no grant time
    #[error("gave up on {name} after {attempts} wait attempts")]
    AcquisitionFailed { name: String, attempts: u32 },
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("authority error: {0}")]
    Authority(#[from] AuthorityError),
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}
