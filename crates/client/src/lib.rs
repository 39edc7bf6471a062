// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! semgate-client: the semaphore acquisition client
//!
//! Ties the store seams together into the acquire/hold/release life
//! cycle: validate the semaphore exists, persist an audit row before
//! blocking, wait through the retry policy with reconnect-and-dequeue
//! recovery, record the grant on an independent session, and hand back
//! a scoped guard whose release returns the slot.

pub mod client;
pub mod error;
pub mod guard;

pub use client::SemaphoreClient;
pub use error::AcquireError;
pub use guard::SlotGuard;
