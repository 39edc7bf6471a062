// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot-pool state machine for bounded concurrency
//!
//! A pool of distinct numbered slots with a wait queue, the in-process
//! equivalent of the authority's slot table. Slots are the integers
//! `1..=capacity`; a claim grants the lowest free slot unless an earlier
//! waiter is queued ahead of the caller.

use crate::id::SessionId;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Events that trigger pool transitions
#[derive(Clone, Debug)]
pub enum PoolInput {
    /// Claim a slot for a session, queueing it if none is free
    Claim { session: SessionId },
    /// Remove a session's queued wait entry, if any
    Dequeue { session: SessionId },
    /// Return a slot to the free set
    Release { slot: u32 },
    /// Session death: drop its queue entry and free anything it holds
    Abandon { session: SessionId },
}

/// Events emitted by pool transitions
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    Granted {
        name: String,
        session: SessionId,
        slot: u32,
    },
    Queued {
        name: String,
        session: SessionId,
    },
    Dequeued {
        name: String,
        session: SessionId,
    },
    Released {
        name: String,
        slot: u32,
    },
    Reclaimed {
        name: String,
        session: SessionId,
        slot: u32,
    },
}

/// A bounded pool of numbered slots with a FIFO wait queue
#[derive(Clone, Debug)]
pub struct SlotPool {
    name: String,
    capacity: u32,
    free: BTreeSet<u32>,
    held: HashMap<u32, SessionId>,
    queue: VecDeque<SessionId>,
}

impl SlotPool {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            name: name.into(),
            capacity,
            free: (1..=capacity).collect(),
            held: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn available_slots(&self) -> u32 {
        self.free.len() as u32
    }

    pub fn used_slots(&self) -> u32 {
        self.held.len() as u32
    }

    /// Slot currently held by a session, if any
    pub fn slot_held_by(&self, session: &SessionId) -> Option<u32> {
        self.held
            .iter()
            .find(|(_, s)| *s == session)
            .map(|(slot, _)| *slot)
    }

    pub fn holder_of(&self, slot: u32) -> Option<&SessionId> {
        self.held.get(&slot)
    }

    pub fn is_queued(&self, session: &SessionId) -> bool {
        self.queue.contains(session)
    }

    pub fn queued_sessions(&self) -> Vec<SessionId> {
        self.queue.iter().cloned().collect()
    }

    /// Whether a claim by this session would be granted right now
    fn claimable_by(&self, session: &SessionId) -> bool {
        !self.free.is_empty() && self.queue.front().is_none_or(|front| front == session)
    }

    /// Pure state transition function
    pub fn transition(&self, input: PoolInput) -> (SlotPool, Vec<PoolEvent>) {
        let mut next = self.clone();
        let mut events = Vec::new();

        match input {
            PoolInput::Claim { session } => {
                // A session holds at most one slot per pool
                if let Some(slot) = self.slot_held_by(&session) {
                    events.push(PoolEvent::Granted {
                        name: self.name.clone(),
                        session,
                        slot,
                    });
                } else if self.claimable_by(&session) {
                    if next.queue.front() == Some(&session) {
                        next.queue.pop_front();
                    }
                    // claimable_by checked free is non-empty
                    if let Some(slot) = next.free.pop_first() {
                        next.held.insert(slot, session.clone());
                        events.push(PoolEvent::Granted {
                            name: self.name.clone(),
                            session,
                            slot,
                        });
                    }
                } else if !self.is_queued(&session) {
                    next.queue.push_back(session.clone());
                    events.push(PoolEvent::Queued {
                        name: self.name.clone(),
                        session,
                    });
                }
            }

            PoolInput::Dequeue { session } => {
                // Tolerant of "nothing queued"
                if let Some(pos) = next.queue.iter().position(|s| s == &session) {
                    next.queue.remove(pos);
                    events.push(PoolEvent::Dequeued {
                        name: self.name.clone(),
                        session,
                    });
                }
            }

            PoolInput::Release { slot } => {
                if next.held.remove(&slot).is_some() {
                    next.free.insert(slot);
                    events.push(PoolEvent::Released {
                        name: self.name.clone(),
                        slot,
                    });
                }
            }

            PoolInput::Abandon { session } => {
                if let Some(pos) = next.queue.iter().position(|s| s == &session) {
                    next.queue.remove(pos);
                    events.push(PoolEvent::Dequeued {
                        name: self.name.clone(),
                        session: session.clone(),
                    });
                }
                let held: Vec<u32> = next
                    .held
                    .iter()
                    .filter(|(_, s)| **s == session)
                    .map(|(slot, _)| *slot)
                    .collect();
                for slot in held {
                    next.held.remove(&slot);
                    next.free.insert(slot);
                    events.push(PoolEvent::Reclaimed {
                        name: self.name.clone(),
                        session: session.clone(),
                        slot,
                    });
                }
            }
        }

        (next, events)
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
