//! Bookkeeping shared by every pool operation.
//!
//! All of it lives behind the pool's single mutex.

use super::ResourceId;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// A resource sitting in the idle queue
pub(super) struct IdleEntry<R> {
    pub(super) id: ResourceId,
    pub(super) resource: R,
    pub(super) idle_since: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SlotState {
    Idle,
    Leased,
}

/// Live-set entry for one created resource
#[derive(Debug)]
pub(super) struct Slot {
    pub(super) state: SlotState,
    pub(super) created_at: Instant,
}

pub(super) struct PoolState<R> {
    /// FIFO of resources ready to lease
    pub(super) idle: VecDeque<IdleEntry<R>>,

    /// Every resource created and not yet closed
    pub(super) live: HashMap<ResourceId, Slot>,

    /// Slots reserved for factory calls in flight
    pub(super) pending: usize,

    /// Tickets of callers inside `acquire`, oldest first
    waiters: VecDeque<u64>,

    next_ticket: u64,

    pub(super) shutdown: bool,
}

impl<R> PoolState<R> {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            idle: VecDeque::with_capacity(capacity),
            live: HashMap::new(),
            pending: 0,
            waiters: VecDeque::new(),
            next_ticket: 0,
            shutdown: false,
        }
    }

    /// Live resources plus reserved slots; never exceeds the pool's max size.
    pub(super) fn occupied(&self) -> usize {
        self.live.len() + self.pending
    }

    pub(super) fn leased(&self) -> usize {
        self.live
            .values()
            .filter(|slot| slot.state == SlotState::Leased)
            .count()
    }

    pub(super) fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Join the back of the waiter queue.
    pub(super) fn take_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.waiters.push_back(ticket);
        ticket
    }

    /// Join the front of the waiter queue, for a caller that was already
    /// served once and lost its resource.
    pub(super) fn take_front_ticket(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.waiters.push_front(ticket);
        ticket
    }

    /// Whether `ticket` is the longest-waiting caller.
    pub(super) fn is_next(&self, ticket: u64) -> bool {
        self.waiters.front() == Some(&ticket)
    }

    pub(super) fn leave_queue(&mut self, ticket: u64) {
        if let Some(pos) = self.waiters.iter().position(|t| *t == ticket) {
            self.waiters.remove(pos);
        }
    }

    /// Pop the oldest idle resource and mark it leased.
    pub(super) fn pop_idle(&mut self) -> Option<IdleEntry<R>> {
        let entry = self.idle.pop_front()?;
        if let Some(slot) = self.live.get_mut(&entry.id) {
            slot.state = SlotState::Leased;
        }
        Some(entry)
    }

    pub(super) fn push_idle(&mut self, id: ResourceId, resource: R) {
        if let Some(slot) = self.live.get_mut(&id) {
            slot.state = SlotState::Idle;
        }
        self.idle.push_back(IdleEntry {
            id,
            resource,
            idle_since: Instant::now(),
        });
    }

    pub(super) fn insert_leased(&mut self, id: ResourceId) {
        self.live.insert(
            id,
            Slot {
                state: SlotState::Leased,
                created_at: Instant::now(),
            },
        );
    }

    pub(super) fn is_leased(&self, id: ResourceId) -> bool {
        self.live
            .get(&id)
            .is_some_and(|slot| slot.state == SlotState::Leased)
    }

    /// Drop a leased resource from the live set. Returns false if it was not
    /// a leased member.
    pub(super) fn retire(&mut self, id: ResourceId) -> bool {
        if self.is_leased(id) {
            self.live.remove(&id);
            true
        } else {
            false
        }
    }
}
