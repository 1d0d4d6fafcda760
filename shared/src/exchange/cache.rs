use log::{debug, warn};

use crate::{
    messages::envelope::MessageEnvelope,
    storage::allocator::Shared,
    table::subtable::SubTable,
    types::{CacheId, ProcessGroup, Rank},
};

/// One cache slot: the latest envelope from its owning rank
#[derive(Debug)]
pub struct CacheSlot {
    envelope: MessageEnvelope,
    lock_count: u32,
    send_pending: bool,
}

impl CacheSlot {
    fn new(owner: Rank) -> Self {
        Self {
            envelope: MessageEnvelope::new(owner),
            lock_count: 0,
            send_pending: false,
        }
    }

    pub fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    pub fn lock_count(&self) -> u32 {
        self.lock_count
    }

    pub fn is_send_pending(&self) -> bool {
        self.send_pending
    }

    pub fn is_valid(&self) -> bool {
        self.envelope.subtable_route().object_is_valid()
    }
}

/// Per-rank array of envelopes keyed by owning rank. Slots are locked while
/// the exchange or a pending task still relies on their subtable.
#[derive(Debug)]
pub struct ExchangeCache {
    local_rank: Rank,
    slots: Vec<CacheSlot>,
    total_locks: u64,
}

impl ExchangeCache {
    pub fn new(group: &ProcessGroup) -> Self {
        Self {
            local_rank: group.rank(),
            slots: (0..group.size()).map(CacheSlot::new).collect(),
            total_locks: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn local_rank(&self) -> Rank {
        self.local_rank
    }

    pub fn slot(&self, cache_id: CacheId) -> Option<&CacheSlot> {
        self.slots.get(cache_id)
    }

    pub fn slots(&self) -> impl Iterator<Item = &CacheSlot> {
        self.slots.iter()
    }

    pub fn envelope(&self, cache_id: CacheId) -> Option<&MessageEnvelope> {
        self.slots.get(cache_id).map(|slot| &slot.envelope)
    }

    pub(crate) fn envelope_mut(&mut self, cache_id: CacheId) -> Option<&mut MessageEnvelope> {
        self.slots.get_mut(cache_id).map(|slot| &mut slot.envelope)
    }

    pub fn lock_count(&self, cache_id: CacheId) -> Option<u32> {
        self.slots.get(cache_id).map(|slot| slot.lock_count)
    }

    /// Sum of lock counts over every slot
    pub fn total_locks(&self) -> u64 {
        self.total_locks
    }

    pub fn find_subtable(&self, cache_id: CacheId) -> Option<&Shared<SubTable>> {
        self.envelope(cache_id)
            .and_then(|envelope| envelope.subtable())
    }

    pub fn lock(&mut self, cache_id: CacheId, times: u32) {
        let slot_count = self.slots.len();
        let Some(slot) = self.slots.get_mut(cache_id) else {
            warn!("Ignoring lock of cache slot {} outside a cache of {}", cache_id, slot_count);
            return;
        };
        slot.lock_count += times;
        self.total_locks += times as u64;
    }

    /// Releases `times` locks. A valid remote slot whose count reaches zero is
    /// evicted; returns whether that happened.
    pub fn release(&mut self, cache_id: CacheId, times: u32) -> bool {
        let slot_count = self.slots.len();
        let Some(slot) = self.slots.get_mut(cache_id) else {
            warn!("Ignoring release of cache slot {} outside a cache of {}", cache_id, slot_count);
            return false;
        };

        let released = if times > slot.lock_count {
            warn!(
                "Releasing {} locks on cache slot {} which only holds {}",
                times, cache_id, slot.lock_count
            );
            slot.lock_count
        } else {
            times
        };
        slot.lock_count -= released;
        self.total_locks -= released as u64;

        if slot.lock_count == 0 && slot.is_valid() && cache_id != self.local_rank as CacheId {
            return self.evict(cache_id);
        }
        false
    }

    /// Frees the subtable held by an unlocked remote slot. Returns whether a
    /// payload was dropped; evicting an empty slot is a no-op.
    pub fn evict(&mut self, cache_id: CacheId) -> bool {
        if cache_id == self.local_rank as CacheId {
            return false;
        }
        let Some(slot) = self.slots.get_mut(cache_id) else {
            return false;
        };
        if slot.lock_count > 0 {
            return false;
        }

        let evicted = slot.envelope.subtable_route_mut().take_object();
        if let Some(subtable) = &evicted {
            debug!("Rank {} evicted subtable {}", self.local_rank, subtable.id());
        }
        evicted.is_some()
    }

    /// Places `envelope` into the slot of its originating rank, replacing
    /// whatever was there. The caller checks the rank is in range.
    pub(crate) fn store(&mut self, envelope: MessageEnvelope) -> CacheId {
        let cache_id = envelope.originating_rank() as CacheId;
        self.slots[cache_id].envelope = envelope;
        cache_id
    }

    pub(crate) fn set_send_pending(&mut self, cache_id: CacheId, pending: bool) {
        if let Some(slot) = self.slots.get_mut(cache_id) {
            slot.send_pending = pending;
        }
    }

    /// Whether every slot in `[lower, lower + count)` is free of locks
    pub fn is_window_unlocked(&self, lower: CacheId, count: usize) -> bool {
        self.slots
            .iter()
            .skip(lower)
            .take(count)
            .all(|slot| slot.lock_count == 0)
    }
}
