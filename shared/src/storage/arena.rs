use std::sync::Arc;

/// Generation-checked index into an [`Arena`]. A key whose slot has been freed
/// and reused never resolves to the new occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArenaKey {
    index: u32,
    generation: u32,
}

impl ArenaKey {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot<T> {
    generation: u32,
    ref_count: u32,
    value: Option<Arc<T>>,
}

/// Index-based storage with a free list and a reference count per slot.
/// A slot is freed when its count drops to zero.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Stores `value` with a reference count of one
    pub fn insert(&mut self, value: T) -> (ArenaKey, Arc<T>) {
        let value = Arc::new(value);
        self.live += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.ref_count = 1;
            slot.value = Some(value.clone());
            return (
                ArenaKey {
                    index,
                    generation: slot.generation,
                },
                value,
            );
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            ref_count: 1,
            value: Some(value.clone()),
        });
        (
            ArenaKey {
                index,
                generation: 0,
            },
            value,
        )
    }

    fn slot(&self, key: &ArenaKey) -> Option<&Slot<T>> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation && slot.value.is_some())
    }

    fn slot_mut(&mut self, key: &ArenaKey) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation && slot.value.is_some())
    }

    pub fn get(&self, key: &ArenaKey) -> Option<&Arc<T>> {
        self.slot(key).and_then(|slot| slot.value.as_ref())
    }

    pub fn ref_count(&self, key: &ArenaKey) -> Option<u32> {
        self.slot(key).map(|slot| slot.ref_count)
    }

    /// Adds one reference; false for a stale key
    pub fn retain(&mut self, key: &ArenaKey) -> bool {
        match self.slot_mut(key) {
            Some(slot) => {
                slot.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference. When the count reaches zero the slot is freed and
    /// the stored value is handed back so it can be dropped outside any lock.
    pub fn release(&mut self, key: &ArenaKey) -> Option<Arc<T>> {
        let slot = self.slot_mut(key)?;
        slot.ref_count -= 1;
        if slot.ref_count > 0 {
            return None;
        }

        slot.generation = slot.generation.wrapping_add(1);
        let value = slot.value.take();
        self.free_list.push(key.index);
        self.live -= 1;
        value
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated, free or not
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
