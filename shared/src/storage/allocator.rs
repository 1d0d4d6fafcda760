use std::{
    fmt,
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::arena::{Arena, ArenaKey};

type ArenaHandle<T> = Arc<Mutex<Arena<T>>>;

fn lock<T>(arena: &ArenaHandle<T>) -> MutexGuard<'_, Arena<T>> {
    arena.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where shared objects live. The handle is passed to whoever creates shared
/// objects; every [`Shared`] it hands out returns to it on destruction.
pub enum Allocator<T> {
    /// Plain reference-counted heap allocations
    Heap,
    /// Slots in an arena that tracks live objects and recycles indices
    Arena(ArenaHandle<T>),
}

impl<T> Allocator<T> {
    pub fn heap() -> Self {
        Self::Heap
    }

    pub fn arena() -> Self {
        Self::Arena(Arc::new(Mutex::new(Arena::new())))
    }

    pub fn is_arena(&self) -> bool {
        matches!(self, Self::Arena(_))
    }

    pub fn allocate(&self, value: T) -> Shared<T> {
        match self {
            Self::Heap => Shared {
                value: Arc::new(value),
                origin: Origin::Heap,
            },
            Self::Arena(arena) => {
                let (key, value) = lock(arena).insert(value);
                Shared {
                    value,
                    origin: Origin::Arena {
                        key,
                        arena: arena.clone(),
                    },
                }
            }
        }
    }

    /// Looks up a live arena object by key, adding a reference to it
    pub fn get(&self, key: &ArenaKey) -> Option<Shared<T>> {
        let Self::Arena(arena) = self else {
            return None;
        };
        let mut guard = lock(arena);
        let value = guard.get(key)?.clone();
        guard.retain(key);
        Some(Shared {
            value,
            origin: Origin::Arena {
                key: *key,
                arena: arena.clone(),
            },
        })
    }

    /// Number of live arena objects; heap allocations are not tracked
    pub fn live_objects(&self) -> Option<usize> {
        match self {
            Self::Heap => None,
            Self::Arena(arena) => Some(lock(arena).len()),
        }
    }
}

impl<T> Clone for Allocator<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Heap => Self::Heap,
            Self::Arena(arena) => Self::Arena(arena.clone()),
        }
    }
}

impl<T> Default for Allocator<T> {
    fn default() -> Self {
        Self::Heap
    }
}

impl<T> fmt::Debug for Allocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heap => write!(f, "Allocator::Heap"),
            Self::Arena(arena) => write!(f, "Allocator::Arena(live: {})", lock(arena).len()),
        }
    }
}

enum Origin<T> {
    Heap,
    Arena { key: ArenaKey, arena: ArenaHandle<T> },
}

/// A reference-counted handle to an object created by an [`Allocator`]
pub struct Shared<T> {
    value: Arc<T>,
    origin: Origin<T>,
}

impl<T> Shared<T> {
    /// Number of live handles to this object
    pub fn ref_count(&self) -> usize {
        match &self.origin {
            Origin::Heap => Arc::strong_count(&self.value),
            Origin::Arena { key, arena } => {
                lock(arena).ref_count(key).map_or(0, |count| count as usize)
            }
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    pub fn arena_key(&self) -> Option<ArenaKey> {
        match &self.origin {
            Origin::Heap => None,
            Origin::Arena { key, .. } => Some(*key),
        }
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        let origin = match &self.origin {
            Origin::Heap => Origin::Heap,
            Origin::Arena { key, arena } => {
                lock(arena).retain(key);
                Origin::Arena {
                    key: *key,
                    arena: arena.clone(),
                }
            }
        };
        Self {
            value: self.value.clone(),
            origin,
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Origin::Arena { key, arena } = &self.origin {
            // dropped after the guard so T's destructor never runs under the lock
            let freed = lock(arena).release(key);
            drop(freed);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_handles_share_one_value() {
        let allocator = Allocator::heap();
        let first = allocator.allocate(vec![1, 2, 3]);
        let second = first.clone();

        assert!(first.ptr_eq(&second));
        assert_eq!(first.ref_count(), 2);
        drop(second);
        assert_eq!(first.ref_count(), 1);
        assert_eq!(allocator.live_objects(), None);
    }

    #[test]
    fn arena_frees_slot_on_last_drop() {
        let allocator = Allocator::arena();
        let first = allocator.allocate(String::from("fragment"));
        let second = first.clone();
        assert_eq!(first.ref_count(), 2);
        assert_eq!(allocator.live_objects(), Some(1));

        drop(first);
        assert_eq!(allocator.live_objects(), Some(1));
        assert_eq!(second.as_str(), "fragment");

        drop(second);
        assert_eq!(allocator.live_objects(), Some(0));
    }

    #[test]
    fn arena_lookup_by_key() {
        let allocator = Allocator::arena();
        let original = allocator.allocate(42u64);
        let key = original.arena_key().unwrap();

        let found = allocator.get(&key).unwrap();
        assert_eq!(*found, 42);
        assert_eq!(original.ref_count(), 2);

        drop(found);
        drop(original);
        assert!(allocator.get(&key).is_none());
        assert!(Allocator::<u64>::heap().get(&key).is_none());
    }
}
