use std::sync::atomic::{AtomicU64, Ordering};

/// Work bookkeeping shared between a task queue and its checked-out locks
#[derive(Debug, Default)]
pub struct WorkCounters {
    num_remaining_tasks: AtomicU64,
    remaining_local_computation: AtomicU64,
    remaining_global_computation: AtomicU64,
}

fn saturating_sub(counter: &AtomicU64, quantity: u64) -> u64 {
    let previous = counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
            Some(value.saturating_sub(quantity))
        })
        .unwrap_or_else(|value| value);
    previous.saturating_sub(quantity)
}

impl WorkCounters {
    pub fn new(remaining_global_computation: u64) -> Self {
        Self {
            num_remaining_tasks: AtomicU64::new(0),
            remaining_local_computation: AtomicU64::new(0),
            remaining_global_computation: AtomicU64::new(remaining_global_computation),
        }
    }

    pub fn num_remaining_tasks(&self) -> u64 {
        self.num_remaining_tasks.load(Ordering::Acquire)
    }

    pub fn remaining_local_computation(&self) -> u64 {
        self.remaining_local_computation.load(Ordering::Acquire)
    }

    pub fn remaining_global_computation(&self) -> u64 {
        self.remaining_global_computation.load(Ordering::Acquire)
    }

    pub(crate) fn add_task(&self, work: u64) {
        self.num_remaining_tasks.fetch_add(1, Ordering::AcqRel);
        self.remaining_local_computation
            .fetch_add(work, Ordering::AcqRel);
    }

    pub(crate) fn complete_task(&self, work: u64) {
        saturating_sub(&self.num_remaining_tasks, 1);
        saturating_sub(&self.remaining_local_computation, work);
    }

    /// Returns the remaining global computation after the decrement
    pub(crate) fn decrement_global(&self, quantity: u64) -> u64 {
        saturating_sub(&self.remaining_global_computation, quantity)
    }
}
