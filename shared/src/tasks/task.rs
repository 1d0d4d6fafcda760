use std::{cmp::Ordering, collections::BinaryHeap, fmt};

use crate::{
    storage::allocator::Shared,
    table::subtable::{SubTable, SubTableId},
    types::CacheId,
};

/// One unit of work: a query fragment paired with a reference fragment
pub struct Task {
    query: SubTableId,
    reference: Shared<SubTable>,
    reference_cache_id: Option<CacheId>,
    priority: f64,
    work: u64,
}

impl Task {
    /// `reference_cache_id` is `None` for reference fragments owned by the
    /// local rank, which are never held in a cache slot
    pub fn new(
        query: SubTableId,
        reference: Shared<SubTable>,
        reference_cache_id: Option<CacheId>,
        priority: f64,
    ) -> Self {
        let work = query.count as u64 * reference.id().count as u64;
        Self {
            query,
            reference,
            reference_cache_id,
            priority,
            work,
        }
    }

    pub fn query(&self) -> SubTableId {
        self.query
    }

    pub fn reference(&self) -> &Shared<SubTable> {
        &self.reference
    }

    pub fn reference_id(&self) -> SubTableId {
        self.reference.id()
    }

    pub fn reference_cache_id(&self) -> Option<CacheId> {
        self.reference_cache_id
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Number of point pairs this task covers
    pub fn work(&self) -> u64 {
        self.work
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("query", &self.query)
            .field("reference", &self.reference.id())
            .field("reference_cache_id", &self.reference_cache_id)
            .field("priority", &self.priority)
            .field("work", &self.work)
            .finish()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Task {}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.reference.id().cmp(&self.reference.id()))
    }
}

/// Pending tasks of one query fragment, highest priority first
#[derive(Debug, Default)]
pub struct TaskList {
    heap: BinaryHeap<Task>,
    total_work: u64,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.total_work += task.work();
        self.heap.push(task);
    }

    pub fn pop(&mut self) -> Option<Task> {
        let task = self.heap.pop()?;
        self.total_work -= task.work();
        Some(task)
    }

    pub fn peek(&self) -> Option<&Task> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Sum of the work of every pending task
    pub fn total_work(&self) -> u64 {
        self.total_work
    }
}
