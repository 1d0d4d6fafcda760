use std::sync::Arc;

use crate::{
    storage::allocator::Shared,
    table::{
        metric::Metric,
        subtable::{SubTable, SubTableId},
    },
    tasks::{
        assigned_work::AssignedWork,
        task::{Task, TaskList},
        task_queue::{task_priority, TaskQueue},
        work_counters::WorkCounters,
    },
    types::{CacheId, Rank},
};

/// Exclusive hold on one query fragment of a [`TaskQueue`] together with
/// its pending tasks. The tuple leaves the queue on checkout and goes back
/// on [`QuerySubTableLock::return_to`].
#[derive(Debug)]
pub struct QuerySubTableLock {
    assigned_work: AssignedWork,
    query_subtable: Shared<SubTable>,
    remaining_work: u64,
    tasks: TaskList,
    locked_rank: Rank,
    counters: Arc<WorkCounters>,
}

impl QuerySubTableLock {
    /// Takes entry `index` out of `queue`. Returns `None` if there is no such entry.
    pub fn checkout(queue: &mut TaskQueue, index: usize, locked_rank: Rank) -> Option<Self> {
        let (assigned_work, query_subtable, remaining_work, tasks) = queue.take_entry(index)?;
        Some(Self {
            assigned_work,
            query_subtable,
            remaining_work,
            tasks,
            locked_rank,
            counters: queue.counters().clone(),
        })
    }

    /// Puts the tuple back at the end of `queue`
    pub fn return_to(self, queue: &mut TaskQueue) {
        queue.put_entry(
            self.assigned_work,
            self.query_subtable,
            self.remaining_work,
            self.tasks,
        );
    }

    /// Queues a task pairing this query fragment with `reference`
    pub fn push_task<M: Metric>(
        &mut self,
        queue: &TaskQueue,
        metric: &M,
        reference: Shared<SubTable>,
        cache_id: Option<CacheId>,
    ) {
        let priority = task_priority(
            metric,
            &self.query_subtable,
            &reference,
            self.locked_rank,
            queue.process_rank_favor_factor(),
        );
        let task = Task::new(self.query_subtable.id(), reference, cache_id, priority);
        self.counters.add_task(task.work());
        self.tasks.push(task);
    }

    /// Records that `reference_id` has been paired with this query fragment.
    /// Only the rank owning the fragment may do so; returns false otherwise
    /// or when the pairing already exists.
    pub fn insert(&mut self, world_rank: Rank, reference_id: SubTableId) -> bool {
        if world_rank != self.query_subtable.rank() {
            return false;
        }
        self.assigned_work.insert(reference_id)
    }

    pub fn pop_task(&mut self) -> Option<Task> {
        self.tasks.pop()
    }

    /// Accounts for a finished task of this fragment
    pub fn complete_task(&mut self, work: u64) {
        self.remaining_work = self.remaining_work.saturating_sub(work);
        self.counters.complete_task(work);
    }

    pub fn subtable_id(&self) -> SubTableId {
        self.query_subtable.id()
    }

    pub fn query_subtable(&self) -> &Shared<SubTable> {
        &self.query_subtable
    }

    pub fn remaining_work(&self) -> u64 {
        self.remaining_work
    }

    pub fn locked_rank(&self) -> Rank {
        self.locked_rank
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn assigned_work(&self) -> &AssignedWork {
        &self.assigned_work
    }
}
