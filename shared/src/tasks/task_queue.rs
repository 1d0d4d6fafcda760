use std::sync::Arc;

use log::{debug, trace};

use crate::{
    exchange::{cache::ExchangeCache, table_exchange::TableExchange},
    storage::allocator::Shared,
    table::{local_table::LocalTable, metric::Metric, subtable::SubTable},
    tasks::{
        assigned_work::AssignedWork,
        query_subtable_lock::QuerySubTableLock,
        task::{Task, TaskList},
        task_generator::{ReceivedSubTable, TaskGenerator},
        task_queue_config::TaskQueueConfig,
        work_counters::WorkCounters,
    },
    types::{hypercube_distance, CacheId, ProcessGroup, Rank},
};

/// Point totals over the whole group, used to size the computation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkTotals {
    pub query_points: u64,
    pub reference_points: u64,
}

pub(crate) fn task_priority<M: Metric>(
    metric: &M,
    query: &SubTable,
    reference: &SubTable,
    locked_rank: Rank,
    favor_factor: f64,
) -> f64 {
    let distance = metric.range_distance_sq(query.bound(), reference.bound());
    -distance.mid() - favor_factor * hypercube_distance(locked_rank, reference.rank()) as f64
}

/// Tasks of the local query fragments, kept as four parallel arrays so a
/// fragment and everything pending on it can be checked out as one tuple
pub struct TaskQueue {
    rank: Rank,
    assigned_work: Vec<AssignedWork>,
    query_subtables: Vec<Shared<SubTable>>,
    remaining_work: Vec<u64>,
    tasks: Vec<TaskList>,
    counters: Arc<WorkCounters>,
    config: TaskQueueConfig,
    checked_out: usize,
    backlog: Vec<ReceivedSubTable>,
}

impl TaskQueue {
    pub fn new(
        group: &ProcessGroup,
        query_table: &LocalTable,
        totals: WorkTotals,
        config: TaskQueueConfig,
    ) -> Self {
        let query_subtables: Vec<Shared<SubTable>> = query_table.fragments().to_vec();
        let remaining_work = query_subtables
            .iter()
            .map(|subtable| subtable.id().count as u64 * totals.reference_points)
            .collect();

        debug!(
            "Rank {} queues {} query fragments of {} points",
            group.rank(),
            query_subtables.len(),
            query_table.point_count()
        );

        Self {
            rank: group.rank(),
            assigned_work: vec![AssignedWork::new(); query_subtables.len()],
            remaining_work,
            tasks: query_subtables.iter().map(|_| TaskList::new()).collect(),
            query_subtables,
            counters: Arc::new(WorkCounters::new(
                totals.query_points * totals.reference_points,
            )),
            config,
            checked_out: 0,
            backlog: Vec::new(),
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Number of entries currently in the queue, not counting checked-out ones
    pub fn len(&self) -> usize {
        self.query_subtables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query_subtables.is_empty()
    }

    pub fn checked_out(&self) -> usize {
        self.checked_out
    }

    pub fn counters(&self) -> &Arc<WorkCounters> {
        &self.counters
    }

    pub fn query_subtable(&self, index: usize) -> Option<&Shared<SubTable>> {
        self.query_subtables.get(index)
    }

    pub fn remaining_work(&self, index: usize) -> Option<u64> {
        self.remaining_work.get(index).copied()
    }

    pub fn assigned_work(&self, index: usize) -> Option<&AssignedWork> {
        self.assigned_work.get(index)
    }

    pub fn task_count(&self, index: usize) -> Option<usize> {
        self.tasks.get(index).map(TaskList::len)
    }

    /// True once no task is pending here and no rank has work left
    pub fn is_done(&self) -> bool {
        self.checked_out == 0
            && self.backlog.is_empty()
            && self.counters.num_remaining_tasks() == 0
            && self.counters.remaining_global_computation() == 0
    }

    /// Pairs every query fragment with every fragment of the local reference table
    pub fn generate_local_tasks<M: Metric>(&mut self, metric: &M, reference_table: &LocalTable) {
        for reference in reference_table.fragments() {
            for index in 0..self.len() {
                if self.assigned_work[index].insert(reference.id()) {
                    self.push_task_at(index, metric, reference.clone(), None);
                }
            }
        }
    }

    /// Checks out the entry whose best task has the highest priority and
    /// pops that task. The lock must be handed back through [`TaskQueue::complete`].
    pub fn dequeue(&mut self) -> Option<(QuerySubTableLock, Task)> {
        let index = (0..self.len())
            .filter_map(|index| self.tasks[index].peek().map(|task| (index, task)))
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(index, _)| index)?;

        let rank = self.rank;
        let mut lock = QuerySubTableLock::checkout(self, index, rank)?;
        match lock.pop_task() {
            Some(task) => Some((lock, task)),
            None => {
                lock.return_to(self);
                None
            }
        }
    }

    /// Accounts for a computed task: releases its cache lock, reports the
    /// work to the other ranks and returns the query fragment to the queue
    pub fn complete<M: Metric>(
        &mut self,
        metric: &M,
        mut lock: QuerySubTableLock,
        task: Task,
        exchange: &mut TableExchange,
    ) {
        let work = task.work();
        trace!(
            "Rank {} finished query {} against reference {}",
            self.rank,
            task.query(),
            task.reference_id()
        );

        lock.complete_task(work);
        lock.return_to(self);
        let cache_id = task.reference_cache_id();
        drop(task);
        if let Some(cache_id) = cache_id {
            exchange.release_cache(cache_id, 1);
        }

        exchange.push_completed_computation(work);
        self.counters.decrement_global(work);

        if self.checked_out == 0 {
            self.flush_backlog(metric, exchange.cache_mut());
        }
    }

    fn push_task_at<M: Metric>(
        &mut self,
        index: usize,
        metric: &M,
        reference: Shared<SubTable>,
        cache_id: Option<CacheId>,
    ) {
        let query = &self.query_subtables[index];
        let priority = task_priority(
            metric,
            query,
            &reference,
            self.rank,
            self.config.process_rank_favor_factor,
        );
        let task = Task::new(query.id(), reference, cache_id, priority);
        self.counters.add_task(task.work());
        self.tasks[index].push(task);
    }

    /// Creates the tasks for `received` on every queued entry that lacks them,
    /// locking its cache slot once per task
    fn assign<M: Metric>(
        &mut self,
        metric: &M,
        received: &ReceivedSubTable,
        cache: &mut ExchangeCache,
    ) {
        for index in 0..self.len() {
            if self.assigned_work[index].insert(received.id()) {
                cache.lock(received.cache_id, 1);
                self.push_task_at(index, metric, received.subtable.clone(), Some(received.cache_id));
            }
        }
    }

    /// Assigns subtables that arrived while entries were checked out. Each
    /// held one cache lock of its own until now.
    fn flush_backlog<M: Metric>(&mut self, metric: &M, cache: &mut ExchangeCache) {
        let backlog = std::mem::take(&mut self.backlog);
        for received in backlog {
            self.assign(metric, &received, cache);
            cache.release(received.cache_id, 1);
        }
    }

    pub(crate) fn take_entry(
        &mut self,
        index: usize,
    ) -> Option<(AssignedWork, Shared<SubTable>, u64, TaskList)> {
        if index >= self.len() {
            return None;
        }
        self.checked_out += 1;
        Some((
            self.assigned_work.swap_remove(index),
            self.query_subtables.swap_remove(index),
            self.remaining_work.swap_remove(index),
            self.tasks.swap_remove(index),
        ))
    }

    pub(crate) fn put_entry(
        &mut self,
        assigned_work: AssignedWork,
        query_subtable: Shared<SubTable>,
        remaining_work: u64,
        tasks: TaskList,
    ) {
        self.checked_out = self.checked_out.saturating_sub(1);
        self.assigned_work.push(assigned_work);
        self.query_subtables.push(query_subtable);
        self.remaining_work.push(remaining_work);
        self.tasks.push(tasks);
    }

    pub fn process_rank_favor_factor(&self) -> f64 {
        self.config.process_rank_favor_factor
    }
}

impl TaskGenerator for TaskQueue {
    fn generate_tasks<M: Metric>(
        &mut self,
        metric: &M,
        received: &[ReceivedSubTable],
        cache: &mut ExchangeCache,
    ) {
        if self.checked_out > 0 {
            // entries out of the queue would miss these subtables
            for subtable in received {
                cache.lock(subtable.cache_id, 1);
                self.backlog.push(subtable.clone());
            }
            return;
        }

        self.flush_backlog(metric, cache);
        for subtable in received {
            self.assign(metric, subtable, cache);
        }
    }

    fn decrement_remaining_global_computation(&mut self, quantity: u64) {
        self.counters.decrement_global(quantity);
    }

    fn process_rank_favor_factor(&self) -> f64 {
        self.config.process_rank_favor_factor
    }
}
