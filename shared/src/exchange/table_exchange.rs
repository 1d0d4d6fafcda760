use std::{hint, sync::Arc, thread};

use log::{debug, info, trace, warn};

use crate::{
    exchange::{
        cache::ExchangeCache, error::ExchangeError, exchange_config::ExchangeConfig,
    },
    messages::envelope::MessageEnvelope,
    route::route_request::RouteRequest,
    storage::allocator::{Allocator, Shared},
    table::{
        local_table::LocalTable,
        metric::Metric,
        subtable::{SubTable, SubTableId},
    },
    tasks::task_generator::{ReceivedSubTable, TaskGenerator},
    transport::communicator::Communicator,
    types::{hypercube_distance, CacheId, ProcessGroup, Rank, Stage},
};

/// Whether the next round may overwrite its receive window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageGate {
    Open,
    Closed,
    /// A round broke off partway. Peers are out of step, so no further
    /// round may run.
    Failed,
}

/// What a call to [`TableExchange::send_receive`] did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The group has a single rank; nothing to exchange
    Solo,
    /// Slots of the next receive window are still locked
    Blocked { stage: Stage },
    /// A round ran at `stage`
    Completed {
        stage: Stage,
        /// Subtables addressed to this rank that arrived during the round
        received: Vec<SubTableId>,
        /// Invalid payloads that were dropped on arrival
        evicted: usize,
    },
}

/// All-to-some exchange of subtables over a hypercube schedule.
///
/// Each round pairs the local rank with `rank ^ (1 << stage)` and trades the
/// cache window the pair has accumulated so far, so after `log2(P)` rounds
/// every rank has seen one envelope from every other rank.
pub struct TableExchange {
    group: ProcessGroup,
    max_stage: Stage,
    stage: Stage,
    gate: StageGate,
    cache: ExchangeCache,
    queued_completed_computation: Option<RouteRequest<u64>>,
    local_table: Arc<LocalTable>,
    allocator: Allocator<SubTable>,
    config: ExchangeConfig,
}

impl TableExchange {
    pub fn new(
        group: ProcessGroup,
        reference_table: Arc<LocalTable>,
        allocator: Allocator<SubTable>,
        config: ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        let max_stage = group.max_stage().ok_or(ExchangeError::UnsupportedGroupSize {
            size: group.size(),
        })?;
        if reference_table.rank() != group.rank() {
            return Err(ExchangeError::RankMismatch {
                table_rank: reference_table.rank(),
                group_rank: group.rank(),
            });
        }

        info!(
            "Rank {} joins a table exchange of {} ranks ({} stages, {} local fragments)",
            group.rank(),
            group.size(),
            max_stage,
            reference_table.fragments().len()
        );

        Ok(Self {
            group,
            max_stage,
            stage: 0,
            gate: StageGate::Open,
            cache: ExchangeCache::new(&group),
            queued_completed_computation: None,
            local_table: reference_table,
            allocator,
            config,
        })
    }

    pub fn group(&self) -> &ProcessGroup {
        &self.group
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn max_stage(&self) -> Stage {
        self.max_stage
    }

    pub fn is_ready_for_stage(&self) -> bool {
        self.gate == StageGate::Open
    }

    pub fn gate(&self) -> StageGate {
        self.gate
    }

    pub fn cache(&self) -> &ExchangeCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ExchangeCache {
        &mut self.cache
    }

    pub fn allocator(&self) -> &Allocator<SubTable> {
        &self.allocator
    }

    pub fn local_table(&self) -> &Arc<LocalTable> {
        &self.local_table
    }

    pub fn find_by_begin_count(&self, begin: u32, count: u32) -> Option<&Shared<SubTable>> {
        self.local_table.find_by_begin_count(begin, count)
    }

    pub fn find_subtable(&self, cache_id: CacheId) -> Option<&Shared<SubTable>> {
        self.cache.find_subtable(cache_id)
    }

    pub fn lock_cache(&mut self, cache_id: CacheId, times: u32) {
        self.cache.lock(cache_id, times);
    }

    pub fn release_cache(&mut self, cache_id: CacheId, times: u32) {
        self.cache.release(cache_id, times);
    }

    pub fn total_locks(&self) -> u64 {
        self.cache.total_locks()
    }

    /// Hypercube distance between the local rank and `rank`
    pub fn process_rank(&self, rank: Rank) -> u32 {
        hypercube_distance(self.group.rank(), rank)
    }

    /// Local termination check: no completed work waits to be reported and
    /// the schedule sits at the start of a cycle
    pub fn can_terminate(&self) -> bool {
        self.queued_completed_computation.is_none() && self.stage == 0
    }

    /// Queues `quantity` units of finished work for broadcast at the next
    /// cycle start. Reports pushed before then are merged.
    pub fn push_completed_computation(&mut self, quantity: u64) {
        if self.group.is_solo() {
            return;
        }
        let route = self
            .queued_completed_computation
            .get_or_insert_with(|| RouteRequest::broadcast(&self.group, 0));
        let total = route.object().copied().unwrap_or(0);
        route.set_object(total + quantity);
    }

    pub fn log_cached_subtables(&self) {
        debug!("Rank {} holds the subtables:", self.group.rank());
        for (cache_id, slot) in self.cache.slots().enumerate() {
            if let Some(id) = slot.envelope().subtable_id() {
                debug!("  slot {}: {} ({} locks)", cache_id, id, slot.lock_count());
            }
        }
    }

    /// Runs one round of the exchange if the stage gate allows it, then
    /// re-evaluates the gate for the following round.
    ///
    /// `outbox` holds subtable routes waiting to leave this rank; one is taken
    /// at the start of each cycle.
    ///
    /// An error is fatal to the exchange: the gate moves to
    /// [`StageGate::Failed`] and every later call returns
    /// [`ExchangeError::Aborted`] without touching the outbox or the transport.
    pub fn send_receive<M: Metric, G: TaskGenerator>(
        &mut self,
        comm: &mut Communicator,
        metric: &M,
        outbox: &mut Vec<RouteRequest<Shared<SubTable>>>,
        tasks: &mut G,
    ) -> Result<RoundOutcome, ExchangeError> {
        if self.group.is_solo() {
            return Ok(RoundOutcome::Solo);
        }

        let outcome = match self.gate {
            StageGate::Open => match self.exchange_round(comm, metric, outbox, tasks) {
                Ok(outcome) => {
                    self.gate = StageGate::Closed;
                    outcome
                }
                Err(error) => {
                    self.abort(&error);
                    return Err(error);
                }
            },
            StageGate::Closed => RoundOutcome::Blocked { stage: self.stage },
            StageGate::Failed => return Err(ExchangeError::Aborted { stage: self.stage }),
        };

        if self.next_window_unlocked() {
            self.gate = StageGate::Open;
        }

        Ok(outcome)
    }

    fn exchange_round<M: Metric, G: TaskGenerator>(
        &mut self,
        comm: &mut Communicator,
        metric: &M,
        outbox: &mut Vec<RouteRequest<Shared<SubTable>>>,
        tasks: &mut G,
    ) -> Result<RoundOutcome, ExchangeError> {
        let stage = self.stage;
        let rank = self.group.rank();
        if stage == 0 {
            self.load_local_slot(outbox);
        }

        let neighbor = self.group.neighbor(stage);
        let window = 1usize << stage;
        let lower = ((rank >> stage) << stage) as CacheId;
        debug!(
            "Rank {} stage {}: trading slots [{}, {}) with rank {}",
            rank,
            stage,
            lower,
            lower + window,
            neighbor
        );

        let mut sent_valid = Vec::with_capacity(window);
        for cache_id in lower..lower + window {
            let Some(envelope) = self.cache.envelope_mut(cache_id) else {
                continue;
            };
            envelope.next_destination(&self.group, stage);
            let bytes = envelope.to_bytes(neighbor, stage);
            if envelope.subtable_route().object_is_valid() && cache_id != rank as CacheId {
                sent_valid.push(cache_id);
            }
            comm.send(neighbor, &bytes)?;
            self.cache.set_send_pending(cache_id, true);
        }

        let mut received = Vec::new();
        let mut arrivals = Vec::with_capacity(window);
        let mut evicted = 0;
        for _ in 0..window {
            let bytes = self.poll_receive(comm, neighbor)?;
            let envelope = MessageEnvelope::from_bytes(&bytes, &self.allocator).map_err(
                |reason| ExchangeError::Decode {
                    from: neighbor,
                    reason,
                },
            )?;

            let origin = envelope.originating_rank();
            if origin >= self.group.size() || origin == rank {
                return Err(ExchangeError::InvalidOriginatingRank {
                    rank: origin,
                    from: neighbor,
                });
            }
            trace!(
                "Rank {} stage {}: envelope of rank {} via rank {} ({:?})",
                rank,
                stage,
                origin,
                neighbor,
                envelope.subtable_id()
            );

            let cache_id = self.cache.store(envelope);
            arrivals.push(cache_id);
            let Some(envelope) = self.cache.envelope_mut(cache_id) else {
                continue;
            };

            let wanted = envelope.subtable_route_mut().remove_from_destination_list(rank);
            let subtable = envelope.subtable().cloned();
            let reported = if envelope.energy_route_mut().remove_from_destination_list(rank) {
                envelope.energy_route().object().copied()
            } else {
                None
            };

            match subtable {
                Some(subtable) => {
                    self.cache.lock(cache_id, self.max_stage - stage - 1);
                    if wanted {
                        received.push(ReceivedSubTable { cache_id, subtable });
                    }
                }
                None => {
                    self.cache.evict(cache_id);
                    evicted += 1;
                }
            }

            if let Some(quantity) = reported {
                tasks.decrement_remaining_global_computation(quantity);
            }
        }

        comm.wait_all()?;
        for cache_id in lower..lower + window {
            self.cache.set_send_pending(cache_id, false);
        }
        for cache_id in sent_valid {
            self.cache.release(cache_id, 1);
        }

        tasks.generate_tasks(metric, &received, &mut self.cache);

        // arrivals no task asked for and no later stage forwards
        for cache_id in arrivals {
            if self.cache.lock_count(cache_id) == Some(0) {
                self.cache.evict(cache_id);
            }
        }

        self.stage = (stage + 1) % self.max_stage;
        let received: Vec<SubTableId> = received.iter().map(ReceivedSubTable::id).collect();
        debug!(
            "Rank {} stage {}: received {} subtables, dropped {} invalid payloads",
            rank,
            stage,
            received.len(),
            evicted
        );

        Ok(RoundOutcome::Completed {
            stage,
            received,
            evicted,
        })
    }

    /// Stops the exchange after a round broke off at the current stage.
    /// Sends of that round will never be waited on, so their slots are no
    /// longer marked pending.
    fn abort(&mut self, error: &ExchangeError) {
        let stage = self.stage;
        warn!(
            "Rank {} stage {}: exchange aborted: {}",
            self.group.rank(),
            stage,
            error
        );
        let lower = ((self.group.rank() >> stage) << stage) as CacheId;
        for cache_id in lower..lower + (1usize << stage) {
            self.cache.set_send_pending(cache_id, false);
        }
        self.gate = StageGate::Failed;
    }

    /// Places the next outgoing subtable and the pending work report into
    /// the local slot. Every rank sends something at every stage, so empty
    /// queues are replaced by an invalid subtable and a zero report.
    fn load_local_slot(&mut self, outbox: &mut Vec<RouteRequest<Shared<SubTable>>>) {
        let rank = self.group.rank();
        let subtable_route = outbox.pop();
        let energy_route = self
            .queued_completed_computation
            .take()
            .unwrap_or_else(|| RouteRequest::broadcast(&self.group, 0));

        let Some(envelope) = self.cache.envelope_mut(rank as CacheId) else {
            return;
        };
        envelope.set_originating_rank(rank);
        match subtable_route {
            Some(route) => {
                envelope.subtable_route_mut().init_with(route);
                envelope.subtable_route_mut().remove_from_destination_list(rank);
            }
            None => envelope.subtable_route_mut().init(&self.group),
        }
        envelope.energy_route_mut().init_with(energy_route);
    }

    fn poll_receive(
        &self,
        comm: &mut Communicator,
        from: Rank,
    ) -> Result<Box<[u8]>, ExchangeError> {
        let mut polls: u32 = 0;
        loop {
            if let Some(bytes) = comm.receive(from)? {
                return Ok(bytes);
            }
            if polls < self.config.receive_poll.spins_before_yield {
                polls += 1;
                hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
    }

    /// The next round overwrites the slots of the neighbor's window at that
    /// stage; it may only run once none of them is locked
    fn next_window_unlocked(&self) -> bool {
        let stage = self.stage;
        let neighbor = self.group.neighbor(stage);
        let lower = ((neighbor >> stage) << stage) as CacheId;
        self.cache.is_window_unlocked(lower, 1usize << stage)
    }
}
