use canopy_shared::{
    CacheId, ExchangeCache, Metric, ReceivedSubTable, SubTableId, TaskGenerator,
};

/// Records what the exchange hands over without creating any work
#[derive(Debug, Default)]
pub struct RecordingTaskGenerator {
    pub received: Vec<SubTableId>,
    pub received_slots: Vec<CacheId>,
    pub rounds: usize,
    pub completed_elsewhere: u64,
    pub reports: usize,
}

impl RecordingTaskGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn times_received(&self, id: SubTableId) -> usize {
        self.received.iter().filter(|received| **received == id).count()
    }
}

impl TaskGenerator for RecordingTaskGenerator {
    fn generate_tasks<M: Metric>(
        &mut self,
        _metric: &M,
        received: &[ReceivedSubTable],
        _cache: &mut ExchangeCache,
    ) {
        self.rounds += 1;
        for subtable in received {
            self.received.push(subtable.id());
            self.received_slots.push(subtable.cache_id);
        }
    }

    fn decrement_remaining_global_computation(&mut self, quantity: u64) {
        self.completed_elsewhere += quantity;
        self.reports += 1;
    }

    fn process_rank_favor_factor(&self) -> f64 {
        0.0
    }
}
