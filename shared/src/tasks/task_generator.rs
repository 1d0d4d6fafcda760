use crate::{
    exchange::cache::ExchangeCache,
    storage::allocator::Shared,
    table::{
        metric::Metric,
        subtable::{SubTable, SubTableId},
    },
    types::CacheId,
};

/// A subtable that reached the local rank during the last exchange round
#[derive(Clone, Debug)]
pub struct ReceivedSubTable {
    pub cache_id: CacheId,
    pub subtable: Shared<SubTable>,
}

impl ReceivedSubTable {
    pub fn id(&self) -> SubTableId {
        self.subtable.id()
    }
}

/// Consumer of exchanged subtables, called by the table exchange once per round
pub trait TaskGenerator {
    /// Turns freshly received subtables into tasks. Any cache slot a new task
    /// relies on must be locked through `cache` until the task completes.
    fn generate_tasks<M: Metric>(
        &mut self,
        metric: &M,
        received: &[ReceivedSubTable],
        cache: &mut ExchangeCache,
    );

    /// Another rank reported `quantity` units of completed work
    fn decrement_remaining_global_computation(&mut self, quantity: u64);

    fn process_rank_favor_factor(&self) -> f64;
}
