use crate::{
    storage::allocator::Shared,
    table::subtable::{SubTable, SubTableId},
    types::Rank,
};

/// The fragments of the distributed tree owned by one rank
pub struct LocalTable {
    rank: Rank,
    fragments: Vec<Shared<SubTable>>,
}

impl LocalTable {
    pub fn new(rank: Rank, fragments: Vec<Shared<SubTable>>) -> Self {
        Self { rank, fragments }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn fragments(&self) -> &[Shared<SubTable>] {
        &self.fragments
    }

    /// Total number of points across all local fragments
    pub fn point_count(&self) -> u64 {
        self.fragments
            .iter()
            .map(|fragment| fragment.id().count as u64)
            .sum()
    }

    /// Finds the local fragment rooted at the node covering `[begin, begin + count)`
    pub fn find_by_begin_count(&self, begin: u32, count: u32) -> Option<&Shared<SubTable>> {
        self.fragments
            .iter()
            .find(|fragment| fragment.id() == SubTableId::new(self.rank, begin, count))
    }
}
