/// Identifier of one worker process within the fixed-size group
pub type Rank = u32;

/// Index of a slot in the exchange cache; equal to the rank that owns the slot
pub type CacheId = usize;

/// Index of one recursive-doubling round within a hypercube cycle
pub type Stage = u32;

/// The fixed set of cooperating processes, seen from one member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessGroup {
    rank: Rank,
    size: u32,
}

impl ProcessGroup {
    /// Returns `None` unless `rank < size`
    pub fn new(rank: Rank, size: u32) -> Option<Self> {
        if size == 0 || rank >= size {
            return None;
        }
        Some(Self { rank, size })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_solo(&self) -> bool {
        self.size == 1
    }

    /// Every member except the local one, in rank order
    pub fn others(&self) -> impl Iterator<Item = Rank> + '_ {
        (0..self.size).filter(move |rank| *rank != self.rank)
    }

    /// Number of recursive-doubling stages in one cycle, when the size is a power of two
    pub fn max_stage(&self) -> Option<Stage> {
        if self.size.is_power_of_two() {
            Some(self.size.trailing_zeros())
        } else {
            None
        }
    }

    /// Partner of the local rank at the given stage
    pub fn neighbor(&self, stage: Stage) -> Rank {
        self.rank ^ (1 << stage)
    }
}

/// Hypercube distance between two ranks: the number of stages on which their paths differ
pub fn hypercube_distance(a: Rank, b: Rank) -> u32 {
    (a ^ b).count_ones()
}
