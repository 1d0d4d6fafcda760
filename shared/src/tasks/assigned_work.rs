use std::collections::{BTreeMap, HashMap};

use crate::{table::subtable::SubTableId, types::Rank};

/// Reference point ranges already paired with one query fragment, kept as
/// disjoint `[begin, end)` intervals per owning rank
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssignedWork {
    intervals: HashMap<Rank, BTreeMap<u32, u32>>,
}

impl AssignedWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `reference`. Returns false if any part of its range was
    /// already assigned, leaving the record unchanged.
    pub fn insert(&mut self, reference: SubTableId) -> bool {
        if reference.count == 0 {
            return false;
        }
        let intervals = self.intervals.entry(reference.rank).or_default();

        let begin = reference.begin;
        let end = reference.end();
        if let Some((_, previous_end)) = intervals.range(..=begin).next_back() {
            if *previous_end > begin {
                return false;
            }
        }
        if intervals.range(begin..end).next().is_some() {
            return false;
        }

        intervals.insert(begin, end);
        true
    }

    pub fn contains(&self, reference: SubTableId) -> bool {
        self.intervals
            .get(&reference.rank)
            .and_then(|intervals| intervals.get(&reference.begin))
            .is_some_and(|end| *end == reference.end())
    }

    /// Total number of reference points assigned so far
    pub fn assigned_points(&self) -> u64 {
        self.intervals
            .values()
            .flat_map(|intervals| intervals.iter())
            .map(|(begin, end)| (end - begin) as u64)
            .sum()
    }
}
