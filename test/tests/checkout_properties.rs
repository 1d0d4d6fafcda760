use proptest::prelude::*;

use canopy_shared::{
    Allocator, ExchangeCache, LocalTable, ProcessGroup, QuerySubTableLock, SubTableId, TaskQueue,
    TaskQueueConfig, WorkTotals,
};
use canopy_test::fragment;

fn queue_of(fragments: u32) -> TaskQueue {
    let allocator = Allocator::heap();
    let group = ProcessGroup::new(0, 4).unwrap();
    let table = LocalTable::new(
        0,
        (0..fragments)
            .map(|i| fragment(&allocator, 0, i * 2, 2, i as f64 * 10.0))
            .collect(),
    );
    let totals = WorkTotals {
        query_points: 64,
        reference_points: 64,
    };
    TaskQueue::new(&group, &table, totals, TaskQueueConfig::default())
}

fn entries(queue: &TaskQueue) -> Vec<(SubTableId, u64)> {
    let mut entries: Vec<_> = (0..queue.len())
        .filter_map(|index| {
            let id = queue.query_subtable(index)?.id();
            Some((id, queue.remaining_work(index)?))
        })
        .collect();
    entries.sort();
    entries
}

proptest! {
    #[test]
    fn checkout_then_return_keeps_every_tuple(
        fragments in 1u32..12,
        picks in proptest::collection::vec(0usize..16, 0..12),
    ) {
        let mut queue = queue_of(fragments);
        let before = entries(&queue);

        let mut held = Vec::new();
        for pick in picks {
            let len = queue.len();
            match QuerySubTableLock::checkout(&mut queue, pick, 0) {
                Some(lock) => {
                    prop_assert!(pick < len);
                    held.push(lock);
                }
                None => prop_assert!(pick >= len),
            }
            prop_assert_eq!(queue.len() + held.len(), fragments as usize);
        }
        prop_assert_eq!(queue.checked_out(), held.len());

        for lock in held.into_iter().rev() {
            lock.return_to(&mut queue);
        }
        prop_assert_eq!(queue.checked_out(), 0);
        prop_assert_eq!(entries(&queue), before);
    }

    #[test]
    fn lock_counts_never_underflow(
        operations in proptest::collection::vec((0usize..4, 0u32..4, any::<bool>()), 0..64),
    ) {
        let group = ProcessGroup::new(0, 4).unwrap();
        let mut cache = ExchangeCache::new(&group);
        let mut expected = [0u32; 4];

        for (cache_id, times, lock) in operations {
            if lock {
                cache.lock(cache_id, times);
                expected[cache_id] += times;
            } else {
                cache.release(cache_id, times);
                expected[cache_id] = expected[cache_id].saturating_sub(times);
            }
            prop_assert_eq!(cache.lock_count(cache_id), Some(expected[cache_id]));
        }
        let total: u64 = expected.iter().map(|count| *count as u64).sum();
        prop_assert_eq!(cache.total_locks(), total);
    }
}
