use std::sync::Arc;

use canopy_shared::{
    Allocator, EuclideanMetric, ExchangeConfig, RoundOutcome, RouteRequest, TableExchange,
    TaskQueue, TaskQueueConfig, WorkTotals,
};
use canopy_test::{line_table, LinkConditionerConfig, TestGroup};

const FRAGMENTS: u32 = 2;
const POINTS: u32 = 3;

struct Summary {
    rounds: usize,
    remaining_global: u64,
    remaining_work: Vec<u64>,
    assigned_points: Vec<u64>,
    live_subtables: Option<usize>,
    total_locks: u64,
}

fn run_all_pairs(test_group: TestGroup, favor: f64) -> Vec<Summary> {
    let group_size = test_group.size();
    test_group.run(|mut comm| {
        let group = *comm.group();
        let metric = EuclideanMetric;
        let allocator = Allocator::arena();
        let table = Arc::new(line_table(&allocator, group.rank(), FRAGMENTS, POINTS));

        let points = (group_size * FRAGMENTS * POINTS) as u64;
        let totals = WorkTotals {
            query_points: points,
            reference_points: points,
        };
        let config = TaskQueueConfig {
            process_rank_favor_factor: favor,
        };
        let mut queue = TaskQueue::new(&group, &table, totals, config);
        queue.generate_local_tasks(&metric, &table);

        let mut outbox = Vec::new();
        if !group.is_solo() {
            outbox.extend(
                table
                    .fragments()
                    .iter()
                    .map(|fragment| RouteRequest::broadcast(&group, fragment.clone())),
            );
        }
        let mut exchange =
            TableExchange::new(group, table.clone(), allocator.clone(), ExchangeConfig::default())
                .unwrap();

        let mut rounds = 0;
        let mut calls = 0;
        loop {
            let outcome = exchange
                .send_receive(&mut comm, &metric, &mut outbox, &mut queue)
                .unwrap();
            if let RoundOutcome::Completed { .. } = outcome {
                rounds += 1;
            }
            calls += 1;

            while let Some((lock, task)) = queue.dequeue() {
                queue.complete(&metric, lock, task, &mut exchange);
            }

            if outbox.is_empty() && queue.is_done() && exchange.can_terminate() {
                break;
            }
            assert!(calls < 1000, "rank {} never terminated", group.rank());
        }

        exchange.log_cached_subtables();
        Summary {
            rounds,
            remaining_global: queue.counters().remaining_global_computation(),
            remaining_work: (0..queue.len())
                .filter_map(|index| queue.remaining_work(index))
                .collect(),
            assigned_points: (0..queue.len())
                .filter_map(|index| queue.assigned_work(index))
                .map(|work| work.assigned_points())
                .collect(),
            live_subtables: allocator.live_objects(),
            total_locks: exchange.total_locks(),
        }
    })
}

fn assert_all_pairs_processed(group_size: u32, summaries: &[Summary]) {
    let points = (group_size * FRAGMENTS * POINTS) as u64;
    let rounds = summaries[0].rounds;
    for summary in summaries {
        assert_eq!(summary.rounds, rounds);
        assert_eq!(summary.remaining_global, 0);
        assert_eq!(summary.remaining_work, vec![0; FRAGMENTS as usize]);
        assert_eq!(summary.assigned_points, vec![points; FRAGMENTS as usize]);
        assert_eq!(summary.total_locks, 0);
        assert_eq!(summary.live_subtables, Some(FRAGMENTS as usize));
    }
}

#[test]
fn every_pair_is_computed_once() {
    let _ = env_logger::builder().is_test(true).try_init();

    for group_size in [2, 4, 8] {
        let summaries = run_all_pairs(TestGroup::new(group_size), 0.0);
        assert_all_pairs_processed(group_size, &summaries);
    }
}

#[test]
fn rank_favor_and_uneven_delivery_keep_the_totals() {
    let group_size = 4;
    let test_group = TestGroup::new(group_size).link_condition(LinkConditionerConfig::average());
    let summaries = run_all_pairs(test_group, 5.0);
    assert_all_pairs_processed(group_size, &summaries);
}

#[test]
fn single_rank_needs_no_exchange() {
    let summaries = run_all_pairs(TestGroup::new(1), 0.0);
    assert_eq!(summaries[0].rounds, 0);
    assert_all_pairs_processed(1, &summaries);
}
