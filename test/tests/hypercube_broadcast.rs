use std::sync::Arc;

use canopy_shared::{
    Allocator, EuclideanMetric, ExchangeConfig, RoundOutcome, RouteRequest, SubTableId,
    TableExchange,
};
use canopy_test::{line_table, LinkConditionerConfig, RecordingTaskGenerator, TestGroup};

struct RankReport {
    rank: u32,
    received: Vec<SubTableId>,
    total_locks: u64,
    can_terminate: bool,
}

fn broadcast_from(group_size: u32, origin: u32, test_group: TestGroup) -> Vec<RankReport> {
    test_group.run(|mut comm| {
        let group = *comm.group();
        let allocator = Allocator::arena();
        let table = Arc::new(line_table(&allocator, group.rank(), 1, 4));
        let mut outbox = Vec::new();
        if group.rank() == origin {
            outbox.push(RouteRequest::broadcast(&group, table.fragments()[0].clone()));
        }

        let mut exchange =
            TableExchange::new(group, table, allocator, ExchangeConfig::default()).unwrap();
        let mut recorder = RecordingTaskGenerator::new();
        for _ in 0..exchange.max_stage() {
            let outcome = exchange
                .send_receive(&mut comm, &EuclideanMetric, &mut outbox, &mut recorder)
                .unwrap();
            assert!(matches!(outcome, RoundOutcome::Completed { .. }));
        }
        assert_eq!(exchange.max_stage(), group_size.trailing_zeros());

        RankReport {
            rank: group.rank(),
            received: recorder.received,
            total_locks: exchange.total_locks(),
            can_terminate: exchange.can_terminate(),
        }
    })
}

fn assert_reached_everyone(group_size: u32, origin: u32, reports: &[RankReport]) {
    let id = SubTableId::new(origin, 0, 4);
    for report in reports {
        if report.rank == origin {
            assert!(report.received.is_empty());
        } else {
            assert_eq!(report.received, vec![id], "rank {} of {}", report.rank, group_size);
        }
        assert_eq!(report.total_locks, 0);
        assert!(report.can_terminate);
    }
}

#[test]
fn every_rank_receives_a_broadcast_once() {
    let _ = env_logger::builder().is_test(true).try_init();

    for group_size in [2, 4, 8] {
        for origin in 0..group_size {
            let reports = broadcast_from(group_size, origin, TestGroup::new(group_size));
            assert_reached_everyone(group_size, origin, &reports);
        }
    }
}

#[test]
fn broadcast_survives_uneven_delivery() {
    let group_size = 8;
    let test_group = TestGroup::new(group_size).link_condition(LinkConditionerConfig::average());
    let reports = broadcast_from(group_size, 5, test_group);
    assert_reached_everyone(group_size, 5, &reports);
}

#[test]
fn targeted_route_skips_other_ranks() {
    let reports = TestGroup::new(4).run(|mut comm| {
        let group = *comm.group();
        let allocator = Allocator::heap();
        let table = Arc::new(line_table(&allocator, group.rank(), 1, 2));
        let mut outbox = Vec::new();
        if group.rank() == 0 {
            outbox.push(RouteRequest::to_ranks(table.fragments()[0].clone(), [3]));
        }

        let mut exchange =
            TableExchange::new(group, table, allocator, ExchangeConfig::default()).unwrap();
        let mut recorder = RecordingTaskGenerator::new();
        let mut dropped = 0;
        for _ in 0..2 {
            if let RoundOutcome::Completed { evicted, .. } = exchange
                .send_receive(&mut comm, &EuclideanMetric, &mut outbox, &mut recorder)
                .unwrap()
            {
                dropped += evicted;
            }
        }
        (recorder.received, dropped, exchange.total_locks())
    });

    let id = SubTableId::new(0, 0, 2);
    assert!(reports[0].0.is_empty());
    assert!(reports[1].0.is_empty());
    assert!(reports[2].0.is_empty());
    assert_eq!(reports[3].0, vec![id]);
    // rank 2 only ever sees a stripped copy from rank 0
    assert_eq!(reports[2].1, 3);
    assert!(reports.iter().all(|report| report.2 == 0));
}
