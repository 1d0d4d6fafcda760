use std::sync::Arc;

use canopy_shared::{Allocator, EuclideanMetric, ExchangeConfig, TableExchange};
use canopy_test::{line_table, LinkConditionerConfig, RecordingTaskGenerator, TestGroup};

fn report(rank: u32) -> u64 {
    (rank as u64 + 1) * 10
}

/// Every rank reports some finished work, then the group runs `cycles` full cycles
fn exchange_reports(test_group: TestGroup, cycles: u32) -> Vec<(u64, usize, bool)> {
    test_group.run(|mut comm| {
        let group = *comm.group();
        let allocator = Allocator::heap();
        let table = Arc::new(line_table(&allocator, group.rank(), 1, 1));
        let mut exchange =
            TableExchange::new(group, table, allocator, ExchangeConfig::default()).unwrap();
        let mut recorder = RecordingTaskGenerator::new();
        let mut outbox = Vec::new();

        exchange.push_completed_computation(report(group.rank()) / 2);
        exchange.push_completed_computation(report(group.rank()) / 2);
        assert!(!exchange.can_terminate());

        for _ in 0..cycles * exchange.max_stage() {
            exchange
                .send_receive(&mut comm, &EuclideanMetric, &mut outbox, &mut recorder)
                .unwrap();
        }
        (
            recorder.completed_elsewhere,
            recorder.reports,
            exchange.can_terminate(),
        )
    })
}

#[test]
fn reported_work_reaches_every_other_rank() {
    let _ = env_logger::builder().is_test(true).try_init();

    for group_size in [2u32, 4, 8] {
        let total: u64 = (0..group_size).map(report).sum();
        let results = exchange_reports(TestGroup::new(group_size), 1);
        for (rank, (observed, reports, can_terminate)) in results.into_iter().enumerate() {
            assert_eq!(observed + report(rank as u32), total);
            assert_eq!(reports, group_size as usize - 1);
            assert!(can_terminate);
        }
    }
}

#[test]
fn quiet_cycles_report_zero() {
    let group_size = 4;
    let total: u64 = (0..group_size).map(report).sum();
    let results = exchange_reports(
        TestGroup::new(group_size).link_condition(LinkConditionerConfig::poor()),
        3,
    );
    for (rank, (observed, reports, _)) in results.into_iter().enumerate() {
        assert_eq!(observed + report(rank as u32), total);
        assert_eq!(reports, 3 * (group_size as usize - 1));
    }
}
