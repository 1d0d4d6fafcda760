use std::sync::Arc;

use canopy_shared::{
    Allocator, EuclideanMetric, ExchangeConfig, RoundOutcome, RouteRequest, SubTableId,
    TableExchange,
};
use canopy_test::{line_table, RecordingTaskGenerator, TestGroup};

/// Rank 0 ships one subtable to {1, 2, 3}. Rank 1 gets it directly at stage 0
/// and relays it to rank 3 at stage 1, while rank 0 hands it to rank 2.
#[test]
fn subtable_reaches_all_destinations_in_two_rounds() {
    let _ = env_logger::builder().is_test(true).try_init();
    let id = SubTableId::new(0, 0, 3);

    TestGroup::new(4).run(|mut comm| {
        let group = *comm.group();
        let rank = group.rank();
        let allocator = Allocator::arena();
        let table = Arc::new(line_table(&allocator, rank, 1, 3));
        let mut outbox = Vec::new();
        if rank == 0 {
            outbox.push(RouteRequest::to_ranks(table.fragments()[0].clone(), [1, 2, 3]));
        }
        let mut exchange =
            TableExchange::new(group, table, allocator, ExchangeConfig::default()).unwrap();
        let mut recorder = RecordingTaskGenerator::new();

        // round 0: pairs (0, 1) and (2, 3)
        let outcome = exchange
            .send_receive(&mut comm, &EuclideanMetric, &mut outbox, &mut recorder)
            .unwrap();
        let RoundOutcome::Completed { stage, received, .. } = outcome else {
            panic!("round 0 did not run on rank {}", rank);
        };
        assert_eq!(stage, 0);
        match rank {
            1 => {
                assert_eq!(received, vec![id]);
                assert_eq!(exchange.cache().lock_count(0), Some(1));
                assert_eq!(exchange.find_subtable(0).map(|subtable| subtable.id()), Some(id));
            }
            _ => assert!(received.is_empty()),
        }
        assert!(outbox.is_empty());
        assert_eq!(exchange.stage(), 1);
        assert!(!exchange.can_terminate());

        // round 1: pairs (0, 2) and (1, 3)
        let outcome = exchange
            .send_receive(&mut comm, &EuclideanMetric, &mut outbox, &mut recorder)
            .unwrap();
        let RoundOutcome::Completed { stage, received, .. } = outcome else {
            panic!("round 1 did not run on rank {}", rank);
        };
        assert_eq!(stage, 1);
        match rank {
            2 | 3 => assert_eq!(received, vec![id]),
            _ => assert!(received.is_empty()),
        }

        // the relay copy on rank 1 is freed once forwarded
        if rank == 1 {
            assert_eq!(exchange.cache().lock_count(0), Some(0));
            assert!(exchange.find_subtable(0).is_none());
        }
        assert_eq!(recorder.times_received(id), usize::from(rank != 0));
        assert_eq!(exchange.stage(), 0);
        assert!(exchange.can_terminate());
        assert!(exchange.is_ready_for_stage());
    });
}
