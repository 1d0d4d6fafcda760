use std::thread;

use canopy_shared::{ChannelTransport, Communicator};
use log::{debug, info};

use crate::link_conditioner::{ConditionedReceiver, LinkConditionerConfig};

/// Runs one closure per rank of an in-memory group, each on its own thread
pub struct TestGroup {
    size: u32,
    link_condition: Option<LinkConditionerConfig>,
}

impl TestGroup {
    pub fn new(size: u32) -> Self {
        Self {
            size,
            link_condition: None,
        }
    }

    pub fn link_condition(mut self, config: LinkConditionerConfig) -> Self {
        self.link_condition = Some(config);
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Connected communicators, one per rank, in rank order
    pub fn communicators(&self) -> Vec<Communicator> {
        ChannelTransport::group(self.size)
            .into_iter()
            .map(|comm| match &self.link_condition {
                None => comm,
                Some(config) => {
                    let (group, sender, receiver) = comm.into_parts();
                    debug!("Conditioning the link into rank {}: {:?}", group.rank(), config);
                    let seed = 0x5eed + group.rank() as u64;
                    let receiver = ConditionedReceiver::new(receiver, config.clone(), seed);
                    Communicator::new(group, sender, Box::new(receiver))
                }
            })
            .collect()
    }

    /// Runs `rank_main` for every rank concurrently and returns the results
    /// in rank order. Panics if any rank panics.
    pub fn run<F, R>(&self, rank_main: F) -> Vec<R>
    where
        F: Fn(Communicator) -> R + Sync,
        R: Send,
    {
        info!(
            "Starting a test group of {} ranks (link conditioned: {})",
            self.size,
            self.link_condition.is_some()
        );
        let communicators = self.communicators();
        let rank_main = &rank_main;
        thread::scope(|scope| {
            let handles: Vec<_> = communicators
                .into_iter()
                .map(|comm| scope.spawn(move || rank_main(comm)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("rank thread panicked"))
                .collect()
        })
    }
}
