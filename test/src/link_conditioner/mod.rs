/// Random delivery delays for the in-memory transport, so ranks drift out
/// of step the way real processes do
use canopy_shared::{PacketReceiver, Rank, TransportError};

#[derive(Clone, Debug)]
pub struct LinkConditionerConfig {
    /// Chance that a poll reports nothing even though a packet is waiting
    pub hold_probability: f32,
}

impl LinkConditionerConfig {
    pub fn new(hold_probability: f32) -> Self {
        Self { hold_probability }
    }

    pub fn good() -> Self {
        Self::new(0.1)
    }

    pub fn average() -> Self {
        Self::new(0.5)
    }

    pub fn poor() -> Self {
        Self::new(0.9)
    }
}

/// Wraps a receiver and randomly withholds packets for a poll
pub struct ConditionedReceiver {
    inner: Box<dyn PacketReceiver>,
    config: LinkConditionerConfig,
    rng: fastrand::Rng,
}

impl ConditionedReceiver {
    pub fn new(inner: Box<dyn PacketReceiver>, config: LinkConditionerConfig, seed: u64) -> Self {
        Self {
            inner,
            config,
            rng: fastrand::Rng::with_seed(seed),
        }
    }
}

impl PacketReceiver for ConditionedReceiver {
    fn receive(&mut self, from: Rank) -> Result<Option<Box<[u8]>>, TransportError> {
        if self.rng.f32() < self.config.hold_probability {
            return Ok(None);
        }
        self.inner.receive(from)
    }
}
