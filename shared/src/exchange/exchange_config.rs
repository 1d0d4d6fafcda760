use std::default::Default;

/// Contains Config properties which will be used by the table exchange
#[derive(Clone, Debug, Default)]
pub struct ExchangeConfig {
    /// How the exchange waits for envelopes from its neighbor
    pub receive_poll: ReceivePollConfig,
}

/// Controls the busy-poll loop that waits for a neighbor's envelopes
#[derive(Clone, Copy, Debug)]
pub struct ReceivePollConfig {
    /// Empty polls answered with a spin hint before the thread starts yielding
    pub spins_before_yield: u32,
}

impl Default for ReceivePollConfig {
    fn default() -> Self {
        Self {
            spins_before_yield: 64,
        }
    }
}
