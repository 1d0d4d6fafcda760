pub mod communicator;
pub mod error;

cfg_if! {
    if #[cfg(feature = "transport_channel")] {
        pub mod channel;
    }
}

use crate::types::Rank;

use error::TransportError;

/// Sending half of a point-to-point transport
pub trait PacketSender: Send {
    /// Hands a packet to the transport without waiting for delivery
    fn send(&mut self, to: Rank, payload: &[u8]) -> Result<(), TransportError>;

    /// Blocks until every packet handed to `send` has left this rank
    fn wait_all(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Receiving half of a point-to-point transport
pub trait PacketReceiver: Send {
    /// Polls for the next packet from `from`. Packets from other ranks that
    /// arrive meanwhile are kept for later calls.
    fn receive(&mut self, from: Rank) -> Result<Option<Box<[u8]>>, TransportError>;
}
