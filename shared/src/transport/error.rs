use thiserror::Error;

use crate::types::Rank;

/// Errors raised by a transport while moving envelopes between ranks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The packet could not be handed to the transport
    #[error("Failed to send packet to rank {to}")]
    SendFailed { to: Rank },

    /// The transport failed while polling for a packet
    #[error("Failed to receive packet from rank {from}")]
    ReceiveFailed { from: Rank },

    /// The destination rank is not part of the group
    #[error("Rank {rank} is outside a group of {size} ranks")]
    UnknownRank { rank: Rank, size: u32 },

    /// Every peer endpoint has been dropped
    #[error("Transport disconnected. All peer endpoints have been dropped")]
    Disconnected,
}
