use canopy_serde::SerdeErr;
use thiserror::Error;

use crate::{
    transport::error::TransportError,
    types::{Rank, Stage},
};

/// Errors that can occur while setting up or driving the table exchange.
/// Protocol states (invalid payloads, locked slots) are never reported here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// The hypercube schedule needs a power-of-two number of ranks
    #[error("Process group of {size} ranks is not supported. The exchange requires a power-of-two group size")]
    UnsupportedGroupSize { size: u32 },

    /// The local table handed to the exchange belongs to another rank
    #[error("Local table belongs to rank {table_rank} but the exchange runs on rank {group_rank}")]
    RankMismatch { table_rank: Rank, group_rank: Rank },

    /// A received envelope names an originating rank that cannot own a remote slot
    #[error("Envelope from rank {from} names originating rank {rank}, which has no remote cache slot")]
    InvalidOriginatingRank { rank: Rank, from: Rank },

    /// A received packet could not be decoded
    #[error("Failed to decode envelope from rank {from}: {reason}")]
    Decode { from: Rank, reason: SerdeErr },

    /// An earlier round failed at `stage`; the exchange cannot continue
    #[error("Exchange aborted after a failed round at stage {stage}")]
    Aborted { stage: Stage },

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
