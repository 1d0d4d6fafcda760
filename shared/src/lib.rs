//! # Canopy Shared
//! All-to-some subtable exchange over a hypercube schedule, plus the
//! checkout discipline that hands exchanged subtables to a local task queue.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

pub use canopy_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr,
    SerdeIntegerConversion, SignedInteger, SignedVariableInteger, UnsignedInteger,
    UnsignedVariableInteger,
};

mod exchange;
mod messages;
mod route;
mod storage;
mod table;
mod tasks;
mod transport;
mod types;

cfg_if! {
    if #[cfg(feature = "transport_channel")] {
        pub use transport::channel::ChannelTransport;
    }
}

pub use exchange::{
    cache::{CacheSlot, ExchangeCache},
    error::ExchangeError,
    exchange_config::{ExchangeConfig, ReceivePollConfig},
    table_exchange::{RoundOutcome, StageGate, TableExchange},
};
pub use messages::envelope::MessageEnvelope;
pub use route::route_request::RouteRequest;
pub use storage::{
    allocator::{Allocator, Shared},
    arena::{Arena, ArenaKey},
};
pub use table::{
    bound::{Bound, Range},
    local_table::LocalTable,
    metric::{EuclideanMetric, Metric},
    subtable::{SubTable, SubTableId},
};
pub use tasks::{
    assigned_work::AssignedWork,
    query_subtable_lock::QuerySubTableLock,
    task::{Task, TaskList},
    task_generator::{ReceivedSubTable, TaskGenerator},
    task_queue::{TaskQueue, WorkTotals},
    task_queue_config::TaskQueueConfig,
    work_counters::WorkCounters,
};
pub use transport::{
    communicator::Communicator, error::TransportError, PacketReceiver, PacketSender,
};
pub use types::{hypercube_distance, CacheId, ProcessGroup, Rank, Stage};
