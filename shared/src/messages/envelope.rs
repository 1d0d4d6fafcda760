use canopy_serde::{BitReader, BitWrite, BitWriter, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    route::route_request::RouteRequest,
    storage::allocator::{Allocator, Shared},
    table::subtable::{SubTable, SubTableId},
    types::{ProcessGroup, Rank, Stage},
};

/// The unit exchanged between ranks: one subtable route, one completed-work
/// ("energy") route, and the rank whose cache slot the envelope belongs to
#[derive(Clone, Debug)]
pub struct MessageEnvelope {
    originating_rank: Rank,
    subtable_route: RouteRequest<Shared<SubTable>>,
    energy_route: RouteRequest<u64>,
}

impl MessageEnvelope {
    pub fn new(originating_rank: Rank) -> Self {
        Self {
            originating_rank,
            subtable_route: RouteRequest::new(),
            energy_route: RouteRequest::new(),
        }
    }

    pub fn originating_rank(&self) -> Rank {
        self.originating_rank
    }

    pub fn set_originating_rank(&mut self, rank: Rank) {
        self.originating_rank = rank;
    }

    pub fn subtable_route(&self) -> &RouteRequest<Shared<SubTable>> {
        &self.subtable_route
    }

    pub fn subtable_route_mut(&mut self) -> &mut RouteRequest<Shared<SubTable>> {
        &mut self.subtable_route
    }

    pub fn energy_route(&self) -> &RouteRequest<u64> {
        &self.energy_route
    }

    pub fn energy_route_mut(&mut self) -> &mut RouteRequest<u64> {
        &mut self.energy_route
    }

    /// The carried subtable, if the envelope holds a valid one
    pub fn subtable(&self) -> Option<&Shared<SubTable>> {
        self.subtable_route.object()
    }

    pub fn subtable_id(&self) -> Option<SubTableId> {
        self.subtable().map(|subtable| subtable.id())
    }

    /// Advances both routes to the partner at `stage`
    pub fn next_destination(&mut self, group: &ProcessGroup, stage: Stage) -> Rank {
        self.subtable_route.next_destination(group, stage);
        self.energy_route.next_destination(group, stage)
    }

    /// Writes the envelope for the hop to `neighbor`. The subtable payload is
    /// left out when none of its destinations lies behind that hop.
    pub fn write(&self, writer: &mut dyn BitWrite, neighbor: Rank, stage: Stage) {
        UnsignedVariableInteger::<7>::new(self.originating_rank).ser(writer);

        let include_subtable = self.subtable_route.routes_through(neighbor, stage);
        self.subtable_route
            .write_with(writer, include_subtable, |subtable, writer| {
                subtable.ser(writer)
            });
        self.energy_route.ser(writer);
    }

    /// Reads an envelope, placing any received subtable with `allocator`
    pub fn read(reader: &mut BitReader, allocator: &Allocator<SubTable>) -> Result<Self, SerdeErr> {
        let originating_rank = UnsignedVariableInteger::<7>::de(reader)?.try_to()?;
        let subtable_route = RouteRequest::read_with(reader, |reader| {
            SubTable::de(reader).map(|subtable| allocator.allocate(subtable))
        })?;
        let energy_route = RouteRequest::<u64>::de(reader)?;

        Ok(Self {
            originating_rank,
            subtable_route,
            energy_route,
        })
    }

    pub fn to_bytes(&self, neighbor: Rank, stage: Stage) -> Box<[u8]> {
        let mut writer = BitWriter::new();
        self.write(&mut writer, neighbor, stage);
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8], allocator: &Allocator<SubTable>) -> Result<Self, SerdeErr> {
        let mut reader = BitReader::new(bytes);
        Self::read(&mut reader, allocator)
    }
}
