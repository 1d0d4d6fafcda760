use std::collections::BTreeSet;

use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use crate::types::{ProcessGroup, Rank, Stage};

/// An object travelling hop by hop through the hypercube toward a set of ranks.
///
/// The object is optional: an invalid request still travels (so every rank keeps
/// the same round structure) but carries nothing that may be read.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRequest<T> {
    object: Option<T>,
    destinations: BTreeSet<Rank>,
    next_hop: Option<Rank>,
}

impl<T> RouteRequest<T> {
    /// An invalid request with no destinations
    pub fn new() -> Self {
        Self {
            object: None,
            destinations: BTreeSet::new(),
            next_hop: None,
        }
    }

    /// Ships `object` to every rank of the group except the local one
    pub fn broadcast(group: &ProcessGroup, object: T) -> Self {
        let mut request = Self::new();
        request.add_destinations(group);
        request.object = Some(object);
        request
    }

    /// Ships `object` to the given ranks only
    pub fn to_ranks<I: IntoIterator<Item = Rank>>(object: T, destinations: I) -> Self {
        Self {
            object: Some(object),
            destinations: destinations.into_iter().collect(),
            next_hop: None,
        }
    }

    /// An invalid request addressed to every other rank. Keeps the round
    /// structure intact when there is nothing to send.
    pub fn placeholder(group: &ProcessGroup) -> Self {
        let mut request = Self::new();
        request.add_destinations(group);
        request
    }

    /// Resets to an invalid broadcast
    pub fn init(&mut self, group: &ProcessGroup) {
        *self = Self::placeholder(group);
    }

    /// Takes over the object and destinations of a queued request
    pub fn init_with(&mut self, request: RouteRequest<T>) {
        self.object = request.object;
        self.destinations = request.destinations;
        self.next_hop = None;
    }

    pub fn add_destinations(&mut self, group: &ProcessGroup) {
        self.destinations.extend(group.others());
    }

    pub fn add_destination(&mut self, rank: Rank) {
        self.destinations.insert(rank);
    }

    pub fn object(&self) -> Option<&T> {
        self.object.as_ref()
    }

    pub fn object_mut(&mut self) -> Option<&mut T> {
        self.object.as_mut()
    }

    pub fn set_object(&mut self, object: T) {
        self.object = Some(object);
    }

    pub fn take_object(&mut self) -> Option<T> {
        self.object.take()
    }

    pub fn object_is_valid(&self) -> bool {
        self.object.is_some()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Rank> {
        self.destinations.iter()
    }

    pub fn is_exhausted(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn next_hop(&self) -> Option<Rank> {
        self.next_hop
    }

    /// Records and returns the partner the request travels to at `stage`
    pub fn next_destination(&mut self, group: &ProcessGroup, stage: Stage) -> Rank {
        let neighbor = group.neighbor(stage);
        self.next_hop = Some(neighbor);
        neighbor
    }

    /// Whether any pending destination is reached through `neighbor` at `stage`.
    ///
    /// Recursive doubling fixes bit `s` of the holder at stage `s`, so a hop at
    /// `stage` leads to exactly the ranks sharing the neighbor's low `stage + 1` bits.
    pub fn routes_through(&self, neighbor: Rank, stage: Stage) -> bool {
        let mask: u64 = (1u64 << (stage + 1)) - 1;
        self.destinations
            .iter()
            .any(|rank| (*rank as u64 & mask) == (neighbor as u64 & mask))
    }

    /// Marks `rank` as reached. True iff it was still pending, meaning the
    /// caller must act on the arriving object.
    pub fn remove_from_destination_list(&mut self, rank: Rank) -> bool {
        self.destinations.remove(&rank)
    }

    /// Writes the request, leaving the object out when `include_object` is false
    pub fn write_with(
        &self,
        writer: &mut dyn BitWrite,
        include_object: bool,
        write_object: impl FnOnce(&T, &mut dyn BitWrite),
    ) {
        let object = self.object.as_ref().filter(|_| include_object);
        object.is_some().ser(writer);

        UnsignedVariableInteger::<7>::new(self.destinations.len() as u64).ser(writer);
        for rank in &self.destinations {
            UnsignedVariableInteger::<7>::new(*rank).ser(writer);
        }
        self.next_hop
            .map(UnsignedVariableInteger::<7>::new)
            .ser(writer);

        if let Some(object) = object {
            write_object(object, writer);
        }
    }

    pub fn read_with(
        reader: &mut BitReader,
        read_object: impl FnOnce(&mut BitReader) -> Result<T, SerdeErr>,
    ) -> Result<Self, SerdeErr> {
        let valid = bool::de(reader)?;

        let count: u64 = UnsignedVariableInteger::<7>::de(reader)?.try_to()?;
        let remaining_bits = reader.bits_remaining();
        if count > remaining_bits as u64 {
            return Err(SerdeErr::LengthTooLarge {
                length: count,
                remaining_bits,
            });
        }
        let mut destinations: BTreeSet<Rank> = BTreeSet::new();
        for _ in 0..count {
            destinations.insert(UnsignedVariableInteger::<7>::de(reader)?.try_to()?);
        }

        let next_hop: Option<Rank> = match Option::<UnsignedVariableInteger<7>>::de(reader)? {
            Some(hop) => Some(hop.try_to()?),
            None => None,
        };

        let object = if valid {
            Some(read_object(reader)?)
        } else {
            None
        };

        Ok(Self {
            object,
            destinations,
            next_hop,
        })
    }
}

impl<T> Default for RouteRequest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serde> Serde for RouteRequest<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.write_with(writer, true, |object, writer| object.ser(writer));
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Self::read_with(reader, T::de)
    }

    fn bit_length(&self) -> u32 {
        let mut output = 1;
        output += UnsignedVariableInteger::<7>::new(self.destinations.len() as u64).bit_length();
        for rank in &self.destinations {
            output += UnsignedVariableInteger::<7>::new(*rank).bit_length();
        }
        output += self
            .next_hop
            .map(UnsignedVariableInteger::<7>::new)
            .bit_length();
        output + self.object.as_ref().map_or(0, Serde::bit_length)
    }
}
