use std::fmt;

use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use super::bound::Bound;
use crate::types::Rank;

/// Addresses a fragment of the distributed tree: the rank owning it plus the
/// contiguous point range `[begin, begin + count)` of its root node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubTableId {
    pub rank: Rank,
    pub begin: u32,
    pub count: u32,
}

impl SubTableId {
    pub fn new(rank: Rank, begin: u32, count: u32) -> Self {
        Self { rank, begin, count }
    }

    /// One past the last point. Decoded ids are checked to fit in a `u32`;
    /// ids built locally saturate.
    pub fn end(&self) -> u32 {
        self.begin.saturating_add(self.count)
    }
}

impl fmt::Display for SubTableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.rank, self.begin, self.count)
    }
}

impl Serde for SubTableId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.rank).ser(writer);
        UnsignedVariableInteger::<9>::new(self.begin).ser(writer);
        UnsignedVariableInteger::<9>::new(self.count).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let rank = UnsignedVariableInteger::<7>::de(reader)?.try_to()?;
        let begin: u32 = UnsignedVariableInteger::<9>::de(reader)?.try_to()?;
        let count: u32 = UnsignedVariableInteger::<9>::de(reader)?.try_to()?;
        if begin.checked_add(count).is_none() {
            return Err(SerdeErr::ValueOutOfRange {
                value: begin as i128 + count as i128,
                target: "SubTableId end",
            });
        }
        Ok(Self { rank, begin, count })
    }

    fn bit_length(&self) -> u32 {
        UnsignedVariableInteger::<7>::new(self.rank).bit_length()
            + UnsignedVariableInteger::<9>::new(self.begin).bit_length()
            + UnsignedVariableInteger::<9>::new(self.count).bit_length()
    }
}

/// A fragment of the distributed tree together with its backing points
#[derive(Clone, Debug, PartialEq)]
pub struct SubTable {
    id: SubTableId,
    dimension: u16,
    bound: Bound,
    points: Vec<f64>,
}

impl SubTable {
    /// Builds a fragment from row-major points. Returns `None` when the buffer
    /// does not hold exactly `id.count` points of `dimension` coordinates.
    pub fn new(id: SubTableId, dimension: u16, points: Vec<f64>) -> Option<Self> {
        if points.len() != id.count as usize * dimension as usize {
            return None;
        }
        let bound = Bound::from_points(dimension as usize, &points);
        Some(Self {
            id,
            dimension,
            bound,
            points,
        })
    }

    pub fn id(&self) -> SubTableId {
        self.id
    }

    pub fn rank(&self) -> Rank {
        self.id.rank
    }

    pub fn dimension(&self) -> u16 {
        self.dimension
    }

    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&[f64]> {
        let dimension = self.dimension as usize;
        self.points.get(index * dimension..(index + 1) * dimension)
    }
}

impl Serde for SubTable {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.id.ser(writer);
        self.dimension.ser(writer);
        self.bound.ser(writer);
        self.points.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let id = SubTableId::de(reader)?;
        let dimension = u16::de(reader)?;
        let bound = Bound::de(reader)?;
        if bound.dimension() != dimension as usize {
            return Err(SerdeErr::ValueOutOfRange {
                value: bound.dimension() as i128,
                target: "SubTable bound dimension",
            });
        }
        let points = Vec::<f64>::de(reader)?;
        if points.len() != id.count as usize * dimension as usize {
            return Err(SerdeErr::ValueOutOfRange {
                value: points.len() as i128,
                target: "SubTable points",
            });
        }
        Ok(Self {
            id,
            dimension,
            bound,
            points,
        })
    }

    fn bit_length(&self) -> u32 {
        self.id.bit_length()
            + self.dimension.bit_length()
            + self.bound.bit_length()
            + self.points.bit_length()
    }
}
