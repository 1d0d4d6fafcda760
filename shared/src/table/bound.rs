use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// A closed interval of reals
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    pub lo: f64,
    pub hi: f64,
}

impl Range {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn mid(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

/// Axis-aligned bounding box of a fragment's points
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl Bound {
    /// Returns `None` if the corners disagree on dimension or are inverted
    pub fn new(lo: Vec<f64>, hi: Vec<f64>) -> Option<Self> {
        if lo.len() != hi.len() || lo.iter().zip(&hi).any(|(l, h)| l > h) {
            return None;
        }
        Some(Self { lo, hi })
    }

    /// Tightest box around `points`, laid out row-major with `dimension` columns
    pub fn from_points(dimension: usize, points: &[f64]) -> Self {
        let mut lo = vec![f64::INFINITY; dimension];
        let mut hi = vec![f64::NEG_INFINITY; dimension];
        if dimension > 0 {
            for point in points.chunks_exact(dimension) {
                for (d, coordinate) in point.iter().enumerate() {
                    lo[d] = lo[d].min(*coordinate);
                    hi[d] = hi[d].max(*coordinate);
                }
            }
        }
        Self { lo, hi }
    }

    pub fn dimension(&self) -> usize {
        self.lo.len()
    }

    pub fn lo(&self) -> &[f64] {
        &self.lo
    }

    pub fn hi(&self) -> &[f64] {
        &self.hi
    }

    pub fn is_empty(&self) -> bool {
        self.lo.iter().zip(&self.hi).any(|(l, h)| l > h)
    }
}

impl Serde for Bound {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.lo.ser(writer);
        self.hi.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let lo = Vec::<f64>::de(reader)?;
        let hi = Vec::<f64>::de(reader)?;
        if lo.len() != hi.len() {
            return Err(SerdeErr::ValueOutOfRange {
                value: hi.len() as i128,
                target: "Bound",
            });
        }
        Ok(Self { lo, hi })
    }

    fn bit_length(&self) -> u32 {
        self.lo.bit_length() + self.hi.bit_length()
    }
}
