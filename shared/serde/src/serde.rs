use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A type that can be written into and read back out of a bit stream
pub trait Serde: Sized {
    /// Writes the value into the bit stream
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Reads a value back out of the bit stream
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits `ser` will write for this value
    fn bit_length(&self) -> u32;
}

/// Implemented by types whose encoding always has the same length
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
