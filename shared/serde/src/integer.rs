use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde, ConstBitLength,
};

pub trait SerdeIntegerConversion<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    fn from(value: &SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self;
}

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

// The generic wrapper delegates to a non-generic inner type to keep monomorphized code small.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: IntegerInner,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct IntegerInner {
    value: i128,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl IntegerInner {
    fn new(signed: bool, variable: bool, bits: u8, value: i128) -> Self {
        if bits == 0 {
            panic!("can't create an integer with 0 bits...");
        }
        if bits > 127 {
            panic!("can't create an integer with more than 127 bits...");
        }
        if !signed && value < 0 {
            panic!("can't encode a negative number with an Unsigned Integer!");
        }
        if !variable {
            let limit: i128 = 2_i128.pow(bits as u32);
            if value >= limit || value <= -limit {
                panic!("with {} bits, can't encode number {}", bits, value);
            }
        }

        Self {
            value,
            signed,
            variable,
            bits,
        }
    }

    fn magnitude(&self) -> u128 {
        self.value.unsigned_abs()
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        if self.signed {
            writer.write_bit(self.value < 0);
        }

        let mut value = self.magnitude();
        if self.variable {
            loop {
                let proceed = value >= 2_u128.pow(self.bits as u32);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(value & 1 != 0);
                    value >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..self.bits {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
        }
    }

    fn de(reader: &mut BitReader, signed: bool, variable: bool, bits: u8) -> Result<Self, SerdeErr> {
        let negative = if signed { reader.read_bit()? } else { false };

        let mut magnitude: u128 = 0;
        let mut shift: u32 = 0;
        loop {
            let proceed = if variable { reader.read_bit()? } else { false };
            for _ in 0..bits {
                let bit = reader.read_bit()?;
                if bit {
                    if shift >= 127 {
                        return Err(SerdeErr::ValueOutOfRange {
                            value: i128::MAX,
                            target: "i128",
                        });
                    }
                    magnitude |= 1 << shift;
                }
                shift += 1;
            }
            if !proceed {
                break;
            }
        }

        let magnitude = magnitude as i128;
        let value = if negative { -magnitude } else { magnitude };
        Ok(Self {
            value,
            signed,
            variable,
            bits,
        })
    }

    fn bit_length(&self) -> u32 {
        let mut output: u32 = if self.signed { 1 } else { 0 };

        if self.variable {
            let mut value = self.magnitude();
            loop {
                let proceed = value >= 2_u128.pow(self.bits as u32);
                output += 1 + self.bits as u32;
                value >>= self.bits;
                if !proceed {
                    break;
                }
            }
        } else {
            output += self.bits as u32;
        }
        output
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> SerdeInteger<SIGNED, VARIABLE, BITS> {
    pub fn new<T: Into<i128>>(value: T) -> Self {
        Self {
            inner: IntegerInner::new(SIGNED, VARIABLE, BITS, value.into()),
        }
    }

    pub fn get(&self) -> i128 {
        self.inner.value
    }

    pub fn set<T: Into<i128>>(&mut self, value: T) {
        self.inner = IntegerInner::new(SIGNED, VARIABLE, BITS, value.into());
    }

    pub fn to<T: SerdeIntegerConversion<SIGNED, VARIABLE, BITS>>(&self) -> T {
        T::from(self)
    }

    /// Converts to `T`, reporting decoded values that do not fit instead of panicking
    pub fn try_to<T: TryFrom<i128>>(&self) -> Result<T, SerdeErr> {
        T::try_from(self.inner.value).map_err(|_| SerdeErr::ValueOutOfRange {
            value: self.inner.value,
            target: std::any::type_name::<T>(),
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = IntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }

    fn bit_length(&self) -> u32 {
        self.inner.bit_length()
    }
}

impl<const SIGNED: bool, const BITS: u8> ConstBitLength for SerdeInteger<SIGNED, false, BITS> {
    fn const_bit_length() -> u32 {
        let sign = if SIGNED { 1 } else { 0 };
        sign + BITS as u32
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8, T: Into<i128>> From<T>
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8, T: TryFrom<i128>>
    SerdeIntegerConversion<SIGNED, VARIABLE, BITS> for T
{
    fn from(value: &SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self {
        let Ok(t_value) = T::try_from(value.get()) else {
            panic!("SerdeInteger's value is out of range to convert to this type.");
        };
        t_value
    }
}
