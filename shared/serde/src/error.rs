use thiserror::Error;

/// Errors that can occur while reading values back out of a bit stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran past the end of its buffer
    #[error("Attempted to read past the end of a {buffer_len} byte buffer")]
    BufferExhausted { buffer_len: usize },

    /// A decoded value does not fit the type it is being read into
    #[error("Decoded value {value} is out of range for {target}")]
    ValueOutOfRange { value: i128, target: &'static str },

    /// A length prefix describes more elements than can possibly be present
    #[error("Length prefix {length} exceeds the {remaining_bits} bits left in the buffer")]
    LengthTooLarge { length: u64, remaining_bits: usize },
}
