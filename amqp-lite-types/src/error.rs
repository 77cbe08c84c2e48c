//! Custom error

use crate::{
    definitions::{self, AmqpError, ConnectionError},
    primitives::Descriptor,
};

/// Errors raised while encoding or decoding AMQP types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not enough bytes to read from or room to write into a fixed buffer
    #[error("Buffer too small: {requested} bytes requested, {available} available")]
    BufferTooSmall {
        /// Number of bytes the operation needed
        requested: usize,
        /// Number of bytes that were available
        available: usize,
    },

    /// The format code is not defined by the type system
    #[error("Invalid format code 0x{0:02x}")]
    InvalidFormatCode(u8),

    /// A described type whose descriptor is not known in this position
    #[error("Unknown descriptor {0}")]
    UnknownDescriptor(Descriptor),

    /// A value of the wrong type
    #[error("Expecting {expected}, found {found}")]
    InvalidValue {
        /// Type that was expected
        expected: &'static str,
        /// Type that was found
        found: &'static str,
    },

    /// A field of a composite type could not be converted
    #[error("Invalid field {index} of {composite}")]
    InvalidField {
        /// Name of the composite type
        composite: &'static str,
        /// Zero based index of the field
        index: usize,
    },

    /// A mandatory field of a composite type is null or absent
    #[error("Mandatory field {index} of {composite} is missing")]
    MissingField {
        /// Name of the composite type
        composite: &'static str,
        /// Zero based index of the field
        index: usize,
    },

    /// String or symbol bytes are not valid UTF-8
    #[error(transparent)]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A char value is not a valid unicode scalar value
    #[error("Invalid char 0x{0:x}")]
    InvalidChar(u32),

    /// Array elements must all share one constructor
    #[error("Array elements are not of the same type")]
    HeterogeneousArray,

    /// The two sequence numbers are exactly 2^31 apart
    #[error("Comparison between sequence numbers {0} and {1} is undefined")]
    AmbiguousSequenceNumber(u32, u32),

    /// A message carries more than one body section
    #[error("More than one body section found in message")]
    DuplicateBody,
}

impl From<Error> for definitions::Error {
    fn from(err: Error) -> Self {
        let condition: definitions::ErrorCondition = match &err {
            Error::AmbiguousSequenceNumber(_, _) => AmqpError::NotAllowed.into(),
            Error::BufferTooSmall { .. } | Error::UnknownDescriptor(_) => {
                ConnectionError::FramingError.into()
            }
            _ => AmqpError::DecodeError.into(),
        };
        definitions::Error::new(condition, err.to_string(), None)
    }
}
