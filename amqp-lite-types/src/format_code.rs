//! Format codes of the AMQP type system

use std::fmt::Display;

use crate::Error;

macro_rules! format_codes {
    ($($(#[$meta:meta])* $name:ident = $code:literal),* $(,)?) => {
        /// Constructor byte that precedes every encoded value
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum FormatCode {
            $(
                $(#[$meta])*
                $name = $code,
            )*
        }

        impl TryFrom<u8> for FormatCode {
            type Error = Error;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($code => Ok(FormatCode::$name),)*
                    other => Err(Error::InvalidFormatCode(other)),
                }
            }
        }
    };
}

format_codes! {
    /// Descriptor constructor
    Described = 0x00,
    /// null
    Null = 0x40,
    /// boolean with one byte payload
    Boolean = 0x56,
    /// boolean true with no payload
    BooleanTrue = 0x41,
    /// boolean false with no payload
    BooleanFalse = 0x42,
    /// 8-bit unsigned
    UByte = 0x50,
    /// 16-bit unsigned
    UShort = 0x60,
    /// 32-bit unsigned
    UInt = 0x70,
    /// 32-bit unsigned in one byte
    SmallUInt = 0x52,
    /// 32-bit unsigned zero
    UInt0 = 0x43,
    /// 64-bit unsigned
    ULong = 0x80,
    /// 64-bit unsigned in one byte
    SmallULong = 0x53,
    /// 64-bit unsigned zero
    ULong0 = 0x44,
    /// 8-bit signed
    Byte = 0x51,
    /// 16-bit signed
    Short = 0x61,
    /// 32-bit signed
    Int = 0x71,
    /// 32-bit signed in one byte
    SmallInt = 0x54,
    /// 64-bit signed
    Long = 0x81,
    /// 64-bit signed in one byte
    SmallLong = 0x55,
    /// IEEE 754 binary32
    Float = 0x72,
    /// IEEE 754 binary64
    Double = 0x82,
    /// IEEE 754 decimal32
    Decimal32 = 0x74,
    /// IEEE 754 decimal64
    Decimal64 = 0x84,
    /// IEEE 754 decimal128
    Decimal128 = 0x94,
    /// UTF-32BE code point
    Char = 0x73,
    /// milliseconds since the unix epoch
    Timestamp = 0x83,
    /// RFC 4122 UUID
    Uuid = 0x98,
    /// binary up to 255 bytes
    VBin8 = 0xa0,
    /// binary up to 2^32 - 1 bytes
    VBin32 = 0xb0,
    /// UTF-8 string up to 255 bytes
    Str8 = 0xa1,
    /// UTF-8 string up to 2^32 - 1 bytes
    Str32 = 0xb1,
    /// ASCII symbol up to 255 bytes
    Sym8 = 0xa3,
    /// ASCII symbol up to 2^32 - 1 bytes
    Sym32 = 0xb3,
    /// empty list
    List0 = 0x45,
    /// list with one byte size and count
    List8 = 0xc0,
    /// list with four byte size and count
    List32 = 0xd0,
    /// map with one byte size and count
    Map8 = 0xc1,
    /// map with four byte size and count
    Map32 = 0xd1,
    /// array with one byte size and count
    Array8 = 0xe0,
    /// array with four byte size and count
    Array32 = 0xf0,
}

impl Display for FormatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:0x{:02x}", self, *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::FormatCode;

    #[test]
    fn try_from_byte() {
        assert_eq!(FormatCode::try_from(0x53).unwrap(), FormatCode::SmallULong);
        assert_eq!(FormatCode::try_from(0xf0).unwrap(), FormatCode::Array32);
        assert!(FormatCode::try_from(0x01).is_err());
        assert_eq!(FormatCode::List8.to_string(), "List8:0xc0");
    }
}
