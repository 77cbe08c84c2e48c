//! Network byte order reads and writes of fixed width primitives on a [`ByteBuffer`]
//!
//! Every read validates that enough bytes are available and advances the read
//! cursor. Every write validates (and possibly grows) the buffer and advances the
//! write cursor.

use uuid::Uuid;

use crate::{ByteBuffer, Error};

macro_rules! read_write_fixed {
    ($($read:ident, $write:ident, $ty:ty);* $(;)?) => {
        $(
            #[doc = concat!("Reads a big-endian `", stringify!($ty), "`")]
            pub fn $read(buffer: &mut ByteBuffer) -> Result<$ty, Error> {
                let mut bytes = [0u8; std::mem::size_of::<$ty>()];
                buffer.take_slice(&mut bytes)?;
                Ok(<$ty>::from_be_bytes(bytes))
            }

            #[doc = concat!("Writes a big-endian `", stringify!($ty), "`")]
            pub fn $write(buffer: &mut ByteBuffer, value: $ty) -> Result<(), Error> {
                buffer.put_slice(&value.to_be_bytes())
            }
        )*
    };
}

read_write_fixed! {
    read_ubyte, write_ubyte, u8;
    read_byte, write_byte, i8;
    read_ushort, write_ushort, u16;
    read_short, write_short, i16;
    read_uint, write_uint, u32;
    read_int, write_int, i32;
    read_ulong, write_ulong, u64;
    read_long, write_long, i64;
}

/// Reads an IEEE 754 single precision float
pub fn read_float(buffer: &mut ByteBuffer) -> Result<f32, Error> {
    read_uint(buffer).map(f32::from_bits)
}

/// Writes an IEEE 754 single precision float
pub fn write_float(buffer: &mut ByteBuffer, value: f32) -> Result<(), Error> {
    write_uint(buffer, value.to_bits())
}

/// Reads an IEEE 754 double precision float
pub fn read_double(buffer: &mut ByteBuffer) -> Result<f64, Error> {
    read_ulong(buffer).map(f64::from_bits)
}

/// Writes an IEEE 754 double precision float
pub fn write_double(buffer: &mut ByteBuffer, value: f64) -> Result<(), Error> {
    write_ulong(buffer, value.to_bits())
}

/// Reads a UUID in network order.
///
/// The wire form is the RFC 4122 byte sequence. Platforms that keep the first
/// three fields little-endian in memory (the GUID layout) see them byte-swapped
/// compared to [`Uuid::to_bytes_le`].
pub fn read_uuid(buffer: &mut ByteBuffer) -> Result<Uuid, Error> {
    let mut bytes = [0u8; 16];
    buffer.take_slice(&mut bytes)?;
    Ok(Uuid::from_bytes(bytes))
}

/// Writes a UUID in network order
pub fn write_uuid(buffer: &mut ByteBuffer, value: &Uuid) -> Result<(), Error> {
    buffer.put_slice(value.as_bytes())
}

/// Fills `dst` with the next readable bytes
pub fn read_bytes(buffer: &mut ByteBuffer, dst: &mut [u8]) -> Result<(), Error> {
    buffer.take_slice(dst)
}

/// Writes raw bytes
pub fn write_bytes(buffer: &mut ByteBuffer, src: &[u8]) -> Result<(), Error> {
    buffer.put_slice(src)
}
