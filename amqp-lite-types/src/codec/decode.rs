//! Decoding of [`Value`]s

use ordered_float::OrderedFloat;

use crate::{
    bit_converter::*,
    format_code::FormatCode,
    primitives::{Binary, Described, Descriptor, OrderedMap, Symbol, Timestamp, Value},
    ByteBuffer, Error,
};

/// Reads a constructor and the value that follows it
pub fn read_value(buffer: &mut ByteBuffer) -> Result<Value, Error> {
    let code = FormatCode::try_from(read_ubyte(buffer)?)?;
    read_value_with_code(buffer, code)
}

/// Reads the value that follows an already consumed constructor
pub fn read_value_with_code(buffer: &mut ByteBuffer, code: FormatCode) -> Result<Value, Error> {
    let value = match code {
        FormatCode::Described => {
            let descriptor = read_descriptor(buffer)?;
            let value = read_value(buffer)?;
            Value::Described(Box::new(Described { descriptor, value }))
        }
        FormatCode::Null => Value::Null,
        FormatCode::Boolean => Value::Bool(read_ubyte(buffer)? != 0),
        FormatCode::BooleanTrue => Value::Bool(true),
        FormatCode::BooleanFalse => Value::Bool(false),
        FormatCode::UByte => Value::UByte(read_ubyte(buffer)?),
        FormatCode::UShort => Value::UShort(read_ushort(buffer)?),
        FormatCode::UInt => Value::UInt(read_uint(buffer)?),
        FormatCode::SmallUInt => Value::UInt(read_ubyte(buffer)? as u32),
        FormatCode::UInt0 => Value::UInt(0),
        FormatCode::ULong => Value::ULong(read_ulong(buffer)?),
        FormatCode::SmallULong => Value::ULong(read_ubyte(buffer)? as u64),
        FormatCode::ULong0 => Value::ULong(0),
        FormatCode::Byte => Value::Byte(read_byte(buffer)?),
        FormatCode::Short => Value::Short(read_short(buffer)?),
        FormatCode::Int => Value::Int(read_int(buffer)?),
        FormatCode::SmallInt => Value::Int(read_byte(buffer)? as i32),
        FormatCode::Long => Value::Long(read_long(buffer)?),
        FormatCode::SmallLong => Value::Long(read_byte(buffer)? as i64),
        FormatCode::Float => Value::Float(OrderedFloat(read_float(buffer)?)),
        FormatCode::Double => Value::Double(OrderedFloat(read_double(buffer)?)),
        FormatCode::Decimal32 => {
            let mut bytes = [0u8; 4];
            read_bytes(buffer, &mut bytes)?;
            Value::Decimal32(bytes)
        }
        FormatCode::Decimal64 => {
            let mut bytes = [0u8; 8];
            read_bytes(buffer, &mut bytes)?;
            Value::Decimal64(bytes)
        }
        FormatCode::Decimal128 => {
            let mut bytes = [0u8; 16];
            read_bytes(buffer, &mut bytes)?;
            Value::Decimal128(bytes)
        }
        FormatCode::Char => {
            let code_point = read_uint(buffer)?;
            let c = char::from_u32(code_point).ok_or(Error::InvalidChar(code_point))?;
            Value::Char(c)
        }
        FormatCode::Timestamp => Value::Timestamp(Timestamp::from_milliseconds(read_long(buffer)?)),
        FormatCode::Uuid => Value::Uuid(read_uuid(buffer)?),
        FormatCode::VBin8 | FormatCode::VBin32 => {
            let len = read_len(buffer, code == FormatCode::VBin8)?;
            Value::Binary(Binary::from(read_vec(buffer, len)?))
        }
        FormatCode::Str8 | FormatCode::Str32 => {
            let len = read_len(buffer, code == FormatCode::Str8)?;
            Value::String(String::from_utf8(read_vec(buffer, len)?)?)
        }
        FormatCode::Sym8 | FormatCode::Sym32 => {
            let len = read_len(buffer, code == FormatCode::Sym8)?;
            Value::Symbol(Symbol::new(String::from_utf8(read_vec(buffer, len)?)?))
        }
        FormatCode::List0 => Value::List(Vec::new()),
        FormatCode::List8 | FormatCode::List32 => {
            let small = code == FormatCode::List8;
            let (_size, count) = read_size_and_count(buffer, small)?;
            let mut items = Vec::with_capacity(count.min(buffer.len()));
            for _ in 0..count {
                items.push(read_value(buffer)?);
            }
            Value::List(items)
        }
        FormatCode::Map8 | FormatCode::Map32 => {
            let small = code == FormatCode::Map8;
            let (_size, count) = read_size_and_count(buffer, small)?;
            let mut map = OrderedMap::new();
            for _ in 0..count / 2 {
                let key = read_value(buffer)?;
                let value = read_value(buffer)?;
                map.insert(key, value);
            }
            Value::Map(map)
        }
        FormatCode::Array8 | FormatCode::Array32 => {
            let small = code == FormatCode::Array8;
            let (_size, count) = read_size_and_count(buffer, small)?;
            read_array(buffer, count)?
        }
    };
    Ok(value)
}

/// Reads a numeric or symbolic descriptor
pub fn read_descriptor(buffer: &mut ByteBuffer) -> Result<Descriptor, Error> {
    match read_value(buffer)? {
        Value::ULong(code) => Ok(Descriptor::Code(code)),
        Value::Symbol(name) => Ok(Descriptor::Name(name)),
        other => Err(Error::InvalidValue {
            expected: "ulong or symbol descriptor",
            found: other.type_name(),
        }),
    }
}

fn read_array(buffer: &mut ByteBuffer, count: usize) -> Result<Value, Error> {
    let code = FormatCode::try_from(read_ubyte(buffer)?)?;
    let mut items = Vec::with_capacity(count.min(buffer.len()));
    match code {
        FormatCode::Described => {
            let descriptor = read_descriptor(buffer)?;
            let element_code = FormatCode::try_from(read_ubyte(buffer)?)?;
            for _ in 0..count {
                let value = read_value_with_code(buffer, element_code)?;
                items.push(Value::Described(Box::new(Described {
                    descriptor: descriptor.clone(),
                    value,
                })));
            }
        }
        element_code => {
            for _ in 0..count {
                items.push(read_value_with_code(buffer, element_code)?);
            }
        }
    }
    Ok(Value::Array(items))
}

fn read_len(buffer: &mut ByteBuffer, small: bool) -> Result<usize, Error> {
    if small {
        Ok(read_ubyte(buffer)? as usize)
    } else {
        Ok(read_uint(buffer)? as usize)
    }
}

fn read_size_and_count(buffer: &mut ByteBuffer, small: bool) -> Result<(usize, usize), Error> {
    let size = read_len(buffer, small)?;
    let count = read_len(buffer, small)?;
    Ok((size, count))
}

fn read_vec(buffer: &mut ByteBuffer, len: usize) -> Result<Vec<u8>, Error> {
    buffer.validate(false, len)?;
    let bytes = buffer.as_slice()[..len].to_vec();
    buffer.complete(len);
    Ok(bytes)
}
