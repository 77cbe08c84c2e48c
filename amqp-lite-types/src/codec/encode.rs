//! Encoding of [`Value`]s in their most compact form

use crate::{
    bit_converter::*,
    format_code::FormatCode,
    primitives::{Descriptor, OrderedMap, Value},
    ByteBuffer, Error,
};

/// Writes a value preceded by its constructor
pub fn write_value(buffer: &mut ByteBuffer, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => write_code(buffer, FormatCode::Null),
        Value::Bool(true) => write_code(buffer, FormatCode::BooleanTrue),
        Value::Bool(false) => write_code(buffer, FormatCode::BooleanFalse),
        Value::UByte(v) => {
            write_code(buffer, FormatCode::UByte)?;
            write_ubyte(buffer, *v)
        }
        Value::UShort(v) => {
            write_code(buffer, FormatCode::UShort)?;
            write_ushort(buffer, *v)
        }
        Value::UInt(0) => write_code(buffer, FormatCode::UInt0),
        Value::UInt(v) if *v <= u8::MAX as u32 => {
            write_code(buffer, FormatCode::SmallUInt)?;
            write_ubyte(buffer, *v as u8)
        }
        Value::UInt(v) => {
            write_code(buffer, FormatCode::UInt)?;
            write_uint(buffer, *v)
        }
        Value::ULong(0) => write_code(buffer, FormatCode::ULong0),
        Value::ULong(v) if *v <= u8::MAX as u64 => {
            write_code(buffer, FormatCode::SmallULong)?;
            write_ubyte(buffer, *v as u8)
        }
        Value::ULong(v) => {
            write_code(buffer, FormatCode::ULong)?;
            write_ulong(buffer, *v)
        }
        Value::Byte(v) => {
            write_code(buffer, FormatCode::Byte)?;
            write_byte(buffer, *v)
        }
        Value::Short(v) => {
            write_code(buffer, FormatCode::Short)?;
            write_short(buffer, *v)
        }
        Value::Int(v) if i8::try_from(*v).is_ok() => {
            write_code(buffer, FormatCode::SmallInt)?;
            write_byte(buffer, *v as i8)
        }
        Value::Int(v) => {
            write_code(buffer, FormatCode::Int)?;
            write_int(buffer, *v)
        }
        Value::Long(v) if i8::try_from(*v).is_ok() => {
            write_code(buffer, FormatCode::SmallLong)?;
            write_byte(buffer, *v as i8)
        }
        Value::Long(v) => {
            write_code(buffer, FormatCode::Long)?;
            write_long(buffer, *v)
        }
        Value::Binary(v) if v.len() <= u8::MAX as usize => {
            write_code(buffer, FormatCode::VBin8)?;
            write_ubyte(buffer, v.len() as u8)?;
            write_bytes(buffer, v)
        }
        Value::String(v) if v.len() <= u8::MAX as usize => {
            write_code(buffer, FormatCode::Str8)?;
            write_ubyte(buffer, v.len() as u8)?;
            write_bytes(buffer, v.as_bytes())
        }
        Value::Symbol(v) if v.as_str().len() <= u8::MAX as usize => {
            write_code(buffer, FormatCode::Sym8)?;
            write_ubyte(buffer, v.as_str().len() as u8)?;
            write_bytes(buffer, v.as_str().as_bytes())
        }
        Value::Described(described) => {
            write_code(buffer, FormatCode::Described)?;
            write_descriptor(buffer, &described.descriptor)?;
            write_value(buffer, &described.value)
        }
        Value::List(items) => write_list(buffer, items),
        Value::Map(map) => write_map(buffer, map),
        Value::Array(items) => write_array(buffer, items),
        other => {
            let code = wide_code(other)?;
            write_code(buffer, code)?;
            write_body(buffer, other, code)
        }
    }
}

/// Writes a descriptor, numeric descriptors in their smallest form
pub fn write_descriptor(buffer: &mut ByteBuffer, descriptor: &Descriptor) -> Result<(), Error> {
    match descriptor {
        Descriptor::Code(code) => write_value(buffer, &Value::ULong(*code)),
        Descriptor::Name(name) => write_value(buffer, &Value::Symbol(name.clone())),
    }
}

/// Writes `fields` as a described list, dropping trailing null fields
pub fn write_described_list(
    buffer: &mut ByteBuffer,
    code: u64,
    fields: &[Value],
) -> Result<(), Error> {
    write_code(buffer, FormatCode::Described)?;
    write_value(buffer, &Value::ULong(code))?;

    let mut body = ByteBuffer::new(64, true);
    let mut count = 0;
    let mut end = body.write_pos();
    for (index, field) in fields.iter().enumerate() {
        write_value(&mut body, field)?;
        if !field.is_null() {
            count = index + 1;
            end = body.write_pos();
        }
    }
    body.shrink(body.write_pos() - end);
    write_compound(buffer, Compound::List, count, &body)
}

pub(crate) fn write_code(buffer: &mut ByteBuffer, code: FormatCode) -> Result<(), Error> {
    write_ubyte(buffer, code as u8)
}

fn write_list(buffer: &mut ByteBuffer, items: &[Value]) -> Result<(), Error> {
    let mut body = ByteBuffer::new(64, true);
    for item in items {
        write_value(&mut body, item)?;
    }
    write_compound(buffer, Compound::List, items.len(), &body)
}

fn write_map(buffer: &mut ByteBuffer, map: &OrderedMap<Value, Value>) -> Result<(), Error> {
    let mut body = ByteBuffer::new(64, true);
    for (key, value) in map.iter() {
        write_value(&mut body, key)?;
        write_value(&mut body, value)?;
    }
    write_compound(buffer, Compound::Map, map.len() * 2, &body)
}

fn write_array(buffer: &mut ByteBuffer, items: &[Value]) -> Result<(), Error> {
    let element_code = match items.first() {
        Some(first) => wide_code(first)?,
        None => FormatCode::Null,
    };

    let mut body = ByteBuffer::new(64, true);
    for item in items {
        if std::mem::discriminant(item) != std::mem::discriminant(&items[0]) {
            return Err(Error::HeterogeneousArray);
        }
        write_body(&mut body, item, element_code)?;
    }

    let count = items.len();
    let size = body.len() + 1;
    if size + 1 <= u8::MAX as usize && count <= u8::MAX as usize {
        write_code(buffer, FormatCode::Array8)?;
        write_ubyte(buffer, (size + 1) as u8)?;
        write_ubyte(buffer, count as u8)?;
    } else {
        write_code(buffer, FormatCode::Array32)?;
        write_uint(buffer, (size + 4) as u32)?;
        write_uint(buffer, count as u32)?;
    }
    write_code(buffer, element_code)?;
    write_bytes(buffer, body.as_slice())
}

#[derive(Clone, Copy)]
enum Compound {
    List,
    Map,
}

/// Writes the constructor, size and count of a list or map followed by its encoded items
fn write_compound(
    buffer: &mut ByteBuffer,
    kind: Compound,
    count: usize,
    body: &ByteBuffer,
) -> Result<(), Error> {
    if let (Compound::List, 0) = (kind, count) {
        return write_code(buffer, FormatCode::List0);
    }

    let (small, large) = match kind {
        Compound::List => (FormatCode::List8, FormatCode::List32),
        Compound::Map => (FormatCode::Map8, FormatCode::Map32),
    };
    if body.len() + 1 <= u8::MAX as usize && count <= u8::MAX as usize {
        write_code(buffer, small)?;
        write_ubyte(buffer, (body.len() + 1) as u8)?;
        write_ubyte(buffer, count as u8)?;
    } else {
        write_code(buffer, large)?;
        write_uint(buffer, (body.len() + 4) as u32)?;
        write_uint(buffer, count as u32)?;
    }
    write_bytes(buffer, body.as_slice())
}

/// Constructor used for array elements and values without a compact form
fn wide_code(value: &Value) -> Result<FormatCode, Error> {
    let code = match value {
        Value::Null => FormatCode::Null,
        Value::Bool(_) => FormatCode::Boolean,
        Value::UByte(_) => FormatCode::UByte,
        Value::UShort(_) => FormatCode::UShort,
        Value::UInt(_) => FormatCode::UInt,
        Value::ULong(_) => FormatCode::ULong,
        Value::Byte(_) => FormatCode::Byte,
        Value::Short(_) => FormatCode::Short,
        Value::Int(_) => FormatCode::Int,
        Value::Long(_) => FormatCode::Long,
        Value::Float(_) => FormatCode::Float,
        Value::Double(_) => FormatCode::Double,
        Value::Decimal32(_) => FormatCode::Decimal32,
        Value::Decimal64(_) => FormatCode::Decimal64,
        Value::Decimal128(_) => FormatCode::Decimal128,
        Value::Char(_) => FormatCode::Char,
        Value::Timestamp(_) => FormatCode::Timestamp,
        Value::Uuid(_) => FormatCode::Uuid,
        Value::Binary(_) => FormatCode::VBin32,
        Value::String(_) => FormatCode::Str32,
        Value::Symbol(_) => FormatCode::Sym32,
        Value::List(_) => FormatCode::List32,
        Value::Map(_) => FormatCode::Map32,
        Value::Described(_) | Value::Array(_) => {
            return Err(Error::InvalidValue {
                expected: "primitive array element",
                found: value.type_name(),
            })
        }
    };
    Ok(code)
}

/// Writes the payload of `value` for the fixed width constructor `code`
fn write_body(buffer: &mut ByteBuffer, value: &Value, code: FormatCode) -> Result<(), Error> {
    match value {
        Value::Null => Ok(()),
        Value::Bool(v) => write_ubyte(buffer, *v as u8),
        Value::UByte(v) => write_ubyte(buffer, *v),
        Value::UShort(v) => write_ushort(buffer, *v),
        Value::UInt(v) => write_uint(buffer, *v),
        Value::ULong(v) => write_ulong(buffer, *v),
        Value::Byte(v) => write_byte(buffer, *v),
        Value::Short(v) => write_short(buffer, *v),
        Value::Int(v) => write_int(buffer, *v),
        Value::Long(v) => write_long(buffer, *v),
        Value::Float(v) => write_float(buffer, v.into_inner()),
        Value::Double(v) => write_double(buffer, v.into_inner()),
        Value::Decimal32(v) => write_bytes(buffer, v),
        Value::Decimal64(v) => write_bytes(buffer, v),
        Value::Decimal128(v) => write_bytes(buffer, v),
        Value::Char(v) => write_uint(buffer, *v as u32),
        Value::Timestamp(v) => write_long(buffer, v.milliseconds()),
        Value::Uuid(v) => write_uuid(buffer, v),
        Value::Binary(v) => {
            write_uint(buffer, v.len() as u32)?;
            write_bytes(buffer, v)
        }
        Value::String(v) => {
            write_uint(buffer, v.len() as u32)?;
            write_bytes(buffer, v.as_bytes())
        }
        Value::Symbol(v) => {
            write_uint(buffer, v.as_str().len() as u32)?;
            write_bytes(buffer, v.as_str().as_bytes())
        }
        Value::List(items) => {
            let mut body = ByteBuffer::new(64, true);
            for item in items {
                write_value(&mut body, item)?;
            }
            write_uint(buffer, (body.len() + 4) as u32)?;
            write_uint(buffer, items.len() as u32)?;
            write_bytes(buffer, body.as_slice())
        }
        Value::Map(map) => {
            let mut body = ByteBuffer::new(64, true);
            for (key, value) in map.iter() {
                write_value(&mut body, key)?;
                write_value(&mut body, value)?;
            }
            write_uint(buffer, (body.len() + 4) as u32)?;
            write_uint(buffer, (map.len() * 2) as u32)?;
            write_bytes(buffer, body.as_slice())
        }
        Value::Described(_) | Value::Array(_) => Err(Error::InvalidValue {
            expected: code_name(code),
            found: value.type_name(),
        }),
    }
}

fn code_name(code: FormatCode) -> &'static str {
    match code {
        FormatCode::List32 => "list",
        FormatCode::Map32 => "map",
        _ => "primitive",
    }
}
