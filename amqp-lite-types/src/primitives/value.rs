use ordered_float::OrderedFloat;
use uuid::Uuid;

use super::{Binary, Described, OrderedMap, Symbol, Timestamp};

/// Any value of the AMQP type system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Indicates an empty value
    Null,

    /// Represents a true or false value
    Bool(bool),

    /// Integer in the range 0 to 2^8 - 1 inclusive
    UByte(u8),

    /// Integer in the range 0 to 2^16 - 1 inclusive
    UShort(u16),

    /// Integer in the range 0 to 2^32 - 1 inclusive
    UInt(u32),

    /// Integer in the range 0 to 2^64 - 1 inclusive
    ULong(u64),

    /// Integer in the range -(2^7) to 2^7 - 1 inclusive
    Byte(i8),

    /// Integer in the range -(2^15) to 2^15 - 1 inclusive
    Short(i16),

    /// Integer in the range -(2^31) to 2^31 - 1 inclusive
    Int(i32),

    /// Integer in the range -(2^63) to 2^63 - 1 inclusive
    Long(i64),

    /// 32-bit floating point number (IEEE 754-2008 binary32)
    Float(OrderedFloat<f32>),

    /// 64-bit floating point number (IEEE 754-2008 binary64)
    Double(OrderedFloat<f64>),

    /// IEEE 754-2008 decimal32, kept as raw bytes
    Decimal32([u8; 4]),

    /// IEEE 754-2008 decimal64, kept as raw bytes
    Decimal64([u8; 8]),

    /// IEEE 754-2008 decimal128, kept as raw bytes
    Decimal128([u8; 16]),

    /// A single Unicode character
    Char(char),

    /// An absolute point in time
    Timestamp(Timestamp),

    /// A universally unique identifier as defined by RFC-4122 section 4.1.2
    Uuid(Uuid),

    /// A sequence of octets
    Binary(Binary),

    /// A sequence of Unicode characters
    String(String),

    /// Symbolic values from a constrained domain
    Symbol(Symbol),

    /// A value with a descriptor
    Described(Box<Described>),

    /// A sequence of polymorphic values
    List(Vec<Value>),

    /// A polymorphic mapping from distinct keys to values
    Map(OrderedMap<Value, Value>),

    /// A sequence of values of a single type
    Array(Vec<Value>),
}

impl Value {
    /// Name of the AMQP type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::UByte(_) => "ubyte",
            Value::UShort(_) => "ushort",
            Value::UInt(_) => "uint",
            Value::ULong(_) => "ulong",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Decimal32(_) => "decimal32",
            Value::Decimal64(_) => "decimal64",
            Value::Decimal128(_) => "decimal128",
            Value::Char(_) => "char",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Binary(_) => "binary",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Described(_) => "described",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
        }
    }

    /// Whether the value is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

macro_rules! impl_from_for_value {
    ($($variant:ident, $ty:ty);* $(;)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_value! {
    Bool, bool;
    UByte, u8;
    UShort, u16;
    UInt, u32;
    ULong, u64;
    Byte, i8;
    Short, i16;
    Int, i32;
    Long, i64;
    Char, char;
    Timestamp, Timestamp;
    Uuid, Uuid;
    Binary, Binary;
    String, String;
    Symbol, Symbol;
    List, Vec<Value>;
    Map, OrderedMap<Value, Value>;
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(OrderedFloat(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(OrderedFloat(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(Binary::from(value))
    }
}

/// Multiple symbols are encoded as an array
impl From<Vec<Symbol>> for Value {
    fn from(value: Vec<Symbol>) -> Self {
        Value::Array(value.into_iter().map(Value::Symbol).collect())
    }
}

impl From<Described> for Value {
    fn from(value: Described) -> Self {
        Value::Described(Box::new(value))
    }
}

impl From<OrderedMap<Symbol, Value>> for Value {
    fn from(value: OrderedMap<Symbol, Value>) -> Self {
        Value::Map(
            value
                .into_iter()
                .map(|(k, v)| (Value::Symbol(k), v))
                .collect(),
        )
    }
}

impl From<OrderedMap<String, Value>> for Value {
    fn from(value: OrderedMap<String, Value>) -> Self {
        Value::Map(
            value
                .into_iter()
                .map(|(k, v)| (Value::String(k), v))
                .collect(),
        )
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}
