//! Binary encoding of the AMQP type system
//!
//! Primitive values go through [`write_value`] and [`read_value`]. Composite types
//! (performatives, delivery states, sources, targets and the list based message
//! sections) implement [`Composite`] and travel as described lists.

mod decode;
mod encode;

pub use decode::{read_descriptor, read_value, read_value_with_code};
pub use encode::{write_described_list, write_descriptor, write_value};

use uuid::Uuid;

use crate::{
    primitives::{Binary, Described, DescriptorDef, OrderedMap, Symbol, Timestamp, Value},
    ByteBuffer, Error,
};

/// Conversion out of a decoded [`Value`]
pub trait FromValue: Sized {
    /// Converts the value, failing if it has the wrong type
    fn from_value(value: Value) -> Result<Self, Error>;
}

fn unexpected(expected: &'static str, found: &Value) -> Error {
    Error::InvalidValue {
        expected,
        found: found.type_name(),
    }
}

macro_rules! impl_from_value {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, Error> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(unexpected(stringify!($variant), &other)),
                    }
                }
            }
        )*
    };
}

impl_from_value! {
    Bool => bool,
    UByte => u8,
    UShort => u16,
    UInt => u32,
    ULong => u64,
    Int => i32,
    Long => i64,
    Timestamp => Timestamp,
    Uuid => Uuid,
    Binary => Binary,
    String => String,
    Symbol => Symbol,
    List => Vec<Value>,
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, Error> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A single symbol or an array of symbols
impl FromValue for Vec<Symbol> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Symbol(symbol) => Ok(vec![symbol]),
            Value::Array(items) => items.into_iter().map(Symbol::from_value).collect(),
            other => Err(unexpected("symbol or array of symbols", &other)),
        }
    }
}

impl FromValue for OrderedMap<Value, Value> {
    fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Map(map) => Ok(map),
            other => Err(unexpected("map", &other)),
        }
    }
}

impl FromValue for OrderedMap<Symbol, Value> {
    fn from_value(value: Value) -> Result<Self, Error> {
        OrderedMap::<Value, Value>::from_value(value)?
            .into_iter()
            .map(|(k, v)| Symbol::from_value(k).map(|k| (k, v)))
            .collect()
    }
}

impl FromValue for OrderedMap<String, Value> {
    fn from_value(value: Value) -> Result<Self, Error> {
        OrderedMap::<Value, Value>::from_value(value)?
            .into_iter()
            .map(|(k, v)| String::from_value(k).map(|k| (k, v)))
            .collect()
    }
}

/// Sequential access to the fields of a described list
#[derive(Debug)]
pub struct FieldReader {
    composite: &'static str,
    index: usize,
    fields: std::vec::IntoIter<Value>,
}

impl FieldReader {
    /// Creates a reader over the fields of `composite`
    pub fn new(composite: &'static str, fields: Vec<Value>) -> Self {
        Self {
            composite,
            index: 0,
            fields: fields.into_iter(),
        }
    }

    /// Reads the next field, returning `None` if it is null or absent
    pub fn next<T: FromValue>(&mut self) -> Result<Option<T>, Error> {
        let index = self.index;
        self.index += 1;
        match self.fields.next() {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .map_err(|_| Error::InvalidField {
                    composite: self.composite,
                    index,
                }),
        }
    }

    /// Reads the next field, failing if it is null or absent
    pub fn required<T: FromValue>(&mut self) -> Result<T, Error> {
        let index = self.index;
        self.next()?.ok_or(Error::MissingField {
            composite: self.composite,
            index,
        })
    }

    /// Reads the next field, substituting `default` if it is null or absent
    pub fn or<T: FromValue>(&mut self, default: T) -> Result<T, Error> {
        Ok(self.next()?.unwrap_or(default))
    }
}

/// A composite type encoded as a described list
pub trait Composite: Sized {
    /// Descriptor name and code
    const DESCRIPTOR: DescriptorDef;

    /// Fields in declaration order
    fn to_fields(&self) -> Vec<Value>;

    /// Rebuilds the type from its fields
    fn from_fields(fields: FieldReader) -> Result<Self, Error>;

    /// Writes the type as a described list
    fn encode(&self, buffer: &mut ByteBuffer) -> Result<(), Error> {
        write_described_list(buffer, Self::DESCRIPTOR.code, &self.to_fields())
    }

    /// Converts the type into a described [`Value`]
    fn to_value(&self) -> Value {
        Value::Described(Box::new(Described {
            descriptor: Self::DESCRIPTOR.into(),
            value: Value::List(self.to_fields()),
        }))
    }

    /// Converts a described list whose descriptor matches [`Self::DESCRIPTOR`]
    fn from_described(described: Described) -> Result<Self, Error> {
        if !Self::DESCRIPTOR.matches(&described.descriptor) {
            return Err(Error::UnknownDescriptor(described.descriptor));
        }
        match described.value {
            Value::List(fields) => {
                Self::from_fields(FieldReader::new(Self::DESCRIPTOR.name, fields))
            }
            other => Err(unexpected("list", &other)),
        }
    }
}

/// Implements [`FromValue`] and `From<T> for Value` for composite types
macro_rules! composite_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::codec::FromValue for $ty {
                fn from_value(
                    value: $crate::primitives::Value,
                ) -> Result<Self, $crate::Error> {
                    match value {
                        $crate::primitives::Value::Described(described) => {
                            <$ty as $crate::codec::Composite>::from_described(*described)
                        }
                        other => Err($crate::Error::InvalidValue {
                            expected: "described list",
                            found: other.type_name(),
                        }),
                    }
                }
            }

            impl From<$ty> for $crate::primitives::Value {
                fn from(value: $ty) -> Self {
                    $crate::codec::Composite::to_value(&value)
                }
            }
        )*
    };
}

pub(crate) use composite_value;
