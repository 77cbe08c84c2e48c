//! Primitive and described types of the AMQP type system

use std::fmt::Display;

mod map;
mod value;

pub use map::OrderedMap;
pub use value::Value;

/// Variable width binary data
pub type Binary = bytes::Bytes;

/// Symbolic value from a constrained domain, encoded as ASCII
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new [`Symbol`]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the symbol as `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Milliseconds since the unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a new [`Timestamp`] from milliseconds
    pub fn from_milliseconds(milliseconds: i64) -> Self {
        Self(milliseconds)
    }

    /// Get the timestamp value as milliseconds
    pub fn milliseconds(&self) -> i64 {
        self.0
    }
}

/// Descriptor of a described type, either the numeric code or the symbolic name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// Numeric descriptor `domain-id << 32 | descriptor-id`
    Code(u64),
    /// Symbolic descriptor such as `amqp:open:list`
    Name(Symbol),
}

impl Descriptor {
    /// Numeric code of the descriptor, if it is numeric
    pub fn code(&self) -> Option<u64> {
        match self {
            Descriptor::Code(code) => Some(*code),
            Descriptor::Name(_) => None,
        }
    }
}

impl Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::Code(code) => write!(f, "0x{:08x}:0x{:08x}", code >> 32, code & 0xffff_ffff),
            Descriptor::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Static description of a composite type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorDef {
    /// Numeric code
    pub code: u64,
    /// Symbolic name
    pub name: &'static str,
}

impl DescriptorDef {
    /// Creates a new descriptor definition
    pub const fn new(name: &'static str, code: u64) -> Self {
        Self { code, name }
    }

    /// Whether a descriptor read from the wire refers to this type
    pub fn matches(&self, descriptor: &Descriptor) -> bool {
        match descriptor {
            Descriptor::Code(code) => *code == self.code,
            Descriptor::Name(name) => name.as_str() == self.name,
        }
    }
}

impl From<DescriptorDef> for Descriptor {
    fn from(value: DescriptorDef) -> Self {
        Descriptor::Code(value.code)
    }
}

/// A value annotated with a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Described {
    /// Descriptor
    pub descriptor: Descriptor,
    /// Described value
    pub value: Value,
}
