//! Frame bodies of the transport layer

mod attach;
mod begin;
mod close;
mod detach;
mod disposition;
mod end;
mod flow;
mod open;
mod transfer;

pub use attach::Attach;
pub use begin::Begin;
pub use close::Close;
pub use detach::Detach;
pub use disposition::Disposition;
pub use end::End;
pub use flow::Flow;
pub use open::Open;
pub use transfer::Transfer;

use crate::{
    codec::{read_value, Composite, FieldReader},
    primitives::{Described, Value},
    ByteBuffer, Error,
};

/// One of the nine AMQP performatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Performative {
    /// Open
    Open(Open),
    /// Begin
    Begin(Begin),
    /// Attach
    Attach(Attach),
    /// Flow
    Flow(Flow),
    /// Transfer
    Transfer(Transfer),
    /// Disposition
    Disposition(Disposition),
    /// Detach
    Detach(Detach),
    /// End
    End(End),
    /// Close
    Close(Close),
}

impl Performative {
    /// Name of the performative
    pub fn name(&self) -> &'static str {
        match self {
            Performative::Open(_) => "open",
            Performative::Begin(_) => "begin",
            Performative::Attach(_) => "attach",
            Performative::Flow(_) => "flow",
            Performative::Transfer(_) => "transfer",
            Performative::Disposition(_) => "disposition",
            Performative::Detach(_) => "detach",
            Performative::End(_) => "end",
            Performative::Close(_) => "close",
        }
    }

    /// Writes the performative as a described list
    pub fn encode(&self, buffer: &mut ByteBuffer) -> Result<(), Error> {
        match self {
            Performative::Open(p) => p.encode(buffer),
            Performative::Begin(p) => p.encode(buffer),
            Performative::Attach(p) => p.encode(buffer),
            Performative::Flow(p) => p.encode(buffer),
            Performative::Transfer(p) => p.encode(buffer),
            Performative::Disposition(p) => p.encode(buffer),
            Performative::Detach(p) => p.encode(buffer),
            Performative::End(p) => p.encode(buffer),
            Performative::Close(p) => p.encode(buffer),
        }
    }

    /// Reads a performative, leaving any payload that follows in `buffer`
    pub fn decode(buffer: &mut ByteBuffer) -> Result<Self, Error> {
        let described = match read_value(buffer)? {
            Value::Described(described) => *described,
            other => {
                return Err(Error::InvalidValue {
                    expected: "performative",
                    found: other.type_name(),
                })
            }
        };
        let Described { descriptor, value } = described;
        let fields = match value {
            Value::List(fields) => fields,
            other => {
                return Err(Error::InvalidValue {
                    expected: "list",
                    found: other.type_name(),
                })
            }
        };

        macro_rules! dispatch {
            ($($variant:ident),*) => {
                $(
                    if $variant::DESCRIPTOR.matches(&descriptor) {
                        let fields = FieldReader::new($variant::DESCRIPTOR.name, fields);
                        return $variant::from_fields(fields).map(Performative::$variant);
                    }
                )*
            };
        }
        dispatch!(Open, Begin, Attach, Flow, Transfer, Disposition, Detach, End, Close);

        Err(Error::UnknownDescriptor(descriptor))
    }
}

macro_rules! impl_from_performative {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Performative {
                fn from(value: $variant) -> Self {
                    Performative::$variant(value)
                }
            }
        )*
    };
}

impl_from_performative!(Open, Begin, Attach, Flow, Transfer, Disposition, Detach, End, Close);
