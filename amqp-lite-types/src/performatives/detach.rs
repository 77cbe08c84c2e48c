use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{self, Handle},
    primitives::{DescriptorDef, Value},
    Error,
};

/// Detach the link endpoint from the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detach {
    /// The local handle of the link to be detached
    pub handle: Handle,

    /// If true then the sender has closed the link
    pub closed: bool,

    /// Error causing the detach
    pub error: Option<definitions::Error>,
}

impl Composite for Detach {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:detach:list", 0x16);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.handle.into(),
            self.closed.into(),
            self.error.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            handle: fields.required()?,
            closed: fields.or(false)?,
            error: fields.next()?,
        })
    }
}

composite_value!(Detach);
