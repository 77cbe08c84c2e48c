use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions,
    primitives::{DescriptorDef, Value},
    Error,
};

/// Signal a connection close
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Close {
    /// Error causing the close
    pub error: Option<definitions::Error>,
}

impl Composite for Close {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:close:list", 0x18);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.error.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            error: fields.next()?,
        })
    }
}

composite_value!(Close);
