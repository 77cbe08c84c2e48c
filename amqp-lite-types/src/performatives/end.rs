use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions,
    primitives::{DescriptorDef, Value},
    Error,
};

/// End the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct End {
    /// Error causing the end
    pub error: Option<definitions::Error>,
}

impl Composite for End {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:end:list", 0x17);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.error.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            error: fields.next()?,
        })
    }
}

composite_value!(End);
