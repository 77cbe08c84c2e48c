use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{DeliveryNumber, Role},
    messaging::DeliveryState,
    primitives::{DescriptorDef, Value},
    Error,
};

/// Inform remote peer of delivery state changes over the range `first..=last`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Directionality of disposition
    pub role: Role,

    /// Lower bound of deliveries
    pub first: DeliveryNumber,

    /// Upper bound of deliveries, defaults to `first`
    pub last: Option<DeliveryNumber>,

    /// Indicates deliveries are settled
    pub settled: bool,

    /// Indicates state of deliveries
    pub state: Option<DeliveryState>,

    /// Batchable hint
    pub batchable: bool,
}

impl Composite for Disposition {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:disposition:list", 0x15);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.role.into(),
            self.first.into(),
            self.last.into(),
            self.settled.into(),
            self.state.clone().into(),
            self.batchable.into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            role: fields.required()?,
            first: fields.required()?,
            last: fields.next()?,
            settled: fields.or(false)?,
            state: fields.next()?,
            batchable: fields.or(false)?,
        })
    }
}

composite_value!(Disposition);
