use crate::{
    codec::{composite_value, Composite, FieldReader, FromValue},
    definitions::{self, Fields},
    primitives::{DescriptorDef, Value},
    Error,
};

/// The accepted outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accepted {}

/// The rejected outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejected {
    /// The error that caused the message to be rejected
    pub error: Option<definitions::Error>,
}

/// The released outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Released {}

/// The modified outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modified {
    /// Count the transfer as an unsuccessful delivery attempt
    pub delivery_failed: Option<bool>,

    /// Prevent redelivery
    pub undeliverable_here: Option<bool>,

    /// Message attributes to combine with the existing message-annotations
    pub message_annotations: Option<Fields>,
}

/// The received delivery state, describing how much of a partial message arrived
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Received {
    /// The index of the section where the delivery should resume
    pub section_number: u32,

    /// The offset within the section where the delivery should resume
    pub section_offset: u64,
}

impl Composite for Accepted {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:accepted:list", 0x24);

    fn to_fields(&self) -> Vec<Value> {
        Vec::new()
    }

    fn from_fields(_: FieldReader) -> Result<Self, Error> {
        Ok(Self {})
    }
}

impl Composite for Rejected {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:rejected:list", 0x25);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.error.clone().into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            error: fields.next()?,
        })
    }
}

impl Composite for Released {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:released:list", 0x26);

    fn to_fields(&self) -> Vec<Value> {
        Vec::new()
    }

    fn from_fields(_: FieldReader) -> Result<Self, Error> {
        Ok(Self {})
    }
}

impl Composite for Modified {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:modified:list", 0x27);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.delivery_failed.into(),
            self.undeliverable_here.into(),
            self.message_annotations.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            delivery_failed: fields.next()?,
            undeliverable_here: fields.next()?,
            message_annotations: fields.next()?,
        })
    }
}

impl Composite for Received {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:received:list", 0x23);

    fn to_fields(&self) -> Vec<Value> {
        vec![self.section_number.into(), self.section_offset.into()]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            section_number: fields.required()?,
            section_offset: fields.required()?,
        })
    }
}

composite_value!(Accepted, Rejected, Released, Modified, Received);

/// Terminal state of a delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Accepted
    Accepted(Accepted),
    /// Rejected
    Rejected(Rejected),
    /// Released
    Released(Released),
    /// Modified
    Modified(Modified),
}

/// State of a delivery as carried by transfers and dispositions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Accepted
    Accepted(Accepted),
    /// Rejected
    Rejected(Rejected),
    /// Released
    Released(Released),
    /// Modified
    Modified(Modified),
    /// Received, a non-terminal state
    Received(Received),
}

impl DeliveryState {
    /// Whether the state is an outcome
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryState::Received(_))
    }

    /// Converts a terminal state into an [`Outcome`]
    pub fn into_outcome(self) -> Option<Outcome> {
        match self {
            DeliveryState::Accepted(s) => Some(Outcome::Accepted(s)),
            DeliveryState::Rejected(s) => Some(Outcome::Rejected(s)),
            DeliveryState::Released(s) => Some(Outcome::Released(s)),
            DeliveryState::Modified(s) => Some(Outcome::Modified(s)),
            DeliveryState::Received(_) => None,
        }
    }
}

impl From<Outcome> for DeliveryState {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Accepted(s) => DeliveryState::Accepted(s),
            Outcome::Rejected(s) => DeliveryState::Rejected(s),
            Outcome::Released(s) => DeliveryState::Released(s),
            Outcome::Modified(s) => DeliveryState::Modified(s),
        }
    }
}

impl From<DeliveryState> for Value {
    fn from(value: DeliveryState) -> Self {
        match value {
            DeliveryState::Accepted(s) => s.into(),
            DeliveryState::Rejected(s) => s.into(),
            DeliveryState::Released(s) => s.into(),
            DeliveryState::Modified(s) => s.into(),
            DeliveryState::Received(s) => s.into(),
        }
    }
}

impl From<Outcome> for Value {
    fn from(value: Outcome) -> Self {
        DeliveryState::from(value).into()
    }
}

impl FromValue for DeliveryState {
    fn from_value(value: Value) -> Result<Self, Error> {
        let described = match value {
            Value::Described(described) => *described,
            other => {
                return Err(Error::InvalidValue {
                    expected: "delivery-state",
                    found: other.type_name(),
                })
            }
        };
        let descriptor = &described.descriptor;
        if Accepted::DESCRIPTOR.matches(descriptor) {
            Accepted::from_described(described).map(DeliveryState::Accepted)
        } else if Rejected::DESCRIPTOR.matches(descriptor) {
            Rejected::from_described(described).map(DeliveryState::Rejected)
        } else if Released::DESCRIPTOR.matches(descriptor) {
            Released::from_described(described).map(DeliveryState::Released)
        } else if Modified::DESCRIPTOR.matches(descriptor) {
            Modified::from_described(described).map(DeliveryState::Modified)
        } else if Received::DESCRIPTOR.matches(descriptor) {
            Received::from_described(described).map(DeliveryState::Received)
        } else {
            Err(Error::UnknownDescriptor(described.descriptor))
        }
    }
}

impl FromValue for Outcome {
    fn from_value(value: Value) -> Result<Self, Error> {
        DeliveryState::from_value(value)?
            .into_outcome()
            .ok_or(Error::InvalidValue {
                expected: "outcome",
                found: "received",
            })
    }
}
