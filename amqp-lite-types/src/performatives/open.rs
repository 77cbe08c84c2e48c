use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{Fields, Milliseconds},
    primitives::{DescriptorDef, Symbol, Value},
    Error,
};

/// Negotiate connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Open {
    /// The id of the source container
    pub container_id: String,

    /// The name of the target host
    pub hostname: Option<String>,

    /// Proposed maximum frame size, defaults to `u32::MAX`
    pub max_frame_size: u32,

    /// The maximum channel number that can be used on the connection,
    /// defaults to `u16::MAX`
    pub channel_max: u16,

    /// Idle time-out in milliseconds
    pub idle_time_out: Option<Milliseconds>,

    /// Locales available for outgoing text
    pub outgoing_locales: Option<Vec<Symbol>>,

    /// Desired locales for incoming text in decreasing level of preference
    pub incoming_locales: Option<Vec<Symbol>>,

    /// The extension capabilities the sender supports
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// The extension capabilities the sender can use if the receiver supports them
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// Connection properties
    pub properties: Option<Fields>,
}

impl Default for Open {
    fn default() -> Self {
        Self {
            container_id: String::new(),
            hostname: None,
            max_frame_size: u32::MAX,
            channel_max: u16::MAX,
            idle_time_out: None,
            outgoing_locales: None,
            incoming_locales: None,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        }
    }
}

impl Composite for Open {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:open:list", 0x10);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.container_id.clone().into(),
            self.hostname.clone().into(),
            self.max_frame_size.into(),
            self.channel_max.into(),
            self.idle_time_out.into(),
            self.outgoing_locales.clone().into(),
            self.incoming_locales.clone().into(),
            self.offered_capabilities.clone().into(),
            self.desired_capabilities.clone().into(),
            self.properties.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            container_id: fields.required()?,
            hostname: fields.next()?,
            max_frame_size: fields.or(u32::MAX)?,
            channel_max: fields.or(u16::MAX)?,
            idle_time_out: fields.next()?,
            outgoing_locales: fields.next()?,
            incoming_locales: fields.next()?,
            offered_capabilities: fields.next()?,
            desired_capabilities: fields.next()?,
            properties: fields.next()?,
        })
    }
}

composite_value!(Open);
