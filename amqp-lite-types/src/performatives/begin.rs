use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{Fields, TransferNumber},
    primitives::{DescriptorDef, Symbol, Value},
    Error,
};

/// Begin a session on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Begin {
    /// The remote channel for this session, set when answering a remote begin
    pub remote_channel: Option<u16>,

    /// The transfer-id of the first transfer id the sender will send
    pub next_outgoing_id: TransferNumber,

    /// The initial incoming-window of the sender
    pub incoming_window: u32,

    /// The initial outgoing-window of the sender
    pub outgoing_window: u32,

    /// The maximum handle value that can be used on the session,
    /// defaults to `u32::MAX`
    pub handle_max: u32,

    /// The extension capabilities the sender supports
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// The extension capabilities the sender can use if the receiver supports them
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// Session properties
    pub properties: Option<Fields>,
}

impl Composite for Begin {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:begin:list", 0x11);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.remote_channel.into(),
            self.next_outgoing_id.into(),
            self.incoming_window.into(),
            self.outgoing_window.into(),
            self.handle_max.into(),
            self.offered_capabilities.clone().into(),
            self.desired_capabilities.clone().into(),
            self.properties.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            remote_channel: fields.next()?,
            next_outgoing_id: fields.required()?,
            incoming_window: fields.required()?,
            outgoing_window: fields.required()?,
            handle_max: fields.or(u32::MAX)?,
            offered_capabilities: fields.next()?,
            desired_capabilities: fields.next()?,
            properties: fields.next()?,
        })
    }
}

composite_value!(Begin);
