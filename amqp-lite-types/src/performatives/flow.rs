use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{Fields, Handle, TransferNumber},
    primitives::{DescriptorDef, Value},
    Error,
};

/// Update link state
///
/// Session fields are always present, link fields only when `handle` is set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flow {
    /// Expected next incoming transfer-id, absent until the remote begin is seen
    pub next_incoming_id: Option<TransferNumber>,

    /// Incoming-window of the sender
    pub incoming_window: u32,

    /// The next outgoing transfer-id of the sender
    pub next_outgoing_id: TransferNumber,

    /// Outgoing-window of the sender
    pub outgoing_window: u32,

    /// The link the flow state applies to
    pub handle: Option<Handle>,

    /// The endpoint's delivery-count
    pub delivery_count: Option<u32>,

    /// The current maximum number of messages that can be received
    pub link_credit: Option<u32>,

    /// The number of available messages
    pub available: Option<u32>,

    /// Indicates drain mode
    pub drain: bool,

    /// Request state from the partner
    pub echo: bool,

    /// Link state properties
    pub properties: Option<Fields>,
}

impl Composite for Flow {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:flow:list", 0x13);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.next_incoming_id.into(),
            self.incoming_window.into(),
            self.next_outgoing_id.into(),
            self.outgoing_window.into(),
            self.handle.into(),
            self.delivery_count.into(),
            self.link_credit.into(),
            self.available.into(),
            self.drain.into(),
            self.echo.into(),
            self.properties.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            next_incoming_id: fields.next()?,
            incoming_window: fields.required()?,
            next_outgoing_id: fields.required()?,
            outgoing_window: fields.required()?,
            handle: fields.next()?,
            delivery_count: fields.next()?,
            link_credit: fields.next()?,
            available: fields.next()?,
            drain: fields.or(false)?,
            echo: fields.or(false)?,
            properties: fields.next()?,
        })
    }
}

composite_value!(Flow);
