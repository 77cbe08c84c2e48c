use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{DeliveryNumber, DeliveryTag, Handle, ReceiverSettleMode},
    messaging::DeliveryState,
    primitives::{DescriptorDef, Value},
    Error,
};

/// Transfer a message
///
/// The message payload follows the performative in the same frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Specifies the link on which the message is transferred
    pub handle: Handle,

    /// Alias for delivery-tag, only on the first transfer of a delivery
    pub delivery_id: Option<DeliveryNumber>,

    /// Delivery-tag, only on the first transfer of a delivery
    pub delivery_tag: Option<DeliveryTag>,

    /// Indicates the message format
    pub message_format: Option<u32>,

    /// Whether the delivery is settled by the sender
    pub settled: Option<bool>,

    /// Indicates that the message has more content
    pub more: bool,

    /// Overrides the receiver settle mode for this delivery
    pub rcv_settle_mode: Option<ReceiverSettleMode>,

    /// The state of the delivery at the sender
    pub state: Option<DeliveryState>,

    /// Indicates a resumed delivery
    pub resume: bool,

    /// Indicates that the message is aborted
    pub aborted: bool,

    /// Batchable hint
    pub batchable: bool,
}

impl Composite for Transfer {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:transfer:list", 0x14);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.handle.into(),
            self.delivery_id.into(),
            self.delivery_tag.clone().into(),
            self.message_format.into(),
            self.settled.into(),
            self.more.into(),
            self.rcv_settle_mode.into(),
            self.state.clone().into(),
            self.resume.into(),
            self.aborted.into(),
            self.batchable.into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            handle: fields.required()?,
            delivery_id: fields.next()?,
            delivery_tag: fields.next()?,
            message_format: fields.next()?,
            settled: fields.next()?,
            more: fields.or(false)?,
            rcv_settle_mode: fields.next()?,
            state: fields.next()?,
            resume: fields.or(false)?,
            aborted: fields.or(false)?,
            batchable: fields.or(false)?,
        })
    }
}

composite_value!(Transfer);
