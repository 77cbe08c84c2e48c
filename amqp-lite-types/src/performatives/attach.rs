use crate::{
    codec::{composite_value, Composite, FieldReader},
    definitions::{Fields, Handle, ReceiverSettleMode, Role, SenderSettleMode},
    messaging::{Source, Target},
    primitives::{DescriptorDef, OrderedMap, Symbol, Value},
    Error,
};

/// Attach a link to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attach {
    /// The name of the link
    pub name: String,

    /// The handle for the link while attached
    pub handle: Handle,

    /// Role of the link endpoint
    pub role: Role,

    /// Settlement policy for the sender
    pub snd_settle_mode: SenderSettleMode,

    /// The settlement policy of the receiver
    pub rcv_settle_mode: ReceiverSettleMode,

    /// The source for messages
    pub source: Option<Source>,

    /// The target for messages
    pub target: Option<Target>,

    /// Unsettled delivery state
    pub unsettled: Option<OrderedMap<Value, Value>>,

    /// Whether the unsettled map is incomplete
    pub incomplete_unsettled: bool,

    /// The sender's initial value for delivery-count, required for senders
    pub initial_delivery_count: Option<u32>,

    /// The maximum message size supported by the link endpoint
    pub max_message_size: Option<u64>,

    /// The extension capabilities the sender supports
    pub offered_capabilities: Option<Vec<Symbol>>,

    /// The extension capabilities the sender can use if the receiver supports them
    pub desired_capabilities: Option<Vec<Symbol>>,

    /// Link properties
    pub properties: Option<Fields>,
}

impl Composite for Attach {
    const DESCRIPTOR: DescriptorDef = DescriptorDef::new("amqp:attach:list", 0x12);

    fn to_fields(&self) -> Vec<Value> {
        vec![
            self.name.clone().into(),
            self.handle.into(),
            self.role.into(),
            self.snd_settle_mode.into(),
            self.rcv_settle_mode.into(),
            self.source.clone().into(),
            self.target.clone().into(),
            self.unsettled.clone().into(),
            self.incomplete_unsettled.into(),
            self.initial_delivery_count.into(),
            self.max_message_size.into(),
            self.offered_capabilities.clone().into(),
            self.desired_capabilities.clone().into(),
            self.properties.clone().into(),
        ]
    }

    fn from_fields(mut fields: FieldReader) -> Result<Self, Error> {
        Ok(Self {
            name: fields.required()?,
            handle: fields.required()?,
            role: fields.required()?,
            snd_settle_mode: fields.or(SenderSettleMode::Mixed)?,
            rcv_settle_mode: fields.or(ReceiverSettleMode::First)?,
            source: fields.next()?,
            target: fields.next()?,
            unsettled: fields.next()?,
            incomplete_unsettled: fields.or(false)?,
            initial_delivery_count: fields.next()?,
            max_message_size: fields.next()?,
            offered_capabilities: fields.next()?,
            desired_capabilities: fields.next()?,
            properties: fields.next()?,
        })
    }
}

composite_value!(Attach);
