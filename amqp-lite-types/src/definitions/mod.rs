//! Roles, settle modes, error conditions and constants shared by all performatives

use crate::{
    codec::FromValue,
    primitives::{Binary, OrderedMap, Symbol, Value},
    Error as CodecError,
};

mod error;

pub use error::{AmqpError, ConnectionError, Error, ErrorCondition, LinkError, SessionError};

/// Major protocol version
pub const MAJOR: u8 = 1;
/// Minor protocol version
pub const MINOR: u8 = 0;
/// Protocol revision
pub const REVISION: u8 = 0;

/// The IANA assigned port number for AMQP
pub const PORT: u16 = 5672;
/// The IANA assigned port number for secure AMQP (amqps)
pub const SECURE_PORT: u16 = 5671;

/// The lower bound for the agreed maximum frame size
pub const MIN_MAX_FRAME_SIZE: u32 = 512;

/// Link handle
pub type Handle = u32;

/// Alias for delivery-id
pub type DeliveryNumber = u32;

/// Delivery-tag
pub type DeliveryTag = Binary;

/// Transfer-id
pub type TransferNumber = u32;

/// Duration in milliseconds
pub type Milliseconds = u32;

/// A mapping from field name to value
pub type Fields = OrderedMap<Symbol, Value>;

/// Link endpoint role, encoded as a boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// false
    Sender,
    /// true
    Receiver,
}

impl From<Role> for Value {
    fn from(value: Role) -> Self {
        Value::Bool(matches!(value, Role::Receiver))
    }
}

impl FromValue for Role {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match bool::from_value(value)? {
            false => Ok(Role::Sender),
            true => Ok(Role::Receiver),
        }
    }
}

/// Settlement policy for a sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SenderSettleMode {
    /// The sender will send all deliveries initially unsettled to the receiver
    Unsettled = 0,
    /// The sender will send all deliveries settled to the receiver
    Settled = 1,
    /// The sender may send a mixture of settled and unsettled deliveries
    #[default]
    Mixed = 2,
}

/// Settlement policy for a receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReceiverSettleMode {
    /// The receiver will spontaneously settle all incoming transfers
    #[default]
    First = 0,
    /// The receiver will only settle after sending the disposition to the sender
    /// and receiving a disposition indicating settlement from the sender
    Second = 1,
}

impl From<SenderSettleMode> for Value {
    fn from(value: SenderSettleMode) -> Self {
        Value::UByte(value as u8)
    }
}

impl FromValue for SenderSettleMode {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match u8::from_value(value)? {
            0 => Ok(SenderSettleMode::Unsettled),
            1 => Ok(SenderSettleMode::Settled),
            2 => Ok(SenderSettleMode::Mixed),
            _ => Err(CodecError::InvalidValue {
                expected: "sender-settle-mode",
                found: "ubyte",
            }),
        }
    }
}

impl From<ReceiverSettleMode> for Value {
    fn from(value: ReceiverSettleMode) -> Self {
        Value::UByte(value as u8)
    }
}

impl FromValue for ReceiverSettleMode {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match u8::from_value(value)? {
            0 => Ok(ReceiverSettleMode::First),
            1 => Ok(ReceiverSettleMode::Second),
            _ => Err(CodecError::InvalidValue {
                expected: "receiver-settle-mode",
                found: "ubyte",
            }),
        }
    }
}
