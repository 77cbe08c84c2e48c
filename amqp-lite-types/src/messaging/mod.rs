//! Messaging layer types

mod delivery_state;
mod message;
mod terminus;

pub use delivery_state::{Accepted, DeliveryState, Modified, Outcome, Received, Rejected, Released};
pub use message::{
    Annotations, ApplicationProperties, Body, Builder, Header, Message, MessageId, Properties,
};
pub use terminus::{FilterSet, Source, Target};

/// Message format code for standard AMQP messages
pub const MESSAGE_FORMAT: u32 = 0;
