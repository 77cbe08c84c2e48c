#![deny(missing_debug_implementations)]

//! AMQP 1.0 data types and binary codec used by `amqp-lite`
//!
//! The crate is organized the way the protocol document is:
//!
//! - [`primitives`] and [`codec`]: the type system and its wire encoding
//! - [`definitions`]: roles, settle modes and error conditions
//! - [`performatives`]: the nine frame bodies exchanged between endpoints
//! - [`messaging`]: message sections, sources, targets and delivery states
//! - [`sasl`]: SASL frame bodies
//!
//! [`ByteBuffer`] is the cursor buffer every encoder and decoder works on and
//! [`SequenceNumber`] implements serial number arithmetic for transfer and
//! delivery ids.

pub mod bit_converter;
pub mod buffer;
pub mod codec;
pub mod definitions;
pub mod error;
pub mod format_code;
pub mod messaging;
pub mod performatives;
pub mod primitives;
pub mod sasl;
pub mod sequence;

pub use buffer::ByteBuffer;
pub use error::Error;
pub use sequence::SequenceNumber;
