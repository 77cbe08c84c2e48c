#![deny(missing_debug_implementations)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A lightweight AMQP 1.0 protocol engine
//!
//! A [`Connection`] multiplexes [`Session`]s over one byte stream, and every
//! session multiplexes [`SenderLink`]s and [`ReceiverLink`]s. Frames are read
//! by one background task per connection and written through a single writer
//! task, so every handle is cheap to clone and safe to share across tasks.
//!
//! # Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tracing` | Enables logging with `tracing` (default) |
//! | `log` | Enables logging with `log` |
//! | `rustls` | Enables `amqps` addresses with `tokio-rustls` |

pub mod address;
pub mod connection;
pub mod error;
pub mod frames;
pub mod link;
pub mod sasl_profile;
pub mod session;
pub mod transport;
pub mod util;

pub use address::Address;
pub use connection::Connection;
pub use error::Error;
pub use link::{Delivery, DeliveryFut, ReceiverLink, SenderLink};
pub use sasl_profile::SaslProfile;
pub use session::Session;

pub use amqp_lite_types as types;
pub use amqp_lite_types::messaging::{Body, Message, Outcome};
