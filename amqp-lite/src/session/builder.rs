//! Session builder

use std::sync::Arc;

use super::{Session, SessionInner, DEFAULT_HANDLE_MAX, DEFAULT_WINDOW};
use crate::{Connection, Error};

/// Builder for a [`Session`]
#[derive(Debug, Clone)]
pub struct Builder {
    /// Number of links the session can carry
    pub handle_max: u32,

    /// Number of transfer frames the peer may send before a flow
    pub incoming_window: u32,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder with default settings
    pub fn new() -> Self {
        Self {
            handle_max: DEFAULT_HANDLE_MAX,
            incoming_window: DEFAULT_WINDOW,
        }
    }

    /// Number of links the session can carry
    pub fn handle_max(mut self, handle_max: u32) -> Self {
        self.handle_max = handle_max.max(1);
        self
    }

    /// Number of transfer frames the peer may send before a flow
    pub fn incoming_window(mut self, incoming_window: u32) -> Self {
        self.incoming_window = incoming_window.max(1);
        self
    }

    /// Reserves a channel on `connection` and sends the begin frame
    pub fn begin(self, connection: &Connection) -> Result<Session, Error> {
        let inner = connection.inner.add_session(|channel| {
            Arc::new(SessionInner::new(
                connection.inner.clone(),
                channel,
                self.incoming_window,
                self.handle_max,
            ))
        })?;
        if let Err(err) = inner.send_begin() {
            connection.inner.remove_session(inner.channel(), None);
            return Err(err);
        }
        Ok(Session { inner })
    }
}
