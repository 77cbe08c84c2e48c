//! Link builder

use std::sync::Arc;

use amqp_lite_types::{
    definitions::{Fields, ReceiverSettleMode, SenderSettleMode},
    messaging::{Source, Target},
    performatives::Attach,
};

use super::{
    receiver::ReceiverState, sender::SenderState, LinkInner, LinkKind, ReceiverLink, SenderLink,
};
use crate::{Error, Session};

/// Builder for [`SenderLink`] and [`ReceiverLink`]
#[derive(Debug, Clone)]
pub struct Builder {
    /// Name of the link, unique per direction between two containers
    pub name: String,

    /// Source terminus
    pub source: Option<Source>,

    /// Target terminus
    pub target: Option<Target>,

    /// Settlement policy of the sender
    pub snd_settle_mode: SenderSettleMode,

    /// Settlement policy of the receiver
    pub rcv_settle_mode: ReceiverSettleMode,

    /// Largest message this endpoint accepts
    pub max_message_size: Option<u64>,

    /// Link properties
    pub properties: Option<Fields>,
}

impl Builder {
    /// Creates a builder for a link named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            target: None,
            snd_settle_mode: SenderSettleMode::default(),
            rcv_settle_mode: ReceiverSettleMode::default(),
            max_message_size: None,
            properties: None,
        }
    }

    /// Source terminus
    pub fn source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Target terminus
    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Settlement policy of the sender
    pub fn sender_settle_mode(mut self, mode: SenderSettleMode) -> Self {
        self.snd_settle_mode = mode;
        self
    }

    /// Settlement policy of the receiver
    pub fn receiver_settle_mode(mut self, mode: ReceiverSettleMode) -> Self {
        self.rcv_settle_mode = mode;
        self
    }

    /// Largest message this endpoint accepts
    pub fn max_message_size(mut self, max_message_size: u64) -> Self {
        self.max_message_size = Some(max_message_size);
        self
    }

    /// Link properties
    pub fn properties(mut self, properties: Fields) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Attaches a sending link. Messages may be sent before the peer answers.
    pub fn attach_sender(self, session: &Session) -> Result<SenderLink, Error> {
        let inner = self.attach(session, LinkKind::Sender(SenderState::default()))?;
        Ok(SenderLink { inner })
    }

    /// Attaches a receiving link
    pub fn attach_receiver(self, session: &Session) -> Result<ReceiverLink, Error> {
        let inner = self.attach(session, LinkKind::Receiver(ReceiverState::default()))?;
        Ok(ReceiverLink { inner })
    }

    fn attach(self, session: &Session, kind: LinkKind) -> Result<Arc<LinkInner>, Error> {
        let role = kind.role();
        let initial_delivery_count = match kind {
            LinkKind::Sender(_) => Some(0),
            LinkKind::Receiver(_) => None,
        };
        let link = session.inner.add_link(|handle| {
            let attach = Attach {
                name: self.name,
                handle,
                role,
                snd_settle_mode: self.snd_settle_mode,
                rcv_settle_mode: self.rcv_settle_mode,
                source: self.source,
                target: self.target,
                unsettled: None,
                incomplete_unsettled: false,
                initial_delivery_count,
                max_message_size: self.max_message_size,
                offered_capabilities: None,
                desired_capabilities: None,
                properties: self.properties,
            };
            Arc::new(LinkInner::new(session.inner.clone(), attach, kind))
        })?;

        if let Err(err) = link.send_attach() {
            session.inner.remove_link(link.handle);
            return Err(err);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(name = %link.name, handle = link.handle, ?role, "attaching");
        #[cfg(feature = "log")]
        log::debug!("attaching {} handle={} role={:?}", link.name, link.handle, role);

        Ok(link)
    }
}
