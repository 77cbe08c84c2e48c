//! Implements AMQP1.0 Link
//!
//! [`SenderLink`] and [`ReceiverLink`] are thin handles over a shared
//! [`LinkInner`]. The attach and detach handshake is the same for both; credit
//! handling is dispatched on [`LinkKind`].

use std::{sync::Arc, time::Duration};

use amqp_lite_types::{
    definitions::{self, Handle, LinkError, Role},
    performatives::{Attach, Detach, Flow},
    ByteBuffer, SequenceNumber,
};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    error::Terminal,
    session::SessionInner,
    util::{wait_closed, with_timeout},
    Error,
};

mod builder;
pub(crate) mod delivery;
pub mod receiver;
pub mod sender;

pub use builder::Builder;
pub use delivery::{Delivery, DeliveryFut};
pub use receiver::{MessageCallback, ReceiverLink};
pub use sender::SenderLink;

use delivery::OutgoingDelivery;
use receiver::ReceiverState;
use sender::SenderState;

/// Link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Nothing has been sent or received
    Start,
    /// The attach frame has been sent
    AttachSent,
    /// The remote attach frame has been received
    AttachReceived,
    /// Attach frames have been exchanged
    Attached,
    /// The detach frame was sent before the remote attach arrived
    DetachPipe,
    /// The detach frame has been sent
    DetachSent,
    /// The remote detach frame has been received
    DetachReceived,
    /// The link is detached
    End,
}

/// Inputs of the link state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEvent {
    /// The local attach frame is sent
    SendAttach,
    /// The remote attach frame arrives
    RecvAttach,
    /// The local detach frame is sent
    SendDetach,
    /// The remote detach frame arrives
    RecvDetach,
}

impl LinkState {
    /// The state after `event`, or an illegal-state error
    pub fn on_event(self, event: LinkEvent) -> Result<Self, Error> {
        use LinkEvent::*;
        use LinkState::*;

        let next = match (self, event) {
            (Start, SendAttach) => AttachSent,
            (AttachReceived, SendAttach) => Attached,
            (Start, RecvAttach) => AttachReceived,
            (AttachSent, RecvAttach) => Attached,
            (DetachPipe, RecvAttach) => DetachSent,
            (AttachSent, SendDetach) => DetachPipe,
            (Attached, SendDetach) => DetachSent,
            (DetachReceived, SendDetach) => End,
            (Attached, RecvDetach) => DetachReceived,
            (DetachSent, RecvDetach) => End,
            (state, event) => {
                let operation = match event {
                    SendAttach => "Attach",
                    RecvAttach => "OnAttach",
                    SendDetach => "Detach",
                    RecvDetach => "OnDetach",
                };
                return Err(Error::illegal_state(operation, state));
            }
        };
        Ok(next)
    }

    /// Whether messages and credit may be sent
    pub fn can_send(&self) -> bool {
        matches!(self, LinkState::AttachSent | LinkState::Attached)
    }
}

/// Role specific state
#[derive(Debug)]
pub(crate) enum LinkKind {
    Sender(SenderState),
    Receiver(ReceiverState),
}

impl LinkKind {
    fn role(&self) -> Role {
        match self {
            LinkKind::Sender(_) => Role::Sender,
            LinkKind::Receiver(_) => Role::Receiver,
        }
    }
}

#[derive(Debug)]
pub(crate) struct LinkCore {
    pub state: LinkState,
    pub local_attach: Attach,
    pub remote_attach: Option<Attach>,
    pub delivery_count: SequenceNumber,
    pub link_credit: u32,
    pub drain: bool,
    pub terminal: Terminal,
    pub kind: LinkKind,
}

pub(crate) struct LinkInner {
    pub session: Arc<SessionInner>,
    pub name: String,
    pub handle: Handle,
    pub core: Mutex<LinkCore>,
    closed: watch::Sender<bool>,
}

impl std::fmt::Debug for LinkInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkInner")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl LinkInner {
    pub fn new(session: Arc<SessionInner>, local_attach: Attach, kind: LinkKind) -> Self {
        let core = LinkCore {
            state: LinkState::Start,
            delivery_count: SequenceNumber::new(local_attach.initial_delivery_count.unwrap_or(0)),
            local_attach: local_attach.clone(),
            remote_attach: None,
            link_credit: 0,
            drain: false,
            terminal: Terminal::default(),
            kind,
        };
        let (closed, _) = watch::channel(false);
        Self {
            session,
            name: local_attach.name,
            handle: local_attach.handle,
            core: Mutex::new(core),
            closed,
        }
    }

    pub fn send_attach(&self) -> Result<(), Error> {
        let mut core = self.core.lock();
        let next = core.state.on_event(LinkEvent::SendAttach)?;
        self.session
            .send_link_frame(core.local_attach.clone().into())?;
        core.state = next;
        Ok(())
    }

    /// Sends the link flow state
    pub fn send_flow(&self, core: &LinkCore, echo: bool) -> Result<(), Error> {
        // A receiver reports the sender's count only once it is known
        let delivery_count = match (&core.kind, &core.remote_attach) {
            (LinkKind::Receiver(_), None) => None,
            _ => Some(core.delivery_count.value()),
        };
        let flow = Flow {
            handle: Some(self.handle),
            delivery_count,
            link_credit: Some(core.link_credit),
            drain: core.drain,
            echo,
            ..Default::default()
        };
        self.session.send_flow(flow)
    }

    pub fn on_attach(&self, attach: Attach) -> Result<(), Error> {
        let mut core = self.core.lock();
        core.state = core.state.on_event(LinkEvent::RecvAttach)?;
        if matches!(core.kind, LinkKind::Receiver(_)) {
            core.delivery_count = SequenceNumber::new(attach.initial_delivery_count.unwrap_or(0));
        }
        core.remote_attach = Some(attach);
        Ok(())
    }

    pub fn on_flow(&self, flow: &Flow) -> Result<(), Error> {
        let mut core = self.core.lock();
        match matches!(core.kind, LinkKind::Sender(_)) {
            true => sender::on_flow(self, &mut core, flow),
            false => receiver::on_flow(self, &mut core, flow),
        }
    }

    pub fn on_transfer(
        self: &Arc<Self>,
        transfer: amqp_lite_types::performatives::Transfer,
        payload: ByteBuffer,
    ) -> Result<(), Error> {
        receiver::on_transfer(self, transfer, payload)
    }

    pub fn on_detach(&self, detach: Detach) -> Result<(), Error> {
        let pending = {
            let mut core = self.core.lock();
            let next = core.state.on_event(LinkEvent::RecvDetach)?;
            if detach.error.is_some() || next == LinkState::DetachReceived {
                core.terminal = Terminal::remote(detach.error);
            }
            core.state = next;
            if next == LinkState::DetachReceived {
                let next = core.state.on_event(LinkEvent::SendDetach)?;
                let detach = Detach {
                    handle: self.handle,
                    closed: true,
                    error: None,
                };
                self.session.send_link_frame(detach.into())?;
                core.state = next;
            }
            Self::take_pending(&mut core)
        };
        self.on_ended(pending);
        Ok(())
    }

    /// Sends a closing detach. Detaching a detached link is a no-op.
    pub fn detach(&self, error: Option<definitions::Error>) -> Result<(), Error> {
        let pending = {
            let mut core = self.core.lock();
            if core.state == LinkState::End {
                return Ok(());
            }
            let next = core.state.on_event(LinkEvent::SendDetach)?;
            let detach = Detach {
                handle: self.handle,
                closed: true,
                error: error.clone(),
            };
            self.session.send_link_frame(detach.into())?;
            if error.is_some() {
                core.terminal = Terminal::local(error);
            }
            core.state = next;
            if next != LinkState::End {
                return Ok(());
            }
            Self::take_pending(&mut core)
        };
        self.on_ended(pending);
        self.session.remove_link(self.handle);
        Ok(())
    }

    /// Ends the link without a handshake and fails everything pending
    pub fn abort(&self, error: definitions::Error) {
        let pending = {
            let mut core = self.core.lock();
            if core.state == LinkState::End {
                return;
            }
            core.state = LinkState::End;
            core.terminal = Terminal::local(Some(error));
            Self::take_pending(&mut core)
        };
        self.on_ended(pending);
    }

    /// Queued messages of an ended link. Blocked receivers are woken by
    /// dropping their waiters.
    fn take_pending(core: &mut LinkCore) -> Vec<OutgoingDelivery> {
        if core.state != LinkState::End {
            return Vec::new();
        }
        core.link_credit = 0;
        match &mut core.kind {
            LinkKind::Sender(sender) => sender.queue.drain(),
            LinkKind::Receiver(receiver) => {
                receiver.waiters.clear();
                receiver.partial = None;
                Vec::new()
            }
        }
    }

    /// Fails every delivery of the link, including the ones the session
    /// already sent and still waits to see settled
    fn on_ended(&self, pending: Vec<OutgoingDelivery>) {
        let mut deliveries = self.session.take_link_deliveries(self.handle);
        deliveries.extend(pending);
        let terminal = self.core.lock().terminal.clone();
        for mut delivery in deliveries {
            let error = match &terminal.error {
                Some(error) if terminal.remote => Error::Remote(error.clone()),
                Some(error) => Error::Amqp(error.clone()),
                None => Error::amqp(LinkError::DetachForced, "link detached"),
            };
            delivery.complete(Err(error));
        }
        self.closed.send_replace(true);
    }

    /// Result of a finished close: only errors sent by the peer are reported
    fn remote_result(&self) -> Result<(), Error> {
        let core = self.core.lock();
        match core.terminal.remote {
            true => core.terminal.to_result(),
            false => Ok(()),
        }
    }

    pub async fn close(
        &self,
        timeout: Duration,
        error: Option<definitions::Error>,
    ) -> Result<(), Error> {
        let closed = self.closed.subscribe();
        self.detach(error)?;
        if timeout.is_zero() {
            return Ok(());
        }
        if with_timeout(timeout, wait_closed(closed)).await.is_none() {
            return Err(Error::Timeout);
        }
        self.remote_result()
    }
}

#[cfg(test)]
mod tests {
    use amqp_lite_types::definitions::AmqpError;

    use super::*;

    #[test]
    fn link_transitions() {
        use LinkEvent::*;

        let mut state = LinkState::Start;
        for (event, expected) in [
            (SendAttach, LinkState::AttachSent),
            (RecvAttach, LinkState::Attached),
            (SendDetach, LinkState::DetachSent),
            (RecvDetach, LinkState::End),
        ] {
            state = state.on_event(event).unwrap();
            assert_eq!(state, expected);
        }

        let mut state = LinkState::Attached;
        for event in [RecvDetach, SendDetach] {
            state = state.on_event(event).unwrap();
        }
        assert_eq!(state, LinkState::End);

        let mut state = LinkState::AttachSent;
        for (event, expected) in [
            (SendDetach, LinkState::DetachPipe),
            (RecvAttach, LinkState::DetachSent),
            (RecvDetach, LinkState::End),
        ] {
            state = state.on_event(event).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn illegal_link_transitions() {
        let err = LinkState::Start.on_event(LinkEvent::SendDetach).unwrap_err();
        assert_eq!(err.condition(), AmqpError::IllegalState.into());
        assert!(LinkState::End.on_event(LinkEvent::RecvAttach).is_err());
        assert!(!LinkState::DetachSent.can_send());
    }
}
