//! Implementation of AMQP1.0 receiver

use std::{collections::VecDeque, sync::Arc, time::Duration};

use amqp_lite_types::{
    definitions::{self, Handle, LinkError},
    messaging::{
        Accepted, DeliveryState, Message, Modified, Rejected, Released, Source, Target,
    },
    performatives::{Flow, Transfer},
    ByteBuffer, SequenceNumber,
};
use tokio::sync::oneshot;

use super::{delivery::Delivery, Builder, LinkCore, LinkInner, LinkKind, LinkState};
use crate::{Error, Session};

/// Credit granted by the first [`ReceiverLink::receive`] on a link that was
/// never started
pub const DEFAULT_CREDIT: u32 = 20;

/// Called by the connection task for every message received on a started link.
/// The delivery must be disposed through the link passed in.
pub type MessageCallback = Arc<dyn Fn(&ReceiverLink, Delivery) + Send + Sync>;

#[derive(Clone)]
struct Callback(MessageCallback);

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Callback")
    }
}

/// A delivery whose transfer frames are still arriving
#[derive(Debug)]
pub(crate) struct PartialDelivery {
    delivery_id: SequenceNumber,
    delivery_tag: definitions::DeliveryTag,
    settled: bool,
    payload: ByteBuffer,
}

#[derive(Debug, Default)]
pub(crate) struct ReceiverState {
    /// Credit set by the user, `None` until the first flow
    total_credit: Option<u32>,
    auto_restore: bool,
    /// Deliveries disposed since credit was last restored
    restored: u32,
    pub partial: Option<PartialDelivery>,
    pub waiters: VecDeque<oneshot::Sender<Delivery>>,
    queue: VecDeque<Delivery>,
    callback: Option<Callback>,
}

fn receiver_mut(kind: &mut LinkKind) -> Result<&mut ReceiverState, Error> {
    match kind {
        LinkKind::Receiver(receiver) => Ok(receiver),
        LinkKind::Sender(_) => Err(Error::not_allowed("not a receiving link")),
    }
}

fn set_credit(
    link: &LinkInner,
    core: &mut LinkCore,
    credit: u32,
    auto_restore: bool,
) -> Result<(), Error> {
    if !core.state.can_send() {
        return Err(Error::illegal_state("SetCredit", core.state));
    }
    let receiver = receiver_mut(&mut core.kind)?;
    receiver.total_credit = Some(credit);
    receiver.auto_restore = auto_restore;
    receiver.restored = 0;
    core.link_credit = credit;
    link.send_flow(core, false)
}

pub(crate) fn on_flow(link: &LinkInner, core: &mut LinkCore, flow: &Flow) -> Result<(), Error> {
    if let Some(delivery_count) = flow.delivery_count.map(SequenceNumber::new) {
        // The sender advances its count when it drains unused credit
        let limit = core.delivery_count + core.link_credit;
        core.link_credit = (limit - delivery_count).max(0) as u32;
        core.delivery_count = delivery_count;
    }
    if flow.drain {
        core.drain = false;
    }
    match flow.echo {
        true => link.send_flow(core, false),
        false => Ok(()),
    }
}

pub(crate) fn on_transfer(
    link: &Arc<LinkInner>,
    transfer: Transfer,
    payload: ByteBuffer,
) -> Result<(), Error> {
    let (delivery, callback) = {
        let mut core = link.core.lock();
        if core.state != LinkState::Attached {
            return Err(Error::illegal_state("OnTransfer", core.state));
        }

        let first_frame = receiver_mut(&mut core.kind)?.partial.is_none();
        if first_frame {
            if core.link_credit == 0 {
                return Err(Error::amqp(
                    LinkError::TransferLimitExceeded,
                    "transfer without link credit",
                ));
            }
            core.link_credit -= 1;
            core.delivery_count.increment();
        }

        let receiver = receiver_mut(&mut core.kind)?;
        if transfer.aborted {
            receiver.partial = None;
            return Ok(());
        }

        let mut partial = match receiver.partial.take() {
            Some(partial) => partial,
            None => PartialDelivery {
                delivery_id: transfer
                    .delivery_id
                    .map(SequenceNumber::new)
                    .ok_or_else(|| Error::not_allowed("first transfer without delivery id"))?,
                delivery_tag: transfer.delivery_tag.clone().unwrap_or_default(),
                settled: transfer.settled.unwrap_or(false),
                payload: ByteBuffer::new(payload.len() * 2, true),
            },
        };
        partial.payload.put_slice(payload.as_slice())?;
        if let Some(true) = transfer.settled {
            partial.settled = true;
        }
        if transfer.more {
            receiver.partial = Some(partial);
            return Ok(());
        }

        let message = Message::decode(&mut partial.payload)?;
        let mut delivery = Delivery::new(
            link.handle,
            partial.delivery_id,
            partial.delivery_tag,
            partial.settled,
            message,
        );

        #[cfg(feature = "tracing")]
        tracing::trace!(link = %link.name, delivery_id = %partial.delivery_id, "received");
        #[cfg(feature = "log")]
        log::trace!("link {} received delivery {}", link.name, partial.delivery_id);

        // Blocked receivers first, in arrival order
        while let Some(waiter) = receiver.waiters.pop_front() {
            match waiter.send(delivery) {
                Ok(()) => return Ok(()),
                Err(returned) => delivery = returned,
            }
        }
        match &receiver.callback {
            Some(callback) => (delivery, callback.clone()),
            None => {
                receiver.queue.push_back(delivery);
                return Ok(());
            }
        }
    };

    let receiver = ReceiverLink {
        inner: link.clone(),
    };
    (callback.0)(&receiver, delivery);
    Ok(())
}

/// An AMQP1.0 receiver
///
/// Messages are either pulled with [`receive`](Self::receive) or pushed to the
/// callback given to [`start`](Self::start). Every delivery that is not
/// pre-settled must be disposed with [`accept`](Self::accept),
/// [`reject`](Self::reject), [`release`](Self::release) or
/// [`modify`](Self::modify).
#[derive(Debug, Clone)]
pub struct ReceiverLink {
    pub(crate) inner: Arc<LinkInner>,
}

impl ReceiverLink {
    /// Creates a builder for a link named `name`
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder::new(name)
    }

    /// Attaches a receiver named `name` whose source is `address`
    pub fn attach(
        session: &Session,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, Error> {
        let name = name.into();
        Builder::new(name.clone())
            .source(Source::with_address(address))
            .target(Target::with_address(name))
            .attach_receiver(session)
    }

    /// Name of the link
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Local handle
    pub fn handle(&self) -> Handle {
        self.inner.handle
    }

    /// Current state
    pub fn state(&self) -> LinkState {
        self.inner.core.lock().state
    }

    /// Remaining link credit
    pub fn credit(&self) -> u32 {
        self.inner.core.lock().link_credit
    }

    /// The error that detached the link
    pub fn error(&self) -> Option<definitions::Error> {
        self.inner.core.lock().terminal.error.clone()
    }

    /// Grants `credit` to the sender. With `auto_restore` the credit is reset
    /// to `credit` once half of it has been disposed.
    pub fn set_credit(&self, credit: u32, auto_restore: bool) -> Result<(), Error> {
        let mut core = self.inner.core.lock();
        set_credit(&self.inner, &mut core, credit, auto_restore)
    }

    /// Grants `credit` with auto restore and hands every message to
    /// `callback`. Without a callback messages are kept for
    /// [`receive`](Self::receive).
    pub fn start(&self, credit: u32, callback: Option<MessageCallback>) -> Result<(), Error> {
        let mut core = self.inner.core.lock();
        receiver_mut(&mut core.kind)?.callback = callback.map(Callback);
        set_credit(&self.inner, &mut core, credit, true)
    }

    /// Asks the sender to use up or give back its credit
    pub fn drain(&self) -> Result<(), Error> {
        let mut core = self.inner.core.lock();
        if !core.state.can_send() {
            return Err(Error::illegal_state("Drain", core.state));
        }
        core.drain = true;
        self.inner.send_flow(&core, false)
    }

    /// Waits at most `timeout` for a message.
    ///
    /// Returns `Ok(None)` on timeout or when the link ends without an error
    /// while waiting. A detaching or detached link is an illegal state. The
    /// first call on a link that was never started grants
    /// [`DEFAULT_CREDIT`].
    pub async fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, Error> {
        let mut rx = {
            let mut guard = self.inner.core.lock();
            let core = &mut *guard;
            let never_started = receiver_mut(&mut core.kind)?.total_credit.is_none();
            if never_started && core.state.can_send() {
                set_credit(&self.inner, core, DEFAULT_CREDIT, true)?;
            }

            if !core.state.can_send() {
                return Err(Error::illegal_state("Receive", core.state));
            }
            let receiver = receiver_mut(&mut core.kind)?;
            if let Some(delivery) = receiver.queue.pop_front() {
                return Ok(Some(delivery));
            }
            receiver.waiters.retain(|waiter| !waiter.is_closed());
            let (tx, rx) = oneshot::channel();
            receiver.waiters.push_back(tx);
            rx
        };

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(delivery)) => Ok(Some(delivery)),
            // Waiters are dropped when the link ends
            Ok(Err(_)) => self.inner.core.lock().terminal.to_result().map(|_| None),
            Err(_) => {
                rx.close();
                // A delivery handed over right before closing is kept
                Ok(rx.try_recv().ok())
            }
        }
    }

    /// Accepts a delivery
    pub fn accept(&self, delivery: &Delivery) -> Result<(), Error> {
        self.dispose("Accept", delivery, DeliveryState::Accepted(Accepted {}))
    }

    /// Rejects a delivery
    pub fn reject(
        &self,
        delivery: &Delivery,
        error: Option<definitions::Error>,
    ) -> Result<(), Error> {
        self.dispose("Reject", delivery, DeliveryState::Rejected(Rejected { error }))
    }

    /// Releases a delivery so it can be delivered again
    pub fn release(&self, delivery: &Delivery) -> Result<(), Error> {
        self.dispose("Release", delivery, DeliveryState::Released(Released {}))
    }

    /// Settles a delivery with the modified outcome
    pub fn modify(&self, delivery: &Delivery, modified: Modified) -> Result<(), Error> {
        self.dispose("Modify", delivery, DeliveryState::Modified(modified))
    }

    /// Disposing a delivery a second time has no effect
    fn dispose(
        &self,
        operation: &str,
        delivery: &Delivery,
        state: DeliveryState,
    ) -> Result<(), Error> {
        if delivery.handle != self.inner.handle {
            return Err(Error::not_allowed(
                "the delivery was not received on this link",
            ));
        }
        if delivery.is_disposed() {
            return Ok(());
        }
        let link_state = self.inner.core.lock().state;
        if !link_state.can_send() {
            return Err(Error::illegal_state(operation, link_state));
        }
        if !delivery.try_dispose() {
            return Ok(());
        }
        if !delivery.settled {
            self.inner
                .session
                .dispose_incoming(delivery.delivery_id, state, true)?;
        }
        self.restore_credit()
    }

    fn restore_credit(&self) -> Result<(), Error> {
        let mut core = self.inner.core.lock();
        if core.state != LinkState::Attached {
            return Ok(());
        }
        let receiver = receiver_mut(&mut core.kind)?;
        let total = match (receiver.total_credit, receiver.auto_restore) {
            (Some(total), true) => total,
            _ => return Ok(()),
        };
        receiver.restored += 1;
        if receiver.restored < total / 2 {
            return Ok(());
        }
        receiver.restored = 0;
        core.link_credit = total;
        self.inner.send_flow(&core, false)
    }

    /// Detaches the link and waits at most `timeout` for the peer's detach.
    /// Blocked [`receive`](Self::receive) calls return.
    pub async fn close(
        &self,
        timeout: Duration,
        error: Option<definitions::Error>,
    ) -> Result<(), Error> {
        self.inner.close(timeout, error).await
    }
}
