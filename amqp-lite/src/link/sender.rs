//! Implementation of AMQP1.0 sender

use std::{sync::Arc, time::Duration};

use amqp_lite_types::{
    definitions::{self, AmqpError, DeliveryTag, Handle, SenderSettleMode},
    messaging::{Message, Outcome, Source, Target},
    performatives::Flow,
    ByteBuffer, SequenceNumber,
};
use tokio::sync::oneshot;

use super::{
    delivery::{DeliveryFut, OutcomeSender, OutgoingDelivery},
    Builder, LinkCore, LinkInner, LinkKind, LinkState,
};
use crate::{util::list::LinkedList, Error, Session};

/// Messages waiting for link credit
#[derive(Debug, Default)]
pub(crate) struct SenderState {
    pub queue: LinkedList<OutgoingDelivery>,
}

/// Credit left after the receiver's flow: the receiver's view of our delivery
/// count plus the credit it grants, minus what was sent since
fn available_credit(
    remote_delivery_count: SequenceNumber,
    link_credit: u32,
    delivery_count: SequenceNumber,
) -> u32 {
    let limit = remote_delivery_count + link_credit;
    (limit - delivery_count).max(0) as u32
}

/// Moves queued messages to the session while credit lasts
fn pump(link: &LinkInner, core: &mut LinkCore) -> Result<(), Error> {
    while core.link_credit > 0 && core.state == LinkState::Attached {
        let delivery = match &mut core.kind {
            LinkKind::Sender(sender) => sender.queue.pop_front(),
            LinkKind::Receiver(_) => None,
        };
        let mut delivery = match delivery {
            Some(delivery) => delivery,
            None => break,
        };
        delivery.tag = DeliveryTag::copy_from_slice(&core.delivery_count.value().to_be_bytes());
        core.link_credit -= 1;
        core.delivery_count.increment();
        link.session.send_delivery(delivery)?;
    }
    Ok(())
}

pub(crate) fn on_flow(link: &LinkInner, core: &mut LinkCore, flow: &Flow) -> Result<(), Error> {
    // Without a count the receiver has not seen our attach yet
    let initial_delivery_count = core.local_attach.initial_delivery_count.unwrap_or(0);
    let remote_delivery_count = SequenceNumber::new(
        flow.delivery_count.unwrap_or(initial_delivery_count),
    );
    core.link_credit = available_credit(
        remote_delivery_count,
        flow.link_credit.unwrap_or(0),
        core.delivery_count,
    );
    core.drain = flow.drain;
    pump(link, core)?;

    if core.drain && core.link_credit > 0 {
        // Nothing left to send, the unused credit is consumed
        let unused = core.link_credit;
        core.delivery_count += unused;
        core.link_credit = 0;
        link.send_flow(core, false)
    } else if flow.echo {
        link.send_flow(core, false)
    } else {
        Ok(())
    }
}

/// An AMQP1.0 sender
///
/// Messages are queued until the peer grants credit, so [`send_async`] may be
/// called right after attaching.
///
/// [`send_async`]: SenderLink::send_async
#[derive(Debug, Clone)]
pub struct SenderLink {
    pub(crate) inner: Arc<LinkInner>,
}

impl SenderLink {
    /// Creates a builder for a link named `name`
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder::new(name)
    }

    /// Attaches a sender named `name` whose target is `address`
    pub fn attach(
        session: &Session,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, Error> {
        let name = name.into();
        Builder::new(name.clone())
            .source(Source::with_address(name))
            .target(Target::with_address(address))
            .attach_sender(session)
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

    /// Number of messages handed to the session so far
    pub fn delivery_count(&self) -> u32 {
        self.inner.core.lock().delivery_count.value()
    }

    /// Remaining link credit
    pub fn credit(&self) -> u32 {
        self.inner.core.lock().link_credit
    }

    /// The error that detached the link
    pub fn error(&self) -> Option<definitions::Error> {
        self.inner.core.lock().terminal.error.clone()
    }

    fn enqueue(
        &self,
        message: &Message,
        settled: bool,
        outcome: Option<OutcomeSender>,
    ) -> Result<(), Error> {
        let payload: ByteBuffer = message.encode()?;
        let mut core = self.inner.core.lock();
        if !core.state.can_send() {
            return Err(Error::illegal_state("Send", core.state));
        }
        let delivery = OutgoingDelivery::new(self.inner.handle, payload, settled, outcome);
        match &mut core.kind {
            LinkKind::Sender(sender) => {
                sender.queue.push_back(delivery);
            }
            LinkKind::Receiver(_) => return Err(Error::not_allowed("not a sending link")),
        }
        pump(&self.inner, &mut core)
    }

    /// Queues a message and returns a future that resolves to its outcome.
    ///
    /// On a link whose sender settle mode is `Settled` the message is sent
    /// pre-settled and the outcome is `Accepted` once it is written.
    pub fn send_async(&self, message: Message) -> Result<DeliveryFut, Error> {
        let settled = self.inner.core.lock().local_attach.snd_settle_mode
            == SenderSettleMode::Settled;
        let (tx, rx) = oneshot::channel();
        self.enqueue(&message, settled, Some(tx))?;
        Ok(DeliveryFut::new(rx))
    }

    /// Sends a message pre-settled without waiting for anything
    pub fn send_settled(&self, message: Message) -> Result<(), Error> {
        let mode = self.inner.core.lock().local_attach.snd_settle_mode;
        if mode == SenderSettleMode::Unsettled {
            return Err(Error::not_allowed(
                "settled deliveries are not allowed in sender settle mode Unsettled",
            ));
        }
        self.enqueue(&message, true, None)
    }

    /// Sends a message and waits at most `timeout` for its outcome.
    ///
    /// Accepted and modified messages succeed, a released message is
    /// [`Error::MessageReleased`] and a rejected one carries the peer's error.
    pub async fn send(&self, message: Message, timeout: Duration) -> Result<(), Error> {
        let fut = self.send_async(message)?;
        let outcome = match tokio::time::timeout(timeout, fut).await {
            Ok(outcome) => outcome?,
            Err(_) => return Err(Error::Timeout),
        };
        match outcome {
            Outcome::Accepted(_) | Outcome::Modified(_) => Ok(()),
            Outcome::Released(_) => Err(Error::MessageReleased),
            Outcome::Rejected(rejected) => Err(Error::Remote(rejected.error.unwrap_or_else(|| {
                definitions::Error::new(
                    AmqpError::InternalError,
                    Some(String::from("message rejected")),
                    None,
                )
            }))),
        }
    }

    /// Detaches the link and waits at most `timeout` for the peer's detach.
    /// Queued messages fail with the link error.
    pub async fn close(
        &self,
        timeout: Duration,
        error: Option<definitions::Error>,
    ) -> Result<(), Error> {
        self.inner.close(timeout, error).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_follows_receiver_view() {
        let sent = SequenceNumber::new(7);
        assert_eq!(available_credit(SequenceNumber::new(5), 10, sent), 8);
        assert_eq!(available_credit(SequenceNumber::new(7), 0, sent), 0);
        // Credit granted before the last sends arrived is already used up
        assert_eq!(available_credit(SequenceNumber::new(0), 5, sent), 0);
    }

    #[test]
    fn credit_across_wrap_around() {
        let remote = SequenceNumber::new(u32::MAX - 1);
        let sent = SequenceNumber::new(1);
        assert_eq!(available_credit(remote, 10, sent), 7);
    }
}
