//! Outgoing and incoming deliveries

use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
    task::Poll,
};

use amqp_lite_types::{
    definitions::{self, AmqpError, DeliveryTag, Handle},
    messaging::{Message, Outcome},
    ByteBuffer, SequenceNumber,
};
use pin_project_lite::pin_project;
use tokio::sync::oneshot;

use crate::Error;

pub(crate) type OutcomeSender = oneshot::Sender<Result<Outcome, Error>>;

/// A message on its way out. It is queued on the sender link until credit is
/// available and then on the session until it is settled.
#[derive(Debug)]
pub(crate) struct OutgoingDelivery {
    pub handle: Handle,
    pub tag: DeliveryTag,
    pub delivery_id: Option<SequenceNumber>,
    pub settled: bool,
    pub message_format: u32,
    pub batchable: bool,
    pub payload: ByteBuffer,
    /// The last frame has been written
    pub written: bool,
    outcome: Option<OutcomeSender>,
}

impl OutgoingDelivery {
    pub fn new(
        handle: Handle,
        payload: ByteBuffer,
        settled: bool,
        outcome: Option<OutcomeSender>,
    ) -> Self {
        Self {
            handle,
            tag: DeliveryTag::new(),
            delivery_id: None,
            settled,
            message_format: amqp_lite_types::messaging::MESSAGE_FORMAT,
            batchable: false,
            payload,
            written: false,
            outcome,
        }
    }

    /// Reports the result to the sender. Only the first call has an effect.
    pub fn complete(&mut self, result: Result<Outcome, Error>) {
        if let Some(outcome) = self.outcome.take() {
            let _ = outcome.send(result);
        }
    }

    pub fn abort(mut self, error: &definitions::Error) {
        self.complete(Err(Error::Amqp(error.clone())))
    }
}

pin_project! {
    /// Resolves to the outcome of a sent message
    #[derive(Debug)]
    pub struct DeliveryFut {
        #[pin]
        outcome: oneshot::Receiver<Result<Outcome, Error>>,
    }
}

impl DeliveryFut {
    pub(crate) fn new(outcome: oneshot::Receiver<Result<Outcome, Error>>) -> Self {
        Self { outcome }
    }
}

impl Future for DeliveryFut {
    type Output = Result<Outcome, Error>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.outcome.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::amqp(
                AmqpError::InternalError,
                "delivery dropped before settlement",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A received message
#[derive(Debug)]
pub struct Delivery {
    pub(crate) handle: Handle,
    pub(crate) delivery_id: SequenceNumber,
    pub(crate) delivery_tag: DeliveryTag,
    pub(crate) settled: bool,
    pub(crate) message: Message,
    disposed: AtomicBool,
}

impl Delivery {
    pub(crate) fn new(
        handle: Handle,
        delivery_id: SequenceNumber,
        delivery_tag: DeliveryTag,
        settled: bool,
        message: Message,
    ) -> Self {
        Self {
            handle,
            delivery_id,
            delivery_tag,
            settled,
            message,
            disposed: AtomicBool::new(false),
        }
    }

    /// The message
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Consumes the delivery and returns the message
    pub fn into_message(self) -> Message {
        self.message
    }

    /// Delivery id assigned by the sender's session
    pub fn delivery_id(&self) -> u32 {
        self.delivery_id.value()
    }

    /// Delivery tag assigned by the sender
    pub fn delivery_tag(&self) -> &DeliveryTag {
        &self.delivery_tag
    }

    /// Whether the sender settled the delivery before sending it
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Marks the delivery as disposed. Returns false if it already was.
    pub(crate) fn try_dispose(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use amqp_lite_types::messaging::Accepted;

    use super::*;

    #[tokio::test]
    async fn outcome_is_reported_once() {
        let (tx, rx) = oneshot::channel();
        let mut delivery = OutgoingDelivery::new(0, ByteBuffer::default(), false, Some(tx));
        delivery.complete(Ok(Outcome::Accepted(Accepted {})));
        delivery.complete(Err(Error::Timeout));

        let outcome = DeliveryFut::new(rx).await.unwrap();
        assert_eq!(outcome, Outcome::Accepted(Accepted {}));
    }

    #[tokio::test]
    async fn dropped_delivery_is_an_error() {
        let (tx, rx) = oneshot::channel();
        drop(OutgoingDelivery::new(0, ByteBuffer::default(), false, Some(tx)));
        assert!(DeliveryFut::new(rx).await.is_err());
    }

    #[test]
    fn dispose_fires_once() {
        let delivery = Delivery::new(
            0,
            SequenceNumber::new(1),
            DeliveryTag::from_static(b"tag"),
            false,
            Message::new("body"),
        );
        assert!(delivery.try_dispose());
        assert!(!delivery.try_dispose());
    }
}
