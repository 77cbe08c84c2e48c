//! Sender and receiver behaviour against a scripted peer

use std::{sync::Arc, time::Duration};

use amqp_lite::{
    link::{LinkState, MessageCallback},
    session::SessionState,
    types::{
        definitions::{
            self, AmqpError, ConnectionError, ErrorCondition, LinkError, Role, SenderSettleMode,
        },
        messaging::{DeliveryState, Message, Rejected, Released, Target},
        performatives::{Detach, Disposition, Flow, Transfer},
        primitives::Value,
    },
    Error, ReceiverLink, SenderLink, Session,
};
use bytes::Bytes;

mod common;

use common::TIMEOUT;

fn string_body(message: &Message) -> Option<&str> {
    match message.value() {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn transfer(handle: u32, delivery_id: u32) -> Transfer {
    Transfer {
        handle,
        delivery_id: Some(delivery_id),
        delivery_tag: Some(Bytes::copy_from_slice(&delivery_id.to_be_bytes())),
        message_format: Some(0),
        settled: Some(false),
        ..Default::default()
    }
}

#[tokio::test]
async fn presettled_message_is_sent_once() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(1000).await;

    let sender = SenderLink::builder("sender")
        .target(Target::with_address("queue"))
        .sender_settle_mode(SenderSettleMode::Settled)
        .attach_sender(&session)
        .unwrap();
    let attach = peer.attach(channel).await;
    assert_eq!(attach.role, Role::Sender);
    assert_eq!(attach.initial_delivery_count, Some(0));
    peer.grant(channel, &begin, attach.handle, 0, 1).await;

    sender.send(Message::new("hello"), TIMEOUT).await.unwrap();

    let (transfer, mut payload) = peer.recv_transfer().await;
    assert_eq!(transfer.settled, Some(true));
    assert_eq!(transfer.delivery_id, Some(0));
    assert_eq!(transfer.delivery_tag.as_deref(), Some(&[0u8, 0, 0, 0][..]));
    assert!(!transfer.more);
    let message = Message::decode(&mut payload).unwrap();
    assert_eq!(string_body(&message), Some("hello"));

    assert_eq!(sender.delivery_count(), 1);
    assert_eq!(sender.credit(), 0);
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn messages_wait_for_credit() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(1000).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    let attach = peer.attach(channel).await;

    for i in 0..3 {
        sender.send_settled(Message::new(Value::Int(i))).unwrap();
    }
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());

    peer.grant(channel, &begin, attach.handle, 0, 2).await;
    for id in 0..2 {
        let (transfer, _) = peer.recv_transfer().await;
        assert_eq!(transfer.delivery_id, Some(id));
    }
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());

    peer.grant(channel, &begin, attach.handle, 2, 1).await;
    let (transfer, _) = peer.recv_transfer().await;
    assert_eq!(transfer.delivery_id, Some(2));
    assert_eq!(sender.delivery_count(), 3);
}

#[tokio::test]
async fn session_window_limits_transfers() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(2).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    let attach = peer.attach(channel).await;

    let flow = Flow {
        next_incoming_id: Some(begin.next_outgoing_id),
        incoming_window: 2,
        next_outgoing_id: 1,
        outgoing_window: 1000,
        handle: Some(attach.handle),
        delivery_count: Some(0),
        link_credit: Some(5),
        ..Default::default()
    };
    peer.send(channel, flow).await;

    for i in 0..5 {
        sender.send_settled(Message::new(Value::Int(i))).unwrap();
    }
    for id in 0..2 {
        let (transfer, _) = peer.recv_transfer().await;
        assert_eq!(transfer.delivery_id, Some(id));
    }
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
    assert_eq!(session.outgoing_window(), 0);

    // Open the window by three more frames
    let flow = Flow {
        next_incoming_id: Some(begin.next_outgoing_id.wrapping_add(2)),
        incoming_window: 3,
        next_outgoing_id: 1,
        outgoing_window: 1000,
        ..Default::default()
    };
    peer.send(channel, flow).await;
    for id in 2..5 {
        let (transfer, _) = peer.recv_transfer().await;
        assert_eq!(transfer.delivery_id, Some(id));
    }
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
    assert_eq!(session.outgoing_window(), 0);
}

#[tokio::test]
async fn released_and_rejected_outcomes() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(1000).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    let attach = peer.attach(channel).await;
    peer.grant(channel, &begin, attach.handle, 0, 2).await;

    let released = tokio::spawn({
        let sender = sender.clone();
        async move { sender.send(Message::new("first"), TIMEOUT).await }
    });
    let (transfer, _) = peer.recv_transfer().await;
    assert_eq!(transfer.settled, Some(false));
    let disposition = Disposition {
        role: Role::Receiver,
        first: 0,
        last: None,
        settled: true,
        state: Some(DeliveryState::Released(Released {})),
        batchable: false,
    };
    peer.send(channel, disposition).await;
    assert!(matches!(released.await.unwrap(), Err(Error::MessageReleased)));

    let rejected = tokio::spawn({
        let sender = sender.clone();
        async move { sender.send(Message::new("second"), TIMEOUT).await }
    });
    peer.recv_transfer().await;
    let error = definitions::Error::new(
        ErrorCondition::Custom("test:bad-message".into()),
        Some(String::from("bad message")),
        None,
    );
    // Unsettled outcome, the sender settles it
    let disposition = Disposition {
        role: Role::Receiver,
        first: 1,
        last: None,
        settled: false,
        state: Some(DeliveryState::Rejected(Rejected {
            error: Some(error.clone()),
        })),
        batchable: false,
    };
    peer.send(channel, disposition).await;

    match rejected.await.unwrap() {
        Err(Error::Remote(remote)) => assert_eq!(remote, error),
        other => panic!("unexpected result {:?}", other),
    }
    let settle = peer.recv_disposition().await;
    assert_eq!(settle.role, Role::Sender);
    assert_eq!(settle.first, 1);
    assert!(settle.settled);
}

#[tokio::test]
async fn receiver_reassembles_and_restores_credit() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;

    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    let attach = peer.attach(channel).await;
    assert_eq!(attach.role, Role::Receiver);
    receiver.set_credit(10, true).unwrap();
    let flow = peer.recv_flow().await;
    assert_eq!(flow.handle, Some(attach.handle));
    assert_eq!(flow.link_credit, Some(10));

    // Every message spans several frames
    peer.encoder.set_max_frame_size(512);
    let body = "x".repeat(1200);
    for id in 0..5u32 {
        let payload = Message::new(format!("{}{}", id, body)).encode().unwrap();
        peer.send_transfer(channel, transfer(attach.handle, id), payload)
            .await;
    }

    for id in 0..5u32 {
        let delivery = receiver.receive(TIMEOUT).await.unwrap().unwrap();
        assert_eq!(delivery.delivery_id(), id);
        assert!(!delivery.is_settled());
        let expected = format!("{}{}", id, body);
        assert_eq!(string_body(delivery.message()), Some(expected.as_str()));
        receiver.accept(&delivery).unwrap();
    }

    for id in 0..5u32 {
        let disposition = peer.recv_disposition().await;
        assert_eq!(disposition.role, Role::Receiver);
        assert_eq!(disposition.first, id);
        assert!(disposition.settled);
        assert!(matches!(disposition.state, Some(DeliveryState::Accepted(_))));
    }
    let flow = peer.recv_flow().await;
    assert_eq!(flow.link_credit, Some(10));
    assert_eq!(flow.delivery_count, Some(5));
    assert_eq!(receiver.credit(), 10);
}

#[tokio::test]
async fn aborted_delivery_is_dropped() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    let attach = peer.attach(channel).await;
    receiver.set_credit(5, false).unwrap();
    peer.recv_flow().await;

    let mut first = transfer(attach.handle, 0);
    first.more = true;
    peer.send_transfer(channel, first, Bytes::from_static(&[0x00, 0x53]).into())
        .await;
    let abort = Transfer {
        handle: attach.handle,
        aborted: true,
        ..Default::default()
    };
    peer.send(channel, amqp_lite::frames::amqp::FrameBody::Transfer {
        performative: abort,
        payload: Default::default(),
    })
    .await;

    let payload = Message::new("complete").encode().unwrap();
    peer.send_transfer(channel, transfer(attach.handle, 1), payload)
        .await;

    let delivery = receiver.receive(TIMEOUT).await.unwrap().unwrap();
    assert_eq!(delivery.delivery_id(), 1);
    assert_eq!(string_body(delivery.message()), Some("complete"));
    assert_eq!(receiver.credit(), 3);
}

#[tokio::test]
async fn disposing_twice_has_no_effect() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    let attach = peer.attach(channel).await;
    receiver.set_credit(10, false).unwrap();
    peer.recv_flow().await;

    let payload = Message::new("once").encode().unwrap();
    peer.send_transfer(channel, transfer(attach.handle, 0), payload)
        .await;
    let delivery = receiver.receive(TIMEOUT).await.unwrap().unwrap();

    receiver.accept(&delivery).unwrap();
    receiver.accept(&delivery).unwrap();
    receiver.release(&delivery).unwrap();

    let disposition = peer.recv_disposition().await;
    assert!(matches!(disposition.state, Some(DeliveryState::Accepted(_))));
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn receive_times_out_without_messages() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    peer.attach(channel).await;

    let received = receiver.receive(Duration::from_millis(50)).await.unwrap();
    assert!(received.is_none());
    // The first receive grants the default credit
    let flow = peer.recv_flow().await;
    assert_eq!(flow.link_credit, Some(20));
}

#[tokio::test]
async fn started_receiver_calls_back() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    let attach = peer.attach(channel).await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let callback: MessageCallback = Arc::new(move |link, delivery| {
        link.accept(&delivery).unwrap();
        let _ = tx.send(delivery.into_message());
    });
    receiver.start(4, Some(callback)).unwrap();
    assert_eq!(peer.recv_flow().await.link_credit, Some(4));

    for id in 0..2u32 {
        let payload = Message::new(format!("message {}", id)).encode().unwrap();
        peer.send_transfer(channel, transfer(attach.handle, id), payload)
            .await;
    }
    for id in 0..2u32 {
        let message = tokio::time::timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
        let expected = format!("message {}", id);
        assert_eq!(string_body(&message), Some(expected.as_str()));
        assert_eq!(peer.recv_disposition().await.first, id);
    }
    // Half of the credit was used, so it is restored
    assert_eq!(peer.recv_flow().await.link_credit, Some(4));
}

#[tokio::test]
async fn remote_detach_fails_queued_messages() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    let attach = peer.attach(channel).await;

    let pending = sender.send_async(Message::new("queued")).unwrap();
    let error = definitions::Error::new(LinkError::DetachForced, None::<String>, None);
    let detach = Detach {
        handle: attach.handle,
        closed: true,
        error: Some(error.clone()),
    };
    peer.send(channel, detach).await;

    match pending.await {
        Err(Error::Remote(remote)) => assert_eq!(remote, error),
        other => panic!("unexpected result {:?}", other),
    }
    let reply = peer.recv_detach().await;
    assert!(reply.closed);
    assert!(reply.error.is_none());
    assert_eq!(sender.state(), LinkState::End);
    assert_eq!(sender.error(), Some(error));
    assert!(sender.send_async(Message::new("late")).is_err());
}

#[tokio::test]
async fn remote_detach_fails_sent_messages() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(1000).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    let attach = peer.attach(channel).await;
    peer.grant(channel, &begin, attach.handle, 0, 1).await;

    // Written but never settled by the peer
    let pending = sender.send_async(Message::new("in flight")).unwrap();
    peer.recv_transfer().await;

    let error = definitions::Error::new(LinkError::DetachForced, None::<String>, None);
    peer.send(
        channel,
        Detach {
            handle: attach.handle,
            closed: true,
            error: Some(error.clone()),
        },
    )
    .await;

    match tokio::time::timeout(TIMEOUT, pending).await.unwrap() {
        Err(Error::Remote(remote)) => assert_eq!(remote, error),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(peer.recv_detach().await.closed);

    // A late disposition for the dropped delivery is ignored
    peer.send(
        channel,
        Disposition {
            role: Role::Receiver,
            first: 0,
            last: None,
            settled: true,
            state: Some(DeliveryState::Accepted(Default::default())),
            batchable: false,
        },
    )
    .await;
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
    assert_eq!(session.state(), SessionState::Opened);
}

#[tokio::test]
async fn detached_receiver_rejects_operations() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    let attach = peer.attach(channel).await;
    receiver.set_credit(10, false).unwrap();
    peer.recv_flow().await;

    let payload = Message::new("unsettled").encode().unwrap();
    peer.send_transfer(channel, transfer(attach.handle, 0), payload)
        .await;
    let delivery = receiver.receive(TIMEOUT).await.unwrap().unwrap();

    peer.send(
        channel,
        Detach {
            handle: attach.handle,
            closed: true,
            error: None,
        },
    )
    .await;
    peer.recv_detach().await;
    assert_eq!(receiver.state(), LinkState::End);

    let illegal_state = ErrorCondition::from(AmqpError::IllegalState);
    assert_eq!(
        receiver.accept(&delivery).unwrap_err().condition(),
        illegal_state
    );
    assert_eq!(
        receiver.receive(TIMEOUT).await.unwrap_err().condition(),
        illegal_state
    );
    // No disposition goes out for a detached link
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn flow_without_delivery_count_uses_initial_count() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(1000).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    let attach = peer.attach(channel).await;

    for i in 0..3 {
        sender.send_settled(Message::new(Value::Int(i))).unwrap();
    }
    let flow = Flow {
        next_incoming_id: Some(begin.next_outgoing_id),
        incoming_window: 1000,
        next_outgoing_id: 1,
        outgoing_window: 1000,
        handle: Some(attach.handle),
        delivery_count: None,
        link_credit: Some(2),
        ..Default::default()
    };
    peer.send(channel, flow).await;

    for id in 0..2 {
        let (transfer, _) = peer.recv_transfer().await;
        assert_eq!(transfer.delivery_id, Some(id));
    }
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
    assert_eq!(sender.credit(), 0);
}

#[tokio::test]
async fn close_link_is_idempotent() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    let attach = peer.attach(channel).await;

    let closing = tokio::spawn({
        let receiver = receiver.clone();
        async move { receiver.close(TIMEOUT, None).await }
    });
    let detach = peer.recv_detach().await;
    assert!(detach.closed);
    peer.send(
        channel,
        Detach {
            handle: attach.handle,
            closed: true,
            error: None,
        },
    )
    .await;

    closing.await.unwrap().unwrap();
    assert_eq!(receiver.state(), LinkState::End);
    receiver.close(TIMEOUT, None).await.unwrap();
    assert!(peer.try_recv(Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn transport_loss_fails_pending_operations() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(1000).await;
    let sender = SenderLink::attach(&session, "sender", "queue").unwrap();
    peer.attach(channel).await;
    let receiver = ReceiverLink::attach(&session, "receiver", "queue").unwrap();
    peer.attach(channel).await;

    let pending = sender.send_async(Message::new("no credit")).unwrap();
    let receiving = tokio::spawn({
        let receiver = receiver.clone();
        async move { receiver.receive(TIMEOUT).await }
    });
    assert_eq!(peer.recv_flow().await.link_credit, Some(20));
    drop(peer);

    let forced = ErrorCondition::from(ConnectionError::ConnectionForced);
    assert_eq!(pending.await.unwrap_err().condition(), forced);
    assert_eq!(
        receiving.await.unwrap().unwrap_err().condition(),
        forced
    );

    connection.closed().await;
    assert!(connection.is_closed());
    assert_eq!(session.state(), SessionState::End);
    assert_eq!(sender.state(), LinkState::End);
    assert_eq!(receiver.state(), LinkState::End);
    assert!(sender.send_async(Message::new("late")).is_err());
}
