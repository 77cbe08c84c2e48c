//! Connection and session handshakes against a scripted peer

use std::time::Duration;

use amqp_lite::{
    connection::ConnectionState,
    frames::amqp::FrameBody,
    session::SessionState,
    transport::{recv_protocol_header, send_protocol_header, ProtocolHeader},
    types::{
        definitions::{self, AmqpError, ConnectionError, ErrorCondition},
        performatives::{Close, End, Open},
    },
    Connection, Error, Session,
};

mod common;

use common::{Peer, TIMEOUT};

#[tokio::test]
async fn open_is_pipelined_with_the_header() {
    let (connection, mut peer) = common::connect().await;
    let open = peer.open().await;
    assert_eq!(open.container_id, "client");
    assert_eq!(open.channel_max, 3);

    let session = Session::begin(&connection).unwrap();
    let (channel, begin) = peer.begin(100).await;
    assert_eq!(channel, session.channel());
    assert_eq!(begin.remote_channel, None);
    assert_eq!(begin.handle_max, 7);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connection.state(), ConnectionState::Opened);
    assert_eq!(connection.remote_open().unwrap().container_id, "peer");
    assert_eq!(session.state(), SessionState::Opened);
    assert_eq!(session.outgoing_window(), 100);
}

#[tokio::test]
async fn close_handshake_is_idempotent() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    peer.begin(100).await;

    let closing = tokio::spawn({
        let connection = connection.clone();
        async move { connection.close(TIMEOUT, None).await }
    });
    let close = peer.recv_close().await;
    assert!(close.error.is_none());
    peer.send(0, Close { error: None }).await;

    closing.await.unwrap().unwrap();
    assert!(connection.is_closed());
    connection.close(TIMEOUT, None).await.unwrap();
    connection.close(Duration::ZERO, None).await.unwrap();

    // Sessions end with the connection
    assert_eq!(session.state(), SessionState::End);
    session.close(TIMEOUT, None).await.unwrap();
    assert!(Session::begin(&connection).is_err());
}

#[tokio::test]
async fn close_times_out_without_answer() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;

    let result = connection.close(Duration::from_millis(50), None).await;
    assert!(matches!(result, Err(Error::Timeout)));
    peer.recv_close().await;
    assert_eq!(connection.state(), ConnectionState::CloseSent);
}

#[tokio::test]
async fn remote_close_is_answered() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;

    let error = definitions::Error::new(
        ConnectionError::ConnectionForced,
        Some(String::from("shutting down")),
        None,
    );
    peer.send(
        0,
        Close {
            error: Some(error.clone()),
        },
    )
    .await;
    let reply = peer.recv_close().await;
    assert!(reply.error.is_none());

    tokio::time::timeout(TIMEOUT, connection.closed())
        .await
        .unwrap();
    assert_eq!(connection.error(), Some(error.clone()));
    // Closing again reports the peer's error
    match connection.close(TIMEOUT, None).await {
        Err(Error::Remote(remote)) => assert_eq!(remote, error),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn session_end_handshake() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(100).await;

    let ending = tokio::spawn({
        let session = session.clone();
        async move { session.close(TIMEOUT, None).await }
    });
    let end = peer.recv_end().await;
    assert!(end.error.is_none());
    peer.send(channel, End { error: None }).await;
    ending.await.unwrap().unwrap();
    assert_eq!(session.state(), SessionState::End);
    assert!(session.error().is_none());
    assert_eq!(connection.state(), ConnectionState::Opened);
}

#[tokio::test]
async fn remote_end_with_error() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;
    let session = Session::begin(&connection).unwrap();
    let (channel, _) = peer.begin(100).await;

    let error = definitions::Error::new(AmqpError::ResourceLimitExceeded, None::<String>, None);
    peer.send(
        channel,
        End {
            error: Some(error.clone()),
        },
    )
    .await;
    assert!(peer.recv_end().await.error.is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), SessionState::End);
    assert_eq!(session.error(), Some(error));
    assert_eq!(connection.state(), ConnectionState::Opened);
}

#[tokio::test]
async fn frame_for_unknown_channel_closes_connection() {
    let (connection, mut peer) = common::connect().await;
    peer.open().await;

    peer.send(5, End { error: None }).await;
    let close = peer.recv_close().await;
    let error = close.error.unwrap();
    assert_eq!(error.condition, ErrorCondition::from(AmqpError::NotFound));
    assert_eq!(connection.state(), ConnectionState::CloseSent);
}

#[tokio::test]
async fn heartbeats_follow_remote_idle_timeout() {
    let (connection, mut peer) = common::connect().await;
    peer.recv_open().await;
    let open = Open {
        container_id: String::from("peer"),
        hostname: None,
        max_frame_size: 4096,
        channel_max: 0,
        idle_time_out: Some(400),
        outgoing_locales: None,
        incoming_locales: None,
        offered_capabilities: None,
        desired_capabilities: None,
        properties: None,
    };
    peer.send(0, open).await;

    let frame = peer.try_recv(Duration::from_secs(2)).await.unwrap();
    assert!(matches!(frame.body, FrameBody::Empty));
    assert_eq!(connection.max_frame_size(), 4096);
}

#[tokio::test]
async fn silent_peer_hits_idle_timeout() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let connection = Connection::builder()
        .idle_time_out(200u32)
        .open_with_stream(client)
        .await
        .unwrap();
    let mut peer = Peer::accept(server).await;
    let open = peer.recv_open().await;
    assert_eq!(open.idle_time_out, Some(100));

    tokio::time::timeout(TIMEOUT, connection.closed())
        .await
        .unwrap();
    let error = connection.error().unwrap();
    assert_eq!(
        error.condition,
        ErrorCondition::from(ConnectionError::ConnectionForced)
    );
}

#[tokio::test]
async fn protocol_header_mismatch_ends_connection() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let connection = Connection::builder()
        .open_with_stream(client)
        .await
        .unwrap();

    let (mut reader, mut writer) = tokio::io::split(server);
    assert!(recv_protocol_header(&mut reader).await.unwrap().is_amqp());
    send_protocol_header(&mut writer, ProtocolHeader::sasl())
        .await
        .unwrap();

    tokio::time::timeout(TIMEOUT, connection.closed())
        .await
        .unwrap();
    let error = connection.error().unwrap();
    assert_eq!(error.condition, ErrorCondition::from(AmqpError::NotImplemented));
}
