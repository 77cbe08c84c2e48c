use amqp_lite::{
    transport::{recv_protocol_header, send_protocol_header, ProtocolHeader},
    Connection,
};
use amqp_lite_ws::WebSocketStream;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio_tungstenite::{accept_hdr_async, WebSocketStream as ServerStream};
use tungstenite::{
    handshake::server::{ErrorResponse, Request, Response},
    http::HeaderValue,
    Message,
};

async fn accept(stream: DuplexStream, protocol: &'static str) -> ServerStream<DuplexStream> {
    accept_hdr_async(stream, move |req: &Request, mut resp: Response| {
        assert_eq!(
            req.headers().get("Sec-WebSocket-Protocol").unwrap(),
            "amqp"
        );
        resp.headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(protocol));
        Ok::<_, ErrorResponse>(resp)
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn bytes_cross_message_boundaries() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(async move {
        let mut ws = accept(server, "amqp").await;
        let received = match ws.next().await.unwrap().unwrap() {
            Message::Binary(bytes) => bytes,
            other => panic!("unexpected message {:?}", other),
        };
        // Answer in two messages
        ws.send(Message::binary(&received[..3])).await.unwrap();
        ws.send(Message::binary(&received[3..])).await.unwrap();
        ws.send(Message::binary(&b"tail"[..])).await.unwrap();
        received
    });

    let mut ws = WebSocketStream::connect_with_stream("ws://localhost/", client)
        .await
        .unwrap();
    assert_eq!(
        ws.response().headers().get("Sec-WebSocket-Protocol").unwrap(),
        "amqp"
    );
    send_protocol_header(&mut ws, ProtocolHeader::amqp())
        .await
        .unwrap();
    let header = recv_protocol_header(&mut ws).await.unwrap();
    assert!(header.is_amqp());
    let mut tail = [0u8; 4];
    ws.read_exact(&mut tail).await.unwrap();
    assert_eq!(&tail, b"tail");

    let received = server.await.unwrap();
    assert_eq!(&received[..4], b"AMQP");
}

#[tokio::test]
async fn other_subprotocol_is_refused() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    tokio::spawn(async move {
        let mut ws = accept(server, "mqtt").await;
        let _ = ws.next().await;
    });

    let result = WebSocketStream::connect_with_stream("ws://localhost/", client).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn connection_opens_over_websocket() {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(async move {
        let mut ws = accept(server, "amqp").await;
        let mut received = Vec::new();
        while received.len() < 8 {
            match ws.next().await.unwrap().unwrap() {
                Message::Binary(bytes) => received.extend_from_slice(&bytes),
                other => panic!("unexpected message {:?}", other),
            }
        }
        received
    });

    let ws = WebSocketStream::connect_with_stream("ws://localhost/", client)
        .await
        .unwrap();
    let _connection = Connection::builder()
        .container_id("ws-client")
        .open_with_stream(ws)
        .await
        .unwrap();

    let received = server.await.unwrap();
    assert_eq!(&received[..8], b"AMQP\x00\x01\x00\x00");
}
