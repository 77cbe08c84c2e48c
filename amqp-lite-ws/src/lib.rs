#![deny(missing_docs, missing_debug_implementations)]

//! AMQP 1.0 over WebSocket
//!
//! [`WebSocketStream`] performs the upgrade with `Sec-WebSocket-Protocol: amqp`
//! and exposes the binary messages of the socket as a plain byte stream, so it
//! can be handed to `amqp_lite::connection::Builder::open_with_stream`.
//!
//! ```rust,ignore
//! let ws = WebSocketStream::connect("wss://example.servicebus.windows.net/$servicebus/websocket").await?;
//! let connection = Connection::builder()
//!     .hostname("example.servicebus.windows.net")
//!     .open_with_stream(ws)
//!     .await?;
//! ```

use std::{
    io::{self, Cursor, Read},
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{ready, Sink, Stream};
use pin_project_lite::pin_project;
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};
use tokio_tungstenite::{client_async_with_config, connect_async, MaybeTlsStream};
use tungstenite::{
    client::IntoClientRequest,
    handshake::client::{Request, Response},
    http::{HeaderValue, StatusCode},
    protocol::WebSocketConfig,
    Message,
};

mod error;

pub use error::{Error, HttpResponse};

const SEC_WEBSOCKET_PROTOCOL: &str = "Sec-WebSocket-Protocol";
const AMQP_SUBPROTOCOL: &str = "amqp";

pin_project! {
    /// Byte stream over the binary messages of a WebSocket
    #[derive(Debug)]
    pub struct WebSocketStream<S> {
        #[pin]
        inner: tokio_tungstenite::WebSocketStream<S>,
        current_binary: Option<Cursor<Vec<u8>>>,
        response: Response,
    }
}

impl WebSocketStream<MaybeTlsStream<TcpStream>> {
    /// Connects to `req` and upgrades with the "amqp" subprotocol. `wss`
    /// addresses need the `rustls-tls-webpki-roots` feature.
    pub async fn connect(req: impl IntoClientRequest) -> Result<Self, Error> {
        let request = map_amqp_websocket_request(req)?;
        let (ws_stream, response) = connect_async(request).await?;
        Self::verified(ws_stream, response).await
    }
}

impl<S> WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Upgrades an established stream
    pub async fn connect_with_stream(req: impl IntoClientRequest, stream: S) -> Result<Self, Error> {
        Self::connect_with_stream_and_config(req, stream, None).await
    }

    /// Upgrades an established stream with a custom socket configuration
    pub async fn connect_with_stream_and_config(
        req: impl IntoClientRequest,
        stream: S,
        config: Option<WebSocketConfig>,
    ) -> Result<Self, Error> {
        let request = map_amqp_websocket_request(req)?;
        let (ws_stream, response) = client_async_with_config(request, stream, config).await?;
        Self::verified(ws_stream, response).await
    }

    async fn verified(
        mut ws_stream: tokio_tungstenite::WebSocketStream<S>,
        response: Response,
    ) -> Result<Self, Error> {
        match verify_response(&response) {
            Ok(()) => Ok(Self {
                inner: ws_stream,
                current_binary: None,
                response,
            }),
            Err(error) => {
                ws_stream.close(None).await?;
                Err(error)
            }
        }
    }

    /// Response of the WebSocket handshake
    pub fn response(&self) -> &Response {
        &self.response
    }
}

impl<S> AsyncRead for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let mut inner = this.inner;

        let (item_to_copy, len_to_read) = loop {
            if let Some(cursor) = this.current_binary {
                let len = cursor.get_ref().len() as u64;
                let pos = cursor.position();
                if pos < len {
                    break (cursor, len - pos);
                }
            }

            let msg = match ready!(inner.as_mut().poll_next(cx)) {
                Some(Ok(msg)) => msg,
                Some(Err(err)) => return Poll::Ready(Err(Error::from(err).into())),
                // EOF
                None => return Poll::Ready(Ok(())),
            };

            match msg {
                Message::Binary(vec) => *this.current_binary = Some(Cursor::new(vec)),
                Message::Text(_) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "text messages are not part of the AMQP binding",
                    )))
                }
                // Answered by tungstenite
                Message::Ping(_) | Message::Pong(_) => {}
                // tungstenite finishes the close handshake, the stream then ends
                Message::Close(_) => {}
                Message::Frame(_) => {}
            }
        };

        let len_to_read = buf
            .remaining()
            .min(len_to_read.min(usize::MAX as u64) as usize);
        let unfilled_buf = buf.initialize_unfilled_to(len_to_read);
        let len = item_to_copy.read(unfilled_buf)?;
        buf.advance(len);
        Poll::Ready(Ok(()))
    }
}

impl<S> AsyncWrite for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut this = self.project();
        ready!(this.inner.as_mut().poll_ready(cx)).map_err(map_tungstenite_error)?;
        let n = buf.len();
        match this.inner.start_send(Message::binary(buf)) {
            Ok(()) => Poll::Ready(Ok(n)),
            Err(error) => Poll::Ready(Err(map_tungstenite_error(error))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        this.inner.poll_flush(cx).map_err(map_tungstenite_error)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        this.inner.poll_close(cx).map_err(map_tungstenite_error)
    }
}

fn map_tungstenite_error(error: tungstenite::Error) -> io::Error {
    Error::from(error).into()
}

fn map_amqp_websocket_request(req: impl IntoClientRequest) -> Result<Request, Error> {
    let mut request = req.into_client_request()?;
    request.headers_mut().insert(
        SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static(AMQP_SUBPROTOCOL),
    );
    Ok(request)
}

fn verify_response(response: &Response) -> Result<(), Error> {
    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        return Err(Error::StatusCodeIsNotSwitchingProtocols);
    }
    let protocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .ok_or(Error::MissingSecWebSocketProtocol)?;
    match protocol.as_bytes() == AMQP_SUBPROTOCOL.as_bytes() {
        true => Ok(()),
        false => Err(Error::SecWebSocketProtocolIsNotAmqp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode, protocol: Option<&'static str>) -> Response {
        let mut builder = http::Response::builder().status(status);
        if let Some(protocol) = protocol {
            builder = builder.header(SEC_WEBSOCKET_PROTOCOL, protocol);
        }
        builder.body(None).unwrap()
    }

    #[test]
    fn request_asks_for_amqp() {
        let request = map_amqp_websocket_request("ws://localhost:5672/").unwrap();
        assert_eq!(
            request.headers().get(SEC_WEBSOCKET_PROTOCOL).unwrap(),
            "amqp"
        );
    }

    #[test]
    fn response_must_select_amqp() {
        assert!(verify_response(&response(StatusCode::SWITCHING_PROTOCOLS, Some("amqp"))).is_ok());
        assert!(matches!(
            verify_response(&response(StatusCode::SWITCHING_PROTOCOLS, None)),
            Err(Error::MissingSecWebSocketProtocol)
        ));
        assert!(matches!(
            verify_response(&response(StatusCode::SWITCHING_PROTOCOLS, Some("mqtt"))),
            Err(Error::SecWebSocketProtocolIsNotAmqp)
        ));
        assert!(matches!(
            verify_response(&response(StatusCode::OK, Some("amqp"))),
            Err(Error::StatusCodeIsNotSwitchingProtocols)
        ));
    }
}
