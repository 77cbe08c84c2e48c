use std::io;

use http::Response;
use tungstenite::error::{CapacityError, ProtocolError, TlsError, UrlError};

/// Response of a failed WebSocket handshake
pub type HttpResponse = Response<Option<Vec<u8>>>;

/// Error establishing or using the WebSocket binding
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The WebSocket was closed by either side
    #[error("Connection closed")]
    ConnectionClosed,

    /// IO error of the underlying stream
    #[error("IO error: {0}")]
    Io(io::Error),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(TlsError),

    /// A message or frame exceeded the configured limits
    #[error("Space limit exceeded: {0}")]
    Capacity(CapacityError),

    /// WebSocket protocol violation
    #[error("WebSocket protocol error: {0}")]
    Protocol(ProtocolError),

    /// The address cannot be used for a WebSocket request
    #[error("URL error: {0}")]
    Url(UrlError),

    /// The server answered the upgrade request with an HTTP error
    #[error("HTTP error: {}", .0.status())]
    Http(Box<HttpResponse>),

    /// The upgrade request could not be built
    #[error("HTTP format error: {0}")]
    HttpFormat(http::Error),

    /// The server did not switch protocols
    #[error("A status code 101 is expected")]
    StatusCodeIsNotSwitchingProtocols,

    /// The upgrade response has no "Sec-WebSocket-Protocol" header
    #[error("No \"Sec-WebSocket-Protocol\" header")]
    MissingSecWebSocketProtocol,

    /// The server selected a subprotocol other than "amqp"
    #[error("Expect \"Sec-WebSocket-Protocol\" equal to \"amqp\"")]
    SecWebSocketProtocolIsNotAmqp,

    /// Any other tungstenite failure
    #[error("WebSocket error: {0}")]
    Other(tungstenite::Error),
}

impl From<tungstenite::Error> for Error {
    fn from(value: tungstenite::Error) -> Self {
        match value {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionClosed
            }
            tungstenite::Error::Io(val) => Self::Io(val),
            tungstenite::Error::Tls(val) => Self::Tls(val),
            tungstenite::Error::Capacity(val) => Self::Capacity(val),
            tungstenite::Error::Protocol(val) => Self::Protocol(val),
            tungstenite::Error::Url(val) => Self::Url(val),
            tungstenite::Error::Http(val) => Self::Http(Box::new(val)),
            tungstenite::Error::HttpFormat(val) => Self::HttpFormat(val),
            other => Self::Other(other),
        }
    }
}

impl From<Error> for io::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::ConnectionClosed => io::ErrorKind::NotConnected.into(),
            Error::Io(err) => err,
            Error::Capacity(err) => io::Error::new(io::ErrorKind::InvalidData, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
