//! Low level transport framing
//!
//! Two layers are stacked on the byte stream. The lower one is
//! [`LengthDelimitedCodec`] that cuts the stream at frame boundaries, the upper
//! one is [`FrameDecoder`] that turns a frame into a performative. Writes
//! bypass the codec: every frame is encoded to bytes up front and queued to a
//! single writer task, which serializes concurrent senders.

use std::{io, task::Poll, time::Duration};

use amqp_lite_types::definitions::{ConnectionError, MIN_MAX_FRAME_SIZE};
use bytes::Bytes;
use futures_util::{Future, Stream};
use pin_project_lite::pin_project;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::codec::{Decoder, FramedRead, LengthDelimitedCodec};

use crate::{
    frames::amqp::{Frame, FrameDecoder},
    util::IdleTimeout,
    Error,
};

pub mod protocol_header;
#[cfg(feature = "rustls")]
#[cfg_attr(docsrs, doc(cfg(feature = "rustls")))]
pub mod tls;

pub use protocol_header::{ProtocolHeader, ProtocolId};

/// A byte stream a connection can run on
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Writes a protocol header
pub async fn send_protocol_header<Io>(io: &mut Io, header: ProtocolHeader) -> Result<(), Error>
where
    Io: AsyncWrite + Unpin,
{
    let buf: [u8; 8] = header.into();
    io.write_all(&buf).await?;
    io.flush().await?;
    Ok(())
}

/// Reads a protocol header
pub async fn recv_protocol_header<Io>(io: &mut Io) -> Result<ProtocolHeader, Error>
where
    Io: AsyncRead + Unpin,
{
    let mut inbound_buf = [0u8; 8];
    io.read_exact(&mut inbound_buf).await?;
    ProtocolHeader::try_from(inbound_buf).map_err(Error::ProtocolHeaderMismatch)
}

/// Reads one complete frame including its size field with exact reads only,
/// so nothing beyond the frame is consumed from `io`
pub(crate) async fn recv_raw_frame<Io>(io: &mut Io, max_frame_size: usize) -> Result<Vec<u8>, Error>
where
    Io: AsyncRead + Unpin,
{
    let size = io.read_u32().await? as usize;
    if size < 8 || size > max_frame_size {
        return Err(Error::amqp(
            ConnectionError::FramingError,
            format!("invalid frame size {}", size),
        ));
    }
    let mut frame = vec![0u8; size - 4];
    io.read_exact(&mut frame).await?;
    Ok(frame)
}

pin_project! {
    /// Reads AMQP frames off a byte stream
    #[derive(Debug)]
    pub struct FrameReader<Io> {
        #[pin]
        framed: FramedRead<Io, LengthDelimitedCodec>,
        decoder: FrameDecoder,
        #[pin]
        idle_timeout: Option<IdleTimeout>,
    }
}

impl<Io> FrameReader<Io>
where
    Io: AsyncRead + Unpin,
{
    /// Wraps a reader. Frames larger than `max_frame_size` are rejected; a
    /// stream silent for `idle_timeout` yields an error.
    pub fn new(io: Io, max_frame_size: usize, idle_timeout: Option<Duration>) -> Self {
        let framed = LengthDelimitedCodec::builder()
            .big_endian()
            .length_field_length(4)
            .max_frame_length(max_frame_size.max(MIN_MAX_FRAME_SIZE as usize))
            .length_adjustment(-4)
            .new_read(io);
        let idle_timeout = match idle_timeout {
            Some(duration) if !duration.is_zero() => Some(IdleTimeout::new(duration)),
            _ => None,
        };

        Self {
            framed,
            decoder: FrameDecoder::default(),
            idle_timeout,
        }
    }

    /// Changes the max frame size after negotiation
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) -> &mut Self {
        self.framed
            .decoder_mut()
            .set_max_frame_length(max_frame_size.max(MIN_MAX_FRAME_SIZE as usize));
        self
    }
}

impl<Io> Stream for FrameReader<Io>
where
    Io: AsyncRead + Unpin,
{
    type Item = Result<Frame, Error>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.framed.poll_next(cx) {
            Poll::Ready(next) => {
                if let Some(delay) = this.idle_timeout.as_pin_mut() {
                    delay.get_mut().reset();
                }

                match next {
                    Some(Ok(mut src)) => Poll::Ready(this.decoder.decode(&mut src).transpose()),
                    Some(Err(err)) => Poll::Ready(Some(Err(err.into()))),
                    None => Poll::Ready(None),
                }
            }
            Poll::Pending => {
                if let Some(delay) = this.idle_timeout.as_pin_mut() {
                    if let Poll::Ready(()) = delay.poll(cx) {
                        return Poll::Ready(Some(Err(Error::amqp(
                            ConnectionError::ConnectionForced,
                            "idle timeout elapsed",
                        ))));
                    }
                }
                Poll::Pending
            }
        }
    }
}

/// Items queued to the writer task
#[derive(Debug)]
pub(crate) enum Outgoing {
    /// Bytes of one or more complete frames
    Frame(Bytes),
    /// Flush and shut down the write half
    Shutdown,
}

/// Writes queued frames until a shutdown is requested or every sender is
/// dropped
pub(crate) async fn write_loop<W>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) -> Result<(), io::Error>
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = outgoing.recv().await {
        match item {
            Outgoing::Frame(bytes) => {
                writer.write_all(&bytes).await?;
                // Drain whatever else is queued before flushing
                while let Ok(item) = outgoing.try_recv() {
                    match item {
                        Outgoing::Frame(bytes) => writer.write_all(&bytes).await?,
                        Outgoing::Shutdown => {
                            writer.flush().await?;
                            return writer.shutdown().await;
                        }
                    }
                }
                writer.flush().await?;
            }
            Outgoing::Shutdown => break,
        }
    }
    writer.flush().await?;
    writer.shutdown().await
}

#[cfg(test)]
mod tests {
    use amqp_lite_types::performatives::Open;
    use bytes::BytesMut;
    use futures_util::StreamExt;
    use tokio_test::io::Builder;
    use tokio_util::codec::Encoder;

    use super::*;
    use crate::frames::{
        amqp::{FrameBody, FrameEncoder},
        EMPTY_FRAME,
    };

    #[tokio::test]
    async fn header_exchange() {
        let mut mock = Builder::new()
            .write(b"AMQP\x00\x01\x00\x00")
            .read(b"AMQP\x00\x01\x00\x00")
            .build();
        send_protocol_header(&mut mock, ProtocolHeader::amqp())
            .await
            .unwrap();
        let header = recv_protocol_header(&mut mock).await.unwrap();
        assert_eq!(header, ProtocolHeader::amqp());
    }

    #[tokio::test]
    async fn header_mismatch_returns_bytes() {
        let mut mock = Builder::new().read(b"HTTP/1.1").build();
        match recv_protocol_header(&mut mock).await {
            Err(Error::ProtocolHeaderMismatch(bytes)) => assert_eq!(&bytes, b"HTTP/1.1"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn read_frames() {
        let mut encoder = FrameEncoder::new(512);
        let mut open = BytesMut::new();
        encoder
            .encode(
                Frame::new(
                    0u16,
                    Open {
                        container_id: "1234".into(),
                        ..Default::default()
                    },
                ),
                &mut open,
            )
            .unwrap();

        let mock = Builder::new().read(&open).read(&EMPTY_FRAME).build();
        let mut reader = FrameReader::new(mock, 512, None);

        let frame = reader.next().await.unwrap().unwrap();
        match frame.body {
            FrameBody::Open(open) => assert_eq!(open.container_id, "1234"),
            other => panic!("unexpected {:?}", other),
        }
        let frame = reader.next().await.unwrap().unwrap();
        assert!(matches!(frame.body, FrameBody::Empty));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_an_error() {
        let mut frame = vec![0u8; 1024];
        frame[..8].copy_from_slice(&[0, 0, 4, 0, 2, 0, 0, 0]);
        let mock = Builder::new().read(&frame).build();
        let mut reader = FrameReader::new(mock, 512, None);
        assert!(matches!(reader.next().await, Some(Err(Error::Io(_)))));
    }

    #[tokio::test]
    async fn raw_frame_reads_exactly_one_frame() {
        let mut mock = Builder::new()
            .read(&EMPTY_FRAME)
            .read(b"AMQP")
            .build();
        let frame = recv_raw_frame(&mut mock, 512).await.unwrap();
        assert_eq!(frame, vec![2, 0, 0, 0]);
        let mut rest = [0u8; 4];
        mock.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"AMQP");
    }

    #[tokio::test]
    async fn writer_writes_queued_frames() {
        let mock = Builder::new().write(&EMPTY_FRAME).write(&EMPTY_FRAME).build();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Outgoing::Frame(Bytes::from_static(&EMPTY_FRAME)))
            .unwrap();
        tx.send(Outgoing::Frame(Bytes::from_static(&EMPTY_FRAME)))
            .unwrap();
        tx.send(Outgoing::Shutdown).unwrap();
        write_loop(mock, rx).await.unwrap();
    }
}
