//! AMQP frame type and corresponding encoder and decoder

use amqp_lite_types::{
    codec::Composite,
    definitions::AmqpError,
    performatives::{
        Attach, Begin, Close, Detach, Disposition, End, Flow, Open, Performative, Transfer,
    },
    ByteBuffer,
};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{read_header, write_header, FRAME_HEADER_SIZE, FRAME_TYPE_AMQP};
use crate::Error;

/// AMQP frame
#[derive(Debug)]
pub struct Frame {
    /// AMQP frame channel
    pub channel: u16,

    /// AMQP frame body
    pub body: FrameBody,
}

impl Frame {
    /// Creates a new AMQP frame
    pub fn new(channel: impl Into<u16>, body: impl Into<FrameBody>) -> Self {
        Self {
            channel: channel.into(),
            body: body.into(),
        }
    }

    /// Creates an emtpy frame. The empty frame is only used to reset
    /// the remote idle timeout
    pub fn empty() -> Self {
        Self {
            channel: 0,
            body: FrameBody::Empty,
        }
    }
}

/// AMQP frame body
#[derive(Debug)]
pub enum FrameBody {
    /// Open performative
    Open(Open),

    /// Begin performative
    Begin(Begin),

    /// Attach performative
    Attach(Attach),

    /// Flow performative
    Flow(Flow),

    /// Transfer performative and payload
    Transfer {
        /// Transfer performative
        performative: Transfer,

        /// Binary payload
        payload: ByteBuffer,
    },

    /// Disposition performative
    Disposition(Disposition),

    /// Detach performative
    Detach(Detach),

    /// End performative
    End(End),

    /// Close performative
    Close(Close),

    /// An empty frame used only for resetting idle timeout
    Empty,
}

impl From<Performative> for FrameBody {
    fn from(value: Performative) -> Self {
        match value {
            Performative::Open(p) => FrameBody::Open(p),
            Performative::Begin(p) => FrameBody::Begin(p),
            Performative::Attach(p) => FrameBody::Attach(p),
            Performative::Flow(p) => FrameBody::Flow(p),
            Performative::Transfer(performative) => FrameBody::Transfer {
                performative,
                payload: ByteBuffer::default(),
            },
            Performative::Disposition(p) => FrameBody::Disposition(p),
            Performative::Detach(p) => FrameBody::Detach(p),
            Performative::End(p) => FrameBody::End(p),
            Performative::Close(p) => FrameBody::Close(p),
        }
    }
}

macro_rules! impl_from_performative_for_body {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for FrameBody {
                fn from(value: $variant) -> Self {
                    FrameBody::$variant(value)
                }
            }
        )*
    };
}

impl_from_performative_for_body!(Open, Begin, Attach, Flow, Disposition, Detach, End, Close);

/// Encoder of the AMQP frames
#[derive(Debug)]
pub struct FrameEncoder {
    max_frame_size: usize,
}

impl FrameEncoder {
    /// Creates a new encoder. Transfers are split so that no frame exceeds
    /// `max_frame_size`
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Current max frame size
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Changes the max frame size, usually after the remote open arrives
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = max_frame_size;
    }

    /// Encodes a performative without payload
    pub fn encode_performative(
        &self,
        channel: u16,
        performative: &Performative,
        dst: &mut BytesMut,
    ) -> Result<(), Error> {
        let mut body = ByteBuffer::new(64, true);
        performative.encode(&mut body)?;
        write_header(dst, FRAME_TYPE_AMQP, channel, body.len());
        dst.put_slice(body.as_slice());
        Ok(())
    }

    /// Encodes one transfer frame carrying as much of `payload` as fits.
    ///
    /// `more` is set on the performative if the payload does not fit in one
    /// frame. Returns the number of payload bytes written; they are consumed
    /// from `payload`.
    pub fn encode_transfer(
        &self,
        channel: u16,
        mut transfer: Transfer,
        payload: &mut ByteBuffer,
        dst: &mut BytesMut,
    ) -> Result<usize, Error> {
        let mut body = ByteBuffer::new(64, true);
        transfer.encode(&mut body)?;

        let overhead = FRAME_HEADER_SIZE + body.len();
        let room = self.max_frame_size.saturating_sub(overhead);
        if room == 0 && !payload.is_empty() {
            return Err(Error::amqp(
                AmqpError::FrameSizeTooSmall,
                format!(
                    "transfer performative of {} bytes leaves no room for payload in frames of {} bytes",
                    body.len(),
                    self.max_frame_size
                ),
            ));
        }

        let count = std::cmp::min(room, payload.len());
        if count < payload.len() && !transfer.more {
            // Booleans are always encoded, so the size does not change
            transfer.more = true;
            body.reset();
            transfer.encode(&mut body)?;
        }

        write_header(dst, FRAME_TYPE_AMQP, channel, body.len() + count);
        dst.put_slice(body.as_slice());
        dst.put_slice(&payload.as_slice()[..count]);
        payload.complete(count);
        Ok(count)
    }
}

impl Encoder<Frame> for FrameEncoder {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let performative = match item.body {
            FrameBody::Empty => {
                write_header(dst, FRAME_TYPE_AMQP, item.channel, 0);
                return Ok(());
            }
            FrameBody::Transfer {
                mut performative,
                mut payload,
            } => {
                // The first frame carries the delivery fields, the following ones
                // only the handle
                let orig_more = performative.more;
                loop {
                    let mut frame = performative.clone();
                    frame.more = orig_more;
                    self.encode_transfer(item.channel, frame, &mut payload, dst)?;
                    if payload.is_empty() {
                        return Ok(());
                    }
                    performative = Transfer {
                        handle: performative.handle,
                        ..Default::default()
                    };
                }
            }
            FrameBody::Open(p) => Performative::Open(p),
            FrameBody::Begin(p) => Performative::Begin(p),
            FrameBody::Attach(p) => Performative::Attach(p),
            FrameBody::Flow(p) => Performative::Flow(p),
            FrameBody::Disposition(p) => Performative::Disposition(p),
            FrameBody::Detach(p) => Performative::Detach(p),
            FrameBody::End(p) => Performative::End(p),
            FrameBody::Close(p) => Performative::Close(p),
        };
        self.encode_performative(item.channel, &performative, dst)
    }
}

/// Decoder of the AMQP frames
#[derive(Debug, Default)]
pub struct FrameDecoder {}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let channel = read_header(src, FRAME_TYPE_AMQP)?;

        let body = if src.is_empty() {
            FrameBody::Empty
        } else {
            let mut buffer = ByteBuffer::from(src.split());
            match Performative::decode(&mut buffer)? {
                Performative::Transfer(performative) => FrameBody::Transfer {
                    performative,
                    payload: buffer,
                },
                other => other.into(),
            }
        };

        Ok(Some(Frame { channel, body }))
    }
}

#[cfg(test)]
mod tests {
    use amqp_lite_types::{messaging::Message, primitives::Value};
    use bytes::Bytes;

    use super::*;
    use crate::frames::EMPTY_FRAME;

    fn strip_size(frame: &[u8]) -> BytesMut {
        let size = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(size, frame.len());
        BytesMut::from(&frame[4..])
    }

    #[test]
    fn empty_frame_encoding() {
        let mut encoder = FrameEncoder::new(512);
        let mut dst = BytesMut::new();
        encoder.encode(Frame::empty(), &mut dst).unwrap();
        assert_eq!(&dst[..], &EMPTY_FRAME);

        let mut src = strip_size(&dst);
        let frame = FrameDecoder::default().decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.channel, 0);
        assert!(matches!(frame.body, FrameBody::Empty));
    }

    #[test]
    fn performative_frame_round_trip() {
        let mut encoder = FrameEncoder::new(512);
        let mut dst = BytesMut::new();
        let begin = Begin {
            remote_channel: Some(1),
            next_outgoing_id: 1,
            incoming_window: 2048,
            outgoing_window: 2048,
            handle_max: 7,
            offered_capabilities: None,
            desired_capabilities: None,
            properties: None,
        };
        encoder.encode(Frame::new(3u16, begin.clone()), &mut dst).unwrap();

        let mut src = strip_size(&dst);
        let frame = FrameDecoder::default().decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.channel, 3);
        match frame.body {
            FrameBody::Begin(decoded) => assert_eq!(decoded, begin),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transfer_split_reports_bytes_written() {
        let encoder = FrameEncoder::new(512);
        let mut payload = ByteBuffer::wrap(vec![7u8; 1000]);
        let transfer = Transfer {
            handle: 0,
            delivery_id: Some(0),
            delivery_tag: Some(Bytes::from_static(&[0, 0, 0, 0])),
            message_format: Some(0),
            settled: Some(true),
            ..Default::default()
        };

        let mut dst = BytesMut::new();
        let written = encoder
            .encode_transfer(0, transfer, &mut payload, &mut dst)
            .unwrap();
        assert_eq!(dst.len(), 512);
        assert_eq!(payload.len(), 1000 - written);

        let mut src = strip_size(&dst);
        let frame = FrameDecoder::default().decode(&mut src).unwrap().unwrap();
        match frame.body {
            FrameBody::Transfer {
                performative,
                payload: received,
            } => {
                assert!(performative.more);
                assert_eq!(performative.delivery_id, Some(0));
                assert_eq!(received.len(), written);
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut dst = BytesMut::new();
        let last = Transfer {
            handle: 0,
            ..Default::default()
        };
        let written_last = encoder
            .encode_transfer(0, last, &mut payload, &mut dst)
            .unwrap();
        assert_eq!(written + written_last, 1000);
        assert!(payload.is_empty());

        let mut src = strip_size(&dst);
        let frame = FrameDecoder::default().decode(&mut src).unwrap().unwrap();
        match frame.body {
            FrameBody::Transfer { performative, .. } => assert!(!performative.more),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transfer_without_room_is_rejected() {
        let encoder = FrameEncoder::new(16);
        let mut payload = ByteBuffer::wrap(vec![1, 2, 3]);
        let mut dst = BytesMut::new();
        let err = encoder
            .encode_transfer(0, Transfer::default(), &mut payload, &mut dst)
            .unwrap_err();
        assert_eq!(err.condition(), AmqpError::FrameSizeTooSmall.into());
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn encoder_splits_large_message_into_frames() {
        let message = Message::new(Value::Binary(Bytes::from(vec![0xab; 2000])));
        let payload = message.encode().unwrap();
        let expected = payload.as_slice().to_vec();

        let mut encoder = FrameEncoder::new(512);
        let mut dst = BytesMut::new();
        let transfer = Transfer {
            handle: 2,
            delivery_id: Some(5),
            delivery_tag: Some(Bytes::from_static(&[0, 0, 0, 5])),
            ..Default::default()
        };
        encoder
            .encode(
                Frame::new(
                    1u16,
                    FrameBody::Transfer {
                        performative: transfer,
                        payload,
                    },
                ),
                &mut dst,
            )
            .unwrap();

        let mut reassembled = Vec::new();
        let mut frames = 0;
        let mut rest = &dst[..];
        while !rest.is_empty() {
            let size = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            assert!(size <= 512);
            let mut src = BytesMut::from(&rest[4..size]);
            rest = &rest[size..];
            let frame = FrameDecoder::default().decode(&mut src).unwrap().unwrap();
            match frame.body {
                FrameBody::Transfer {
                    performative,
                    payload,
                } => {
                    assert_eq!(performative.handle, 2);
                    assert_eq!(performative.delivery_id.is_some(), frames == 0);
                    assert_eq!(performative.more, !rest.is_empty());
                    reassembled.extend_from_slice(payload.as_slice());
                }
                other => panic!("unexpected {:?}", other),
            }
            frames += 1;
        }
        assert!(frames > 1);
        assert_eq!(reassembled, expected);
    }
}
