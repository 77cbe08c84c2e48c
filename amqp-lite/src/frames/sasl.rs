//! SASL frame type and corresponding encoder and decoder

use amqp_lite_types::{sasl::SaslFrameBody, ByteBuffer};
use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{read_header, write_header, FRAME_TYPE_SASL};
use crate::Error;

/// SASL frame
pub type Frame = SaslFrameBody;

/// Encoder and Decoder for SASL frame
#[derive(Debug, Default)]
pub struct FrameCodec {}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut body = ByteBuffer::new(64, true);
        item.encode(&mut body)?;
        // Bytes 6 and 7 of the header are ignored and set to zero
        write_header(dst, FRAME_TYPE_SASL, 0, body.len());
        dst.put_slice(body.as_slice());
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let _ignored = read_header(src, FRAME_TYPE_SASL)?;
        let mut buffer = ByteBuffer::from(src.split());
        let frame = SaslFrameBody::decode(&mut buffer)?;
        Ok(Some(frame))
    }
}
