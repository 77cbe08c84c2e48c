//! Frame types and their encoders and decoders
//!
//! Every frame starts with an 8 byte header
//! `size(4) | doff(1) | type(1) | channel(2)` followed by the extended header
//! and the frame body. The encoders here produce complete frames including the
//! size field, the decoders expect the size field to be already stripped by
//! [`LengthDelimitedCodec`](tokio_util::codec::LengthDelimitedCodec).

use amqp_lite_types::definitions::{AmqpError, ConnectionError};
use bytes::{Buf, BufMut, BytesMut};

use crate::Error;

pub mod amqp;
pub mod sasl;

/// Frame type of AMQP frames
pub const FRAME_TYPE_AMQP: u8 = 0x00;

/// Frame type of SASL frames
pub const FRAME_TYPE_SASL: u8 = 0x01;

/// Size of the fixed frame header
pub const FRAME_HEADER_SIZE: usize = 8;

/// An empty AMQP frame on channel 0, sent as heartbeat
pub const EMPTY_FRAME: [u8; FRAME_HEADER_SIZE] = [0, 0, 0, 8, 2, FRAME_TYPE_AMQP, 0, 0];

/// Writes a frame header for a body of `body_size` bytes
pub(crate) fn write_header(dst: &mut BytesMut, frame_type: u8, channel: u16, body_size: usize) {
    dst.reserve(FRAME_HEADER_SIZE + body_size);
    dst.put_u32((FRAME_HEADER_SIZE + body_size) as u32);
    // The extended header is not used, doff is always 2
    dst.put_u8(2);
    dst.put_u8(frame_type);
    dst.put_u16(channel);
}

/// Reads the header that follows the size field and skips the extended header.
/// Returns the channel.
pub(crate) fn read_header(src: &mut BytesMut, frame_type: u8) -> Result<u16, Error> {
    if src.len() < FRAME_HEADER_SIZE - 4 {
        return Err(framing_error("frame is shorter than its header"));
    }
    let doff = src.get_u8() as usize;
    let ftype = src.get_u8();
    let channel = src.get_u16();

    if ftype != frame_type {
        return Err(Error::amqp(
            AmqpError::NotImplemented,
            format!("unexpected frame type {}", ftype),
        ));
    }
    if doff < 2 {
        return Err(framing_error("data offset is smaller than 2"));
    }
    let extended = doff * 4 - FRAME_HEADER_SIZE;
    if src.len() < extended {
        return Err(framing_error("extended header exceeds frame"));
    }
    src.advance(extended);
    Ok(channel)
}

fn framing_error(description: &str) -> Error {
    Error::amqp(ConnectionError::FramingError, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_header_skips_extended_header() {
        let mut src = BytesMut::from(&[3, 0, 0, 5, 0xaa, 0xbb, 0xcc, 0xdd, 0x01][..]);
        let channel = read_header(&mut src, FRAME_TYPE_AMQP).unwrap();
        assert_eq!(channel, 5);
        assert_eq!(&src[..], &[0x01]);
    }

    #[test]
    fn read_header_rejects_bad_offsets() {
        let mut src = BytesMut::from(&[1, 0, 0, 0][..]);
        assert!(read_header(&mut src, FRAME_TYPE_AMQP).is_err());

        let mut src = BytesMut::from(&[4, 0, 0, 0, 0][..]);
        assert!(read_header(&mut src, FRAME_TYPE_AMQP).is_err());

        let mut src = BytesMut::from(&[2, 1, 0, 0][..]);
        let err = read_header(&mut src, FRAME_TYPE_AMQP).unwrap_err();
        assert_eq!(err.condition(), AmqpError::NotImplemented.into());
    }
}
