//! Tokio codec moving [`MessageFrame`]s over a byte stream.
//!
//! Decoding is header-first: nothing is consumed until a full 24-byte header
//! is buffered, and the declared length is checked before any payload is
//! awaited. A stream that ends part-way through a frame is a connection
//! failure, not a malformed frame.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::frame::{MessageFrame, HEADER_SIZE};
use crate::error::{constants, ProtocolError, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = MessageFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<MessageFrame>> {
        if src.len() < HEADER_SIZE {
            src.reserve(HEADER_SIZE - src.len());
            return Ok(None);
        }

        let length = MessageFrame::declared_length(src).unwrap_or_default();
        if !MessageFrame::is_valid_length(length) {
            return Err(ProtocolError::MalformedResponse(format!(
                "{}: {length}",
                constants::ERR_INVALID_FRAME_LENGTH
            )));
        }

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let raw = src.split_to(length);
        trace!(length, "Decoded frame");
        MessageFrame::from_bytes(&raw).map(Some)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<MessageFrame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(ProtocolError::ConnectionFailure(
                constants::ERR_UNEXPECTED_EOF.into(),
            )),
        }
    }
}

impl<'a> Encoder<&'a MessageFrame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: &'a MessageFrame, dst: &mut BytesMut) -> Result<()> {
        if !MessageFrame::is_valid_length(frame.length()) {
            return Err(ProtocolError::MalformedRequest(format!(
                "{}: {}",
                constants::ERR_INVALID_FRAME_LENGTH,
                frame.length()
            )));
        }

        let bytes = frame.as_bytes();
        dst.reserve(bytes.len());
        dst.extend_from_slice(bytes);
        Ok(())
    }
}

impl Encoder<MessageFrame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: MessageFrame, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&MessageFrame>>::encode(self, &frame, dst)
    }
}
