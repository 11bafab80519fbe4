//! Fixed-capacity message frame.
//!
//! A [`MessageFrame`] owns one `MESSAGE_SIZE` buffer holding a 24-byte header
//! followed by up to `PAYLOAD_SIZE` payload bytes. All multi-byte integers
//! are big-endian. Payload accessors take offsets relative to the start of
//! the payload, never the start of the buffer.
//!
//! ```text
//! [Length(2)] [Source(8)] [Destination(8)] [Sequence(2)]
//! [Session(1)] [Command(1)] [Qualifier(1)] [Status(1)] [Payload(0..1000)]
//! ```

use std::fmt;

use crate::error::{constants, ProtocolError, Result};

/// Maximum size of a frame on the wire, header included
pub const MESSAGE_SIZE: usize = 1024;

/// Size of the fixed header
pub const HEADER_SIZE: usize = 24;

/// Maximum payload carried by a single frame
pub const PAYLOAD_SIZE: usize = MESSAGE_SIZE - HEADER_SIZE;

const LENGTH_OFFSET: usize = 0;
const SOURCE_OFFSET: usize = 2;
const DESTINATION_OFFSET: usize = 10;
const SEQUENCE_OFFSET: usize = 18;
const SESSION_OFFSET: usize = 20;
const COMMAND_OFFSET: usize = 21;
const QUALIFIER_OFFSET: usize = 22;
const STATUS_OFFSET: usize = 23;

/// The (command, qualifier, status) triple identifying what a frame is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MessageContext {
    pub command: u8,
    pub qualifier: u8,
    pub status: u8,
}

impl MessageContext {
    pub const fn new(command: u8, qualifier: u8, status: u8) -> Self {
        Self {
            command,
            qualifier,
            status,
        }
    }
}

impl fmt::Display for MessageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command={} qualifier={} status={}",
            self.command, self.qualifier, self.status
        )
    }
}

/// One protocol message: header plus optional payload.
#[derive(Clone)]
pub struct MessageFrame {
    buffer: Box<[u8; MESSAGE_SIZE]>,
}

impl MessageFrame {
    /// Create an empty frame whose length covers the header only
    pub fn new() -> Self {
        let mut frame = Self {
            buffer: Box::new([0u8; MESSAGE_SIZE]),
        };
        frame.write_u16(LENGTH_OFFSET, HEADER_SIZE as u16);
        frame
    }

    /// Build a frame from raw wire bytes.
    ///
    /// The declared length is validated before anything is copied; bytes past
    /// the declared length are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let length = Self::declared_length(bytes).ok_or_else(|| {
            ProtocolError::MalformedResponse(constants::ERR_INVALID_FRAME_LENGTH.into())
        })?;

        if !Self::is_valid_length(length) {
            return Err(ProtocolError::MalformedResponse(format!(
                "{}: {length}",
                constants::ERR_INVALID_FRAME_LENGTH
            )));
        }

        if bytes.len() < length {
            return Err(ProtocolError::MalformedResponse(format!(
                "Frame truncated: declared {length} bytes, got {}",
                bytes.len()
            )));
        }

        let mut frame = Self::new();
        frame.buffer[..length].copy_from_slice(&bytes[..length]);
        Ok(frame)
    }

    /// Read the length field from the start of a raw header, if present
    pub fn declared_length(header: &[u8]) -> Option<usize> {
        match header {
            [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo]) as usize),
            _ => None,
        }
    }

    /// Whether `length` is a legal total frame length
    pub fn is_valid_length(length: usize) -> bool {
        (HEADER_SIZE..=MESSAGE_SIZE).contains(&length)
    }

    /// Write every header field at once
    pub fn prepare_header(
        &mut self,
        source: u64,
        destination: u64,
        length: usize,
        sequence_number: i16,
        session: u8,
        context: MessageContext,
    ) -> Result<&mut Self> {
        self.set_length(length)?;
        self.write_u64(SOURCE_OFFSET, source);
        self.write_u64(DESTINATION_OFFSET, destination);
        self.buffer[SEQUENCE_OFFSET..SEQUENCE_OFFSET + 2]
            .copy_from_slice(&sequence_number.to_be_bytes());
        self.buffer[SESSION_OFFSET] = session;
        self.buffer[COMMAND_OFFSET] = context.command;
        self.buffer[QUALIFIER_OFFSET] = context.qualifier;
        self.buffer[STATUS_OFFSET] = context.status;
        Ok(self)
    }

    /// Rewrite the length field, e.g. after raw bytes were placed in the buffer
    pub fn set_length(&mut self, length: usize) -> Result<&mut Self> {
        if !Self::is_valid_length(length) {
            return Err(ProtocolError::MalformedRequest(format!(
                "{}: {length}",
                constants::ERR_INVALID_FRAME_LENGTH
            )));
        }
        self.write_u16(LENGTH_OFFSET, length as u16);
        Ok(self)
    }

    pub fn length(&self) -> usize {
        self.read_u16(LENGTH_OFFSET) as usize
    }

    pub fn payload_length(&self) -> usize {
        self.length().saturating_sub(HEADER_SIZE)
    }

    pub fn source(&self) -> u64 {
        self.read_u64(SOURCE_OFFSET)
    }

    pub fn destination(&self) -> u64 {
        self.read_u64(DESTINATION_OFFSET)
    }

    pub fn sequence_number(&self) -> i16 {
        i16::from_be_bytes([
            self.buffer[SEQUENCE_OFFSET],
            self.buffer[SEQUENCE_OFFSET + 1],
        ])
    }

    pub fn session(&self) -> u8 {
        self.buffer[SESSION_OFFSET]
    }

    /// Same byte as [`session`](Self::session), read as a publish/subscribe topic
    pub fn topic(&self) -> u8 {
        self.session()
    }

    pub fn command(&self) -> u8 {
        self.buffer[COMMAND_OFFSET]
    }

    pub fn qualifier(&self) -> u8 {
        self.buffer[QUALIFIER_OFFSET]
    }

    pub fn status(&self) -> u8 {
        self.buffer[STATUS_OFFSET]
    }

    pub fn context(&self) -> MessageContext {
        MessageContext::new(self.command(), self.qualifier(), self.status())
    }

    /// The declared payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SIZE..self.length().clamp(HEADER_SIZE, MESSAGE_SIZE)]
    }

    /// The bytes that go on the wire: header plus declared payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.length().clamp(HEADER_SIZE, MESSAGE_SIZE)]
    }

    /// Copy `bytes` into the payload at `offset`. An empty slice writes nothing.
    pub fn set_blob(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = Self::payload_range(offset, bytes.len(), PAYLOAD_SIZE)
            .ok_or_else(|| ProtocolError::MalformedRequest(constants::ERR_OVERSIZED_BLOB.into()))?;
        self.buffer[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Borrow `length` payload bytes starting at `offset`
    pub fn blob(&self, offset: usize, length: usize) -> Result<&[u8]> {
        let range = Self::payload_range(offset, length, self.payload_length())
            .ok_or_else(|| ProtocolError::MalformedResponse(constants::ERR_OUT_OF_BOUNDS.into()))?;
        Ok(&self.buffer[range])
    }

    pub fn set_long(&mut self, offset: usize, value: u64) -> Result<()> {
        self.set_blob(offset, &value.to_be_bytes())
    }

    pub fn long(&self, offset: usize) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.blob(offset, 8)?);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn set_short(&mut self, offset: usize, value: u16) -> Result<()> {
        self.set_blob(offset, &value.to_be_bytes())
    }

    pub fn short(&self, offset: usize) -> Result<u16> {
        let raw = self.blob(offset, 2)?;
        Ok(u16::from_be_bytes([raw[0], raw[1]]))
    }

    // Absolute buffer range for a payload-relative window bounded by `limit`
    fn payload_range(
        offset: usize,
        length: usize,
        limit: usize,
    ) -> Option<std::ops::Range<usize>> {
        let end = offset.checked_add(length)?;
        if end > limit {
            return None;
        }
        Some(HEADER_SIZE + offset..HEADER_SIZE + end)
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_be_bytes([self.buffer[at], self.buffer[at + 1]])
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.buffer[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn read_u64(&self, at: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buffer[at..at + 8]);
        u64::from_be_bytes(raw)
    }

    fn write_u64(&mut self, at: usize, value: u64) {
        self.buffer[at..at + 8].copy_from_slice(&value.to_be_bytes());
    }
}

impl Default for MessageFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MessageFrame {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for MessageFrame {}

impl fmt::Debug for MessageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFrame")
            .field("length", &self.length())
            .field("source", &self.source())
            .field("destination", &self.destination())
            .field("sequence_number", &self.sequence_number())
            .field("session", &self.session())
            .field("context", &self.context())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn header_fields_land_at_fixed_offsets() {
        let mut frame = MessageFrame::new();
        frame
            .prepare_header(
                0x0102_0304_0506_0708,
                0x1112_1314_1516_1718,
                HEADER_SIZE + 2,
                0x2122,
                0x31,
                MessageContext::new(0x41, 0x42, 0x43),
            )
            .expect("valid header");
        frame.set_blob(0, &[0xAA, 0xBB]).unwrap();

        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), 26);
        assert_eq!(&bytes[0..2], &[0x00, 0x1A]);
        assert_eq!(&bytes[2..10], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&bytes[10..18], &[0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18]);
        assert_eq!(&bytes[18..20], &[0x21, 0x22]);
        assert_eq!(&bytes[20..24], &[0x31, 0x41, 0x42, 0x43]);
        assert_eq!(&bytes[24..], &[0xAA, 0xBB]);
    }

    #[test]
    fn length_bounds() {
        assert!(!MessageFrame::is_valid_length(HEADER_SIZE - 1));
        assert!(MessageFrame::is_valid_length(HEADER_SIZE));
        assert!(MessageFrame::is_valid_length(MESSAGE_SIZE));
        assert!(!MessageFrame::is_valid_length(MESSAGE_SIZE + 1));

        let mut frame = MessageFrame::new();
        assert!(matches!(
            frame.set_length(MESSAGE_SIZE + 1),
            Err(ProtocolError::MalformedRequest(_))
        ));
        assert_eq!(frame.length(), HEADER_SIZE);
    }

    #[test]
    fn payload_writes_are_bounded_by_capacity() {
        let mut frame = MessageFrame::new();
        assert!(frame.set_blob(PAYLOAD_SIZE - 1, &[1]).is_ok());
        assert!(frame.set_blob(PAYLOAD_SIZE, &[1]).is_err());
        assert!(frame.set_blob(usize::MAX, &[1]).is_err());
        assert!(frame.set_blob(PAYLOAD_SIZE, &[]).is_ok());
    }

    #[test]
    fn payload_reads_are_bounded_by_declared_length() {
        let mut frame = MessageFrame::new();
        frame.set_long(0, 42).unwrap();
        // Length still covers only the header
        assert!(matches!(frame.long(0), Err(ProtocolError::MalformedResponse(_))));

        frame.set_length(HEADER_SIZE + 8).unwrap();
        assert_eq!(frame.long(0).unwrap(), 42);
        assert!(frame.short(7).is_err());
    }

    #[test]
    fn short_and_long_are_big_endian() {
        let mut frame = MessageFrame::new();
        frame.set_short(0, 0x0102).unwrap();
        frame.set_long(2, 0x0A0B_0C0D_0E0F_1011).unwrap();
        frame.set_length(HEADER_SIZE + 10).unwrap();
        assert_eq!(
            frame.payload(),
            &[0x01, 0x02, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11]
        );
        assert_eq!(frame.short(0).unwrap(), 0x0102);
    }

    #[test]
    fn from_bytes_rejects_short_and_invalid_input() {
        assert!(MessageFrame::from_bytes(&[0x00]).is_err());

        let mut raw = [0u8; HEADER_SIZE];
        raw[1] = 10;
        assert!(matches!(
            MessageFrame::from_bytes(&raw),
            Err(ProtocolError::MalformedResponse(_))
        ));

        raw[1] = (HEADER_SIZE + 4) as u8;
        assert!(MessageFrame::from_bytes(&raw).is_err());
    }

    #[test]
    fn negative_sequence_numbers_survive_encoding() {
        let mut frame = MessageFrame::new();
        frame
            .prepare_header(0, 0, HEADER_SIZE, -2, 0, MessageContext::default())
            .unwrap();
        assert_eq!(frame.sequence_number(), -2);
    }
}
