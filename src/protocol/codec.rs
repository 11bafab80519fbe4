//! Request builders and response validators.
//!
//! One [`ProtocolCodec`] belongs to one logical connection. It owns the
//! sequence counter and the session byte; neither is shared across
//! connections.
//!
//! Every response goes through the same three checks before its payload is
//! touched: context (command, qualifier, status), source (must be the
//! broker, id 0) and an operation-specific length bound.

use tracing::{debug, warn};

use crate::core::frame::{MessageFrame, HEADER_SIZE, PAYLOAD_SIZE};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::context::{check_context, Operation};
use crate::protocol::message::{IdentificationResponse, SessionKey, SESSION_KEY_SIZE};

/// Size of the find-root response payload: echoed identity + root identity
const FIND_ROOT_RESPONSE_SIZE: usize = 16;

/// Per-connection protocol state
#[derive(Debug, Default, Clone)]
pub struct ProtocolCodec {
    sequence_number: i16,
    session: u8,
}

impl ProtocolCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the sequence number. Wraps to 1, never to 0.
    pub fn next_sequence_number(&mut self) -> i16 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        if self.sequence_number <= 0 {
            self.sequence_number = 1;
        }
        self.sequence_number
    }

    pub fn sequence_number(&self) -> i16 {
        self.sequence_number
    }

    pub fn set_sequence_number(&mut self, sequence_number: i16) {
        self.sequence_number = sequence_number;
    }

    pub fn session(&self) -> u8 {
        self.session
    }

    pub fn set_session(&mut self, session: u8) {
        self.session = session;
    }

    // -----------------------------------------------------------------

    /// Identification request carrying the caller's public ephemeral nonce
    pub fn identification_request(&mut self, uid: u64, nonce: &[u8]) -> Result<MessageFrame> {
        require_blob(nonce)?;
        self.request(uid, self.session, Operation::Identify, nonce)
    }

    /// Decode the salt and host nonce from an identification response
    pub fn process_identification_response(
        &self,
        message: &MessageFrame,
    ) -> Result<IdentificationResponse> {
        validate(message, Operation::Identify)?;
        if message.length() <= HEADER_SIZE + 4 {
            return Err(bad_length(Operation::Identify, message));
        }

        let salt_length = message.short(0)? as usize;
        let nonce_length = message.short(2)? as usize;
        if salt_length == 0 || nonce_length == 0 || salt_length + nonce_length + 4 > PAYLOAD_SIZE
        {
            return Err(ProtocolError::MalformedResponse(format!(
                "{}: salt={salt_length} nonce={nonce_length}",
                constants::ERR_BAD_FIELD_LENGTHS
            )));
        }

        Ok(IdentificationResponse {
            salt: message.blob(4, salt_length)?.to_vec(),
            nonce: message.blob(4 + salt_length, nonce_length)?.to_vec(),
        })
    }

    /// Authentication request carrying the caller's proof of identity
    pub fn authentication_request(&mut self, proof: &[u8]) -> Result<MessageFrame> {
        require_blob(proof)?;
        self.request(0, self.session, Operation::Authenticate, proof)
    }

    /// Returns the host's proof of identity
    pub fn process_authentication_response(&self, message: &MessageFrame) -> Result<Vec<u8>> {
        validate(message, Operation::Authenticate)?;
        if message.length() <= HEADER_SIZE {
            return Err(bad_length(Operation::Authenticate, message));
        }
        Ok(message.payload().to_vec())
    }

    // -----------------------------------------------------------------

    /// Registration request, optionally carrying session key material
    pub fn register_request(&mut self, uid: u64, key: Option<&[u8]>) -> Result<MessageFrame> {
        self.request(uid, self.session, Operation::Register, key.unwrap_or_default())
    }

    /// Succeeds when the host accepted the registration
    pub fn process_register_response(&self, message: &MessageFrame) -> Result<()> {
        validate(message, Operation::Register)?;
        if message.length() != HEADER_SIZE {
            return Err(bad_length(Operation::Register, message));
        }
        Ok(())
    }

    /// Session key request, optionally carrying the caller's nonce
    pub fn get_key_request(&mut self, nonce: Option<&[u8]>) -> Result<MessageFrame> {
        self.request(0, self.session, Operation::GetKey, nonce.unwrap_or_default())
    }

    /// Extract the session key. A double-width response carries an
    /// acknowledgement region first; only its second half is the key.
    pub fn process_get_key_response(&self, message: &MessageFrame) -> Result<SessionKey> {
        validate(message, Operation::GetKey)?;
        let length = message.length();
        let offset = if length <= HEADER_SIZE {
            return Err(bad_length(Operation::GetKey, message));
        } else if length == HEADER_SIZE + SESSION_KEY_SIZE {
            0
        } else if length == HEADER_SIZE + 2 * SESSION_KEY_SIZE {
            SESSION_KEY_SIZE
        } else {
            return Err(bad_length(Operation::GetKey, message));
        };

        let key = message.blob(offset, SESSION_KEY_SIZE)?;
        SessionKey::try_from(key)
            .map_err(|_| ProtocolError::MalformedResponse(constants::ERR_BAD_RESPONSE_LENGTH.into()))
    }

    // -----------------------------------------------------------------

    /// Bootstrap request asking for the root host of `uid`
    pub fn find_root_request(&mut self, uid: u64) -> Result<MessageFrame> {
        self.request(0, self.session, Operation::FindRoot, &uid.to_be_bytes())
    }

    /// Returns the root host's identity
    pub fn process_find_root_response(&self, message: &MessageFrame) -> Result<u64> {
        validate(message, Operation::FindRoot)?;
        if message.length() != HEADER_SIZE + FIND_ROOT_RESPONSE_SIZE {
            return Err(bad_length(Operation::FindRoot, message));
        }
        message.long(8)
    }

    // -----------------------------------------------------------------

    /// Publish `payload` to `topic`. The topic travels in the session byte.
    pub fn publish_request(&mut self, topic: u8, payload: Option<&[u8]>) -> Result<MessageFrame> {
        self.request(0, topic, Operation::Publish, payload.unwrap_or_default())
    }

    pub fn subscribe_request(&mut self, topic: u8) -> Result<MessageFrame> {
        self.request(0, topic, Operation::Subscribe, &[])
    }

    /// Returns the topic the host subscribed us to
    pub fn process_subscribe_response(&self, message: &MessageFrame) -> Result<u8> {
        process_topic_response(message, Operation::Subscribe)
    }

    pub fn unsubscribe_request(&mut self, topic: u8) -> Result<MessageFrame> {
        self.request(0, topic, Operation::Unsubscribe, &[])
    }

    /// Returns the topic the host unsubscribed us from
    pub fn process_unsubscribe_response(&self, message: &MessageFrame) -> Result<u8> {
        process_topic_response(message, Operation::Unsubscribe)
    }

    // Payload is written before the sequence number is consumed so a
    // rejected build leaves the counter untouched.
    fn request(
        &mut self,
        source: u64,
        session: u8,
        operation: Operation,
        payload: &[u8],
    ) -> Result<MessageFrame> {
        if payload.len() > PAYLOAD_SIZE {
            return Err(ProtocolError::MalformedRequest(format!(
                "{} ({operation}): {} bytes",
                constants::ERR_OVERSIZED_BLOB,
                payload.len()
            )));
        }

        let mut message = MessageFrame::new();
        message.set_blob(0, payload)?;
        let sequence_number = self.next_sequence_number();
        message.prepare_header(
            source,
            0,
            HEADER_SIZE + payload.len(),
            sequence_number,
            session,
            operation.request(),
        )?;

        debug!(%operation, sequence_number, length = message.length(), "Built request");
        Ok(message)
    }
}

fn require_blob(blob: &[u8]) -> Result<()> {
    if blob.is_empty() {
        return Err(ProtocolError::MalformedRequest(
            constants::ERR_EMPTY_BLOB.into(),
        ));
    }
    if blob.len() > PAYLOAD_SIZE {
        return Err(ProtocolError::MalformedRequest(format!(
            "{}: {} bytes",
            constants::ERR_OVERSIZED_BLOB,
            blob.len()
        )));
    }
    Ok(())
}

/// Context and source checks shared by every response
fn validate(message: &MessageFrame, operation: Operation) -> Result<()> {
    if check_context(message, operation.rejection()) {
        warn!(%operation, sequence_number = message.sequence_number(), "Request denied");
        return Err(ProtocolError::ContextMismatch(format!(
            "{} ({operation})",
            constants::ERR_REQUEST_DENIED
        )));
    }

    let expected = operation.response();
    if !check_context(message, expected) {
        warn!(%operation, expected = %expected, actual = %message.context(), "Unexpected response context");
        return Err(ProtocolError::ContextMismatch(format!(
            "{} ({operation}): expected {expected}, got {}",
            constants::ERR_BAD_RESPONSE,
            message.context()
        )));
    }

    if message.source() != 0 {
        warn!(%operation, source = message.source(), "Response from unexpected source");
        return Err(ProtocolError::ContextMismatch(format!(
            "{} ({operation}): {}",
            constants::ERR_UNEXPECTED_SOURCE,
            message.source()
        )));
    }

    Ok(())
}

fn process_topic_response(message: &MessageFrame, operation: Operation) -> Result<u8> {
    validate(message, operation)?;
    if message.length() != HEADER_SIZE {
        return Err(bad_length(operation, message));
    }
    Ok(message.topic())
}

fn bad_length(operation: Operation, message: &MessageFrame) -> ProtocolError {
    ProtocolError::MalformedResponse(format!(
        "{} ({operation}): {}",
        constants::ERR_BAD_RESPONSE_LENGTH,
        message.length()
    ))
}
