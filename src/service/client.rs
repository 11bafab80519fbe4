//! # Endpoint Client
//!
//! Pairs a [`ProtocolCodec`] with a [`Transport`] so each protocol
//! operation is one typed async call: build the request, run the exchange,
//! validate and decode the response.
//!
//! Failed validations are counted in the transport's metrics and leave the
//! connection open; framing and I/O failures close it (see
//! [`Transport`]).

use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::core::frame::MessageFrame;
use crate::error::Result;
use crate::protocol::codec::ProtocolCodec;
use crate::protocol::message::{IdentificationResponse, SessionKey};
use crate::session::{ClientSession, MemorySession};
use crate::transport::connection::{ByteStream, Transport};
use crate::transport::host::HostInfo;

/// Protocol client over one connection
#[derive(Debug)]
pub struct Client<S: ClientSession = MemorySession> {
    transport: Transport,
    protocol: ProtocolCodec,
    session: S,
}

impl Client<MemorySession> {
    /// A disconnected client with an empty in-memory session
    pub fn new() -> Self {
        Self::with_session(MemorySession::default())
    }

    /// Connect to the broker described by `config`
    #[instrument(skip(config), fields(address = %config.address, secure = config.secure))]
    pub async fn connect_with_config(config: &ClientConfig) -> Result<Self> {
        let host = config.host()?;
        let mut client = Self::from_transport(Transport::with_tls(config.tls()));
        client
            .connect(&host, config.connection_timeout, config.secure)
            .await?;
        client.transport.set_timeout(config.response_timeout);
        Ok(client)
    }

    /// A client driving an already established stream
    pub fn from_stream<T>(stream: T) -> Self
    where
        T: ByteStream + 'static,
    {
        Self::from_transport(Transport::from_stream(stream))
    }

    pub fn from_transport(transport: Transport) -> Self {
        Self {
            transport,
            protocol: ProtocolCodec::new(),
            session: MemorySession::default(),
        }
    }
}

impl Default for Client<MemorySession> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ClientSession> Client<S> {
    /// A disconnected client recording into `session`
    pub fn with_session(session: S) -> Self {
        Self {
            transport: Transport::new(),
            protocol: ProtocolCodec::new(),
            session,
        }
    }

    /// Open a connection to `host`, replacing any current one. Protocol
    /// state is reset for the new conversation.
    pub async fn connect(&mut self, host: &HostInfo, timeout: Duration, secure: bool) -> Result<()> {
        self.transport.connect(host, timeout, secure).await?;
        self.protocol = ProtocolCodec::new();
        Ok(())
    }

    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // -----------------------------------------------------------------

    /// Present `uid` and an ephemeral nonce; returns the salt and host nonce
    #[instrument(skip(self, nonce))]
    pub async fn identify(&mut self, uid: u64, nonce: &[u8]) -> Result<IdentificationResponse> {
        let request = self.protocol.identification_request(uid, nonce)?;
        let response = self
            .exchange(&request, |codec, message| {
                codec.process_identification_response(message)
            })
            .await?;
        self.session.set_local_identity(uid);
        Ok(response)
    }

    /// Send the caller's proof; returns the host's proof
    #[instrument(skip(self, proof))]
    pub async fn authenticate(&mut self, proof: &[u8]) -> Result<Vec<u8>> {
        let request = self.protocol.authentication_request(proof)?;
        self.exchange(&request, |codec, message| {
            codec.process_authentication_response(message)
        })
        .await
    }

    #[instrument(skip(self, key))]
    pub async fn register(&mut self, uid: u64, key: Option<&[u8]>) -> Result<()> {
        let request = self.protocol.register_request(uid, key)?;
        self.exchange(&request, |codec, message| codec.process_register_response(message))
            .await?;
        self.session.set_local_identity(uid);
        Ok(())
    }

    #[instrument(skip(self, nonce))]
    pub async fn get_key(&mut self, nonce: Option<&[u8]>) -> Result<SessionKey> {
        let request = self.protocol.get_key_request(nonce)?;
        self.exchange(&request, |codec, message| codec.process_get_key_response(message))
            .await
    }

    /// Ask which host is the root for `uid`; the answer becomes the
    /// session's remote identity
    #[instrument(skip(self))]
    pub async fn find_root(&mut self, uid: u64) -> Result<u64> {
        let request = self.protocol.find_root_request(uid)?;
        let root = self
            .exchange(&request, |codec, message| {
                codec.process_find_root_response(message)
            })
            .await?;
        self.session.set_remote_identity(root);
        info!(uid, root, "Root host resolved");
        Ok(root)
    }

    /// Publish to `topic`. No response is expected.
    #[instrument(skip(self, payload))]
    pub async fn publish(&mut self, topic: u8, payload: Option<&[u8]>) -> Result<()> {
        let request = self.protocol.publish_request(topic, payload)?;
        self.transport.send(&request).await
    }

    #[instrument(skip(self))]
    pub async fn subscribe(&mut self, topic: u8) -> Result<u8> {
        let request = self.protocol.subscribe_request(topic)?;
        self.exchange(&request, |codec, message| codec.process_subscribe_response(message))
            .await
    }

    #[instrument(skip(self))]
    pub async fn unsubscribe(&mut self, topic: u8) -> Result<u8> {
        let request = self.protocol.unsubscribe_request(topic)?;
        self.exchange(&request, |codec, message| {
            codec.process_unsubscribe_response(message)
        })
        .await
    }

    async fn exchange<T, F>(&mut self, request: &MessageFrame, process: F) -> Result<T>
    where
        F: FnOnce(&ProtocolCodec, &MessageFrame) -> Result<T>,
    {
        let response = self.transport.execute(request).await?;
        process(&self.protocol, &response).map_err(|e| {
            self.transport.metrics().protocol_error();
            debug!(error = %e, "Response rejected");
            e
        })
    }

    // -----------------------------------------------------------------

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn protocol(&self) -> &ProtocolCodec {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut ProtocolCodec {
        &mut self.protocol
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }
}
