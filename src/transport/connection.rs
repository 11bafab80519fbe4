//! # Framed Connection
//!
//! Moves [`MessageFrame`]s over one byte stream and pairs each request with
//! its response by sequence number.
//!
//! A transport holds at most one connection and serves at most one
//! outstanding request at a time: every method takes `&mut self`. Frames that
//! arrive carrying a different sequence number while a response is awaited
//! are dropped, which assumes no other conversation shares the connection.
//!
//! The connection is torn down on I/O failure and on a frame whose declared
//! length is invalid (the stream cannot be resynchronised after that). A
//! timeout leaves the connection open; any partially read frame stays
//! buffered for the next read.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument, trace, warn};

use crate::core::codec::FrameCodec;
use crate::core::frame::MessageFrame;
use crate::error::{constants, ProtocolError, Result};
use crate::transport::host::HostInfo;
use crate::transport::tls::TlsClientConfig;
use crate::utils::metrics::{Metrics, Timer};
use crate::utils::timeout::{deadline, with_timeout_error, SHUTDOWN_TIMEOUT};

/// Any reliable, ordered byte stream a transport can drive
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

type FramedStream = Framed<Box<dyn ByteStream>, FrameCodec>;

/// Connection holder and request/response correlator
pub struct Transport {
    framed: Option<FramedStream>,
    timeout: Option<Duration>,
    tls: TlsClientConfig,
    metrics: Metrics,
}

impl Transport {
    /// A disconnected transport with default TLS settings
    pub fn new() -> Self {
        Self::with_tls(TlsClientConfig::default())
    }

    /// A disconnected transport that uses `tls` for secure connections
    pub fn with_tls(tls: TlsClientConfig) -> Self {
        Self {
            framed: None,
            timeout: None,
            tls,
            metrics: Metrics::new(),
        }
    }

    /// A transport driving an already established stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: ByteStream + 'static,
    {
        let mut transport = Self::new();
        transport.install(Box::new(stream));
        transport
    }

    /// Open a new connection to `host`, closing any previous one first.
    ///
    /// `timeout` bounds connection setup and becomes the read timeout; zero
    /// means no limit. The read timeout is replaced even when the attempt
    /// fails. On failure no connection is retained.
    #[instrument(skip(self, host), fields(host = %host))]
    pub async fn connect(
        &mut self,
        host: &HostInfo,
        timeout: Duration,
        secure: bool,
    ) -> Result<()> {
        self.close().await;

        let limit = deadline(timeout);
        self.timeout = limit;
        match Self::open(&self.tls, host, limit, secure).await {
            Ok(stream) => {
                self.install(stream);
                info!(secure, "Connected");
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                warn!(error = %e, "Connection attempt failed");
                Err(e)
            }
        }
    }

    async fn open(
        tls: &TlsClientConfig,
        host: &HostInfo,
        limit: Option<Duration>,
        secure: bool,
    ) -> Result<Box<dyn ByteStream>> {
        let tcp = with_timeout_error(
            async {
                TcpStream::connect((host.host.as_str(), host.port))
                    .await
                    .map_err(ProtocolError::from)
            },
            limit,
        )
        .await?;
        tcp.set_nodelay(true)?;

        if !secure {
            return Ok(Box::new(tcp));
        }

        let connector = TlsConnector::from(Arc::new(tls.load_client_config()?));
        let server_name = tls.server_name(&host.host)?;
        let tls = with_timeout_error(
            async {
                connector
                    .connect(server_name, tcp)
                    .await
                    .map_err(ProtocolError::from)
            },
            limit,
        )
        .await?;
        debug!("TLS session established");
        Ok(Box::new(tls))
    }

    /// Drive `stream` from now on, closing the current connection first
    pub async fn attach<S>(&mut self, stream: S)
    where
        S: ByteStream + 'static,
    {
        self.close().await;
        self.install(Box::new(stream));
    }

    fn install(&mut self, stream: Box<dyn ByteStream>) {
        self.framed = Some(Framed::new(stream, FrameCodec));
        self.metrics.connection_established();
    }

    /// Release the connection. Idempotent; shutdown errors are ignored and
    /// the shutdown is bounded by [`SHUTDOWN_TIMEOUT`].
    pub async fn close(&mut self) {
        let Some(framed) = self.framed.take() else {
            return;
        };

        let mut stream = framed.into_inner();
        let shutdown = with_timeout_error(
            async { stream.shutdown().await.map_err(ProtocolError::from) },
            Some(SHUTDOWN_TIMEOUT),
        )
        .await;
        if let Err(e) = shutdown {
            debug!(error = %e, "Ignoring error while closing connection");
        }

        self.metrics.connection_closed();
        info!("Connection closed");
        self.metrics.log_metrics();
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Set the read timeout; zero blocks indefinitely
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = deadline(timeout);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Write `message` to the connection.
    ///
    /// A frame with an invalid length is rejected before any byte is written.
    #[instrument(skip(self, message), fields(sequence_number = message.sequence_number()))]
    pub async fn send(&mut self, message: &MessageFrame) -> Result<()> {
        let length = message.length();
        if !MessageFrame::is_valid_length(length) {
            return Err(ProtocolError::MalformedRequest(format!(
                "{}: {length}",
                constants::ERR_INVALID_FRAME_LENGTH
            )));
        }

        let framed = self.connection()?;
        let result = framed.send(message).await;
        match result {
            Ok(()) => {
                self.metrics.frame_sent(length as u64);
                trace!(length, "Frame sent");
                Ok(())
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Read the next complete frame, whatever its sequence number
    pub async fn receive(&mut self) -> Result<MessageFrame> {
        let limit = self.timeout;
        let framed = self.connection()?;
        let result = with_timeout_error(
            async {
                match framed.next().await {
                    Some(result) => result,
                    None => Err(ProtocolError::ConnectionFailure(
                        constants::ERR_UNEXPECTED_EOF.into(),
                    )),
                }
            },
            limit,
        )
        .await;

        match result {
            Ok(frame) => {
                self.metrics.frame_received(frame.length() as u64);
                trace!(
                    sequence_number = frame.sequence_number(),
                    length = frame.length(),
                    "Frame received"
                );
                Ok(frame)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Read frames until one carries `sequence_number`; 0 accepts the first
    /// frame. Each discarded frame costs one read under the current timeout.
    pub async fn receive_matching(&mut self, sequence_number: i16) -> Result<MessageFrame> {
        loop {
            let frame = self.receive().await?;
            if sequence_number == 0 || frame.sequence_number() == sequence_number {
                return Ok(frame);
            }

            self.metrics.frame_discarded();
            debug!(
                expected = sequence_number,
                received = frame.sequence_number(),
                "Discarding uncorrelated frame"
            );
        }
    }

    /// Send `request` and wait for the response carrying its sequence number
    #[instrument(skip(self, request), fields(sequence_number = request.sequence_number()))]
    pub async fn execute(&mut self, request: &MessageFrame) -> Result<MessageFrame> {
        let _timer = Timer::start("exchange");
        let sequence_number = request.sequence_number();
        self.send(request).await?;
        self.receive_matching(sequence_number).await
    }

    fn connection(&mut self) -> Result<&mut FramedStream> {
        self.framed
            .as_mut()
            .ok_or_else(|| ProtocolError::ConnectionFailure(constants::ERR_NOT_CONNECTED.into()))
    }

    fn record_failure(&mut self, error: &ProtocolError) {
        match error {
            ProtocolError::Timeout => self.metrics.timeout(),
            e if e.is_connection_fatal() => {
                self.metrics.connection_error();
                if self.framed.take().is_some() {
                    self.metrics.connection_closed();
                    warn!(error = %e, "Dropping connection");
                }
            }
            _ => {}
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("connected", &self.is_connected())
            .field("timeout", &self.timeout)
            .field("tls", &self.tls)
            .finish()
    }
}
