//! Stream transport to the target process.
//!
//! A [`Connection`] owns one bidirectional stream and the frame buffer that goes with it. Outgoing messages get the
//! configured delimiter appended; incoming bytes are accumulated until a delimiter shows up and handed back one frame
//! at a time.
//!
//! ## Timeouts
//!
//! Every individual read and write is bounded by the connection timeout (60 s by default). An expired read surfaces
//! as [`TransportError::ReadTimeout`] and is never reported as a close. Connecting is bounded by the same value.
//!
//! ## I/O Boundary
//!
//! The runner only talks to the [`Transport`] trait. [`Connection`] implements it for any tokio stream, so the same
//! code drives a TCP socket in production and an in-memory duplex pipe in tests.

use std::future::Future;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use wirecheck_proto::{Delimiter, Frame, FrameBuffer, ProtoError};

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on a single read from the stream.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Errors raised by the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("no data received within {0:?}")]
    ReadTimeout(Duration),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("connection closed by peer")]
    Closed,

    #[error("connection closed by peer in the middle of a frame ({buffered} bytes buffered)")]
    EndOfStream { buffered: usize },

    #[error("framing error: {0}")]
    Framing(#[from] ProtoError),

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::ReadTimeout(_) | TransportError::WriteTimeout(_))
    }
}

/// Settings applied to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub timeout: Duration,
    pub delimiter: Delimiter,
    /// `None` lets a single frame grow without bound.
    pub max_frame_len: Option<usize>,
    pub read_chunk: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            delimiter: Delimiter::default(),
            max_frame_len: Some(FrameBuffer::DEFAULT_MAX_FRAME_LEN),
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

/// Message-level transport used by the runner.
pub trait Transport {
    /// Send one message. The delimiter is appended by the transport.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next complete frame, delimiter stripped.
    fn receive_frame(&mut self) -> impl Future<Output = Result<Frame, TransportError>> + Send;
}

/// One live connection to the target and its accumulation buffer.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
    buffer: FrameBuffer,
    scratch: Box<[u8]>,
    timeout: Duration,
    peer: String,
}

impl Connection<TcpStream> {
    /// Open a TCP connection to `host:port`.
    ///
    /// ## Errors
    /// - [`TransportError::Connect`] if the address cannot be reached within the timeout.
    pub async fn connect(host: &str, port: u16, options: ConnectOptions) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let stream = match time::timeout(options.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
            Err(_) => {
                return Err(TransportError::Connect {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connection attempt timed out"),
                });
            }
        };
        // Commands are small and latency matters more than throughput.
        stream.set_nodelay(true)?;

        tracing::debug!(peer = %addr, "connected");
        Ok(Self::new(stream, options).with_peer(addr))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already established stream.
    pub fn new(stream: S, options: ConnectOptions) -> Self {
        Self {
            stream,
            buffer: FrameBuffer::new(options.delimiter).with_max_frame_len(options.max_frame_len),
            scratch: vec![0; options.read_chunk.max(1)].into_boxed_slice(),
            timeout: options.timeout,
            peer: String::from("stream"),
        }
    }

    /// Label the peer in log output.
    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn delimiter(&self) -> &Delimiter {
        self.buffer.delimiter()
    }

    /// Bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.buffered()
    }

    /// Write `data` followed by the delimiter, waiting until everything is flushed.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let delimiter = self.buffer.delimiter().as_bytes();
        let mut message = Vec::with_capacity(data.len() + delimiter.len());
        message.extend_from_slice(data);
        message.extend_from_slice(delimiter);

        let stream = &mut self.stream;
        let write = async {
            stream.write_all(&message).await?;
            stream.flush().await
        };
        match time::timeout(self.timeout, write).await {
            Ok(result) => {
                result?;
                tracing::debug!(
                    peer = %self.peer,
                    command = %String::from_utf8_lossy(data),
                    bytes = message.len(),
                    "sent"
                );
                Ok(())
            }
            Err(_) => Err(TransportError::WriteTimeout(self.timeout)),
        }
    }

    /// Read until the buffer holds a complete frame and return it.
    ///
    /// ## Errors
    /// - [`TransportError::ReadTimeout`] if a single read blocks longer than the timeout.
    /// - [`TransportError::Closed`] if the peer closes with nothing buffered.
    /// - [`TransportError::EndOfStream`] if the peer closes in the middle of a frame.
    pub async fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        loop {
            if let Some(frame) = self.buffer.next_frame()? {
                tracing::debug!(peer = %self.peer, bytes = frame.len(), "received frame");
                return Ok(frame);
            }

            let read = match time::timeout(self.timeout, self.stream.read(&mut self.scratch)).await {
                Ok(result) => result?,
                Err(_) => return Err(TransportError::ReadTimeout(self.timeout)),
            };
            if read == 0 {
                return Err(if self.buffer.is_empty() {
                    TransportError::Closed
                } else {
                    TransportError::EndOfStream {
                        buffered: self.buffer.buffered(),
                    }
                });
            }
            self.buffer.extend(&self.scratch[..read]);
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S> Transport for Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send {
        Connection::send(self, data)
    }

    fn receive_frame(&mut self) -> impl Future<Output = Result<Frame, TransportError>> + Send {
        Connection::receive_frame(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio_test::io::Builder;

    fn options() -> ConnectOptions {
        ConnectOptions::default()
    }

    // ========================================
    // Sending
    // ========================================

    #[tokio::test]
    async fn test_send_appends_delimiter() {
        let mock = Builder::new().write(b"ping\n").build();
        let mut conn = Connection::new(mock, options());
        conn.send(b"ping").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_custom_delimiter() {
        let mock = Builder::new().write(b"quit\r\n").build();
        let opts = ConnectOptions {
            delimiter: Delimiter::new(b"\r\n".to_vec()).unwrap(),
            ..options()
        };
        let mut conn = Connection::new(mock, opts);
        conn.send(b"quit").await.unwrap();
    }

    // ========================================
    // Receiving
    // ========================================

    #[tokio::test]
    async fn test_receive_across_fragmented_reads() {
        let mock = Builder::new()
            .read(b"{\"type\":")
            .read(b"\"Info\",\"data\":\"x\"}\n{\"type\"")
            .read(b":\"Success\"}\n")
            .build();
        let mut conn = Connection::new(mock, options());

        let first = conn.receive_frame().await.unwrap();
        assert_eq!(first.as_bytes(), br#"{"type":"Info","data":"x"}"#);
        assert_eq!(conn.buffered(), 7);
        let second = conn.receive_frame().await.unwrap();
        assert_eq!(second.as_bytes(), br#"{"type":"Success"}"#);
        assert_eq!(conn.buffered(), 0);
    }

    #[tokio::test]
    async fn test_several_frames_in_one_read() {
        let mock = Builder::new().read(b"a\nb\nc\n").build();
        let mut conn = Connection::new(mock, options());
        for expected in [b"a", b"b", b"c"] {
            assert_eq!(conn.receive_frame().await.unwrap().as_bytes(), expected);
        }
    }

    #[tokio::test]
    async fn test_read_chunk_bounds_each_read() {
        let (mut peer, stream) = duplex(64);
        peer.write_all(b"0123456789\n").await.unwrap();
        let opts = ConnectOptions {
            read_chunk: 3,
            ..options()
        };
        let mut conn = Connection::new(stream, opts);
        assert_eq!(conn.receive_frame().await.unwrap().as_bytes(), b"0123456789");
    }

    #[tokio::test]
    async fn test_close_between_frames() {
        let mock = Builder::new().read(b"done\n").build();
        let mut conn = Connection::new(mock, options());
        conn.receive_frame().await.unwrap();
        assert!(matches!(conn.receive_frame().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_close_mid_frame_is_end_of_stream() {
        let mock = Builder::new().read(b"{\"type\":\"Succ").build();
        let mut conn = Connection::new(mock, options());
        match conn.receive_frame().await {
            Err(TransportError::EndOfStream { buffered }) => assert_eq!(buffered, 13),
            other => panic!("expected EndOfStream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_error_propagates() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut conn = Connection::new(mock, options());
        assert!(matches!(conn.receive_frame().await, Err(TransportError::Io(_))));
    }

    #[tokio::test]
    async fn test_frame_limit_surfaces_as_framing_error() {
        let mock = Builder::new().read(b"0123456789").build();
        let opts = ConnectOptions {
            max_frame_len: Some(4),
            ..options()
        };
        let mut conn = Connection::new(mock, opts);
        assert!(matches!(
            conn.receive_frame().await,
            Err(TransportError::Framing(ProtoError::FrameTooLarge { .. }))
        ));
    }

    // ========================================
    // Logging
    // ========================================

    #[tokio::test]
    async fn test_debug_level_logs_commands_and_frames() {
        let (logs, _guard) = crate::logging::capture::capture("debug");
        let mock = Builder::new()
            .write(b"ping\n")
            .read(b"{\"type\":\"Success\"}\n")
            .build();
        let mut conn = Connection::new(mock, options());
        conn.send(b"ping").await.unwrap();
        conn.receive_frame().await.unwrap();

        let out = logs.contents();
        assert!(out.contains("command=ping"), "{out}");
        assert!(out.contains("received frame"), "{out}");
        assert!(out.contains("bytes=18"), "{out}");
    }

    #[tokio::test]
    async fn test_info_level_hides_wire_traffic() {
        let (logs, _guard) = crate::logging::capture::capture("info");
        let mock = Builder::new().write(b"ping\n").read(b"pong\n").build();
        let mut conn = Connection::new(mock, options());
        conn.send(b"ping").await.unwrap();
        conn.receive_frame().await.unwrap();

        assert!(logs.contents().is_empty());
    }

    // ========================================
    // Timeouts
    // ========================================

    #[tokio::test(start_paused = true)]
    async fn test_silent_peer_times_out() {
        // Keep the peer half alive so the read blocks instead of seeing EOF.
        let (_peer, stream) = duplex(64);
        let opts = ConnectOptions {
            timeout: Duration::from_secs(60),
            ..options()
        };
        let mut conn = Connection::new(stream, opts);
        let err = conn.receive_frame().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(matches!(err, TransportError::ReadTimeout(d) if d == Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_frame_then_silence_times_out() {
        let (mut peer, stream) = duplex(64);
        peer.write_all(b"half a fra").await.unwrap();
        let mut conn = Connection::new(stream, options());
        assert!(matches!(conn.receive_frame().await, Err(TransportError::ReadTimeout(_))));
        assert_eq!(conn.buffered(), 10);
    }

    // ========================================
    // TCP
    // ========================================

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = Connection::connect("127.0.0.1", port, options()).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }
}
