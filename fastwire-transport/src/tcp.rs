//! TCP transport.
//!
//! A [`TcpEndpoint`] dials out; a [`TcpAcceptor`] listens. Both produce a
//! [`TcpConnection`] whose read and write halves are independently owned
//! clones of the same socket, so a session can interleave reads and writes
//! without borrowing conflicts.

use crate::endpoint::{Connection, Endpoint};
use fastwire_core::TransportError;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info};

/// A dial-out TCP endpoint.
#[derive(Debug, Clone)]
pub struct TcpEndpoint {
    addr: String,
    nodelay: bool,
}

impl TcpEndpoint {
    /// Creates an endpoint for a `host:port` address.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            nodelay: true,
        }
    }

    /// Enables or disables Nagle's algorithm. On by default; market-data
    /// frames are small and latency-sensitive.
    #[must_use]
    pub const fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Returns the remote address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Endpoint for TcpEndpoint {
    fn connect(&self) -> Result<Box<dyn Connection>, TransportError> {
        let stream = TcpStream::connect(&self.addr).map_err(|e| {
            TransportError::ConnectionFailed(format!("dial {}: {e}", self.addr))
        })?;
        stream.set_nodelay(self.nodelay)?;
        info!(addr = %self.addr, "tcp connected");
        Ok(Box::new(TcpConnection::new(stream)?))
    }
}

/// An established TCP connection with cloned read and write halves.
#[derive(Debug)]
pub struct TcpConnection {
    reader: TcpStream,
    writer: TcpStream,
    closed: bool,
}

impl TcpConnection {
    /// Wraps an already-connected stream.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the socket handle cannot be cloned.
    pub fn new(stream: TcpStream) -> Result<Self, TransportError> {
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: stream,
            writer,
            closed: false,
        })
    }
}

impl Connection for TcpConnection {
    fn reader(&mut self) -> &mut dyn Read {
        &mut self.reader
    }

    fn writer(&mut self) -> &mut dyn Write {
        &mut self.writer
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("tcp connection shutdown");
        match self.reader.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // the peer may have torn the socket down first
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A listening TCP acceptor for the publishing side.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Binds a listener.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionFailed`] when the bind fails.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| TransportError::ConnectionFailed(format!("bind: {e}")))?;
        info!(addr = ?listener.local_addr(), "tcp listening");
        Ok(Self { listener })
    }

    /// Returns the bound local address.
    ///
    /// # Errors
    /// Propagates the socket error.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Blocks until the next inbound connection.
    ///
    /// # Errors
    /// Propagates accept and clone failures.
    pub fn accept(&self) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        debug!(%peer, "tcp accepted");
        Ok(Box::new(TcpConnection::new(stream)?))
    }
}
