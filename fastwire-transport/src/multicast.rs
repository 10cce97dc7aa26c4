//! UDP multicast transport.
//!
//! Exchange feeds publish FAST frames as multicast datagrams. The adapter
//! here joins a group and re-exposes the datagram flow as a byte stream:
//! each datagram is buffered whole, drained byte by byte, and the next one
//! is received only when the buffer runs dry. Datagram boundaries are
//! assumed to coincide with frame boundaries, as the feeds guarantee.

use crate::endpoint::{Connection, Endpoint};
use fastwire_codec::ByteBuffer;
use fastwire_core::TransportError;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, UdpSocket};
use tracing::{info, trace};

/// Default per-datagram receive buffer size.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// A multicast group subscription: group address, port, and local interface.
#[derive(Debug, Clone)]
pub struct MulticastEndpoint {
    group: Ipv4Addr,
    port: u16,
    interface: Ipv4Addr,
    buffer_size: usize,
}

impl MulticastEndpoint {
    /// Creates an endpoint for a multicast group and port, joining on all
    /// interfaces with the default buffer size.
    #[must_use]
    pub fn new(group: Ipv4Addr, port: u16) -> Self {
        Self {
            group,
            port,
            interface: Ipv4Addr::UNSPECIFIED,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Selects the local interface to join on.
    #[must_use]
    pub const fn with_interface(mut self, interface: Ipv4Addr) -> Self {
        self.interface = interface;
        self
    }

    /// Overrides the receive buffer size. Any single datagram larger than
    /// this is a fatal stream error.
    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Returns the group address.
    #[must_use]
    pub const fn group(&self) -> Ipv4Addr {
        self.group
    }

    /// Returns the port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl Endpoint for MulticastEndpoint {
    fn connect(&self) -> Result<Box<dyn Connection>, TransportError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.port)).map_err(|e| {
            TransportError::ConnectionFailed(format!("bind port {}: {e}", self.port))
        })?;
        socket
            .join_multicast_v4(&self.group, &self.interface)
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("join group {}: {e}", self.group))
            })?;
        info!(group = %self.group, port = self.port, "joined multicast group");

        Ok(Box::new(MulticastConnection {
            input: MulticastInputStream::new(socket, self.buffer_size),
            writer: ReceiveOnlyWriter,
        }))
    }
}

/// Byte-stream adapter over a datagram socket.
///
/// Owns a [`ByteBuffer`] holding the current datagram; `read` drains it and
/// blocks on the socket only when it is empty.
#[derive(Debug)]
pub struct MulticastInputStream {
    socket: UdpSocket,
    buffer: ByteBuffer,
    // one byte larger than the buffer so truncation is detectable
    datagram: Vec<u8>,
}

impl MulticastInputStream {
    /// Wraps a bound socket with a drain buffer of the given capacity.
    #[must_use]
    pub fn new(socket: UdpSocket, capacity: usize) -> Self {
        Self {
            socket,
            buffer: ByteBuffer::new(capacity),
            datagram: vec![0; capacity + 1],
        }
    }

    /// Returns the underlying socket.
    #[must_use]
    pub const fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Receives the next datagram into the drain buffer.
    fn refill(&mut self) -> io::Result<()> {
        let len = self.socket.recv(&mut self.datagram)?;
        if len > self.buffer.capacity() {
            return Err(io::Error::other(TransportError::DatagramOversized {
                size: len,
                capacity: self.buffer.capacity(),
            }));
        }
        trace!(len, "datagram received");
        self.buffer.flip();
        self.buffer
            .write_bytes(&self.datagram[..len])
            .map_err(io::Error::other)?;
        Ok(())
    }
}

impl Read for MulticastInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.buffer.has_remaining() {
            self.refill()?;
        }

        let mut n = 0;
        while n < buf.len() && self.buffer.has_remaining() {
            buf[n] = self.buffer.get().map_err(io::Error::other)?;
            n += 1;
        }
        Ok(n)
    }
}

/// Multicast is receive-only; every write fails.
#[derive(Debug)]
struct ReceiveOnlyWriter;

impl Write for ReceiveOnlyWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "multicast transport is receive-only",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An active multicast subscription.
#[derive(Debug)]
pub struct MulticastConnection {
    input: MulticastInputStream,
    writer: ReceiveOnlyWriter,
}

impl Connection for MulticastConnection {
    fn reader(&mut self) -> &mut dyn Read {
        &mut self.input
    }

    fn writer(&mut self) -> &mut dyn Write {
        &mut self.writer
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // dropping the socket leaves the group; nothing explicit to do
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn loopback_pair(capacity: usize) -> (MulticastInputStream, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let addr = receiver.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(addr).unwrap();

        (MulticastInputStream::new(receiver, capacity), sender)
    }

    #[test]
    fn test_datagrams_drain_as_byte_stream() {
        let (mut stream, sender) = loopback_pair(64);

        sender.send(&[1, 2, 3]).unwrap();
        sender.send(&[4, 5]).unwrap();

        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);

        // a read never spans datagrams beyond what is buffered
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [4, 5]);
    }

    #[test]
    fn test_partial_drain_keeps_remainder() {
        let (mut stream, sender) = loopback_pair(64);
        sender.send(&[9, 8, 7, 6]).unwrap();

        let mut one = [0u8; 1];
        stream.read_exact(&mut one).unwrap();
        assert_eq!(one, [9]);

        let mut rest = [0u8; 3];
        stream.read_exact(&mut rest).unwrap();
        assert_eq!(rest, [8, 7, 6]);
    }

    #[test]
    fn test_oversized_datagram_is_fatal() {
        let (mut stream, sender) = loopback_pair(4);
        sender.send(&[0u8; 10]).unwrap();

        let mut buf = [0u8; 1];
        let err = stream.read(&mut buf).unwrap_err();
        let inner = err.get_ref().unwrap().to_string();
        assert!(inner.contains("datagram too large"), "{inner}");
    }

    #[test]
    fn test_empty_read_buffer() {
        let (mut stream, _sender) = loopback_pair(4);
        assert_eq!(stream.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_one_datagram_decodes_one_message_then_blocks() {
        use fastwire_codec::{Context, Decoder, Field, FieldType, Template, TemplateRegistry};
        use fastwire_core::FastError;

        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let addr = receiver.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(addr).unwrap();

        let mut registry = TemplateRegistry::new();
        registry.register(Template::new(
            1,
            "Quote",
            vec![
                Field::new("Qty", FieldType::UInt32),
                Field::new("Symbol", FieldType::Ascii),
            ],
        ));

        // one complete frame in one datagram
        sender
            .send(&[0x86, 0xC0, 0x81, 0xE4, 0x41, 0x43, 0xC9])
            .unwrap();

        let stream = MulticastInputStream::new(receiver, 64);
        let mut decoder = Decoder::new(Context::new(registry), stream);

        let msg = decoder.read_message().unwrap().unwrap();
        assert_eq!(msg.get_u64("Qty"), Some(100));
        assert_eq!(msg.get_str("Symbol"), Some("ACI"));

        // nothing further was sent: the next pull blocks on the socket
        // until the read timeout fires
        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Io(ref e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        ));
    }

    #[test]
    fn test_endpoint_builder() {
        let ep = MulticastEndpoint::new(Ipv4Addr::new(239, 1, 1, 1), 30001)
            .with_interface(Ipv4Addr::LOCALHOST)
            .with_buffer_size(2048);
        assert_eq!(ep.group(), Ipv4Addr::new(239, 1, 1, 1));
        assert_eq!(ep.port(), 30001);
    }
}
