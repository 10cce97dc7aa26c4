//! Transport abstraction consumed by the session layer.

use fastwire_core::TransportError;
use std::io::{Read, Write};

/// An established bidirectional byte channel.
///
/// Decoders pull from [`reader`](Connection::reader), encoders push to
/// [`writer`](Connection::writer). Receive-only transports return an error
/// from every write instead of panicking.
pub trait Connection: Send {
    /// The inbound byte stream.
    fn reader(&mut self) -> &mut dyn Read;

    /// The outbound byte stream.
    fn writer(&mut self) -> &mut dyn Write;

    /// Shuts the channel down. Idempotent.
    ///
    /// # Errors
    /// Returns a [`TransportError`] if the underlying socket refuses the
    /// shutdown.
    fn close(&mut self) -> Result<(), TransportError>;
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Connection")
    }
}

/// A factory for [`Connection`]s: an address plus transport-specific
/// options, reusable across reconnects.
pub trait Endpoint {
    /// Opens a connection.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionFailed`] when the dial, bind, or
    /// group join fails.
    fn connect(&self) -> Result<Box<dyn Connection>, TransportError>;
}
