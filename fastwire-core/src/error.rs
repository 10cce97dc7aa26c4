//! Error types for the Fastwire FAST protocol codec.
//!
//! This module provides a unified error hierarchy using `thiserror` for typed,
//! domain-specific errors across all Fastwire operations.

use thiserror::Error;

/// Result type alias using [`FastError`] as the error type.
pub type Result<T> = std::result::Result<T, FastError>;

/// Top-level error type for all Fastwire operations.
#[derive(Debug, Error)]
pub enum FastError {
    /// Error during message decoding.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Error during message encoding.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Error in the transport layer.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O error from an underlying stream or socket.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that occur during FAST message decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended in the middle of an encoded entity.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A stop-bit integer exceeded its maximum byte count.
    #[error("stop-bit entity not terminated within {max_bytes} bytes")]
    StopBitTooLong {
        /// Maximum number of bytes allowed for the entity.
        max_bytes: usize,
    },

    /// Integer overflow during stop-bit accumulation.
    #[error("integer overflow")]
    IntegerOverflow,

    /// Invalid string encoding.
    #[error("invalid string encoding")]
    InvalidString,

    /// Template id not found in the registry.
    #[error("unknown template id: {0}")]
    UnknownTemplate(u32),

    /// The presence map carries a clear template-id bit but no template has
    /// been resolved on this stream yet.
    #[error("template id carry-over with no prior template on this stream")]
    TemplateCarryOverWithoutPrior,

    /// A field tried to consume a presence bit past the decoded map.
    #[error("presence map exhausted after {bits} bits")]
    PresenceMapExhausted {
        /// Number of bits the decoded map carried.
        bits: usize,
    },

    /// A stateful operator needed a previous value that was never assigned.
    #[error("undefined previous value for field {field} in template {template_id}")]
    UndefinedPreviousValue {
        /// Template id owning the field.
        template_id: u32,
        /// Field name.
        field: String,
    },

    /// A value on the wire or in the dictionary had the wrong type.
    #[error("type mismatch for field {field}: expected {expected}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected type description.
        expected: &'static str,
    },

    /// A mandatory field produced no value.
    #[error("missing mandatory field: {field}")]
    MissingMandatoryField {
        /// Field name.
        field: String,
    },

    /// A buffer read past its write cursor.
    #[error("buffer underflow: no bytes remaining")]
    BufferUnderflow,

    /// An outer frame exceeded the configured maximum.
    #[error("frame too large: {size} bytes exceeds maximum {max_size}")]
    FrameTooLarge {
        /// Declared frame size in bytes.
        size: usize,
        /// Maximum allowed frame size in bytes.
        max_size: usize,
    },
}

/// Errors that occur during FAST message encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Buffer capacity exceeded.
    #[error("buffer overflow: need {needed} bytes, capacity {capacity}")]
    BufferOverflow {
        /// Bytes needed to complete the write.
        needed: usize,
        /// Buffer capacity in bytes.
        capacity: usize,
    },

    /// A mandatory field has no value in the message.
    #[error("missing mandatory field: {field}")]
    MissingMandatoryField {
        /// Field name.
        field: String,
    },

    /// A constant field's message value differs from the template constant.
    #[error("value for constant field {field} does not match the template")]
    ConstantMismatch {
        /// Field name.
        field: String,
    },

    /// A message value has the wrong type for its field.
    #[error("type mismatch for field {field}: expected {expected}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected type description.
        expected: &'static str,
    },

    /// The message names a field its template does not declare.
    #[error("unknown field: {field}")]
    UnknownField {
        /// Field name.
        field: String,
    },

    /// A string field value contains non-ASCII content.
    #[error("non-ascii content in string field {field}")]
    InvalidAscii {
        /// Field name.
        field: String,
    },

    /// The message references a template id the registry does not hold.
    #[error("unknown template id: {0}")]
    UnknownTemplate(u32),
}

/// Errors in the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to establish a connection or join a group.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A datagram did not fit the receive buffer.
    #[error("datagram too large: {size} bytes exceeds buffer capacity {capacity}")]
    DatagramOversized {
        /// Datagram size in bytes.
        size: usize,
        /// Receive buffer capacity in bytes.
        capacity: usize,
    },

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,

    /// I/O error on the underlying socket.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
