//! # Fastwire
//!
//! A FAST (FIX Adapted for STreaming) protocol codec for market-data feeds.
//!
//! FAST compresses FIX market data by transmitting, for each field, only
//! what a template-driven decoder cannot already derive: values repeat,
//! increment, or delta against a session-scoped previous-value cache, gated
//! by a presence map at the front of every message.
//!
//! ## Features
//!
//! - **Template-driven codec**: stop-bit integers, presence maps, and the
//!   Constant, Default, Copy, Increment, Delta, and Tail field operators
//! - **Framed streams**: stop-bit length-prefixed frames with template-id
//!   carry-over and the all-`0xFF` close sentinel
//! - **Transports**: blocking TCP and UDP multicast, both feeding the same
//!   decoder
//! - **Session facades**: handler dispatch on both the inbound and the
//!   outbound side
//!
//! ## Quick Start
//!
//! ```rust
//! use fastwire::prelude::*;
//!
//! let mut registry = TemplateRegistry::new();
//! registry.register(Template::new(
//!     1,
//!     "Quote",
//!     vec![
//!         Field::new("Qty", FieldType::UInt32),
//!         Field::new("Symbol", FieldType::Ascii).with_operator(Operator::Copy),
//!     ],
//! ));
//!
//! let mut encoder = Encoder::new(Context::new(registry));
//! # let mut registry2 = TemplateRegistry::new();
//! # registry2.register(Template::new(
//! #     1,
//! #     "Quote",
//! #     vec![
//! #         Field::new("Qty", FieldType::UInt32),
//! #         Field::new("Symbol", FieldType::Ascii).with_operator(Operator::Copy),
//! #     ],
//! # ));
//! let template = encoder.context().template(1).unwrap();
//! let mut msg = Message::new(template);
//! msg.set("Qty", 100u32).unwrap();
//! msg.set("Symbol", "ACI").unwrap();
//! let frame = encoder.encode(&msg).unwrap();
//!
//! let mut decoder = Decoder::new(
//!     Context::new(registry2),
//!     std::io::Cursor::new(frame),
//! );
//! let decoded = decoder.read_message().unwrap().unwrap();
//! assert_eq!(decoded.get_u64("Qty"), Some(100));
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`]: Field values and the error hierarchy
//! - [`codec`]: Stop-bit encoding, presence maps, templates, operators, and
//!   the framed [`Decoder`](codec::Decoder)/[`Encoder`](codec::Encoder)
//! - [`transport`]: TCP and UDP multicast byte transports
//! - [`session`]: Handler-dispatching message streams

pub mod core {
    //! Field values and the error hierarchy.
    pub use fastwire_core::*;
}

pub mod codec {
    //! Stop-bit encoding, presence maps, templates, and framing.
    pub use fastwire_codec::*;
}

pub mod transport {
    //! TCP and UDP multicast byte transports.
    pub use fastwire_transport::*;
}

pub mod session {
    //! Handler-dispatching message streams.
    pub use fastwire_session::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Core types
    pub use fastwire_core::{
        DecodeError, EncodeError, FastError, FieldValue, Result, TransportError,
    };

    // Codec
    pub use fastwire_codec::{
        Context, Decoder, Encoder, Field, FieldType, Message, Messages, Operator, PresenceMap,
        Template, TemplateRegistry,
    };

    // Transport
    pub use fastwire_transport::{
        Connection, Endpoint, MulticastEndpoint, TcpAcceptor, TcpEndpoint,
    };

    // Session
    pub use fastwire_session::{
        ErrorHandler, LoggingErrorHandler, MessageHandler, MessageInputStream,
        MessageOutputStream, NullErrorHandler,
    };
}
