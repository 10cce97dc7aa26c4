//! # Fastwire Codec
//!
//! FAST (FIX Adapted for STreaming) protocol encoding and decoding.
//!
//! FAST is a binary, template-driven encoding used to compress market-data
//! feeds. Field values can derive from previously transmitted values via
//! per-field operators, gated by a presence map at the front of every
//! message.
//!
//! ## Features
//!
//! - **Stop-bit encoding**: variable-length base-128 integers and strings
//! - **Presence maps**: bit vector gating optional and stateful fields
//! - **Field operators**: Constant, Default, Copy, Increment, Delta, Tail
//! - **Templates**: ordered field schemas resolved by id on the wire
//! - **Context**: session-scoped previous-value state and template registry

pub mod buffer;
pub mod context;
pub mod decoder;
pub mod encoder;
pub mod field;
pub mod message;
pub mod pmap;
pub mod stopbit;
pub mod template;

pub use buffer::ByteBuffer;
pub use context::{Context, PreviousValue};
pub use decoder::{DEFAULT_MAX_FRAME, Decoder, Messages};
pub use encoder::Encoder;
pub use field::{Field, FieldType, Operator};
pub use message::Message;
pub use pmap::{PresenceMap, PresenceMapBuilder, PresenceMapReader};
pub use template::{Template, TemplateRegistry};
