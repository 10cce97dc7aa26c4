//! # Fastwire Session
//!
//! Message-level facades over the FAST codec: an input stream that decodes
//! and dispatches inbound messages to handlers, and an output stream that
//! runs handlers before encoding and writing. Handlers observe and may
//! mutate messages; per-template handlers run after the global ones.

pub mod handler;
pub mod input;
pub mod output;

pub use handler::{ErrorHandler, LoggingErrorHandler, MessageHandler, NullErrorHandler};
pub use input::MessageInputStream;
pub use output::MessageOutputStream;
