//! Handler traits for the session facades.

use fastwire_codec::{Context, Message};
use fastwire_core::FastError;
use tracing::error;

/// Observes messages passing through a session stream.
///
/// Handlers run on the inbound side after a successful decode and on the
/// outbound side before the encode, so outbound handlers can stamp or
/// rewrite fields that then reach the wire.
pub trait MessageHandler {
    /// Called once per message, in registration order.
    fn on_message(&mut self, message: &mut Message, context: &mut Context);
}

impl<F> MessageHandler for F
where
    F: FnMut(&mut Message, &mut Context),
{
    fn on_message(&mut self, message: &mut Message, context: &mut Context) {
        self(message, context);
    }
}

/// Receives errors a stream has chosen not to propagate.
///
/// Only output I/O failures land here; codec errors always propagate to the
/// caller because operator state may have diverged.
pub trait ErrorHandler {
    /// Called with the swallowed error and a short description of the
    /// operation that produced it.
    fn on_error(&mut self, error: &FastError, operation: &str);
}

/// Reports swallowed errors through `tracing`.
#[derive(Debug, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn on_error(&mut self, error: &FastError, operation: &str) {
        error!(%error, operation, "session stream error");
    }
}

/// Discards swallowed errors.
#[derive(Debug, Default)]
pub struct NullErrorHandler;

impl ErrorHandler for NullErrorHandler {
    fn on_error(&mut self, _error: &FastError, _operation: &str) {}
}
