//! Outbound session facade.

use crate::handler::{ErrorHandler, LoggingErrorHandler, MessageHandler};
use fastwire_codec::{Context, Encoder, Message};
use fastwire_core::{FastError, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use tracing::debug;

/// Encodes messages and writes their frames to an output sink.
///
/// Registered handlers run before the encode, global ones first, then the
/// handler bound to the message's template, so they can rewrite fields that
/// then reach the wire. Encode errors propagate; output I/O errors are
/// routed to the error handler and swallowed, because a transient sink
/// failure must not poison the shared encoder state for later messages.
pub struct MessageOutputStream<W> {
    encoder: Encoder,
    output: W,
    handlers: Vec<Box<dyn MessageHandler>>,
    template_handlers: HashMap<u32, Box<dyn MessageHandler>>,
    error_handler: Box<dyn ErrorHandler>,
    closed: bool,
}

impl<W: Write> MessageOutputStream<W> {
    /// Creates an output stream over a session context and a sink.
    #[must_use]
    pub fn new(context: Context, output: W) -> Self {
        Self {
            encoder: Encoder::new(context),
            output,
            handlers: Vec::new(),
            template_handlers: HashMap::new(),
            error_handler: Box::new(LoggingErrorHandler),
            closed: false,
        }
    }

    /// Registers a handler for every outbound message.
    pub fn add_handler(&mut self, handler: impl MessageHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Registers the handler for one template, replacing any existing one.
    pub fn set_template_handler(&mut self, template_id: u32, handler: impl MessageHandler + 'static) {
        self.template_handlers.insert(template_id, Box::new(handler));
    }

    /// Replaces the error handler receiving swallowed output failures.
    pub fn set_error_handler(&mut self, handler: impl ErrorHandler + 'static) {
        self.error_handler = Box::new(handler);
    }

    /// Returns the session context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        self.encoder.context()
    }

    /// Clears all operator state.
    pub fn reset(&mut self) {
        self.encoder.reset();
    }

    /// Runs handlers, encodes, and writes one message.
    ///
    /// # Errors
    /// Encode errors propagate and leave operator state unadvanced. Output
    /// I/O errors are reported to the error handler and swallowed.
    pub fn write_message(&mut self, message: &mut Message, flush: bool) -> Result<()> {
        let context = self.encoder.context_mut();
        for handler in &mut self.handlers {
            handler.on_message(message, context);
        }
        if let Some(handler) = self.template_handlers.get_mut(&message.template_id()) {
            handler.on_message(message, context);
        }

        let frame = self.encoder.encode(message)?;
        debug!(
            template_id = message.template_id(),
            frame = %hex_dump(&frame),
            "writing frame"
        );

        if let Err(e) = self.write_frame(&frame, flush) {
            self.error_handler.on_error(&e, "write message frame");
        }
        Ok(())
    }

    /// Writes the close sentinel and flushes.
    ///
    /// Idempotent; I/O failures go to the error handler.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let sentinel = self.encoder.encode_close();
        if let Err(e) = self.write_frame(&sentinel, true) {
            self.error_handler.on_error(&e, "write close sentinel");
        }
    }

    fn write_frame(&mut self, frame: &[u8], flush: bool) -> Result<()> {
        self.output.write_all(frame)?;
        if flush {
            self.output.flush()?;
        }
        Ok(())
    }

    /// Consumes the stream, returning the sink.
    pub fn into_inner(self) -> W {
        self.output
    }
}

/// Renders bytes as space-separated uppercase hex for frame logs.
fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{b:02X}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastwire_codec::{Field, FieldType, Template, TemplateRegistry};
    use fastwire_core::EncodeError;
    use std::io;
    use std::sync::Arc;

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry.register(Template::new(
            1,
            "Quote",
            vec![
                Field::new("Qty", FieldType::UInt32),
                Field::new("Symbol", FieldType::Ascii),
            ],
        ));
        registry
    }

    fn quote(qty: u32, symbol: &str) -> Message {
        let template = registry().get(1).unwrap();
        let mut msg = Message::new(template);
        msg.set("Qty", qty).unwrap();
        msg.set("Symbol", symbol).unwrap();
        msg
    }

    #[test]
    fn test_writes_encoded_frame() {
        let mut stream = MessageOutputStream::new(Context::new(registry()), Vec::new());
        stream.write_message(&mut quote(100, "ACI"), true).unwrap();

        let written = stream.into_inner();
        assert_eq!(written, vec![0x86, 0xC0, 0x81, 0xE4, 0x41, 0x43, 0xC9]);
    }

    #[test]
    fn test_handlers_run_before_encode() {
        let mut stream = MessageOutputStream::new(Context::new(registry()), Vec::new());
        stream.add_handler(|message: &mut Message, _: &mut Context| {
            message.set("Qty", 7u32).unwrap();
        });

        let mut msg = quote(100, "ACI");
        stream.write_message(&mut msg, true).unwrap();
        assert_eq!(msg.get_u64("Qty"), Some(7));

        let written = stream.into_inner();
        // Qty byte on the wire is the handler's 7, not the original 100
        assert_eq!(written[3], 0x87);
    }

    #[test]
    fn test_template_handler_runs_after_global() {
        let mut stream = MessageOutputStream::new(Context::new(registry()), Vec::new());
        stream.add_handler(|message: &mut Message, _: &mut Context| {
            message.set("Qty", 1u32).unwrap();
        });
        stream.set_template_handler(1, |message: &mut Message, _: &mut Context| {
            let qty = message.get_u64("Qty").unwrap();
            message.set("Qty", u32::try_from(qty).unwrap() + 1).unwrap();
        });

        let mut msg = quote(100, "ACI");
        stream.write_message(&mut msg, true).unwrap();
        assert_eq!(msg.get_u64("Qty"), Some(2));
    }

    #[test]
    fn test_encode_error_propagates() {
        let mut stream = MessageOutputStream::new(Context::new(registry()), Vec::new());
        let mut incomplete = Message::new(registry().get(1).unwrap());

        let err = stream.write_message(&mut incomplete, true).unwrap_err();
        assert!(matches!(
            err,
            FastError::Encode(EncodeError::MissingMandatoryField { .. })
        ));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("sink failed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct CountingErrors(Arc<std::sync::atomic::AtomicUsize>);

    impl ErrorHandler for CountingErrors {
        fn on_error(&mut self, _error: &FastError, _operation: &str) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_output_io_error_is_swallowed() {
        let errors = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut stream = MessageOutputStream::new(Context::new(registry()), FailingWriter);
        stream.set_error_handler(CountingErrors(Arc::clone(&errors)));

        stream.write_message(&mut quote(100, "ACI"), true).unwrap();
        assert_eq!(errors.load(std::sync::atomic::Ordering::SeqCst), 1);

        // encoder state still advanced: the next frame carries the id over
        stream.write_message(&mut quote(100, "ACI"), true).unwrap();
        assert_eq!(errors.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_close_writes_sentinel_once() {
        let mut stream = MessageOutputStream::new(Context::new(registry()), Vec::new());
        stream.close();
        stream.close();

        let written = stream.into_inner();
        assert_eq!(written.len(), 128);
        assert!(written.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x0A, 0xFF, 0x00]), "0A FF 00");
        assert_eq!(hex_dump(&[]), "");
    }
}
