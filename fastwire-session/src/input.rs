//! Inbound session facade.

use crate::handler::MessageHandler;
use fastwire_codec::{Context, Decoder, Message};
use fastwire_core::Result;
use std::collections::HashMap;
use std::io::Read;
use tracing::trace;

/// Decodes messages from an input stream and dispatches them to handlers.
///
/// Handlers run after each successful decode, global ones first, then the
/// handler bound to the message's template. Decode errors propagate
/// immediately; the stream is not usable afterwards because operator state
/// may have diverged from the encoder's.
pub struct MessageInputStream<R> {
    decoder: Decoder<R>,
    handlers: Vec<Box<dyn MessageHandler>>,
    template_handlers: HashMap<u32, Box<dyn MessageHandler>>,
}

impl<R: Read> MessageInputStream<R> {
    /// Creates an input stream over a session context and a byte source.
    #[must_use]
    pub fn new(context: Context, input: R) -> Self {
        Self {
            decoder: Decoder::new(context, input),
            handlers: Vec::new(),
            template_handlers: HashMap::new(),
        }
    }

    /// Registers a handler for every inbound message.
    pub fn add_handler(&mut self, handler: impl MessageHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Registers the handler for one template, replacing any existing one.
    pub fn set_template_handler(&mut self, template_id: u32, handler: impl MessageHandler + 'static) {
        self.template_handlers.insert(template_id, Box::new(handler));
    }

    /// Returns the session context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        self.decoder.context()
    }

    /// Clears all operator state, keeping the stream position.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    /// Reads, decodes, and dispatches the next message.
    ///
    /// Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    /// Propagates every decode and transport error.
    pub fn read_message(&mut self) -> Result<Option<Message>> {
        let Some(mut message) = self.decoder.read_message()? else {
            return Ok(None);
        };

        trace!(template_id = message.template_id(), "dispatching message");
        let context = self.decoder.context_mut();
        for handler in &mut self.handlers {
            handler.on_message(&mut message, context);
        }
        if let Some(handler) = self.template_handlers.get_mut(&message.template_id()) {
            handler.on_message(&mut message, context);
        }

        Ok(Some(message))
    }
}

impl<R: Read> Iterator for MessageInputStream<R> {
    type Item = Result<Message>;

    /// Yields messages until end of stream; a decode error is yielded once
    /// and then the iterator ends.
    fn next(&mut self) -> Option<Self::Item> {
        self.read_message().transpose()
    }
}
