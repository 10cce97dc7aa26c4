//! Framed message decoder.
//!
//! Pulls stop-bit length-prefixed frames from any [`Read`] source, resolves
//! the template for each frame, and walks its fields through the session
//! [`Context`]. One decoder owns one stream and one context; state evolves
//! strictly in stream order.

use crate::context::Context;
use crate::message::Message;
use crate::pmap::PresenceMap;
use crate::stopbit;
use bytes::Bytes;
use fastwire_core::{DecodeError, FastError, Result};
use std::io::Read;
use tracing::{debug, trace};

/// Default cap on a single frame's payload size.
pub const DEFAULT_MAX_FRAME: u32 = 64 * 1024;

/// Length and fill byte of the session-close sentinel frame.
const CLOSE_SENTINEL_LEN: u32 = 127;
const CLOSE_SENTINEL_BYTE: u8 = 0xFF;

/// Decodes a stream of length-prefixed FAST messages.
pub struct Decoder<R> {
    context: Context,
    input: R,
    max_frame: u32,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder over an input stream.
    #[must_use]
    pub fn new(context: Context, input: R) -> Self {
        Self {
            context,
            input,
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    /// Overrides the maximum accepted frame size.
    #[must_use]
    pub fn with_max_frame(mut self, max_frame: u32) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Returns the session context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the session context mutably.
    pub const fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Clears all operator state, keeping the stream position.
    pub fn reset(&mut self) {
        self.context.reset();
    }

    /// Reads and decodes the next message.
    ///
    /// Returns `Ok(None)` on end of stream: a clean EOF before a length
    /// prefix, a zero-length frame, or the all-`0xFF` close sentinel.
    ///
    /// # Errors
    /// Propagates transport errors and every [`DecodeError`]; decode errors
    /// are not recoverable mid-stream because operator state may have
    /// diverged from the encoder's.
    pub fn read_message(&mut self) -> Result<Option<Message>> {
        let Some(length) = stopbit::read_u32(&mut self.input)? else {
            debug!("input stream ended");
            return Ok(None);
        };
        if length == 0 {
            debug!("zero-length frame, treating as end of stream");
            return Ok(None);
        }
        if length > self.max_frame {
            return Err(DecodeError::FrameTooLarge {
                size: length as usize,
                max_size: self.max_frame as usize,
            }
            .into());
        }

        let mut frame = vec![0u8; length as usize];
        self.input.read_exact(&mut frame).map_err(|e| {
            // a short read is a framing error; anything else is transport
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FastError::from(DecodeError::UnexpectedEof)
            } else {
                FastError::Io(e)
            }
        })?;

        if length == CLOSE_SENTINEL_LEN && frame.iter().all(|&b| b == CLOSE_SENTINEL_BYTE) {
            debug!("close sentinel received");
            return Ok(None);
        }

        trace!(length, "decoding frame");
        let mut message = self.decode_frame(&frame)?;
        message.set_raw_bytes(Bytes::from(frame));
        Ok(Some(message))
    }

    /// Decodes one frame payload: presence map, template id, fields.
    fn decode_frame(&mut self, frame: &[u8]) -> Result<Message> {
        let mut offset = 0;
        let pmap = PresenceMap::decode(frame, &mut offset)?;
        let mut reader = pmap.reader();

        // bit 0 gates an explicit template id; clear means carry-over
        let template_id = if reader.read_bit()? {
            stopbit::decode_u32(frame, &mut offset)?
        } else {
            self.context
                .last_template_id()
                .ok_or(DecodeError::TemplateCarryOverWithoutPrior)?
        };

        let template = self
            .context
            .template(template_id)
            .ok_or(DecodeError::UnknownTemplate(template_id))?;

        self.context.set_last_template_id(template_id);
        self.context.new_message(&template);

        let message = template.decode(frame, &mut offset, &mut reader, &mut self.context)?;
        trace!(template_id, template = template.name(), "decoded message");
        Ok(message)
    }

    /// Returns an iterator pulling messages until end of stream or the
    /// first error.
    pub fn messages(&mut self) -> Messages<'_, R> {
        Messages { decoder: self }
    }
}

/// Iterator over a decoder's messages.
///
/// Yields `Err` once on failure and then stops.
pub struct Messages<'a, R> {
    decoder: &'a mut Decoder<R>,
}

impl<R: Read> Iterator for Messages<'_, R> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.read_message().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldType, Operator};
    use crate::template::{Template, TemplateRegistry};
    use std::io::Cursor;

    fn quote_context() -> Context {
        let mut registry = TemplateRegistry::new();
        registry.register(Template::new(
            1,
            "Quote",
            vec![
                Field::new("Qty", FieldType::UInt32),
                Field::new("Symbol", FieldType::Ascii),
            ],
        ));
        Context::new(registry)
    }

    fn heartbeat_context() -> Context {
        let mut registry = TemplateRegistry::new();
        registry.register(Template::new(
            1,
            "Heartbeat",
            vec![Field::new("Seq", FieldType::UInt32).with_operator(Operator::Increment)],
        ));
        Context::new(registry)
    }

    #[test]
    fn test_decode_quote_frame() {
        // frame: pmap 0xC0 (id bit set), id 1, Qty 100, Symbol "ACI"
        let stream = [0x86, 0xC0, 0x81, 0xE4, 0x41, 0x43, 0xC9];
        let mut decoder = Decoder::new(quote_context(), Cursor::new(stream));

        let msg = decoder.read_message().unwrap().unwrap();
        assert_eq!(msg.template_id(), 1);
        assert_eq!(msg.get_u64("Qty"), Some(100));
        assert_eq!(msg.get_str("Symbol"), Some("ACI"));
        assert_eq!(msg.raw_bytes(), &stream[1..]);

        assert!(decoder.read_message().unwrap().is_none());
    }

    #[test]
    fn test_template_id_carry_over() {
        // msg 1: pmap 0xE0 (id + Seq bits), id 1, Seq 5
        // msg 2: pmap 0x80 (all clear), id carried over, Seq incremented
        let stream = [0x83, 0xE0, 0x81, 0x85, 0x81, 0x80];
        let mut decoder = Decoder::new(heartbeat_context(), Cursor::new(stream));

        let msg = decoder.read_message().unwrap().unwrap();
        assert_eq!(msg.get_u64("Seq"), Some(5));

        let msg = decoder.read_message().unwrap().unwrap();
        assert_eq!(msg.template_id(), 1);
        assert_eq!(msg.get_u64("Seq"), Some(6));
    }

    #[test]
    fn test_carry_over_without_prior_fails() {
        let stream = [0x81, 0x80];
        let mut decoder = Decoder::new(heartbeat_context(), Cursor::new(stream));

        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Decode(DecodeError::TemplateCarryOverWithoutPrior)
        ));
    }

    #[test]
    fn test_unknown_template_fails() {
        // id 9 is not registered
        let stream = [0x82, 0xC0, 0x89];
        let mut decoder = Decoder::new(quote_context(), Cursor::new(stream));

        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Decode(DecodeError::UnknownTemplate(9))
        ));
    }

    #[test]
    fn test_zero_length_frame_ends_stream() {
        let stream = [0x80];
        let mut decoder = Decoder::new(quote_context(), Cursor::new(stream));
        assert!(decoder.read_message().unwrap().is_none());
    }

    #[test]
    fn test_close_sentinel_ends_stream() {
        let mut stream = vec![0xFF]; // length 127, stop bit set
        stream.extend(std::iter::repeat_n(0xFF, 127));
        let mut decoder = Decoder::new(quote_context(), Cursor::new(stream));
        assert!(decoder.read_message().unwrap().is_none());
    }

    #[test]
    fn test_oversized_frame_rejected_before_read() {
        let mut stream = Vec::new();
        stopbit::encode_u32(1 << 20, &mut stream);
        let mut decoder = Decoder::new(quote_context(), Cursor::new(stream));

        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Decode(DecodeError::FrameTooLarge {
                size: 1_048_576,
                max_size: 65_536,
            })
        ));
    }

    #[test]
    fn test_truncated_frame_fails() {
        // length says 5 bytes, only 2 follow
        let stream = [0x85, 0xC0, 0x81];
        let mut decoder = Decoder::new(quote_context(), Cursor::new(stream));

        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Decode(DecodeError::UnexpectedEof)
        ));
    }

    /// Yields a frame length, then fails every read with a reset.
    struct ResetAfterLength {
        sent: bool,
    }

    impl Read for ResetAfterLength {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            } else {
                self.sent = true;
                buf[0] = 0x86;
                Ok(1)
            }
        }
    }

    #[test]
    fn test_transport_failure_is_io_not_framing() {
        let mut decoder = Decoder::new(quote_context(), ResetAfterLength { sent: false });

        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Io(ref e) if e.kind() == std::io::ErrorKind::ConnectionReset
        ));
    }

    #[test]
    fn test_messages_iterator() {
        let stream = [0x83, 0xE0, 0x81, 0x85, 0x81, 0x80];
        let mut decoder = Decoder::new(heartbeat_context(), Cursor::new(stream));

        let messages: Vec<_> = decoder.messages().collect::<Result<_>>().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].get_u64("Seq"), Some(6));
    }

    #[test]
    fn test_decode_is_deterministic_from_fresh_state() {
        let stream = [0x83, 0xE0, 0x81, 0x85, 0x81, 0x80];

        let decode_all = || {
            let mut decoder = Decoder::new(heartbeat_context(), Cursor::new(stream));
            decoder
                .messages()
                .collect::<Result<Vec<_>>>()
                .unwrap()
        };

        assert_eq!(decode_all(), decode_all());
    }

    #[test]
    fn test_reset_clears_operator_state() {
        let stream = [0x83, 0xE0, 0x81, 0x85, 0x81, 0x80];
        let mut decoder = Decoder::new(heartbeat_context(), Cursor::new(stream));
        decoder.read_message().unwrap().unwrap();

        decoder.reset();
        // carry-over id was cleared by the reset
        let err = decoder.read_message().unwrap_err();
        assert!(matches!(
            err,
            FastError::Decode(DecodeError::TemplateCarryOverWithoutPrior)
        ));
    }
}
