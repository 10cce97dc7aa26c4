//! Framed message encoder.
//!
//! Mirrors the decoder exactly: same presence-bit order, same operator state
//! transitions. An encoder and a decoder fed the same message sequence hold
//! identical previous-value caches after every message, which is what makes
//! the stateful operators decodable at all.

use crate::context::Context;
use crate::message::Message;
use crate::pmap::PresenceMapBuilder;
use crate::stopbit;
use fastwire_core::{EncodeError, FastError, Result};
use tracing::trace;

/// Encodes messages as length-prefixed FAST frames.
pub struct Encoder {
    context: Context,
}

impl Encoder {
    /// Creates an encoder over a session context.
    #[must_use]
    pub fn new(context: Context) -> Self {
        Self { context }
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

    /// Clears all operator state.
    pub fn reset(&mut self) {
        self.context.reset();
    }

    /// Encodes one message as a complete frame, length prefix included.
    ///
    /// The template id is omitted and its presence bit cleared when the
    /// message reuses the previously encoded template.
    ///
    /// # Errors
    /// Returns [`EncodeError`] variants for messages that do not fit their
    /// template. Each field's previous-value slot advances only once that
    /// field has encoded, and the carry-over template id only once the whole
    /// message has; a failure mid-message leaves the failing field's state
    /// and the carry-over id untouched.
    pub fn encode(&mut self, message: &Message) -> Result<Vec<u8>> {
        let template_id = message.template_id();
        let template = self
            .context
            .template(template_id)
            .ok_or(EncodeError::UnknownTemplate(template_id))?;

        self.context.new_message(&template);

        let mut pmap = PresenceMapBuilder::new();
        let mut body = Vec::new();

        let carry_over = self.context.last_template_id() == Some(template_id);
        pmap.push(!carry_over);
        if !carry_over {
            stopbit::encode_u32(template_id, &mut body);
        }

        template.encode(message, &mut pmap, &mut body, &mut self.context)?;
        self.context.set_last_template_id(template_id);

        let pmap_bytes = pmap.encode();
        let payload_len = pmap_bytes.len() + body.len();
        let length = u32::try_from(payload_len).map_err(|_| EncodeError::BufferOverflow {
            needed: payload_len,
            capacity: u32::MAX as usize,
        })?;

        let mut frame = Vec::with_capacity(payload_len + 2);
        stopbit::encode_u32(length, &mut frame);
        frame.extend_from_slice(&pmap_bytes);
        frame.extend_from_slice(&body);

        trace!(template_id, frame_len = frame.len(), "encoded frame");
        Ok(frame)
    }

    /// Encodes the session-close sentinel frame.
    #[must_use]
    pub fn encode_close(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(128);
        frame.push(0xFF); // length 127 with the stop bit
        frame.extend(std::iter::repeat_n(0xFF, 127));
        frame
    }
}

impl From<Encoder> for Context {
    fn from(encoder: Encoder) -> Self {
        encoder.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::field::{Field, FieldType, Operator};
    use crate::template::{Template, TemplateRegistry};
    use std::io::Cursor;
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
        registry.register(Template::new(
            2,
            "Heartbeat",
            vec![Field::new("Seq", FieldType::UInt32).with_operator(Operator::Increment)],
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
    fn test_encode_quote_known_bytes() {
        let mut encoder = Encoder::new(Context::new(registry()));
        let frame = encoder.encode(&quote(100, "ACI")).unwrap();
        assert_eq!(frame, vec![0x86, 0xC0, 0x81, 0xE4, 0x41, 0x43, 0xC9]);
    }

    #[test]
    fn test_carry_over_omits_template_id() {
        let mut encoder = Encoder::new(Context::new(registry()));
        let first = encoder.encode(&quote(100, "ACI")).unwrap();
        let second = encoder.encode(&quote(100, "ACI")).unwrap();

        // second frame: pmap with the id bit clear, no id on the wire
        assert!(second.len() < first.len());
        assert_eq!(second[1] & 0b0100_0000, 0);

        let mut stream = first;
        stream.extend_from_slice(&second);
        let mut decoder = Decoder::new(Context::new(registry()), Cursor::new(stream));
        assert!(decoder.read_message().unwrap().is_some());
        let msg = decoder.read_message().unwrap().unwrap();
        assert_eq!(msg.template_id(), 1);
    }

    #[test]
    fn test_increment_roundtrip_with_state() {
        let mut encoder = Encoder::new(Context::new(registry()));
        let template = registry().get(2).unwrap();

        let mut stream = Vec::new();
        for seq in [5u32, 6, 7] {
            let mut msg = Message::new(Arc::clone(&template));
            msg.set("Seq", seq).unwrap();
            stream.extend_from_slice(&encoder.encode(&msg).unwrap());
        }

        // frames after the first collapse to pmap-only carry-over
        assert_eq!(stream, vec![0x83, 0xE0, 0x82, 0x85, 0x81, 0x80, 0x81, 0x80]);

        let mut decoder = Decoder::new(Context::new(registry()), Cursor::new(stream));
        let seqs: Vec<_> = decoder
            .messages()
            .map(|m| m.unwrap().get_u64("Seq").unwrap())
            .collect();
        assert_eq!(seqs, vec![5, 6, 7]);
    }

    #[test]
    fn test_missing_mandatory_field_fails_cleanly() {
        let mut encoder = Encoder::new(Context::new(registry()));
        let mut msg = quote(100, "ACI");
        let incomplete = {
            let template = registry().get(1).unwrap();
            Message::new(template)
        };

        let err = encoder.encode(&incomplete).unwrap_err();
        assert!(matches!(
            err,
            FastError::Encode(EncodeError::MissingMandatoryField { .. })
        ));

        // the failure did not record a carry-over template
        msg.set("Qty", 7u32).unwrap();
        let frame = encoder.encode(&msg).unwrap();
        assert_eq!(frame[1] & 0b0100_0000, 0b0100_0000);
    }

    #[test]
    fn test_close_sentinel_shape() {
        let encoder = Encoder::new(Context::new(registry()));
        let frame = encoder.encode_close();
        assert_eq!(frame.len(), 128);
        assert!(frame.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_encoder_decoder_state_parity() {
        let copy_registry = || {
            let mut r = TemplateRegistry::new();
            r.register(Template::new(
                1,
                "Quote",
                vec![
                    Field::new("Qty", FieldType::UInt32).with_operator(Operator::Copy),
                    Field::new("Symbol", FieldType::Ascii).with_operator(Operator::Copy),
                ],
            ));
            r
        };

        let mut encoder = Encoder::new(Context::new(copy_registry()));
        let copy_template = encoder.context().template(1).unwrap();

        let mut stream = Vec::new();
        for (qty, symbol) in [(100u32, "ACI"), (100, "ACI"), (250, "ACI")] {
            let mut msg = Message::new(Arc::clone(&copy_template));
            msg.set("Qty", qty).unwrap();
            msg.set("Symbol", symbol).unwrap();
            stream.extend_from_slice(&encoder.encode(&msg).unwrap());
        }

        let mut decoder = Decoder::new(Context::new(copy_registry()), Cursor::new(stream));
        let decoded: Vec<_> = decoder.messages().map(Result::unwrap).collect();
        assert_eq!(decoded[1].get_u64("Qty"), Some(100));
        assert_eq!(decoded[2].get_u64("Qty"), Some(250));
        assert_eq!(decoded[2].get_str("Symbol"), Some("ACI"));
    }
}
