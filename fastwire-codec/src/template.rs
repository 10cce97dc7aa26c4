//! Templates and the per-field operator state machine.
//!
//! A template is a named, ordered list of fields; it knows how to decode and
//! encode itself against a [`Context`], consuming one presence bit per
//! optional or stateful field in declaration order. Field behavior is
//! driven entirely by the [`Operator`] tag: one generic walk rather than
//! one routine per message type.

use crate::context::{Context, PreviousValue};
use crate::field::{Field, FieldType, Operator};
use crate::message::Message;
use crate::pmap::{PresenceMapBuilder, PresenceMapReader};
use crate::stopbit;
use fastwire_core::{DecodeError, EncodeError, FieldValue};
use std::collections::HashMap;
use std::sync::Arc;

/// A message template: id, name, and ordered fields.
///
/// Immutable once registered.
#[derive(Debug)]
pub struct Template {
    id: u32,
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Template {
    /// Creates a template from an ordered field list.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, fields: Vec<Field>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_string(), i))
            .collect();
        Self {
            id,
            name: name.into(),
            fields,
            index,
        }
    }

    /// Returns the template id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Returns the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ordered field list.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the declaration index of a field by name.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Decodes the field body of one message.
    ///
    /// `data`/`offset` point just past the template id (when present); the
    /// presence-map cursor has already consumed the template-id bit.
    ///
    /// # Errors
    /// Any [`DecodeError`] from the wire or from operator state. A failure
    /// mid-field leaves that field's previous-value state unchanged.
    pub fn decode(
        self: &Arc<Self>,
        data: &[u8],
        offset: &mut usize,
        pmap: &mut PresenceMapReader<'_>,
        context: &mut Context,
    ) -> Result<Message, DecodeError> {
        let mut message = Message::new(Arc::clone(self));

        for (i, field) in self.fields.iter().enumerate() {
            let value = self.decode_field(field, data, offset, pmap, context)?;
            if value.is_none() && !field.is_optional() {
                return Err(DecodeError::MissingMandatoryField {
                    field: field.name().to_string(),
                });
            }
            message.set_at(i, value);
        }

        Ok(message)
    }

    fn decode_field(
        &self,
        field: &Field,
        data: &[u8],
        offset: &mut usize,
        pmap: &mut PresenceMapReader<'_>,
        context: &mut Context,
    ) -> Result<Option<FieldValue>, DecodeError> {
        let present = if field.uses_presence_bit() {
            pmap.read_bit()?
        } else {
            true
        };

        match field.operator() {
            Operator::None => {
                if present {
                    Ok(Some(read_value(field, data, offset)?))
                } else {
                    Ok(None)
                }
            }
            Operator::Constant => {
                if present {
                    Ok(field.initial().cloned())
                } else {
                    Ok(None)
                }
            }
            Operator::Default => {
                if present {
                    Ok(Some(read_value(field, data, offset)?))
                } else {
                    Ok(field.initial().cloned())
                }
            }
            Operator::Copy => {
                if present {
                    let value = read_value(field, data, offset)?;
                    context.set_previous(self.id, field.name(), value.clone());
                    Ok(Some(value))
                } else {
                    self.derive_from_previous(field, context)
                }
            }
            Operator::Increment => {
                if present {
                    let value = read_value(field, data, offset)?;
                    context.set_previous(self.id, field.name(), value.clone());
                    Ok(Some(value))
                } else {
                    match context.previous(self.id, field.name()) {
                        PreviousValue::Assigned(prev) => {
                            let next = increment_value(field, &prev)?;
                            context.set_previous(self.id, field.name(), next.clone());
                            Ok(Some(next))
                        }
                        PreviousValue::Undefined if field.initial().is_some() => {
                            let init = field.initial().cloned().unwrap_or(FieldValue::UInt(0));
                            context.set_previous(self.id, field.name(), init.clone());
                            Ok(Some(init))
                        }
                        _ if field.is_optional() => Ok(None),
                        _ => Err(self.undefined_previous(field)),
                    }
                }
            }
            Operator::Delta => {
                if present {
                    let base = self.delta_base(field, context);
                    let value = read_delta(field, &base, data, offset)?;
                    context.set_previous(self.id, field.name(), value.clone());
                    Ok(Some(value))
                } else {
                    // previous-value state stays untouched on a clear bit
                    self.derive_from_previous(field, context)
                }
            }
            Operator::Tail => {
                if present {
                    let base = self.delta_base(field, context);
                    let value = read_tail(field, &base, data, offset)?;
                    context.set_previous(self.id, field.name(), value.clone());
                    Ok(Some(value))
                } else {
                    self.derive_from_previous(field, context)
                }
            }
        }
    }

    /// Value of a stateful field whose presence bit is clear.
    fn derive_from_previous(
        &self,
        field: &Field,
        context: &Context,
    ) -> Result<Option<FieldValue>, DecodeError> {
        match context.previous(self.id, field.name()) {
            PreviousValue::Assigned(v) => Ok(Some(v)),
            PreviousValue::Empty => {
                if field.is_optional() {
                    Ok(None)
                } else {
                    Err(self.undefined_previous(field))
                }
            }
            PreviousValue::Undefined => {
                if let Some(init) = field.initial() {
                    Ok(Some(init.clone()))
                } else if field.is_optional() {
                    Ok(None)
                } else {
                    Err(self.undefined_previous(field))
                }
            }
        }
    }

    fn undefined_previous(&self, field: &Field) -> DecodeError {
        DecodeError::UndefinedPreviousValue {
            template_id: self.id,
            field: field.name().to_string(),
        }
    }

    /// Base value for Delta and Tail: previous, else initial, else zero.
    fn delta_base(&self, field: &Field, context: &Context) -> FieldValue {
        match context.previous(self.id, field.name()) {
            PreviousValue::Assigned(v) => v,
            _ => field
                .initial()
                .cloned()
                .unwrap_or_else(|| zero_value(field.field_type())),
        }
    }

    /// Encodes the field body of one message, mirroring [`Self::decode`].
    ///
    /// The presence-map builder already holds the template-id bit; field
    /// wire bytes append to `body`.
    ///
    /// # Errors
    /// Any [`EncodeError`] from a missing or mistyped value.
    pub fn encode(
        &self,
        message: &Message,
        pmap: &mut PresenceMapBuilder,
        body: &mut Vec<u8>,
        context: &mut Context,
    ) -> Result<(), EncodeError> {
        for (i, field) in self.fields.iter().enumerate() {
            self.encode_field(field, message.get_at(i), pmap, body, context)?;
        }
        Ok(())
    }

    fn encode_field(
        &self,
        field: &Field,
        value: Option<&FieldValue>,
        pmap: &mut PresenceMapBuilder,
        body: &mut Vec<u8>,
        context: &mut Context,
    ) -> Result<(), EncodeError> {
        let missing = || EncodeError::MissingMandatoryField {
            field: field.name().to_string(),
        };

        match field.operator() {
            Operator::None => match value {
                Some(v) => {
                    if field.is_optional() {
                        pmap.push(true);
                    }
                    write_value(field, v, body)
                }
                None => {
                    if field.is_optional() {
                        pmap.push(false);
                        Ok(())
                    } else {
                        Err(missing())
                    }
                }
            },
            Operator::Constant => {
                if let Some(v) = value {
                    if field.initial() != Some(v) {
                        return Err(EncodeError::ConstantMismatch {
                            field: field.name().to_string(),
                        });
                    }
                    if field.is_optional() {
                        pmap.push(true);
                    }
                } else if field.is_optional() {
                    pmap.push(false);
                }
                Ok(())
            }
            Operator::Default => match value {
                Some(v) if field.initial() == Some(v) => {
                    pmap.push(false);
                    Ok(())
                }
                Some(v) => {
                    pmap.push(true);
                    write_value(field, v, body)
                }
                None => {
                    if field.initial().is_some() || field.is_optional() {
                        pmap.push(false);
                        Ok(())
                    } else {
                        Err(missing())
                    }
                }
            },
            Operator::Copy => match value {
                Some(v) => {
                    if context.previous(self.id, field.name()).value() == Some(v) {
                        pmap.push(false);
                        Ok(())
                    } else {
                        pmap.push(true);
                        write_value(field, v, body)?;
                        context.set_previous(self.id, field.name(), v.clone());
                        Ok(())
                    }
                }
                None => {
                    if field.is_optional() {
                        pmap.push(false);
                        context.set_previous_empty(self.id, field.name());
                        Ok(())
                    } else {
                        Err(missing())
                    }
                }
            },
            Operator::Increment => match value {
                Some(v) => {
                    let prev = context.previous(self.id, field.name());
                    let expected = prev.value().and_then(|p| increment_value(field, p).ok());
                    if expected.as_ref() == Some(v) {
                        pmap.push(false);
                    } else {
                        pmap.push(true);
                        write_value(field, v, body)?;
                    }
                    context.set_previous(self.id, field.name(), v.clone());
                    Ok(())
                }
                None => {
                    if field.is_optional() {
                        pmap.push(false);
                        Ok(())
                    } else {
                        Err(missing())
                    }
                }
            },
            Operator::Delta | Operator::Tail => match value {
                Some(v) => {
                    let prev = context.previous(self.id, field.name());
                    if prev.value() == Some(v) {
                        pmap.push(false);
                        Ok(())
                    } else {
                        let base = match prev {
                            PreviousValue::Assigned(p) => p,
                            _ => field
                                .initial()
                                .cloned()
                                .unwrap_or_else(|| zero_value(field.field_type())),
                        };
                        pmap.push(true);
                        if field.operator() == Operator::Delta {
                            write_delta(field, &base, v, body)?;
                        } else {
                            write_tail(field, &base, v, body)?;
                        }
                        context.set_previous(self.id, field.name(), v.clone());
                        Ok(())
                    }
                }
                None => {
                    if field.is_optional() {
                        pmap.push(false);
                        Ok(())
                    } else {
                        Err(missing())
                    }
                }
            },
        }
    }
}

/// Registry of immutable templates keyed by id.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<u32, Arc<Template>>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template, returning the shared handle.
    ///
    /// Re-registering an id replaces the template.
    pub fn register(&mut self, template: Template) -> Arc<Template> {
        let template = Arc::new(template);
        self.templates.insert(template.id(), Arc::clone(&template));
        template
    }

    /// Looks up a template by id.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<Arc<Template>> {
        self.templates.get(&id).cloned()
    }

    /// Returns the number of registered templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no templates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn type_mismatch(field: &Field) -> DecodeError {
    DecodeError::TypeMismatch {
        field: field.name().to_string(),
        expected: field.field_type().name(),
    }
}

fn encode_type_mismatch(field: &Field) -> EncodeError {
    EncodeError::TypeMismatch {
        field: field.name().to_string(),
        expected: field.field_type().name(),
    }
}

/// The stop-bit string form carries 7 bits per character; anything outside
/// ASCII is rejected at the field layer, never mangled on the wire.
fn ascii_checked<'a>(field: &Field, value: &'a str) -> Result<&'a str, EncodeError> {
    if value.is_ascii() {
        Ok(value)
    } else {
        Err(EncodeError::InvalidAscii {
            field: field.name().to_string(),
        })
    }
}

fn zero_value(field_type: FieldType) -> FieldValue {
    match field_type {
        FieldType::UInt32 | FieldType::UInt64 => FieldValue::UInt(0),
        FieldType::Int32 | FieldType::Int64 => FieldValue::Int(0),
        FieldType::Decimal => FieldValue::Decimal {
            mantissa: 0,
            exponent: 0,
        },
        FieldType::Ascii => FieldValue::Ascii(String::new()),
        FieldType::ByteVector => FieldValue::Bytes(Vec::new()),
    }
}

fn read_value(field: &Field, data: &[u8], offset: &mut usize) -> Result<FieldValue, DecodeError> {
    Ok(match field.field_type() {
        FieldType::UInt32 => FieldValue::UInt(u64::from(stopbit::decode_u32(data, offset)?)),
        FieldType::UInt64 => FieldValue::UInt(stopbit::decode_u64(data, offset)?),
        FieldType::Int32 => FieldValue::Int(i64::from(stopbit::decode_i32(data, offset)?)),
        FieldType::Int64 => FieldValue::Int(stopbit::decode_i64(data, offset)?),
        FieldType::Decimal => {
            let (mantissa, exponent) = stopbit::decode_decimal(data, offset)?;
            FieldValue::Decimal { mantissa, exponent }
        }
        FieldType::Ascii => FieldValue::Ascii(stopbit::decode_ascii(data, offset)?),
        FieldType::ByteVector => FieldValue::Bytes(stopbit::decode_byte_vector(data, offset)?),
    })
}

fn increment_value(field: &Field, previous: &FieldValue) -> Result<FieldValue, DecodeError> {
    match previous {
        FieldValue::UInt(p) => p
            .checked_add(1)
            .map(FieldValue::UInt)
            .ok_or(DecodeError::IntegerOverflow),
        FieldValue::Int(p) => p
            .checked_add(1)
            .map(FieldValue::Int)
            .ok_or(DecodeError::IntegerOverflow),
        _ => Err(type_mismatch(field)),
    }
}

fn read_delta(
    field: &Field,
    base: &FieldValue,
    data: &[u8],
    offset: &mut usize,
) -> Result<FieldValue, DecodeError> {
    match field.field_type() {
        FieldType::UInt32 | FieldType::UInt64 => {
            let delta = stopbit::decode_i64(data, offset)?;
            let b = base.as_u64().ok_or_else(|| type_mismatch(field))?;
            let v = i128::from(b) + i128::from(delta);
            let v = u64::try_from(v).map_err(|_| DecodeError::IntegerOverflow)?;
            if field.field_type() == FieldType::UInt32 && v > u64::from(u32::MAX) {
                return Err(DecodeError::IntegerOverflow);
            }
            Ok(FieldValue::UInt(v))
        }
        FieldType::Int32 | FieldType::Int64 => {
            let delta = stopbit::decode_i64(data, offset)?;
            let b = base.as_i64().ok_or_else(|| type_mismatch(field))?;
            let v = i128::from(b) + i128::from(delta);
            let v = i64::try_from(v).map_err(|_| DecodeError::IntegerOverflow)?;
            if field.field_type() == FieldType::Int32
                && (v > i64::from(i32::MAX) || v < i64::from(i32::MIN))
            {
                return Err(DecodeError::IntegerOverflow);
            }
            Ok(FieldValue::Int(v))
        }
        FieldType::Decimal => {
            let exp_delta = stopbit::decode_i32(data, offset)?;
            let man_delta = stopbit::decode_i64(data, offset)?;
            let (m, e) = base.as_decimal().ok_or_else(|| type_mismatch(field))?;
            let mantissa = m.checked_add(man_delta).ok_or(DecodeError::IntegerOverflow)?;
            let exponent = e.checked_add(exp_delta).ok_or(DecodeError::IntegerOverflow)?;
            Ok(FieldValue::Decimal { mantissa, exponent })
        }
        FieldType::Ascii => {
            let sub = stopbit::decode_i32(data, offset)?;
            let insert = stopbit::decode_ascii(data, offset)?;
            let b = base.as_str().ok_or_else(|| type_mismatch(field))?;
            Ok(FieldValue::Ascii(string_delta(b, sub, &insert)?))
        }
        FieldType::ByteVector => {
            let sub = stopbit::decode_i32(data, offset)?;
            let insert = stopbit::decode_byte_vector(data, offset)?;
            let b = base.as_bytes().ok_or_else(|| type_mismatch(field))?;
            Ok(FieldValue::Bytes(bytes_delta(b, sub, &insert)))
        }
    }
}

/// FAST string delta: a non-negative subtraction length trims the end, a
/// negative one trims `-sub - 1` units from the front; the remainder is
/// appended on the trimmed side.
///
/// Works on raw bytes so a base that is somehow not ASCII (a bad template
/// initial value) surfaces as [`DecodeError::InvalidString`] instead of a
/// char-boundary panic.
fn string_delta(base: &str, sub: i32, insert: &str) -> Result<String, DecodeError> {
    String::from_utf8(bytes_delta(base.as_bytes(), sub, insert.as_bytes()))
        .map_err(|_| DecodeError::InvalidString)
}

fn bytes_delta(base: &[u8], sub: i32, insert: &[u8]) -> Vec<u8> {
    if sub >= 0 {
        let keep = base.len().saturating_sub(sub as usize);
        let mut result = base[..keep].to_vec();
        result.extend_from_slice(insert);
        result
    } else {
        let trim = ((-i64::from(sub)) as usize).saturating_sub(1);
        let kept = if trim >= base.len() { &[][..] } else { &base[trim..] };
        let mut result = insert.to_vec();
        result.extend_from_slice(kept);
        result
    }
}

fn read_tail(
    field: &Field,
    base: &FieldValue,
    data: &[u8],
    offset: &mut usize,
) -> Result<FieldValue, DecodeError> {
    match field.field_type() {
        FieldType::Ascii => {
            let tail = stopbit::decode_ascii(data, offset)?;
            let b = base.as_str().ok_or_else(|| type_mismatch(field))?;
            if tail.len() >= b.len() {
                Ok(FieldValue::Ascii(tail))
            } else {
                let mut bytes = b.as_bytes()[..b.len() - tail.len()].to_vec();
                bytes.extend_from_slice(tail.as_bytes());
                String::from_utf8(bytes)
                    .map(FieldValue::Ascii)
                    .map_err(|_| DecodeError::InvalidString)
            }
        }
        FieldType::ByteVector => {
            let tail = stopbit::decode_byte_vector(data, offset)?;
            let b = base.as_bytes().ok_or_else(|| type_mismatch(field))?;
            if tail.len() >= b.len() {
                Ok(FieldValue::Bytes(tail))
            } else {
                let mut result = b[..b.len() - tail.len()].to_vec();
                result.extend_from_slice(&tail);
                Ok(FieldValue::Bytes(result))
            }
        }
        _ => Err(type_mismatch(field)),
    }
}

fn write_value(field: &Field, value: &FieldValue, body: &mut Vec<u8>) -> Result<(), EncodeError> {
    match (field.field_type(), value) {
        (FieldType::UInt32, FieldValue::UInt(v)) => {
            let v = u32::try_from(*v).map_err(|_| encode_type_mismatch(field))?;
            stopbit::encode_u32(v, body);
            Ok(())
        }
        (FieldType::UInt64, FieldValue::UInt(v)) => {
            stopbit::encode_u64(*v, body);
            Ok(())
        }
        (FieldType::Int32, FieldValue::Int(v)) => {
            let v = i32::try_from(*v).map_err(|_| encode_type_mismatch(field))?;
            stopbit::encode_i32(v, body);
            Ok(())
        }
        (FieldType::Int64, FieldValue::Int(v)) => {
            stopbit::encode_i64(*v, body);
            Ok(())
        }
        (FieldType::Decimal, FieldValue::Decimal { mantissa, exponent }) => {
            stopbit::encode_decimal(*mantissa, *exponent, body);
            Ok(())
        }
        (FieldType::Ascii, FieldValue::Ascii(s)) => {
            stopbit::encode_ascii(ascii_checked(field, s)?, body);
            Ok(())
        }
        (FieldType::ByteVector, FieldValue::Bytes(b)) => {
            stopbit::encode_byte_vector(b, body);
            Ok(())
        }
        _ => Err(encode_type_mismatch(field)),
    }
}

fn write_delta(
    field: &Field,
    base: &FieldValue,
    value: &FieldValue,
    body: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match field.field_type() {
        FieldType::UInt32 | FieldType::UInt64 => {
            let b = base.as_u64().ok_or_else(|| encode_type_mismatch(field))?;
            let v = value.as_u64().ok_or_else(|| encode_type_mismatch(field))?;
            stopbit::encode_i64((i128::from(v) - i128::from(b)) as i64, body);
            Ok(())
        }
        FieldType::Int32 | FieldType::Int64 => {
            let b = base.as_i64().ok_or_else(|| encode_type_mismatch(field))?;
            let v = value.as_i64().ok_or_else(|| encode_type_mismatch(field))?;
            stopbit::encode_i64(v.wrapping_sub(b), body);
            Ok(())
        }
        FieldType::Decimal => {
            let (bm, be) = base.as_decimal().ok_or_else(|| encode_type_mismatch(field))?;
            let (m, e) = value
                .as_decimal()
                .ok_or_else(|| encode_type_mismatch(field))?;
            stopbit::encode_i32(e.wrapping_sub(be), body);
            stopbit::encode_i64(m.wrapping_sub(bm), body);
            Ok(())
        }
        FieldType::Ascii => {
            let b = ascii_checked(field, base.as_str().ok_or_else(|| encode_type_mismatch(field))?)?;
            let v = ascii_checked(field, value.as_str().ok_or_else(|| encode_type_mismatch(field))?)?;
            let prefix = common_prefix(b.as_bytes(), v.as_bytes());
            stopbit::encode_i32((b.len() - prefix) as i32, body);
            stopbit::encode_ascii(&v[prefix..], body);
            Ok(())
        }
        FieldType::ByteVector => {
            let b = base.as_bytes().ok_or_else(|| encode_type_mismatch(field))?;
            let v = value.as_bytes().ok_or_else(|| encode_type_mismatch(field))?;
            let prefix = common_prefix(b, v);
            stopbit::encode_i32((b.len() - prefix) as i32, body);
            stopbit::encode_byte_vector(&v[prefix..], body);
            Ok(())
        }
    }
}

fn write_tail(
    field: &Field,
    base: &FieldValue,
    value: &FieldValue,
    body: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match field.field_type() {
        FieldType::Ascii => {
            let b = ascii_checked(field, base.as_str().ok_or_else(|| encode_type_mismatch(field))?)?;
            let v = ascii_checked(field, value.as_str().ok_or_else(|| encode_type_mismatch(field))?)?;
            let tail = if v.len() == b.len() {
                &v[common_prefix(b.as_bytes(), v.as_bytes())..]
            } else {
                v
            };
            stopbit::encode_ascii(tail, body);
            Ok(())
        }
        FieldType::ByteVector => {
            let b = base.as_bytes().ok_or_else(|| encode_type_mismatch(field))?;
            let v = value.as_bytes().ok_or_else(|| encode_type_mismatch(field))?;
            let tail = if v.len() == b.len() {
                &v[common_prefix(b, v)..]
            } else {
                v
            };
            stopbit::encode_byte_vector(tail, body);
            Ok(())
        }
        _ => Err(encode_type_mismatch(field)),
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
