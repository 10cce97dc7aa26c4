//! Decoded message container.
//!
//! A [`Message`] is created fresh per decode (or built by hand before an
//! encode) and always carries exactly one value slot per template field.
//! After a decode it is additionally annotated with the raw outer-frame
//! bytes it came from.

use crate::template::Template;
use bytes::Bytes;
use fastwire_core::{EncodeError, FieldValue};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A FAST message: one value slot per field of its template.
#[derive(Debug, Clone)]
pub struct Message {
    template: Arc<Template>,
    values: SmallVec<[Option<FieldValue>; 16]>,
    raw: Bytes,
}

impl Message {
    /// Creates an empty message for a template, all slots absent.
    #[must_use]
    pub fn new(template: Arc<Template>) -> Self {
        let values = std::iter::repeat_with(|| None)
            .take(template.fields().len())
            .collect();
        Self {
            template,
            values,
            raw: Bytes::new(),
        }
    }

    /// Returns the message's template.
    #[must_use]
    pub const fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Returns the template id.
    #[must_use]
    pub fn template_id(&self) -> u32 {
        self.template.id()
    }

    /// Returns the template name.
    #[must_use]
    pub fn template_name(&self) -> &str {
        self.template.name()
    }

    /// Returns the number of field slots.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    /// Gets a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.template
            .field_index(name)
            .and_then(|i| self.values[i].as_ref())
    }

    /// Gets a field value by declaration index.
    #[must_use]
    pub fn get_at(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Gets a field as a u64.
    #[must_use]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldValue::as_u64)
    }

    /// Gets a field as an i64.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    /// Gets a field as a string slice.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Gets a field as a byte slice.
    #[must_use]
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(FieldValue::as_bytes)
    }

    /// Gets a field as a (mantissa, exponent) pair.
    #[must_use]
    pub fn get_decimal(&self, name: &str) -> Option<(i64, i32)> {
        self.get(name).and_then(FieldValue::as_decimal)
    }

    /// Sets a field value by name.
    ///
    /// # Errors
    /// Returns [`EncodeError::UnknownField`] if the template does not
    /// declare the field; a message's field set always matches its
    /// template exactly.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), EncodeError> {
        let index = self
            .template
            .field_index(name)
            .ok_or_else(|| EncodeError::UnknownField {
                field: name.to_string(),
            })?;
        self.values[index] = Some(value.into());
        Ok(())
    }

    /// Sets a slot by declaration index. Used by the template decode walk.
    pub(crate) fn set_at(&mut self, index: usize, value: Option<FieldValue>) {
        self.values[index] = value;
    }

    /// Returns the raw outer-frame bytes this message was decoded from.
    ///
    /// Empty for messages built by hand.
    #[must_use]
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Annotates the message with its raw outer-frame bytes.
    pub fn set_raw_bytes(&mut self, raw: Bytes) {
        self.raw = raw;
    }
}

impl PartialEq for Message {
    /// Two messages are equal when they share a template id and carry
    /// identical field values.
    fn eq(&self, other: &Self) -> bool {
        self.template.id() == other.template.id() && self.values == other.values
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={}) {{", self.template.name(), self.template.id())?;
        let mut first = true;
        for (i, field) in self.template.fields().iter().enumerate() {
            if let Some(value) = &self.values[i] {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, " {}={}", field.name(), value)?;
                first = false;
            }
        }
        write!(f, " }}")
    }
}
