//! Field schema: wire types and operators.
//!
//! Operators relate a field's wire value to prior transmissions: a field may
//! be copied from, incremented over, or expressed as a delta against the
//! previous value cached in the session [`Context`](crate::Context).

use fastwire_core::FieldValue;
use serde::{Deserialize, Serialize};

/// FAST wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Decimal: signed exponent then signed mantissa.
    Decimal,
    /// ASCII string, stop bit on the final character.
    Ascii,
    /// Byte vector with a length prefix.
    ByteVector,
}

impl FieldType {
    /// Returns true for the integer wire types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::UInt32 | Self::UInt64 | Self::Int32 | Self::Int64)
    }

    /// Returns a short name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UInt32 => "uInt32",
            Self::UInt64 => "uInt64",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Decimal => "decimal",
            Self::Ascii => "string",
            Self::ByteVector => "byteVector",
        }
    }
}

/// Per-field operator relating wire values to session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Operator {
    /// No operator: the value is on the wire whenever the field is present.
    #[default]
    None,
    /// Never on the wire; the value is the template's initial value.
    Constant,
    /// On the wire when it differs from the initial value.
    Default,
    /// Absent means: repeat the previous value.
    Copy,
    /// Absent means: previous value plus one. Integer fields only.
    Increment,
    /// The wire carries a delta against the previous value.
    Delta,
    /// The wire carries a replacement for the tail of the previous value.
    Tail,
}

impl Operator {
    /// Returns true if this operator reads or writes the previous-value
    /// cache.
    #[must_use]
    pub const fn uses_previous_value(&self) -> bool {
        matches!(self, Self::Copy | Self::Increment | Self::Delta | Self::Tail)
    }

    /// Returns true if a field with this operator consumes a presence bit.
    ///
    /// Mandatory fields with no operator or a constant operator are the only
    /// ones that do not: their presence is implied by the template.
    #[must_use]
    pub const fn uses_presence_bit(&self, optional: bool) -> bool {
        match self {
            Self::None | Self::Constant => optional,
            Self::Default | Self::Copy | Self::Increment | Self::Delta | Self::Tail => true,
        }
    }
}

/// One field of a template: name, wire type, operator, optionality, and an
/// optional initial value for the Constant and Default operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    field_type: FieldType,
    operator: Operator,
    optional: bool,
    initial: Option<FieldValue>,
}

impl Field {
    /// Creates a mandatory field with no operator.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            operator: Operator::None,
            optional: false,
            initial: None,
        }
    }

    /// Sets the operator.
    #[must_use]
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the initial value used by Constant and Default, and as the base
    /// for stateful operators before anything was transmitted.
    #[must_use]
    pub fn with_initial(mut self, value: impl Into<FieldValue>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the wire type.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Returns true if the field is optional.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns the initial value, if any.
    #[must_use]
    pub const fn initial(&self) -> Option<&FieldValue> {
        self.initial.as_ref()
    }

    /// Returns true if this field consumes a presence bit.
    #[must_use]
    pub const fn uses_presence_bit(&self) -> bool {
        self.operator.uses_presence_bit(self.optional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_uses_previous_value() {
        assert!(!Operator::None.uses_previous_value());
        assert!(!Operator::Constant.uses_previous_value());
        assert!(!Operator::Default.uses_previous_value());
        assert!(Operator::Copy.uses_previous_value());
        assert!(Operator::Increment.uses_previous_value());
        assert!(Operator::Delta.uses_previous_value());
        assert!(Operator::Tail.uses_previous_value());
    }

    #[test]
    fn test_presence_bit_rule() {
        assert!(!Operator::None.uses_presence_bit(false));
        assert!(Operator::None.uses_presence_bit(true));
        assert!(!Operator::Constant.uses_presence_bit(false));
        assert!(Operator::Constant.uses_presence_bit(true));
        assert!(Operator::Default.uses_presence_bit(false));
        assert!(Operator::Copy.uses_presence_bit(false));
        assert!(Operator::Increment.uses_presence_bit(true));
        assert!(Operator::Delta.uses_presence_bit(false));
        assert!(Operator::Tail.uses_presence_bit(false));
    }

    #[test]
    fn test_field_builder() {
        let field = Field::new("Px", FieldType::Decimal)
            .with_operator(Operator::Copy)
            .optional()
            .with_initial(FieldValue::Decimal {
                mantissa: 0,
                exponent: 0,
            });

        assert_eq!(field.name(), "Px");
        assert_eq!(field.field_type(), FieldType::Decimal);
        assert_eq!(field.operator(), Operator::Copy);
        assert!(field.is_optional());
        assert!(field.initial().is_some());
        assert!(field.uses_presence_bit());
    }

    #[test]
    fn test_field_type_predicates() {
        assert!(FieldType::UInt32.is_integer());
        assert!(FieldType::Int64.is_integer());
        assert!(!FieldType::Ascii.is_integer());
        assert!(!FieldType::Decimal.is_integer());
        assert_eq!(FieldType::Ascii.name(), "string");
    }
}
