//! Session-scoped codec state.
//!
//! A [`Context`] owns everything a decode or encode loop carries between
//! messages: the template registry, the id of the last template resolved on
//! this stream (for implicit carry-over), and the per-(template, field)
//! previous-value cache read and written by the stateful operators.
//!
//! One Context belongs to exactly one loop. It is not internally
//! synchronized; concurrent streams each get their own.

use crate::template::{Template, TemplateRegistry};
use fastwire_core::FieldValue;
use std::collections::HashMap;
use std::sync::Arc;

/// State of one previous-value slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreviousValue {
    /// Nothing has been transmitted for this field yet.
    #[default]
    Undefined,
    /// The field was last transmitted as absent.
    Empty,
    /// The last transmitted value.
    Assigned(FieldValue),
}

impl PreviousValue {
    /// Returns true if no value has ever been assigned.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns the assigned value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&FieldValue> {
        match self {
            Self::Assigned(v) => Some(v),
            _ => None,
        }
    }
}

/// Session-scoped state for one codec loop.
#[derive(Debug)]
pub struct Context {
    registry: TemplateRegistry,
    last_template_id: Option<u32>,
    previous: HashMap<u32, HashMap<String, PreviousValue>>,
}

impl Context {
    /// Creates a context over a template registry.
    #[must_use]
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            last_template_id: None,
            previous: HashMap::new(),
        }
    }

    /// Looks up a template by id.
    ///
    /// A miss means the wire referenced an unregistered template; callers
    /// must fail the decode, never guess a shape.
    #[must_use]
    pub fn template(&self, id: u32) -> Option<Arc<Template>> {
        self.registry.get(id)
    }

    /// Returns the template registry.
    #[must_use]
    pub const fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Returns the id of the most recently resolved template on this
    /// stream, if any.
    #[must_use]
    pub const fn last_template_id(&self) -> Option<u32> {
        self.last_template_id
    }

    /// Records the most recently resolved template id.
    pub fn set_last_template_id(&mut self, id: u32) {
        self.last_template_id = Some(id);
    }

    /// Lazily initializes the previous-value slots for a template on its
    /// first appearance in this session.
    pub fn new_message(&mut self, template: &Template) {
        self.previous.entry(template.id()).or_insert_with(|| {
            template
                .fields()
                .iter()
                .map(|f| (f.name().to_string(), PreviousValue::Undefined))
                .collect()
        });
    }

    /// Returns the previous value for a field, `Undefined` if never seen.
    #[must_use]
    pub fn previous(&self, template_id: u32, field: &str) -> PreviousValue {
        self.previous
            .get(&template_id)
            .and_then(|slots| slots.get(field))
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a transmitted value as the new previous value.
    pub fn set_previous(&mut self, template_id: u32, field: &str, value: FieldValue) {
        self.previous
            .entry(template_id)
            .or_default()
            .insert(field.to_string(), PreviousValue::Assigned(value));
    }

    /// Marks a field's previous value as explicitly empty.
    pub fn set_previous_empty(&mut self, template_id: u32, field: &str) {
        self.previous
            .entry(template_id)
            .or_default()
            .insert(field.to_string(), PreviousValue::Empty);
    }

    /// Clears all previous-value state and the last template id.
    ///
    /// Triggered by protocol-level Reset control messages.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.last_template_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldType};

    fn registry_with_template() -> TemplateRegistry {
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

    #[test]
    fn test_template_lookup() {
        let context = Context::new(registry_with_template());
        assert!(context.template(1).is_some());
        assert!(context.template(2).is_none());
    }

    #[test]
    fn test_new_message_initializes_slots() {
        let mut context = Context::new(registry_with_template());
        let template = context.template(1).unwrap();

        assert!(context.previous(1, "Qty").is_undefined());
        context.new_message(&template);
        assert!(context.previous(1, "Qty").is_undefined());

        context.set_previous(1, "Qty", FieldValue::UInt(5));
        assert_eq!(
            context.previous(1, "Qty").value(),
            Some(&FieldValue::UInt(5))
        );

        // re-registering the template must not wipe assigned slots
        context.new_message(&template);
        assert_eq!(
            context.previous(1, "Qty").value(),
            Some(&FieldValue::UInt(5))
        );
    }

    #[test]
    fn test_reset_clears_state() {
        let mut context = Context::new(registry_with_template());
        context.set_last_template_id(1);
        context.set_previous(1, "Qty", FieldValue::UInt(5));

        context.reset();
        assert_eq!(context.last_template_id(), None);
        assert!(context.previous(1, "Qty").is_undefined());
    }

    #[test]
    fn test_previous_empty() {
        let mut context = Context::new(registry_with_template());
        context.set_previous_empty(1, "Symbol");
        assert_eq!(context.previous(1, "Symbol"), PreviousValue::Empty);
    }
}
