//! Field values of a stable container.

use crate::{element::Element, StableSchema};

/// A field's value: a present element or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The field carries this element.
    Present(Element),
    /// The field is not set. Only legal for optional fields.
    Absent,
}

impl FieldValue {
    /// Whether the field is present, i.e. its presence bit is set.
    pub fn is_active(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }

    /// The element, if present.
    pub fn element(&self) -> Option<&Element> {
        match self {
            FieldValue::Present(element) => Some(element),
            FieldValue::Absent => None,
        }
    }
}

impl From<Element> for FieldValue {
    fn from(element: Element) -> Self {
        FieldValue::Present(element)
    }
}

impl From<Option<Element>> for FieldValue {
    fn from(element: Option<Element>) -> Self {
        match element {
            Some(element) => FieldValue::Present(element),
            None => FieldValue::Absent,
        }
    }
}

/// One value per schema field, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StableValue {
    fields: Vec<FieldValue>,
}

impl StableValue {
    /// Wrap field values given in schema order.
    pub fn new(fields: Vec<FieldValue>) -> Self {
        Self { fields }
    }

    /// All field values.
    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    /// Consume the value and return its fields.
    pub fn into_fields(self) -> Vec<FieldValue> {
        self.fields
    }

    /// Number of field values.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no field values.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The value of field `index`.
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get(index)
    }

    /// The element of the field called `name`, if that field exists and is
    /// present.
    pub fn get_by_name(&self, schema: &StableSchema, name: &str) -> Option<&Element> {
        schema
            .field_index(name)
            .and_then(|index| self.fields.get(index))
            .and_then(FieldValue::element)
    }

    /// Present elements with their field indices, in field order.
    pub fn active_elements(&self) -> impl Iterator<Item = (usize, &Element)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter_map(|(index, field)| field.element().map(|element| (index, element)))
    }

    /// The same value expressed under a later schema version: fields the
    /// newer schema appended are absent.
    ///
    /// Values already at least as long as the schema are returned unchanged.
    pub fn extended_to(&self, schema: &StableSchema) -> Self {
        let mut fields = self.fields.clone();
        if fields.len() < schema.len() {
            fields.resize(schema.len(), FieldValue::Absent);
        }
        Self { fields }
    }
}
