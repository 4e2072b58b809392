//! Stable container schemas and their evolution rules.

use std::collections::BTreeSet;

use crate::{
    element::ElementType, plan::FieldPlan, value::FieldValue, StableContainerError, StableValue,
};

/// Largest capacity a stable container may declare.
pub const MAX_CAPACITY: usize = 1 << 16;

/// Largest length a byte vector or byte list field may declare.
pub const MAX_BYTE_LEN: usize = u32::MAX as usize;

/// One declared field: name, element type and whether it must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, unique within the schema.
    pub name: String,
    /// Type of the element stored in this field.
    pub element_type: ElementType,
    /// Whether every value must carry this field.
    pub required: bool,
}

impl FieldDescriptor {
    /// A field every value must carry.
    pub fn required(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            required: true,
        }
    }

    /// A field values may leave absent.
    pub fn optional(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            required: false,
        }
    }
}

/// An ordered field list bound to a fixed capacity.
///
/// The capacity fixes both the presence vector length and the Merkle tree
/// depth for the life of the type; later versions may only append optional
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableSchema {
    name: String,
    capacity: usize,
    fields: Vec<FieldDescriptor>,
    plan: FieldPlan,
}

impl StableSchema {
    /// Create a schema, validating it against its capacity.
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, StableContainerError> {
        if !(1..=MAX_CAPACITY).contains(&capacity) {
            return Err(StableContainerError::InvalidSchema(format!(
                "capacity must be between 1 and {}, got {}",
                MAX_CAPACITY, capacity
            )));
        }
        if fields.len() > capacity {
            return Err(StableContainerError::CapacityExceeded {
                fields: fields.len(),
                capacity,
            });
        }

        let mut names = BTreeSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(StableContainerError::InvalidSchema(
                    "field names must not be empty".into(),
                ));
            }
            if !names.insert(field.name.as_str()) {
                return Err(StableContainerError::InvalidSchema(format!(
                    "duplicate field name {}",
                    field.name
                )));
            }
            if field.element_type == ElementType::ByteVector(0) {
                return Err(StableContainerError::InvalidSchema(format!(
                    "field {} is a zero-length byte vector",
                    field.name
                )));
            }
            if let ElementType::ByteVector(len) | ElementType::ByteList(len) = &field.element_type {
                if *len > MAX_BYTE_LEN {
                    return Err(StableContainerError::InvalidSchema(format!(
                        "field {} allows {} bytes, more than 32-bit offsets can address",
                        field.name, len
                    )));
                }
            }
        }

        let plan = FieldPlan::new(&fields);
        Ok(Self {
            name: name.into(),
            capacity,
            fields,
            plan,
        })
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fixed maximum field count N.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Declared fields, in order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The layout table computed at construction.
    pub fn plan(&self) -> &FieldPlan {
        &self.plan
    }

    /// Index of the field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Next version of this schema with `appended` fields added at the end.
    ///
    /// Appended fields must be optional, and the capacity stays the same.
    pub fn extend(
        &self,
        appended: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, StableContainerError> {
        let mut fields = self.fields.clone();
        for field in appended {
            if field.required {
                return Err(StableContainerError::SchemaMismatch(format!(
                    "appended field {} must be optional",
                    field.name
                )));
            }
            fields.push(field);
        }
        Self::new(self.name.clone(), self.capacity, fields)
    }

    /// Check that `self` is a compatible later version of `older`.
    ///
    /// The capacity must match, every field of `older` must keep its
    /// position, name and type, a field may go from required to optional but
    /// never back, and appended fields must be optional.
    pub fn check_extension_of(&self, older: &StableSchema) -> Result<(), StableContainerError> {
        if self.capacity != older.capacity {
            return Err(StableContainerError::SchemaMismatch(format!(
                "capacity changed from {} to {}",
                older.capacity, self.capacity
            )));
        }
        if self.fields.len() < older.fields.len() {
            return Err(StableContainerError::SchemaMismatch(format!(
                "{} fields removed",
                older.fields.len() - self.fields.len()
            )));
        }
        for (index, (old, new)) in older.fields.iter().zip(&self.fields).enumerate() {
            if old.name != new.name || old.element_type != new.element_type {
                return Err(StableContainerError::SchemaMismatch(format!(
                    "field {} changed from {}: {} to {}: {}",
                    index, old.name, old.element_type, new.name, new.element_type
                )));
            }
            if !old.required && new.required {
                return Err(StableContainerError::SchemaMismatch(format!(
                    "optional field {} became required",
                    old.name
                )));
            }
        }
        if let Some(field) = self.fields[older.fields.len()..]
            .iter()
            .find(|field| field.required)
        {
            return Err(StableContainerError::SchemaMismatch(format!(
                "appended field {} must be optional",
                field.name
            )));
        }
        Ok(())
    }

    /// Check that `value` has one entry per field and that every present
    /// element conforms to its field's type.
    ///
    /// Absent required fields are left to presence validation.
    pub fn check_value(&self, value: &StableValue) -> Result<(), StableContainerError> {
        if value.len() != self.fields.len() {
            return Err(StableContainerError::InvalidValue(format!(
                "{} has {} fields, value has {}",
                self.name,
                self.fields.len(),
                value.len()
            )));
        }
        for (field, field_value) in self.fields.iter().zip(value.fields()) {
            if let FieldValue::Present(element) = field_value {
                if !element.conforms_to(&field.element_type) {
                    return Err(StableContainerError::InvalidValue(format!(
                        "field {} expects {}, got {}",
                        field.name,
                        field.element_type,
                        element.type_name()
                    )));
                }
            }
        }
        Ok(())
    }
}
