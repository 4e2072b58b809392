//! Static layout table derived once from a schema.

use crate::FieldDescriptor;

/// Width of a variable-size field's offset in the fixed region.
pub const OFFSET_BYTES: usize = 4;

/// How a field's encoding occupies the fixed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSize {
    /// The element is written in place with this many bytes.
    Fixed(usize),
    /// A 4-byte offset is written in place; the element goes in the variable
    /// region.
    Variable,
}

impl SlotSize {
    /// Bytes this slot takes in the fixed region.
    pub fn fixed_region_bytes(&self) -> usize {
        match self {
            SlotSize::Fixed(len) => *len,
            SlotSize::Variable => OFFSET_BYTES,
        }
    }
}

/// Position, requiredness and size class of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    /// Index of the field in the schema, which is also its presence bit and
    /// Merkle leaf.
    pub index: usize,
    /// Whether the field must always be present.
    pub required: bool,
    /// Size class of the field's element type.
    pub size: SlotSize,
}

/// Per-schema table of field slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPlan {
    slots: Vec<FieldSlot>,
}

impl FieldPlan {
    /// Build the plan for an ordered list of fields.
    pub fn new(fields: &[FieldDescriptor]) -> Self {
        let slots = fields
            .iter()
            .enumerate()
            .map(|(index, field)| FieldSlot {
                index,
                required: field.required,
                size: match field.element_type.fixed_size() {
                    Some(len) => SlotSize::Fixed(len),
                    None => SlotSize::Variable,
                },
            })
            .collect();
        Self { slots }
    }

    /// All slots in field order.
    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    /// The slot for field `index`, if the schema has that many fields.
    pub fn slot(&self, index: usize) -> Option<&FieldSlot> {
        self.slots.get(index)
    }

    /// Length of the fixed region when exactly the given fields are active.
    ///
    /// Indices without a slot are ignored.
    pub fn fixed_region_len(&self, active: impl IntoIterator<Item = usize>) -> usize {
        active
            .into_iter()
            .filter_map(|index| self.slots.get(index))
            .map(|slot| slot.size.fixed_region_bytes())
            .sum()
    }

    /// Indices of required fields.
    pub fn required_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.required)
            .map(|slot| slot.index)
    }
}
