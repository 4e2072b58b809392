//! Fixed-length presence bitmap.
//!
//! A vector of exactly `capacity` bits, packed least-significant-bit first:
//! bit `i` lives at byte `i / 8`, bit position `i % 8`. It serializes and
//! merkleizes as an SSZ `Bitvector[capacity]`.

use crate::{
    hash::{chunk_count, merkleize_bytes, MerkleHasher},
    StableContainerError, StableSchema, StableValue,
};

/// One bit per field slot, marking which fields are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitPresenceVector {
    capacity: usize,
    bytes: Vec<u8>,
}

impl BitPresenceVector {
    /// An all-false vector of `capacity` bits.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bytes: vec![0u8; Self::byte_len(capacity)],
        }
    }

    /// Serialized length of a vector of `capacity` bits.
    pub fn byte_len(capacity: usize) -> usize {
        capacity.div_ceil(8)
    }

    /// Presence bits of `value` under `schema`.
    ///
    /// Bits beyond the value's fields stay false. Field values past the
    /// schema's capacity are ignored; `StableSchema::check_value` rejects
    /// such values.
    pub fn build(schema: &StableSchema, value: &StableValue) -> Self {
        let mut vector = Self::new(schema.capacity());
        for (index, field) in value.fields().iter().enumerate().take(schema.capacity()) {
            if field.is_active() {
                vector.set(index, true);
            }
        }
        vector
    }

    /// Read a vector of `capacity` bits from exactly `bytes`.
    ///
    /// Fails with `TruncatedInput` on short input and with
    /// `InvalidPresenceBits` if the unused high bits of the last byte are set.
    pub fn from_bytes(bytes: &[u8], capacity: usize) -> Result<Self, StableContainerError> {
        let needed = Self::byte_len(capacity);
        if bytes.len() < needed {
            return Err(StableContainerError::TruncatedInput {
                needed,
                available: bytes.len(),
            });
        }
        if bytes.len() > needed {
            return Err(StableContainerError::InvalidPresenceBits(format!(
                "expected {} bytes for {} bits, got {}",
                needed,
                capacity,
                bytes.len()
            )));
        }
        let used_in_last = capacity % 8;
        if used_in_last != 0 {
            let last = bytes[needed - 1];
            if last >> used_in_last != 0 {
                return Err(StableContainerError::InvalidPresenceBits(format!(
                    "padding bits beyond capacity {} are set",
                    capacity
                )));
            }
        }
        Ok(Self {
            capacity,
            bytes: bytes.to_vec(),
        })
    }

    /// Number of bits, i.e. the schema capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Packed bytes, as serialized.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bit `index`; false beyond capacity.
    pub fn get(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    /// Set bit `index`. Indices beyond capacity are ignored.
    pub fn set(&mut self, index: usize, present: bool) {
        if index >= self.capacity {
            return;
        }
        let mask = 1 << (index % 8);
        if present {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
    }

    /// Indices of set bits, ascending.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(move |index| self.get(*index))
    }

    /// Number of set bits.
    pub fn count_active(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    /// Check the vector against `schema`.
    ///
    /// Every required field's bit must be set, no bit at or beyond the
    /// schema's field count may be set, and the length must match the
    /// schema's capacity.
    pub fn validate(&self, schema: &StableSchema) -> Result<(), StableContainerError> {
        if self.capacity != schema.capacity() {
            return Err(StableContainerError::SchemaMismatch(format!(
                "presence vector has {} bits, {} has capacity {}",
                self.capacity,
                schema.name(),
                schema.capacity()
            )));
        }
        if let Some(index) = schema.plan().required_indices().find(|i| !self.get(*i)) {
            return Err(StableContainerError::InvalidPresenceBits(format!(
                "required field {} is absent",
                schema.fields()[index].name
            )));
        }
        if let Some(index) = (schema.len()..self.capacity).find(|i| self.get(*i)) {
            return Err(StableContainerError::InvalidPresenceBits(format!(
                "bit {} is set but {} declares only {} fields",
                index,
                schema.name(),
                schema.len()
            )));
        }
        Ok(())
    }

    /// Hash tree root as a `Bitvector[capacity]`.
    pub fn hash_tree_root<H: MerkleHasher>(&self) -> Result<[u8; 32], StableContainerError> {
        merkleize_bytes::<H>(&self.bytes, chunk_count(self.bytes.len()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{hash::Sha256Hasher, Element, ElementType, FieldDescriptor, FieldValue};

    fn schema() -> StableSchema {
        StableSchema::new(
            "T",
            4,
            vec![
                FieldDescriptor::required("a", ElementType::Uint8),
                FieldDescriptor::optional("b", ElementType::Uint8),
            ],
        )
        .expect("schema")
    }

    #[test]
    fn test_build_sets_active_bits_lsb_first() {
        let schema = schema();
        let value = StableValue::new(vec![Element::Uint8(5).into(), FieldValue::Absent]);
        let vector = BitPresenceVector::build(&schema, &value);
        assert_eq!(vector.as_bytes(), &[0b0000_0001]);

        let value = StableValue::new(vec![Element::Uint8(5).into(), Element::Uint8(7).into()]);
        let vector = BitPresenceVector::build(&schema, &value);
        assert_eq!(vector.as_bytes(), &[0b0000_0011]);
        assert_eq!(vector.active_indices().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(vector.count_active(), 2);
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(BitPresenceVector::byte_len(1), 1);
        assert_eq!(BitPresenceVector::byte_len(8), 1);
        assert_eq!(BitPresenceVector::byte_len(9), 2);
        assert_eq!(BitPresenceVector::new(17).as_bytes().len(), 3);
    }

    #[test]
    fn test_set_and_get_across_bytes() {
        let mut vector = BitPresenceVector::new(12);
        vector.set(9, true);
        assert!(vector.get(9));
        assert_eq!(vector.as_bytes(), &[0, 0b0000_0010]);
        vector.set(9, false);
        assert!(!vector.get(9));
        vector.set(12, true);
        assert!(!vector.get(12));
        assert_eq!(vector.count_active(), 0);
    }

    #[test]
    fn test_validate_rejects_missing_required() {
        let vector = BitPresenceVector::new(4);
        assert_matches!(
            vector.validate(&schema()),
            Err(StableContainerError::InvalidPresenceBits(_))
        );
    }

    #[test]
    fn test_validate_rejects_stray_bits() {
        let mut vector = BitPresenceVector::new(4);
        vector.set(0, true);
        vector.set(3, true);
        assert_matches!(
            vector.validate(&schema()),
            Err(StableContainerError::InvalidPresenceBits(_))
        );
    }

    #[test]
    fn test_validate_leaves_optional_bits_unconstrained() {
        let schema = schema();
        let mut vector = BitPresenceVector::new(4);
        vector.set(0, true);
        vector.validate(&schema).expect("b absent");
        vector.set(1, true);
        vector.validate(&schema).expect("b present");
    }

    #[test]
    fn test_validate_rejects_other_capacity() {
        let mut vector = BitPresenceVector::new(8);
        vector.set(0, true);
        assert_matches!(
            vector.validate(&schema()),
            Err(StableContainerError::SchemaMismatch(_))
        );
    }

    #[test]
    fn test_from_bytes() {
        let vector = BitPresenceVector::from_bytes(&[0b0000_0101], 4).expect("valid");
        assert!(vector.get(0));
        assert!(!vector.get(1));
        assert!(vector.get(2));

        assert_matches!(
            BitPresenceVector::from_bytes(&[], 4),
            Err(StableContainerError::TruncatedInput {
                needed: 1,
                available: 0
            })
        );
        assert_matches!(
            BitPresenceVector::from_bytes(&[0b0001_0000], 4),
            Err(StableContainerError::InvalidPresenceBits(_))
        );
        // All eight bits are in range for a capacity of 8
        assert!(BitPresenceVector::from_bytes(&[0xff], 8).is_ok());
    }

    #[test]
    fn test_hash_tree_root_is_packed_chunk() {
        let mut vector = BitPresenceVector::new(4);
        vector.set(0, true);
        let mut expected = [0u8; 32];
        expected[0] = 1;
        assert_eq!(vector.hash_tree_root::<Sha256Hasher>().unwrap(), expected);
    }
}
