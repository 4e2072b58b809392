//! Single-field inclusion proofs against a stable container root.
//!
//! A `FieldProof` carries the field's leaf chunk, the sibling chunks from
//! that leaf up to the data root, and the packed presence bits. The verifier
//! rebuilds the data root from the branch, mixes in the presence root and
//! compares the result to the expected root.
//!
//! The branch length is `ceil(log2(capacity))` for every proof of a given
//! type, independent of how many fields are declared or present.

use bincode::{Decode, Encode};

use crate::{
    hash::{merkle_branch, tree_depth, MerkleHasher},
    merkle::field_leaves,
    StableContainerError, StableSchema, StableValue,
};

mod verify;

/// Upper bound on the size of an encoded proof accepted by
/// [`FieldProof::decode_from_slice`].
pub const MAX_PROOF_BYTES: usize = 1024 * 1024;

/// Proof that one field slot of a stable container holds a given leaf.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FieldProof {
    /// Capacity N of the container type.
    pub capacity: u32,
    /// Index of the proved field slot.
    pub field_index: u32,
    /// Hash tree root of the field's element, or zero if it is absent.
    pub leaf: [u8; 32],
    /// Sibling hashes from the leaf level up to the data root.
    pub branch: Vec<[u8; 32]>,
    /// Packed presence bits of the proved value.
    pub presence: Vec<u8>,
}

impl FieldProof {
    /// Build a proof for field slot `field_index` of `value`.
    ///
    /// Any slot below the capacity can be proved; slots with no declared or
    /// present field prove absence with a zero leaf.
    pub fn generate<H: MerkleHasher>(
        schema: &StableSchema,
        value: &StableValue,
        field_index: usize,
    ) -> Result<Self, StableContainerError> {
        if field_index >= schema.capacity() {
            return Err(StableContainerError::InvalidProof(format!(
                "field index {} is out of range (capacity={})",
                field_index,
                schema.capacity()
            )));
        }
        let (leaves, presence) = field_leaves::<H>(schema, value)?;
        let branch = merkle_branch::<H>(&leaves, schema.capacity(), field_index)?;
        let leaf = leaves.get(field_index).copied().unwrap_or([0u8; 32]);

        Ok(FieldProof {
            capacity: schema.capacity() as u32,
            field_index: field_index as u32,
            leaf,
            branch,
            presence: presence.as_bytes().to_vec(),
        })
    }

    /// Depth of the data tree this proof walks.
    pub fn depth(&self) -> u32 {
        tree_depth(self.capacity as usize)
    }

    /// Generalized index of the proved leaf in the full tree, where the data
    /// root is the left child of the root: `2 * 2^depth + field_index`.
    pub fn generalized_index(&self) -> u64 {
        (2u64 << self.depth()) + u64::from(self.field_index)
    }

    /// Encode to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, StableContainerError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_no_limit();
        bincode::encode_to_vec(self, config)
            .map_err(|e| StableContainerError::InvalidProof(format!("encode error: {}", e)))
    }

    /// Decode from bytes using bincode.
    ///
    /// The decoded proof is only structurally parsed; call `verify` before
    /// trusting it.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self, StableContainerError> {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_limit::<{ MAX_PROOF_BYTES }>();
        let (proof, consumed): (Self, _) = bincode::decode_from_slice(bytes, config)
            .map_err(|e| StableContainerError::InvalidProof(format!("decode error: {}", e)))?;
        if consumed != bytes.len() {
            return Err(StableContainerError::InvalidProof(format!(
                "{} trailing bytes after proof",
                bytes.len() - consumed
            )));
        }
        Ok(proof)
    }
}
