//! Field proof verification.
//!
//! Pure function of the proof and the expected root; no schema or value
//! needed.

use crate::{
    hash::{root_from_branch, MerkleHasher, ZERO_CHUNK},
    proof::FieldProof,
    schema::MAX_CAPACITY,
    BitPresenceVector, Element, ElementType, StableContainerError,
};

impl FieldProof {
    /// Verify the proof against an expected stable container root.
    pub fn verify<H: MerkleHasher>(
        &self,
        expected_root: &[u8; 32],
    ) -> Result<(), StableContainerError> {
        let computed_root = self.compute_root::<H>()?;
        if &computed_root != expected_root {
            return Err(StableContainerError::InvalidProof(format!(
                "root hash mismatch: expected {}, got {}",
                hex::encode(expected_root),
                hex::encode(computed_root)
            )));
        }
        Ok(())
    }

    /// Verify the proof and check that the proved field holds `element` of
    /// type `element_type`.
    pub fn verify_element<H: MerkleHasher>(
        &self,
        expected_root: &[u8; 32],
        element: &Element,
        element_type: &ElementType,
    ) -> Result<(), StableContainerError> {
        self.verify::<H>(expected_root)?;
        if !self.is_present()? {
            return Err(StableContainerError::InvalidProof(format!(
                "field {} is absent",
                self.field_index
            )));
        }
        if element.hash_tree_root::<H>(element_type)? != self.leaf {
            return Err(StableContainerError::InvalidProof(format!(
                "field {} does not hold the given {}",
                self.field_index,
                element.type_name()
            )));
        }
        Ok(())
    }

    /// Whether the proved field's presence bit is set.
    pub fn is_present(&self) -> Result<bool, StableContainerError> {
        Ok(self.presence_vector()?.get(self.field_index as usize))
    }

    /// Recompute the container root this proof commits to.
    pub fn compute_root<H: MerkleHasher>(&self) -> Result<[u8; 32], StableContainerError> {
        let capacity = self.capacity as usize;
        if !(1..=MAX_CAPACITY).contains(&capacity) {
            return Err(StableContainerError::InvalidProof(format!(
                "invalid capacity {} in proof (must be 1..={})",
                capacity, MAX_CAPACITY
            )));
        }
        if self.field_index >= self.capacity {
            return Err(StableContainerError::InvalidProof(format!(
                "field index {} is out of range (capacity={})",
                self.field_index, capacity
            )));
        }
        if self.branch.len() != self.depth() as usize {
            return Err(StableContainerError::InvalidProof(format!(
                "branch has {} hashes, capacity {} needs {}",
                self.branch.len(),
                capacity,
                self.depth()
            )));
        }

        let presence = self.presence_vector()?;
        if !presence.get(self.field_index as usize) && self.leaf != ZERO_CHUNK {
            return Err(StableContainerError::InvalidProof(format!(
                "absent field {} has a non-zero leaf",
                self.field_index
            )));
        }

        let data_root =
            root_from_branch::<H>(&self.leaf, &self.branch, self.field_index as usize);
        let bits_root = presence.hash_tree_root::<H>()?;
        Ok(H::mix_in(&data_root, &bits_root))
    }

    fn presence_vector(&self) -> Result<BitPresenceVector, StableContainerError> {
        BitPresenceVector::from_bytes(&self.presence, self.capacity as usize)
            .map_err(|e| StableContainerError::InvalidProof(format!("presence bits: {}", e)))
    }
}
