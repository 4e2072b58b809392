//! Hash tree root of a stable container.
//!
//! ```text
//! root = H(data_root || bits_root)
//! data_root = merkleize([leaf_0, .., leaf_{N-1}], N)
//! leaf_i = hash_tree_root(field i) if field i is present, else [0; 32]
//! bits_root = hash_tree_root(presence as Bitvector[N])
//! ```
//!
//! The data tree always has `N` leaf slots, so its depth is `ceil(log2(N))`
//! however many fields the schema currently declares. Appending optional
//! fields never changes the root of a value that leaves them unset.

use tracing::trace;

use crate::{
    hash::{merkleize, MerkleHasher, Sha256Hasher, ZERO_CHUNK},
    BitPresenceVector, StableContainerError, StableSchema, StableValue, LOG_TARGET,
};

/// Hash tree root of `value` under `schema`, using SHA-256.
pub fn hash_tree_root(
    schema: &StableSchema,
    value: &StableValue,
) -> Result<[u8; 32], StableContainerError> {
    hash_tree_root_with::<Sha256Hasher>(schema, value)
}

/// Hash tree root of `value` under `schema` with the hasher `H`.
pub fn hash_tree_root_with<H: MerkleHasher>(
    schema: &StableSchema,
    value: &StableValue,
) -> Result<[u8; 32], StableContainerError> {
    let (leaves, presence) = field_leaves::<H>(schema, value)?;
    let data_root = merkleize::<H>(&leaves, schema.capacity())?;
    let bits_root = presence.hash_tree_root::<H>()?;
    let root = H::mix_in(&data_root, &bits_root);

    trace!(
        target: LOG_TARGET,
        schema = schema.name(),
        active = presence.count_active(),
        root = %hex::encode(root),
        "computed stable container root"
    );
    Ok(root)
}

/// Leaf chunks for every declared field, zero for absent ones, plus the
/// validated presence vector.
///
/// Slots between the schema's field count and its capacity are left to the
/// tree padding, which hashes them as zero chunks too.
pub(crate) fn field_leaves<H: MerkleHasher>(
    schema: &StableSchema,
    value: &StableValue,
) -> Result<(Vec<[u8; 32]>, BitPresenceVector), StableContainerError> {
    schema.check_value(value)?;
    let presence = BitPresenceVector::build(schema, value);
    presence.validate(schema)?;

    let leaves = schema
        .fields()
        .iter()
        .zip(value.fields())
        .map(|(field, field_value)| match field_value.element() {
            Some(element) => element.hash_tree_root::<H>(&field.element_type),
            None => Ok(ZERO_CHUNK),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((leaves, presence))
}
